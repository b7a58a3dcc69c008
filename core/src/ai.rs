use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One entry in the AI tool catalog, for UI discovery. Static metadata;
/// the catalog never changes at runtime.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolInfo {
    /// Tool identifier passed to `POST /ai/query` (e.g. "identify_trends")
    pub id: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Icon tag for the frontend (e.g. "alert-triangle")
    pub icon: String,
}

/// Body of `GET /ai/tools`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ToolListResponse {
    pub success: bool,
    pub tools: Vec<ToolInfo>,
}

/// Body of `POST /ai/query`: run one named tool against the audit data.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AiQueryRequest {
    /// Free-text question forwarded to the model
    pub query: String,
    /// Tool identifier from the catalog
    pub tool: String,
    /// Tool-specific context, e.g. `{"audit_id": "AUD-2025-1A2B3C4D"}`
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Envelope every AI endpoint returns. Tool-level failures (unparseable
/// model output, unknown audit id) land here as `success: false` with an
/// error string, never as a transport-level failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct AiResponse {
    pub success: bool,
    pub tool: String,
    pub query: String,
    /// Tool-specific payload; shape varies per tool
    pub result: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /ai/chat`: free text, routed to a tool by keyword.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Body of the chat response; echoes which tool the router picked.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub success: bool,
    pub message: String,
    pub tool_used: String,
    pub response: serde_json::Value,
}
