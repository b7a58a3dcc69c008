use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use qms_core::ai::{
    AiQueryRequest, AiResponse, ChatRequest, ChatResponse, ToolInfo, ToolListResponse,
};

use crate::ai;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ai/tools", get(list_tools))
        .route("/ai/query", post(execute_query))
        .route("/ai/chat", post(chat))
}

/// Derive the response envelope from a tool payload. A non-empty `error`
/// key forces failure; otherwise the payload's own success flag decides
/// (tools that never set one count as success).
fn envelope(tool: String, query: String, result: Value) -> AiResponse {
    let error = result
        .get("error")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .map(str::to_string);
    let success = error.is_none()
        && result
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true);
    AiResponse {
        success,
        tool,
        query,
        result,
        error,
    }
}

/// List the available AI tools
///
/// Static catalog metadata for UI discovery.
#[utoipa::path(
    get,
    path = "/ai/tools",
    responses(
        (status = 200, description = "Tool catalog", body = ToolListResponse)
    ),
    tag = "ai"
)]
pub async fn list_tools() -> Json<ToolListResponse> {
    let tools: Vec<ToolInfo> = ai::available_tools();
    Json(ToolListResponse {
        success: true,
        tools,
    })
}

/// Run one AI tool against the audit data
///
/// Always answers 200 with a success flag. Tool-level failures (unknown
/// tool, unparseable model output, unknown audit id) are carried in the
/// envelope, never surfaced as transport errors.
#[utoipa::path(
    post,
    path = "/ai/query",
    request_body = AiQueryRequest,
    responses(
        (status = 200, description = "Tool result envelope", body = AiResponse)
    ),
    tag = "ai"
)]
pub async fn execute_query(
    State(state): State<AppState>,
    Json(req): Json<AiQueryRequest>,
) -> Json<AiResponse> {
    let result = state
        .ai
        .execute(&state.db, &req.tool, &req.query, req.context.as_ref())
        .await;
    Json(envelope(req.tool, req.query, result))
}

/// Free-text AI chat
///
/// Routes the message to a tool by keyword (first match in a fixed table;
/// defaults to the open-events summary) and runs it.
#[utoipa::path(
    post,
    path = "/ai/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chat response", body = ChatResponse),
        (status = 422, description = "Empty message", body = qms_core::error::ApiError)
    ),
    tag = "ai"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation {
            message: "Message is required".to_string(),
            field: Some("message".to_string()),
            received: None,
            docs_hint: None,
        });
    }

    let tool = ai::route_message(&req.message);
    let result = state
        .ai
        .execute(&state.db, tool, &req.message, req.context.as_ref())
        .await;

    Ok(Json(ChatResponse {
        success: true,
        message: req.message,
        tool_used: tool.to_string(),
        response: result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_passes_through_successful_payloads() {
        let result = json!({ "tool": "identify_trends", "success": true, "ai_analysis": {} });
        let env = envelope("identify_trends".into(), "trends?".into(), result);
        assert!(env.success);
        assert!(env.error.is_none());
    }

    #[test]
    fn envelope_error_key_forces_failure() {
        let result = json!({ "error": "Unknown tool: make_coffee" });
        let env = envelope("make_coffee".into(), "espresso".into(), result);
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("Unknown tool: make_coffee"));
    }

    #[test]
    fn envelope_respects_payload_success_flag() {
        let result = json!({
            "tool": "identify_trends",
            "success": false,
            "error": "AI returned non-JSON response. Check raw response for details.",
            "ai_response": "sorry"
        });
        let env = envelope("identify_trends".into(), "trends?".into(), result);
        assert!(!env.success);
        assert!(env.error.is_some());
    }

    #[test]
    fn envelope_without_flags_counts_as_success() {
        let result = json!({ "anything": 1 });
        let env = envelope("t".into(), "q".into(), result);
        assert!(env.success);
    }
}
