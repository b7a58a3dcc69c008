//! AI tool pipeline: five analysis tools sharing one skeleton. Select
//! records, render a prompt, call the model gateway, recover structure
//! from the reply, shape the payload. Tool-level failures become error
//! payloads; nothing in here propagates an error to the route layer.

mod gateway;
mod interpret;
mod prompt;
mod select;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use sqlx::PgPool;

use qms_core::ai::ToolInfo;
use qms_core::audit::Audit;

use crate::store::{self, AuditFilter, StoreError};

pub use gateway::{DEFAULT_GEMINI_MODEL, GatewayError, GeminiGateway, MockGateway, ModelGateway};
pub use interpret::{Interpreted, PARSE_FAILURE_MARKER, interpret};

/// Error string attached when the model reply could not be parsed.
const NON_JSON_REPLY_ERROR: &str =
    "AI returned non-JSON response. Check raw response for details.";

/// The five tools. Adding a tool means one new variant plus its plan and
/// payload arms; the pipeline itself stays untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    HighRiskEvents,
    OpenEventsSummary,
    NextSteps,
    Trends,
    Notification,
}

impl ToolKind {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "show_high_risk_events" => Some(Self::HighRiskEvents),
            "summarize_open_events" => Some(Self::OpenEventsSummary),
            "suggest_next_steps" => Some(Self::NextSteps),
            "identify_trends" => Some(Self::Trends),
            "generate_notification" => Some(Self::Notification),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::HighRiskEvents => "show_high_risk_events",
            Self::OpenEventsSummary => "summarize_open_events",
            Self::NextSteps => "suggest_next_steps",
            Self::Trends => "identify_trends",
            Self::Notification => "generate_notification",
        }
    }
}

/// Static catalog behind `GET /ai/tools`.
pub fn available_tools() -> Vec<ToolInfo> {
    [
        (
            "show_high_risk_events",
            "Show High-Risk Events",
            "Identify and filter audits based on severity, priority, and risk factors",
            "alert-triangle",
        ),
        (
            "summarize_open_events",
            "Summarize Open Events",
            "Provide a summary of open/planned audits for the specified time period",
            "file-text",
        ),
        (
            "suggest_next_steps",
            "Suggest Next Steps",
            "Get AI recommendations for specific audit actions and follow-ups",
            "lightbulb",
        ),
        (
            "identify_trends",
            "Identify Audit Trends",
            "Analyze audit patterns and trends across different types and locations",
            "trending-up",
        ),
        (
            "generate_notification",
            "Generate Notification",
            "Create draft notifications for audit communications and closures",
            "bell",
        ),
    ]
    .iter()
    .map(|(id, name, description, icon)| ToolInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}

pub const DEFAULT_TOOL: &str = "summarize_open_events";

/// Ordered keyword table for `/ai/chat`; the first keyword contained in
/// the lowercased message wins.
const KEYWORD_ROUTING: &[(&str, &str)] = &[
    ("high-risk", "show_high_risk_events"),
    ("high risk", "show_high_risk_events"),
    ("risk", "show_high_risk_events"),
    ("summary", "summarize_open_events"),
    ("summarize", "summarize_open_events"),
    ("next steps", "suggest_next_steps"),
    ("suggest", "suggest_next_steps"),
    ("recommend", "suggest_next_steps"),
    ("trends", "identify_trends"),
    ("pattern", "identify_trends"),
    ("notification", "generate_notification"),
    ("notify", "generate_notification"),
    ("draft", "generate_notification"),
];

pub fn route_message(message: &str) -> &'static str {
    let lowered = message.to_lowercase();
    KEYWORD_ROUTING
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, tool)| *tool)
        .unwrap_or(DEFAULT_TOOL)
}

#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("Audit {0} not found")]
    AuditNotFound(String),
    #[error("No audit ID specified")]
    MissingAuditId,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a tool needs after the gateway replies: which tool ran and
/// the record data its payload echoes back alongside the model's answer.
enum ShapeData {
    HighRisk { audits: Vec<Audit> },
    OpenEvents { digests: Vec<Value> },
    NextSteps { detail: Value },
    Trends { data_points: usize },
    Notification {
        notification_type: String,
        audit_details: Value,
    },
}

impl ShapeData {
    fn tool_id(&self) -> &'static str {
        match self {
            Self::HighRisk { .. } => ToolKind::HighRiskEvents.id(),
            Self::OpenEvents { .. } => ToolKind::OpenEventsSummary.id(),
            Self::NextSteps { .. } => ToolKind::NextSteps.id(),
            Self::Trends { .. } => ToolKind::Trends.id(),
            Self::Notification { .. } => ToolKind::Notification.id(),
        }
    }

    /// Interpret the raw reply and produce the final tool payload: either
    /// the shaped success object or the diagnostics-preserving fallback.
    fn conclude(self, query: &str, raw: &str) -> Value {
        let reply = interpret(raw);
        if reply.is_fallback {
            return json!({
                "tool": self.tool_id(),
                "query": query,
                "ai_response": raw,
                "success": false,
                "error": NON_JSON_REPLY_ERROR,
            });
        }
        self.into_payload(query, reply.value)
    }

    fn into_payload(self, query: &str, analysis: Value) -> Value {
        match self {
            Self::HighRisk { audits } => {
                let flagged: HashSet<&str> = analysis
                    .get("high_risk_audits")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| item.get("audit_id").and_then(Value::as_str))
                            .collect()
                    })
                    .unwrap_or_default();
                let filtered: Vec<Value> = audits
                    .iter()
                    .filter(|a| flagged.contains(a.audit_id.as_str()))
                    .map(select::summary_digest)
                    .collect();
                json!({
                    "tool": ToolKind::HighRiskEvents.id(),
                    "query": query,
                    "ai_analysis": analysis,
                    "filtered_audits": filtered,
                    "success": true,
                })
            }
            Self::OpenEvents { digests } => json!({
                "tool": ToolKind::OpenEventsSummary.id(),
                "query": query,
                "ai_analysis": analysis,
                "audit_count": digests.len(),
                "audits": digests,
                "success": true,
            }),
            Self::NextSteps { detail } => json!({
                "tool": ToolKind::NextSteps.id(),
                "query": query,
                "audit": detail,
                "ai_recommendations": analysis,
                "success": true,
            }),
            Self::Trends { data_points } => json!({
                "tool": ToolKind::Trends.id(),
                "query": query,
                "ai_analysis": analysis,
                "data_points": data_points,
                "success": true,
            }),
            Self::Notification {
                notification_type,
                audit_details,
            } => json!({
                "tool": ToolKind::Notification.id(),
                "query": query,
                "notification_type": notification_type,
                "audit_details": audit_details,
                "ai_generated": analysis,
                "success": true,
            }),
        }
    }
}

struct ToolCall {
    prompt: String,
    data: ShapeData,
}

/// Tool dispatcher. Holds the one shared gateway handle; constructed at
/// startup and passed in explicitly so tests can swap the gateway.
pub struct AiService {
    gateway: Arc<dyn ModelGateway>,
}

impl AiService {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Single entry point for `/ai/query` and `/ai/chat`. Always returns a
    /// payload object; every failure mode is folded into it.
    pub async fn execute(
        &self,
        db: &PgPool,
        tool: &str,
        query: &str,
        context: Option<&Value>,
    ) -> Value {
        let Some(kind) = ToolKind::from_id(tool) else {
            return json!({ "error": format!("Unknown tool: {}", tool) });
        };

        match self.run(db, kind, query, context).await {
            Ok(payload) => payload,
            Err(err) => error_payload(kind, query, err),
        }
    }

    async fn run(
        &self,
        db: &PgPool,
        kind: ToolKind,
        query: &str,
        context: Option<&Value>,
    ) -> Result<Value, ToolError> {
        let call = plan(db, kind, query, context).await?;
        let raw = self.gateway.generate(&call.prompt).await?;
        Ok(call.data.conclude(query, &raw))
    }
}

/// Per-tool preparation: record selection and prompt rendering. The only
/// stage that differs between tools.
async fn plan(
    db: &PgPool,
    kind: ToolKind,
    query: &str,
    context: Option<&Value>,
) -> Result<ToolCall, ToolError> {
    match kind {
        ToolKind::HighRiskEvents => {
            let audits = store::list_audits(
                db,
                &AuditFilter::default(),
                0,
                select::ROSTER_FETCH_LIMIT,
            )
            .await?;
            let digests: Vec<Value> = audits.iter().map(select::risk_digest).collect();
            Ok(ToolCall {
                prompt: prompt::high_risk(query, &digests),
                data: ShapeData::HighRisk { audits },
            })
        }
        ToolKind::OpenEventsSummary => {
            let audits = store::list_audits(
                db,
                &AuditFilter::default(),
                0,
                select::ROSTER_FETCH_LIMIT,
            )
            .await?;
            let open = select::open_within_window(&audits, Utc::now().date_naive());
            let digests: Vec<Value> = open.iter().map(|a| select::open_digest(a)).collect();
            let prompt = prompt::open_events(query, &digests, digests.len());
            Ok(ToolCall {
                prompt,
                data: ShapeData::OpenEvents { digests },
            })
        }
        ToolKind::NextSteps => {
            let audit_id =
                select::resolve_audit_id(context, query).ok_or(ToolError::MissingAuditId)?;
            let audit = store::get_audit(db, &audit_id)
                .await?
                .ok_or_else(|| ToolError::AuditNotFound(audit_id.clone()))?;
            let detail = select::detail_digest(&audit);
            Ok(ToolCall {
                prompt: prompt::next_steps(query, &detail),
                data: ShapeData::NextSteps { detail },
            })
        }
        ToolKind::Trends => {
            let audits = store::list_audits(
                db,
                &AuditFilter::default(),
                0,
                select::ROSTER_FETCH_LIMIT,
            )
            .await?;
            let digests: Vec<Value> = audits.iter().map(select::trend_digest).collect();
            let prompt = prompt::trends(query, &digests);
            Ok(ToolCall {
                prompt,
                data: ShapeData::Trends {
                    data_points: digests.len(),
                },
            })
        }
        ToolKind::Notification => {
            let notification_type = context
                .and_then(|c| c.get("type"))
                .and_then(Value::as_str)
                .unwrap_or("general")
                .to_string();
            // An id that resolves to nothing is not an error here; the
            // tool can draft generic templates without an audit.
            let audit = match select::context_audit_id(context) {
                Some(id) => store::get_audit(db, &id).await?,
                None => None,
            };
            let detail = audit.as_ref().map(select::contact_digest);
            let prompt = prompt::notification(query, &notification_type, detail.as_ref());
            Ok(ToolCall {
                prompt,
                data: ShapeData::Notification {
                    notification_type,
                    audit_details: detail.unwrap_or_else(|| json!({})),
                },
            })
        }
    }
}

fn error_payload(kind: ToolKind, query: &str, err: ToolError) -> Value {
    match err {
        ToolError::AuditNotFound(_) | ToolError::MissingAuditId => {
            json!({ "error": err.to_string() })
        }
        other => {
            tracing::error!(tool = kind.id(), error = %other, "AI tool execution failed");
            json!({
                "tool": kind.id(),
                "query": query,
                "success": false,
                "error": format!("Processing error: {}", other),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use qms_core::audit::{AuditStatus, AuditType};

    fn audit(audit_id: &str) -> Audit {
        Audit {
            id: 1,
            audit_id: audit_id.to_string(),
            audit_title: "Annual GMP Compliance".to_string(),
            audit_type: AuditType::Regulatory,
            audit_scope: "scope".to_string(),
            audit_objective: "objective".to_string(),
            auditee_name: "Manufacturing Line B".to_string(),
            auditee_site_location: "Boston".to_string(),
            auditee_country: "USA".to_string(),
            primary_contact_name: "John Smith".to_string(),
            primary_contact_email: Some("john.smith@company.com".to_string()),
            proposed_start_date: None,
            proposed_end_date: None,
            confirmed_start_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            confirmed_end_date: NaiveDate::from_ymd_opt(2025, 5, 14).unwrap(),
            lead_auditor: "QA Manager".to_string(),
            audit_team: None,
            audit_criteria: "criteria".to_string(),
            audit_agenda: None,
            status: AuditStatus::Planned,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn tool_ids_round_trip() {
        for kind in [
            ToolKind::HighRiskEvents,
            ToolKind::OpenEventsSummary,
            ToolKind::NextSteps,
            ToolKind::Trends,
            ToolKind::Notification,
        ] {
            assert_eq!(ToolKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ToolKind::from_id("make_coffee"), None);
    }

    #[test]
    fn catalog_lists_all_five_tools() {
        let tools = available_tools();
        assert_eq!(tools.len(), 5);
        for tool in &tools {
            assert!(ToolKind::from_id(&tool.id).is_some());
        }
    }

    #[test]
    fn chat_routing_picks_tools_by_keyword() {
        assert_eq!(route_message("show me high risk audits"), "show_high_risk_events");
        assert_eq!(route_message("give me a summary"), "summarize_open_events");
        assert_eq!(route_message("what are the TRENDS this year"), "identify_trends");
        assert_eq!(route_message("draft a closure notice"), "generate_notification");
        assert_eq!(
            route_message("suggest next steps for AUD-2025-AAAAAAAA"),
            "suggest_next_steps"
        );
    }

    #[test]
    fn chat_routing_defaults_to_open_events_summary() {
        assert_eq!(route_message("hello there"), DEFAULT_TOOL);
    }

    #[test]
    fn chat_routing_earlier_keywords_win() {
        // Contains both "risk" and "summary"; "risk" sits earlier in the table.
        assert_eq!(route_message("risk summary please"), "show_high_risk_events");
    }

    #[test]
    fn high_risk_payload_keeps_only_flagged_audits() {
        let data = ShapeData::HighRisk {
            audits: vec![audit("AUD-2025-AAAAAAAA"), audit("AUD-2025-BBBBBBBB")],
        };
        let raw = r#"{
            "high_risk_audits": [{"audit_id": "AUD-2025-BBBBBBBB", "risk_score": 9}],
            "summary": "one regulatory audit",
            "total_high_risk": 1
        }"#;
        let payload = data.conclude("risks?", raw);
        assert_eq!(payload["success"], json!(true));
        let filtered = payload["filtered_audits"].as_array().unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["audit_id"], json!("AUD-2025-BBBBBBBB"));
        assert_eq!(payload["ai_analysis"]["total_high_risk"], json!(1));
    }

    #[test]
    fn open_events_payload_echoes_digests_and_count() {
        let digests = vec![json!({"audit_id": "AUD-2025-AAAAAAAA"})];
        let data = ShapeData::OpenEvents { digests };
        let payload = data.conclude("open?", r#"{"executive_summary": "quiet month"}"#);
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["audit_count"], json!(1));
        assert_eq!(payload["audits"][0]["audit_id"], json!("AUD-2025-AAAAAAAA"));
        assert_eq!(payload["ai_analysis"]["executive_summary"], json!("quiet month"));
    }

    #[test]
    fn next_steps_payload_carries_audit_and_recommendations() {
        let detail = select::detail_digest(&audit("AUD-2025-AAAAAAAA"));
        let data = ShapeData::NextSteps { detail };
        let payload = data.conclude("next?", r#"{"immediate_actions": ["book kickoff"]}"#);
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["audit"]["audit_id"], json!("AUD-2025-AAAAAAAA"));
        assert_eq!(
            payload["ai_recommendations"]["immediate_actions"][0],
            json!("book kickoff")
        );
    }

    #[test]
    fn unparseable_reply_becomes_fallback_payload() {
        let data = ShapeData::Trends { data_points: 4 };
        let payload = data.conclude("trends?", "I could not produce JSON, sorry.");
        assert_eq!(payload["success"], json!(false));
        assert_eq!(payload["tool"], json!("identify_trends"));
        assert_eq!(payload["error"], json!(NON_JSON_REPLY_ERROR));
        assert_eq!(
            payload["ai_response"],
            json!("I could not produce JSON, sorry.")
        );
    }

    #[test]
    fn fenced_reply_still_counts_as_success() {
        let data = ShapeData::Trends { data_points: 2 };
        let payload = data.conclude("trends?", "```json\n{\"frequency_trends\": \"up\"}\n```");
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["data_points"], json!(2));
        assert_eq!(payload["ai_analysis"]["frequency_trends"], json!("up"));
    }

    #[test]
    fn missing_audit_id_maps_to_plain_error_payload() {
        let payload = error_payload(ToolKind::NextSteps, "next?", ToolError::MissingAuditId);
        assert_eq!(payload, json!({ "error": "No audit ID specified" }));
    }

    #[test]
    fn unknown_audit_maps_to_plain_error_payload() {
        let payload = error_payload(
            ToolKind::NextSteps,
            "next?",
            ToolError::AuditNotFound("AUD-2099-DEADBEEF".to_string()),
        );
        assert_eq!(payload, json!({ "error": "Audit AUD-2099-DEADBEEF not found" }));
    }

    #[test]
    fn gateway_failure_maps_to_processing_error_payload() {
        let payload = error_payload(
            ToolKind::Trends,
            "trends?",
            ToolError::Gateway(GatewayError::EmptyReply),
        );
        assert_eq!(payload["success"], json!(false));
        assert_eq!(payload["tool"], json!("identify_trends"));
        assert!(
            payload["error"]
                .as_str()
                .unwrap()
                .starts_with("Processing error:")
        );
    }

    #[test]
    fn notification_payload_without_audit_has_empty_details() {
        let data = ShapeData::Notification {
            notification_type: "general".to_string(),
            audit_details: json!({}),
        };
        let payload = data.conclude("draft", r#"{"recommended_type": "completion"}"#);
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["notification_type"], json!("general"));
        assert_eq!(payload["audit_details"], json!({}));
        assert_eq!(payload["ai_generated"]["recommended_type"], json!("completion"));
    }
}
