use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Value, json};

use qms_core::audit::Audit;

/// Record caps applied when serializing audits into a prompt, bounding
/// prompt size per tool.
pub const HIGH_RISK_RECORD_CAP: usize = 10;
pub const OPEN_EVENTS_RECORD_CAP: usize = 20;
pub const TRENDS_RECORD_CAP: usize = 30;

/// Fetch bound when a tool looks at "all" audits.
pub const ROSTER_FETCH_LIMIT: i64 = 1000;

/// Reporting window for the open-events summary, in days.
pub const OPEN_EVENTS_WINDOW_DAYS: i64 = 30;

static AUDIT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AUD-\d{4}-[A-Z0-9]+").expect("audit id pattern"));

/// Open audits created within the reporting window ending at `today`
/// (inclusive lower bound). The window is measured against record creation,
/// not the audit schedule, carried over from the original behavior.
pub fn open_within_window(audits: &[Audit], today: NaiveDate) -> Vec<&Audit> {
    let cutoff = today - chrono::Duration::days(OPEN_EVENTS_WINDOW_DAYS);
    audits
        .iter()
        .filter(|a| a.status.is_open() && a.created_at.date_naive() >= cutoff)
        .collect()
}

/// Audit id supplied explicitly in the tool context, if any.
pub fn context_audit_id(context: Option<&Value>) -> Option<String> {
    context
        .and_then(|c| c.get("audit_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Resolve which audit a query refers to: an explicit context id wins,
/// else the first `AUD-YYYY-…` shaped token in the query text.
pub fn resolve_audit_id(context: Option<&Value>, query: &str) -> Option<String> {
    if let Some(id) = context_audit_id(context) {
        return Some(id);
    }
    AUDIT_ID_PATTERN.find(query).map(|m| m.as_str().to_string())
}

// Per-tool prompt digests. Each keeps just the fields that tool's analysis
// needs, mirroring what the payload later echoes back to the caller.

pub fn risk_digest(audit: &Audit) -> Value {
    json!({
        "audit_id": audit.audit_id,
        "title": audit.audit_title,
        "type": audit.audit_type.as_str(),
        "status": audit.status.as_str(),
        "auditee": audit.auditee_name,
        "country": audit.auditee_country,
        "start_date": audit.confirmed_start_date.to_string(),
        "end_date": audit.confirmed_end_date.to_string(),
        "lead_auditor": audit.lead_auditor,
        "scope": audit.audit_scope,
    })
}

pub fn open_digest(audit: &Audit) -> Value {
    json!({
        "audit_id": audit.audit_id,
        "title": audit.audit_title,
        "type": audit.audit_type.as_str(),
        "status": audit.status.as_str(),
        "auditee": audit.auditee_name,
        "lead_auditor": audit.lead_auditor,
        "start_date": audit.confirmed_start_date.to_string(),
        "end_date": audit.confirmed_end_date.to_string(),
    })
}

pub fn detail_digest(audit: &Audit) -> Value {
    json!({
        "audit_id": audit.audit_id,
        "title": audit.audit_title,
        "type": audit.audit_type.as_str(),
        "status": audit.status.as_str(),
        "scope": audit.audit_scope,
        "objective": audit.audit_objective,
        "auditee": audit.auditee_name,
        "country": audit.auditee_country,
        "lead_auditor": audit.lead_auditor,
        "audit_team": audit.audit_team,
        "start_date": audit.confirmed_start_date.to_string(),
        "end_date": audit.confirmed_end_date.to_string(),
        "criteria": audit.audit_criteria,
        "agenda": audit.audit_agenda,
    })
}

pub fn trend_digest(audit: &Audit) -> Value {
    json!({
        "audit_id": audit.audit_id,
        "type": audit.audit_type.as_str(),
        "status": audit.status.as_str(),
        "country": audit.auditee_country,
        "lead_auditor": audit.lead_auditor,
        "created_date": audit.created_at.to_rfc3339(),
        "start_date": audit.confirmed_start_date.to_string(),
        "end_date": audit.confirmed_end_date.to_string(),
    })
}

pub fn contact_digest(audit: &Audit) -> Value {
    json!({
        "audit_id": audit.audit_id,
        "title": audit.audit_title,
        "type": audit.audit_type.as_str(),
        "status": audit.status.as_str(),
        "auditee": audit.auditee_name,
        "lead_auditor": audit.lead_auditor,
        "start_date": audit.confirmed_start_date.to_string(),
        "end_date": audit.confirmed_end_date.to_string(),
        "primary_contact": audit.primary_contact_name,
        "contact_email": audit.primary_contact_email,
    })
}

/// List-row shape echoed back with the high-risk analysis so the caller
/// can render the flagged audits without a second fetch.
pub fn summary_digest(audit: &Audit) -> Value {
    json!({
        "id": audit.id,
        "audit_id": audit.audit_id,
        "audit_title": audit.audit_title,
        "audit_type": audit.audit_type.as_str(),
        "status": audit.status.as_str(),
        "auditee_name": audit.auditee_name,
        "lead_auditor": audit.lead_auditor,
        "confirmed_end_date": audit.confirmed_end_date.to_string(),
        "auditee_country": audit.auditee_country,
    })
}
