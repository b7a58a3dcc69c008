use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use qms_core::audit::{
    Audit, AuditStatus, AuditSummary, AuditType, CreateAuditRequest, UpdateAuditRequest,
};
use qms_core::error::ApiError;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::{self, AuditFilter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/audits", get(list_audits).post(create_audit))
        .route(
            "/audits/{audit_id}",
            get(get_audit).put(update_audit).delete(delete_audit),
        )
        .route("/audits-summary", get(audits_summary))
}

/// Crude plausibility check, deliberately loose: the contact email is
/// informational, not an account identity.
fn is_plausible_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

fn validate_email(email: Option<&str>) -> Result<(), AppError> {
    let Some(email) = email else { return Ok(()) };
    if email.trim().is_empty() || is_plausible_email(email) {
        return Ok(());
    }
    Err(AppError::Validation {
        message: "Invalid email format".to_string(),
        field: Some("primary_contact_email".to_string()),
        received: Some(serde_json::Value::String(email.to_string())),
        docs_hint: Some("Provide an address like 'name@company.com' or omit the field".to_string()),
    })
}

/// Date ordering invariants: confirmed end strictly after confirmed start,
/// and the same for the proposed pair when both are present.
fn validate_schedule(
    confirmed_start: NaiveDate,
    confirmed_end: NaiveDate,
    proposed_start: Option<NaiveDate>,
    proposed_end: Option<NaiveDate>,
) -> Result<(), AppError> {
    if confirmed_end <= confirmed_start {
        return Err(AppError::Validation {
            message: "End date must be after start date".to_string(),
            field: Some("confirmed_end_date".to_string()),
            received: Some(serde_json::Value::String(confirmed_end.to_string())),
            docs_hint: Some(
                "confirmed_end_date must be strictly after confirmed_start_date".to_string(),
            ),
        });
    }

    if let (Some(start), Some(end)) = (proposed_start, proposed_end) {
        if end <= start {
            return Err(AppError::Validation {
                message: "Proposed end date must be after proposed start date".to_string(),
                field: Some("proposed_end_date".to_string()),
                received: Some(serde_json::Value::String(end.to_string())),
                docs_hint: None,
            });
        }
    }

    Ok(())
}

fn validate_create(req: &CreateAuditRequest) -> Result<(), AppError> {
    validate_email(req.primary_contact_email.as_deref())?;
    validate_schedule(
        req.confirmed_start_date,
        req.confirmed_end_date,
        req.proposed_start_date,
        req.proposed_end_date,
    )
}

/// Query parameters for listing audits. Enum filters are permissive: a
/// value of "All" or anything that does not parse drops the filter.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ListAuditsParams {
    /// Rows to skip (default 0)
    #[serde(default)]
    pub skip: Option<i64>,
    /// Maximum rows to return (default 100)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Substring match on the audit id
    #[serde(default)]
    pub audit_id: Option<String>,
    /// Exact audit type, or "All"
    #[serde(default)]
    pub audit_type: Option<String>,
    /// Exact status, or "All"
    #[serde(default)]
    pub status: Option<String>,
    /// Substring match on the lead auditor
    #[serde(default)]
    pub lead_auditor: Option<String>,
    /// Substring match on the auditee country
    #[serde(default)]
    pub site: Option<String>,
}

fn text_filter(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.is_empty() && *v != "All")
        .map(str::to_string)
}

fn type_filter(value: Option<&str>) -> Option<AuditType> {
    value
        .filter(|v| !v.is_empty() && *v != "All")
        .and_then(|v| v.parse().ok())
}

fn status_filter(value: Option<&str>) -> Option<AuditStatus> {
    value
        .filter(|v| !v.is_empty() && *v != "All")
        .and_then(|v| v.parse().ok())
}

fn filter_from_params(params: &ListAuditsParams) -> AuditFilter {
    AuditFilter {
        audit_id: params
            .audit_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        audit_type: type_filter(params.audit_type.as_deref()),
        status: status_filter(params.status.as_deref()),
        lead_auditor: text_filter(params.lead_auditor.as_deref()),
        country: text_filter(params.site.as_deref()),
    }
}

/// Create a new audit
///
/// The store assigns the numeric id, the human-facing audit_id and the
/// timestamps; a new audit always starts as Planned.
#[utoipa::path(
    post,
    path = "/audits",
    request_body = CreateAuditRequest,
    responses(
        (status = 201, description = "Audit created", body = Audit),
        (status = 422, description = "Validation error", body = ApiError)
    ),
    tag = "audits"
)]
pub async fn create_audit(
    State(state): State<AppState>,
    Json(req): Json<CreateAuditRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create(&req)?;
    let audit = store::create_audit(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(audit)))
}

/// List audits with optional filtering
///
/// Returns summary-shaped rows in insertion order. Unknown audit_type or
/// status filter values are ignored rather than rejected.
#[utoipa::path(
    get,
    path = "/audits",
    params(ListAuditsParams),
    responses(
        (status = 200, description = "Matching audits", body = Vec<AuditSummary>)
    ),
    tag = "audits"
)]
pub async fn list_audits(
    State(state): State<AppState>,
    Query(params): Query<ListAuditsParams>,
) -> Result<Json<Vec<AuditSummary>>, AppError> {
    let filter = filter_from_params(&params);
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let audits = store::list_audits(&state.db, &filter, skip, limit).await?;
    Ok(Json(audits.iter().map(AuditSummary::from).collect()))
}

/// Get a specific audit by audit_id
#[utoipa::path(
    get,
    path = "/audits/{audit_id}",
    params(("audit_id" = String, Path, description = "Human-facing audit id")),
    responses(
        (status = 200, description = "The audit", body = Audit),
        (status = 404, description = "Audit not found", body = ApiError)
    ),
    tag = "audits"
)]
pub async fn get_audit(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
) -> Result<Json<Audit>, AppError> {
    let audit = store::get_audit(&state.db, &audit_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            message: "Audit not found".to_string(),
        })?;
    Ok(Json(audit))
}

/// Update an existing audit
///
/// Partial update: only supplied fields change. Date invariants are
/// checked against the merged record before anything is written.
#[utoipa::path(
    put,
    path = "/audits/{audit_id}",
    request_body = UpdateAuditRequest,
    params(("audit_id" = String, Path, description = "Human-facing audit id")),
    responses(
        (status = 200, description = "Updated audit", body = Audit),
        (status = 404, description = "Audit not found", body = ApiError),
        (status = 422, description = "Validation error", body = ApiError)
    ),
    tag = "audits"
)]
pub async fn update_audit(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
    Json(req): Json<UpdateAuditRequest>,
) -> Result<Json<Audit>, AppError> {
    let existing = store::get_audit(&state.db, &audit_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            message: "Audit not found".to_string(),
        })?;

    validate_email(req.primary_contact_email.as_deref())?;
    let merged = req.apply(&existing);
    validate_schedule(
        merged.confirmed_start_date,
        merged.confirmed_end_date,
        merged.proposed_start_date,
        merged.proposed_end_date,
    )?;

    let updated = store::save_audit(&state.db, &merged)
        .await?
        .ok_or_else(|| AppError::NotFound {
            message: "Audit not found".to_string(),
        })?;
    Ok(Json(updated))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditDeletedResponse {
    pub message: String,
}

/// Delete an audit
///
/// Hard delete; there is no soft-delete or versioning.
#[utoipa::path(
    delete,
    path = "/audits/{audit_id}",
    params(("audit_id" = String, Path, description = "Human-facing audit id")),
    responses(
        (status = 200, description = "Audit deleted", body = AuditDeletedResponse),
        (status = 404, description = "Audit not found", body = ApiError)
    ),
    tag = "audits"
)]
pub async fn delete_audit(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
) -> Result<Json<AuditDeletedResponse>, AppError> {
    let found = store::delete_audit(&state.db, &audit_id).await?;
    if !found {
        return Err(AppError::NotFound {
            message: "Audit not found".to_string(),
        });
    }
    Ok(Json(AuditDeletedResponse {
        message: "Audit deleted successfully".to_string(),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditsSummaryResponse {
    pub total: i64,
    pub planned: i64,
    pub in_progress: i64,
    pub closed: i64,
}

/// Summary statistics for the dashboard tiles
#[utoipa::path(
    get,
    path = "/audits-summary",
    responses(
        (status = 200, description = "Counts by status bucket", body = AuditsSummaryResponse)
    ),
    tag = "audits"
)]
pub async fn audits_summary(
    State(state): State<AppState>,
) -> Result<Json<AuditsSummaryResponse>, AppError> {
    let counts = store::status_counts(&state.db).await?;
    Ok(Json(AuditsSummaryResponse {
        total: counts.total,
        planned: counts.planned,
        in_progress: counts.in_progress,
        closed: counts.closed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(start: (i32, u32, u32), end: (i32, u32, u32)) -> CreateAuditRequest {
        CreateAuditRequest {
            audit_title: "Test Audit".to_string(),
            audit_type: AuditType::Internal,
            audit_scope: "scope".to_string(),
            audit_objective: "objective".to_string(),
            auditee_name: "Auditee".to_string(),
            auditee_site_location: "Site".to_string(),
            auditee_country: "USA".to_string(),
            primary_contact_name: "Contact".to_string(),
            primary_contact_email: Some("contact@company.com".to_string()),
            proposed_start_date: None,
            proposed_end_date: None,
            confirmed_start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            confirmed_end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            lead_auditor: "Lead".to_string(),
            audit_team: None,
            audit_criteria: "criteria".to_string(),
            audit_agenda: None,
        }
    }

    #[test]
    fn end_after_start_passes_validation() {
        let req = create_request((2025, 5, 10), (2025, 5, 14));
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn end_equal_to_start_fails_validation() {
        let req = create_request((2025, 5, 10), (2025, 5, 10));
        assert!(matches!(
            validate_create(&req),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn end_before_start_fails_validation() {
        let req = create_request((2025, 5, 14), (2025, 5, 10));
        assert!(matches!(
            validate_create(&req),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn proposed_pair_must_be_ordered_when_both_present() {
        let mut req = create_request((2025, 5, 10), (2025, 5, 14));
        req.proposed_start_date = NaiveDate::from_ymd_opt(2025, 4, 20);
        req.proposed_end_date = NaiveDate::from_ymd_opt(2025, 4, 15);
        assert!(matches!(
            validate_create(&req),
            Err(AppError::Validation { .. })
        ));

        req.proposed_end_date = NaiveDate::from_ymd_opt(2025, 4, 25);
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn lone_proposed_date_is_fine() {
        let mut req = create_request((2025, 5, 10), (2025, 5, 14));
        req.proposed_start_date = NaiveDate::from_ymd_opt(2025, 4, 20);
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn malformed_email_fails_validation() {
        let mut req = create_request((2025, 5, 10), (2025, 5, 14));
        req.primary_contact_email = Some("not-an-email".to_string());
        assert!(matches!(
            validate_create(&req),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn blank_or_missing_email_is_accepted() {
        let mut req = create_request((2025, 5, 10), (2025, 5, 14));
        req.primary_contact_email = Some("   ".to_string());
        assert!(validate_create(&req).is_ok());
        req.primary_contact_email = None;
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn all_and_unknown_enum_filters_are_dropped() {
        let params = ListAuditsParams {
            audit_type: Some("All".to_string()),
            status: Some("Paused".to_string()),
            ..Default::default()
        };
        let filter = filter_from_params(&params);
        assert!(filter.audit_type.is_none());
        assert!(filter.status.is_none());
    }

    #[test]
    fn valid_enum_filters_are_parsed() {
        let params = ListAuditsParams {
            audit_type: Some("Supplier/Vendor".to_string()),
            status: Some("In Progress".to_string()),
            ..Default::default()
        };
        let filter = filter_from_params(&params);
        assert_eq!(filter.audit_type, Some(AuditType::SupplierVendor));
        assert_eq!(filter.status, Some(AuditStatus::InProgress));
    }

    #[test]
    fn text_filters_keep_substrings_and_drop_all() {
        let params = ListAuditsParams {
            lead_auditor: Some("Smith".to_string()),
            site: Some("All".to_string()),
            audit_id: Some("AUD-2025".to_string()),
            ..Default::default()
        };
        let filter = filter_from_params(&params);
        assert_eq!(filter.lead_auditor.as_deref(), Some("Smith"));
        assert!(filter.country.is_none());
        assert_eq!(filter.audit_id.as_deref(), Some("AUD-2025"));
    }
}
