use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Audit classification. Serialized as the display strings the QMS teams
/// actually use, which are also what the database stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AuditType {
    #[serde(rename = "Internal")]
    Internal,
    #[serde(rename = "Supplier/Vendor")]
    SupplierVendor,
    #[serde(rename = "Regulatory")]
    Regulatory,
    #[serde(rename = "CRO")]
    Cro,
    #[serde(rename = "For-Cause")]
    ForCause,
    #[serde(rename = "Pre-Approval Inspection (PAI)")]
    PreApprovalInspection,
    #[serde(rename = "Surveillance")]
    Surveillance,
}

impl AuditType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "Internal",
            Self::SupplierVendor => "Supplier/Vendor",
            Self::Regulatory => "Regulatory",
            Self::Cro => "CRO",
            Self::ForCause => "For-Cause",
            Self::PreApprovalInspection => "Pre-Approval Inspection (PAI)",
            Self::Surveillance => "Surveillance",
        }
    }
}

impl std::str::FromStr for AuditType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Internal" => Ok(Self::Internal),
            "Supplier/Vendor" => Ok(Self::SupplierVendor),
            "Regulatory" => Ok(Self::Regulatory),
            "CRO" => Ok(Self::Cro),
            "For-Cause" => Ok(Self::ForCause),
            "Pre-Approval Inspection (PAI)" => Ok(Self::PreApprovalInspection),
            "Surveillance" => Ok(Self::Surveillance),
            other => Err(format!("unknown audit type: {}", other)),
        }
    }
}

impl std::fmt::Display for AuditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit lifecycle state. New audits start as Planned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AuditStatus {
    #[default]
    #[serde(rename = "Planned")]
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Closed")]
    Closed,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "Planned",
            Self::InProgress => "In Progress",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Planned and In Progress audits are "open" for reporting purposes.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Planned | Self::InProgress)
    }
}

impl std::str::FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planned" => Ok(Self::Planned),
            "In Progress" => Ok(Self::InProgress),
            "Closed" => Ok(Self::Closed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown audit status: {}", other)),
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One quality-management audit engagement, as persisted and as returned by
/// the detail endpoints. Dates are plain calendar dates; only the audit
/// record's own timestamps carry a time component.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Audit {
    /// Store-assigned numeric key
    pub id: i64,
    /// Human-facing identifier, `AUD-<year>-<8 hex chars>`, unique
    pub audit_id: String,

    pub audit_title: String,
    pub audit_type: AuditType,
    pub audit_scope: String,
    pub audit_objective: String,

    pub auditee_name: String,
    pub auditee_site_location: String,
    pub auditee_country: String,
    pub primary_contact_name: String,
    pub primary_contact_email: Option<String>,

    pub proposed_start_date: Option<NaiveDate>,
    pub proposed_end_date: Option<NaiveDate>,
    pub confirmed_start_date: NaiveDate,
    pub confirmed_end_date: NaiveDate,
    /// Required; every audit has exactly one lead
    pub lead_auditor: String,
    /// Free-text roster of the remaining team members
    pub audit_team: Option<String>,

    pub audit_criteria: String,
    pub audit_agenda: Option<String>,

    pub status: AuditStatus,
    /// Stamped by the store at insertion, never changed afterwards
    pub created_at: DateTime<Utc>,
    /// Null until the first mutation, refreshed on every update
    pub updated_at: Option<DateTime<Utc>>,
}

/// Compact shape returned by the list endpoint, enough for a table row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditSummary {
    pub id: i64,
    pub audit_id: String,
    pub audit_title: String,
    pub audit_type: AuditType,
    pub status: AuditStatus,
    pub auditee_name: String,
    pub lead_auditor: String,
    pub confirmed_end_date: NaiveDate,
    pub auditee_country: String,
}

impl From<&Audit> for AuditSummary {
    fn from(audit: &Audit) -> Self {
        Self {
            id: audit.id,
            audit_id: audit.audit_id.clone(),
            audit_title: audit.audit_title.clone(),
            audit_type: audit.audit_type,
            status: audit.status,
            auditee_name: audit.auditee_name.clone(),
            lead_auditor: audit.lead_auditor.clone(),
            confirmed_end_date: audit.confirmed_end_date,
            auditee_country: audit.auditee_country.clone(),
        }
    }
}

/// Body of `POST /audits`. Identity, status and timestamps are assigned by
/// the store; a new audit always starts as Planned.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAuditRequest {
    pub audit_title: String,
    pub audit_type: AuditType,
    pub audit_scope: String,
    pub audit_objective: String,

    pub auditee_name: String,
    pub auditee_site_location: String,
    pub auditee_country: String,
    pub primary_contact_name: String,
    #[serde(default)]
    pub primary_contact_email: Option<String>,

    #[serde(default)]
    pub proposed_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub proposed_end_date: Option<NaiveDate>,
    pub confirmed_start_date: NaiveDate,
    pub confirmed_end_date: NaiveDate,
    pub lead_auditor: String,
    #[serde(default)]
    pub audit_team: Option<String>,

    pub audit_criteria: String,
    #[serde(default)]
    pub audit_agenda: Option<String>,
}

/// Body of `PUT /audits/{audit_id}`. Every field optional; only supplied
/// fields change.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateAuditRequest {
    #[serde(default)]
    pub audit_title: Option<String>,
    #[serde(default)]
    pub audit_type: Option<AuditType>,
    #[serde(default)]
    pub audit_scope: Option<String>,
    #[serde(default)]
    pub audit_objective: Option<String>,
    #[serde(default)]
    pub auditee_name: Option<String>,
    #[serde(default)]
    pub auditee_site_location: Option<String>,
    #[serde(default)]
    pub auditee_country: Option<String>,
    #[serde(default)]
    pub primary_contact_name: Option<String>,
    #[serde(default)]
    pub primary_contact_email: Option<String>,
    #[serde(default)]
    pub proposed_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub proposed_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub confirmed_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub confirmed_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub lead_auditor: Option<String>,
    #[serde(default)]
    pub audit_team: Option<String>,
    #[serde(default)]
    pub audit_criteria: Option<String>,
    #[serde(default)]
    pub audit_agenda: Option<String>,
    #[serde(default)]
    pub status: Option<AuditStatus>,
}

impl UpdateAuditRequest {
    /// Merge this partial update over an existing record. Identity and
    /// timestamps are untouched; the store refreshes `updated_at` itself.
    pub fn apply(&self, existing: &Audit) -> Audit {
        Audit {
            id: existing.id,
            audit_id: existing.audit_id.clone(),
            audit_title: self
                .audit_title
                .clone()
                .unwrap_or_else(|| existing.audit_title.clone()),
            audit_type: self.audit_type.unwrap_or(existing.audit_type),
            audit_scope: self
                .audit_scope
                .clone()
                .unwrap_or_else(|| existing.audit_scope.clone()),
            audit_objective: self
                .audit_objective
                .clone()
                .unwrap_or_else(|| existing.audit_objective.clone()),
            auditee_name: self
                .auditee_name
                .clone()
                .unwrap_or_else(|| existing.auditee_name.clone()),
            auditee_site_location: self
                .auditee_site_location
                .clone()
                .unwrap_or_else(|| existing.auditee_site_location.clone()),
            auditee_country: self
                .auditee_country
                .clone()
                .unwrap_or_else(|| existing.auditee_country.clone()),
            primary_contact_name: self
                .primary_contact_name
                .clone()
                .unwrap_or_else(|| existing.primary_contact_name.clone()),
            primary_contact_email: self
                .primary_contact_email
                .clone()
                .or_else(|| existing.primary_contact_email.clone()),
            proposed_start_date: self.proposed_start_date.or(existing.proposed_start_date),
            proposed_end_date: self.proposed_end_date.or(existing.proposed_end_date),
            confirmed_start_date: self
                .confirmed_start_date
                .unwrap_or(existing.confirmed_start_date),
            confirmed_end_date: self.confirmed_end_date.unwrap_or(existing.confirmed_end_date),
            lead_auditor: self
                .lead_auditor
                .clone()
                .unwrap_or_else(|| existing.lead_auditor.clone()),
            audit_team: self.audit_team.clone().or_else(|| existing.audit_team.clone()),
            audit_criteria: self
                .audit_criteria
                .clone()
                .unwrap_or_else(|| existing.audit_criteria.clone()),
            audit_agenda: self
                .audit_agenda
                .clone()
                .or_else(|| existing.audit_agenda.clone()),
            status: self.status.unwrap_or(existing.status),
            created_at: existing.created_at,
            updated_at: existing.updated_at,
        }
    }
}

/// Generate a human-facing audit identifier: `AUD-<year>-<8 uppercase hex>`.
/// The suffix is the leading slice of a v4 UUID, which keeps concurrent
/// creations from colliding without store coordination.
pub fn new_audit_id() -> String {
    let year = Utc::now().year();
    let uuid = Uuid::new_v4().simple().to_string();
    format!("AUD-{}-{}", year, uuid[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_type_serializes_as_display_string() {
        let json = serde_json::to_string(&AuditType::SupplierVendor).unwrap();
        assert_eq!(json, "\"Supplier/Vendor\"");
        let json = serde_json::to_string(&AuditType::PreApprovalInspection).unwrap();
        assert_eq!(json, "\"Pre-Approval Inspection (PAI)\"");
    }

    #[test]
    fn audit_type_round_trips_through_as_str() {
        for ty in [
            AuditType::Internal,
            AuditType::SupplierVendor,
            AuditType::Regulatory,
            AuditType::Cro,
            AuditType::ForCause,
            AuditType::PreApprovalInspection,
            AuditType::Surveillance,
        ] {
            assert_eq!(ty.as_str().parse::<AuditType>().unwrap(), ty);
        }
    }

    #[test]
    fn audit_status_round_trips_and_defaults_to_planned() {
        for status in [
            AuditStatus::Planned,
            AuditStatus::InProgress,
            AuditStatus::Closed,
            AuditStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<AuditStatus>().unwrap(), status);
        }
        assert_eq!(AuditStatus::default(), AuditStatus::Planned);
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        assert!("External".parse::<AuditType>().is_err());
        assert!("Done".parse::<AuditStatus>().is_err());
    }

    #[test]
    fn open_statuses_are_planned_and_in_progress() {
        assert!(AuditStatus::Planned.is_open());
        assert!(AuditStatus::InProgress.is_open());
        assert!(!AuditStatus::Closed.is_open());
        assert!(!AuditStatus::Cancelled.is_open());
    }

    #[test]
    fn new_audit_id_matches_expected_shape() {
        let id = new_audit_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "AUD");
        assert_eq!(parts[1].len(), 4);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn new_audit_ids_do_not_collide() {
        let a = new_audit_id();
        let b = new_audit_id();
        assert_ne!(a, b);
    }

    fn sample_audit() -> Audit {
        Audit {
            id: 1,
            audit_id: "AUD-2025-00C0FFEE".to_string(),
            audit_title: "Annual GMP Compliance".to_string(),
            audit_type: AuditType::Internal,
            audit_scope: "Manufacturing Line B".to_string(),
            audit_objective: "Verify GMP compliance".to_string(),
            auditee_name: "Manufacturing Line B".to_string(),
            auditee_site_location: "Boston, MA".to_string(),
            auditee_country: "USA".to_string(),
            primary_contact_name: "John Smith".to_string(),
            primary_contact_email: Some("john.smith@company.com".to_string()),
            proposed_start_date: None,
            proposed_end_date: None,
            confirmed_start_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            confirmed_end_date: NaiveDate::from_ymd_opt(2025, 5, 14).unwrap(),
            lead_auditor: "QA Manager".to_string(),
            audit_team: None,
            audit_criteria: "FDA 21 CFR Parts 210/211".to_string(),
            audit_agenda: None,
            status: AuditStatus::Planned,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn apply_changes_only_supplied_fields() {
        let existing = sample_audit();
        let update = UpdateAuditRequest {
            status: Some(AuditStatus::InProgress),
            lead_auditor: Some("Senior QA".to_string()),
            ..Default::default()
        };
        let merged = update.apply(&existing);
        assert_eq!(merged.status, AuditStatus::InProgress);
        assert_eq!(merged.lead_auditor, "Senior QA");
        assert_eq!(merged.audit_title, existing.audit_title);
        assert_eq!(merged.audit_id, existing.audit_id);
        assert_eq!(merged.confirmed_end_date, existing.confirmed_end_date);
    }

    #[test]
    fn apply_keeps_identity_and_timestamps() {
        let existing = sample_audit();
        let update = UpdateAuditRequest {
            audit_title: Some("Renamed".to_string()),
            ..Default::default()
        };
        let merged = update.apply(&existing);
        assert_eq!(merged.id, existing.id);
        assert_eq!(merged.created_at, existing.created_at);
        assert_eq!(merged.updated_at, existing.updated_at);
    }
}
