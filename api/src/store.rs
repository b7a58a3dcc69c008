use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use qms_core::audit::{Audit, AuditStatus, AuditType, CreateAuditRequest, new_audit_id};

/// Persistence failures, separated from HTTP concerns so both the route
/// layer and the AI tool pipeline can consume them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    /// A stored enum column no longer parses, only possible via manual edits
    #[error("invalid stored {field} value: {value}")]
    Corrupt { field: &'static str, value: String },
}

/// List-endpoint filters. `None` means "no constraint"; enum filters are
/// already parsed, so an unknown incoming value simply never gets here.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    /// Substring match on the human-facing audit id
    pub audit_id: Option<String>,
    pub audit_type: Option<AuditType>,
    pub status: Option<AuditStatus>,
    /// Substring match
    pub lead_auditor: Option<String>,
    /// Substring match on auditee country
    pub country: Option<String>,
}

/// Internal row type for sqlx mapping. Enums travel as their display
/// strings and are parsed on the way out.
#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    audit_id: String,
    audit_title: String,
    audit_type: String,
    audit_scope: String,
    audit_objective: String,
    auditee_name: String,
    auditee_site_location: String,
    auditee_country: String,
    primary_contact_name: String,
    primary_contact_email: Option<String>,
    proposed_start_date: Option<NaiveDate>,
    proposed_end_date: Option<NaiveDate>,
    confirmed_start_date: NaiveDate,
    confirmed_end_date: NaiveDate,
    lead_auditor: String,
    audit_team: Option<String>,
    audit_criteria: String,
    audit_agenda: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl AuditRow {
    fn into_audit(self) -> Result<Audit, StoreError> {
        let audit_type = self.audit_type.parse().map_err(|_| StoreError::Corrupt {
            field: "audit_type",
            value: self.audit_type.clone(),
        })?;
        let status = self.status.parse().map_err(|_| StoreError::Corrupt {
            field: "status",
            value: self.status.clone(),
        })?;
        Ok(Audit {
            id: self.id,
            audit_id: self.audit_id,
            audit_title: self.audit_title,
            audit_type,
            audit_scope: self.audit_scope,
            audit_objective: self.audit_objective,
            auditee_name: self.auditee_name,
            auditee_site_location: self.auditee_site_location,
            auditee_country: self.auditee_country,
            primary_contact_name: self.primary_contact_name,
            primary_contact_email: self.primary_contact_email,
            proposed_start_date: self.proposed_start_date,
            proposed_end_date: self.proposed_end_date,
            confirmed_start_date: self.confirmed_start_date,
            confirmed_end_date: self.confirmed_end_date,
            lead_auditor: self.lead_auditor,
            audit_team: self.audit_team,
            audit_criteria: self.audit_criteria,
            audit_agenda: self.audit_agenda,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Create a new audit: id, audit_id and created_at are assigned here.
pub async fn create_audit(pool: &PgPool, req: &CreateAuditRequest) -> Result<Audit, StoreError> {
    insert_audit(pool, req, AuditStatus::Planned).await
}

async fn insert_audit(
    pool: &PgPool,
    req: &CreateAuditRequest,
    status: AuditStatus,
) -> Result<Audit, StoreError> {
    let audit_id = new_audit_id();

    let row = sqlx::query_as::<_, AuditRow>(
        r#"
        INSERT INTO audits (
            audit_id, audit_title, audit_type, audit_scope, audit_objective,
            auditee_name, auditee_site_location, auditee_country,
            primary_contact_name, primary_contact_email,
            proposed_start_date, proposed_end_date,
            confirmed_start_date, confirmed_end_date,
            lead_auditor, audit_team, audit_criteria, audit_agenda, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING id, audit_id, audit_title, audit_type, audit_scope, audit_objective,
                  auditee_name, auditee_site_location, auditee_country,
                  primary_contact_name, primary_contact_email,
                  proposed_start_date, proposed_end_date,
                  confirmed_start_date, confirmed_end_date,
                  lead_auditor, audit_team, audit_criteria, audit_agenda,
                  status, created_at, updated_at
        "#,
    )
    .bind(&audit_id)
    .bind(&req.audit_title)
    .bind(req.audit_type.as_str())
    .bind(&req.audit_scope)
    .bind(&req.audit_objective)
    .bind(&req.auditee_name)
    .bind(&req.auditee_site_location)
    .bind(&req.auditee_country)
    .bind(&req.primary_contact_name)
    .bind(req.primary_contact_email.as_deref())
    .bind(req.proposed_start_date)
    .bind(req.proposed_end_date)
    .bind(req.confirmed_start_date)
    .bind(req.confirmed_end_date)
    .bind(&req.lead_auditor)
    .bind(req.audit_team.as_deref())
    .bind(&req.audit_criteria)
    .bind(req.audit_agenda.as_deref())
    .bind(status.as_str())
    .fetch_one(pool)
    .await?;

    row.into_audit()
}

/// Fetch a single audit by its human-facing id.
pub async fn get_audit(pool: &PgPool, audit_id: &str) -> Result<Option<Audit>, StoreError> {
    let row = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT id, audit_id, audit_title, audit_type, audit_scope, audit_objective,
               auditee_name, auditee_site_location, auditee_country,
               primary_contact_name, primary_contact_email,
               proposed_start_date, proposed_end_date,
               confirmed_start_date, confirmed_end_date,
               lead_auditor, audit_team, audit_criteria, audit_agenda,
               status, created_at, updated_at
        FROM audits
        WHERE audit_id = $1
        "#,
    )
    .bind(audit_id)
    .fetch_optional(pool)
    .await?;

    row.map(AuditRow::into_audit).transpose()
}

/// List audits with optional filters, in insertion order.
pub async fn list_audits(
    pool: &PgPool,
    filter: &AuditFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Audit>, StoreError> {
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT id, audit_id, audit_title, audit_type, audit_scope, audit_objective,
               auditee_name, auditee_site_location, auditee_country,
               primary_contact_name, primary_contact_email,
               proposed_start_date, proposed_end_date,
               confirmed_start_date, confirmed_end_date,
               lead_auditor, audit_team, audit_criteria, audit_agenda,
               status, created_at, updated_at
        FROM audits
        WHERE ($1::text IS NULL OR audit_id LIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR audit_type = $2)
          AND ($3::text IS NULL OR status = $3)
          AND ($4::text IS NULL OR lead_auditor LIKE '%' || $4 || '%')
          AND ($5::text IS NULL OR auditee_country LIKE '%' || $5 || '%')
        ORDER BY id
        OFFSET $6
        LIMIT $7
        "#,
    )
    .bind(filter.audit_id.as_deref())
    .bind(filter.audit_type.map(|t| t.as_str()))
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.lead_auditor.as_deref())
    .bind(filter.country.as_deref())
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(AuditRow::into_audit).collect()
}

/// Write a fully merged record back. The caller resolves the partial
/// update against the stored row first; `updated_at` is refreshed here.
pub async fn save_audit(pool: &PgPool, audit: &Audit) -> Result<Option<Audit>, StoreError> {
    let row = sqlx::query_as::<_, AuditRow>(
        r#"
        UPDATE audits SET
            audit_title = $2, audit_type = $3, audit_scope = $4, audit_objective = $5,
            auditee_name = $6, auditee_site_location = $7, auditee_country = $8,
            primary_contact_name = $9, primary_contact_email = $10,
            proposed_start_date = $11, proposed_end_date = $12,
            confirmed_start_date = $13, confirmed_end_date = $14,
            lead_auditor = $15, audit_team = $16,
            audit_criteria = $17, audit_agenda = $18,
            status = $19, updated_at = now()
        WHERE audit_id = $1
        RETURNING id, audit_id, audit_title, audit_type, audit_scope, audit_objective,
                  auditee_name, auditee_site_location, auditee_country,
                  primary_contact_name, primary_contact_email,
                  proposed_start_date, proposed_end_date,
                  confirmed_start_date, confirmed_end_date,
                  lead_auditor, audit_team, audit_criteria, audit_agenda,
                  status, created_at, updated_at
        "#,
    )
    .bind(&audit.audit_id)
    .bind(&audit.audit_title)
    .bind(audit.audit_type.as_str())
    .bind(&audit.audit_scope)
    .bind(&audit.audit_objective)
    .bind(&audit.auditee_name)
    .bind(&audit.auditee_site_location)
    .bind(&audit.auditee_country)
    .bind(&audit.primary_contact_name)
    .bind(audit.primary_contact_email.as_deref())
    .bind(audit.proposed_start_date)
    .bind(audit.proposed_end_date)
    .bind(audit.confirmed_start_date)
    .bind(audit.confirmed_end_date)
    .bind(&audit.lead_auditor)
    .bind(audit.audit_team.as_deref())
    .bind(&audit.audit_criteria)
    .bind(audit.audit_agenda.as_deref())
    .bind(audit.status.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(AuditRow::into_audit).transpose()
}

/// Hard delete. Returns whether a row existed.
pub async fn delete_audit(pool: &PgPool, audit_id: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM audits WHERE audit_id = $1")
        .bind(audit_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_audits(pool: &PgPool) -> Result<i64, StoreError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audits")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Counts behind `GET /audits-summary`. Cancelled audits count toward the
/// total but get no bucket of their own, matching the dashboard tiles.
pub struct StatusCounts {
    pub total: i64,
    pub planned: i64,
    pub in_progress: i64,
    pub closed: i64,
}

pub async fn status_counts(pool: &PgPool) -> Result<StatusCounts, StoreError> {
    let (total, planned, in_progress, closed): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = 'Planned'),
               COUNT(*) FILTER (WHERE status = 'In Progress'),
               COUNT(*) FILTER (WHERE status = 'Closed')
        FROM audits
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(StatusCounts {
        total,
        planned,
        in_progress,
        closed,
    })
}

/// First-run seeding: three example audits so the dashboard and the AI
/// tools have material before anyone creates real records.
pub async fn seed_sample_audits(pool: &PgPool) -> Result<(), StoreError> {
    let samples = [
        (
            CreateAuditRequest {
                audit_title: "Annual GMP Compliance for Mfg Line B".to_string(),
                audit_type: AuditType::Internal,
                audit_scope: "Manufacturing Line B GMP compliance review covering production \
                              processes, documentation, and quality control procedures for the \
                              fiscal year 2024."
                    .to_string(),
                audit_objective: "To verify compliance with current Good Manufacturing Practice \
                                  regulations and internal quality standards."
                    .to_string(),
                auditee_name: "Manufacturing Line B".to_string(),
                auditee_site_location: "123 Pharma Way, Boston, MA 02101, USA".to_string(),
                auditee_country: "USA".to_string(),
                primary_contact_name: "John Smith".to_string(),
                primary_contact_email: Some("john.smith@company.com".to_string()),
                proposed_start_date: None,
                proposed_end_date: None,
                confirmed_start_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap_or_default(),
                confirmed_end_date: NaiveDate::from_ymd_opt(2025, 5, 14).unwrap_or_default(),
                lead_auditor: "QA Manager".to_string(),
                audit_team: Some("Sarah Johnson, Michael Brown".to_string()),
                audit_criteria: "FDA 21 CFR Parts 210/211, ICH Q7, Company SOPs QA-001 through \
                                 QA-015"
                    .to_string(),
                audit_agenda: Some(
                    "Day 1: Opening meeting, facility tour, documentation review\n\
                     Day 2: Production process review\n\
                     Day 3: Quality control procedures\n\
                     Day 4: Closing meeting and report preparation"
                        .to_string(),
                ),
            },
            AuditStatus::Planned,
        ),
        (
            CreateAuditRequest {
                audit_title: "Qualification Audit for API Inc.".to_string(),
                audit_type: AuditType::SupplierVendor,
                audit_scope: "Comprehensive supplier qualification audit covering quality \
                              management system, manufacturing capabilities, and regulatory \
                              compliance."
                    .to_string(),
                audit_objective: "To qualify API Inc. as an approved supplier for critical raw \
                                  materials and assess their quality management system."
                    .to_string(),
                auditee_name: "API Inc.".to_string(),
                auditee_site_location: "45 Industrial Park, Mumbai, Maharashtra 400001, India"
                    .to_string(),
                auditee_country: "India".to_string(),
                primary_contact_name: "Priya Patel".to_string(),
                primary_contact_email: Some("priya.patel@apiinc.com".to_string()),
                proposed_start_date: None,
                proposed_end_date: None,
                confirmed_start_date: NaiveDate::from_ymd_opt(2025, 5, 16).unwrap_or_default(),
                confirmed_end_date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap_or_default(),
                lead_auditor: "Supplier Quality".to_string(),
                audit_team: Some("David Wilson, Lisa Chen".to_string()),
                audit_criteria: "ISO 9001:2015, ICH Q7, FDA Guidelines for API Manufacturing"
                    .to_string(),
                audit_agenda: Some(
                    "Day 1: QMS review and management interview\n\
                     Day 2: Manufacturing facility inspection\n\
                     Day 3: Laboratory and testing procedures\n\
                     Day 4: Documentation review\n\
                     Day 5: Closing meeting and action items"
                        .to_string(),
                ),
            },
            AuditStatus::Planned,
        ),
        (
            CreateAuditRequest {
                audit_title: "QC Lab Data Integrity Review".to_string(),
                audit_type: AuditType::Internal,
                audit_scope: "Comprehensive review of data integrity practices in the Quality \
                              Control Laboratory, including electronic records, data backup, and \
                              audit trails."
                    .to_string(),
                audit_objective: "To assess compliance with data integrity requirements and \
                                  identify areas for improvement in laboratory data management."
                    .to_string(),
                auditee_name: "QC Laboratory".to_string(),
                auditee_site_location: "789 Science Drive, Research Triangle, NC 27709, USA"
                    .to_string(),
                auditee_country: "USA".to_string(),
                primary_contact_name: "Dr. Emily Rodriguez".to_string(),
                primary_contact_email: Some("emily.rodriguez@company.com".to_string()),
                proposed_start_date: None,
                proposed_end_date: None,
                confirmed_start_date: NaiveDate::from_ymd_opt(2025, 4, 12).unwrap_or_default(),
                confirmed_end_date: NaiveDate::from_ymd_opt(2025, 4, 16).unwrap_or_default(),
                lead_auditor: "QA Specialist".to_string(),
                audit_team: Some("Robert Johnson, Amanda White".to_string()),
                audit_criteria: "FDA Guidance on Data Integrity, 21 CFR Part 11, Company \
                                 SOP-IT-005"
                    .to_string(),
                audit_agenda: Some(
                    "Day 1: LIMS system review\n\
                     Day 2: Laboratory procedures and practices\n\
                     Day 3: Data backup and recovery procedures\n\
                     Day 4: Training records review\n\
                     Day 5: Final assessment and recommendations"
                        .to_string(),
                ),
            },
            AuditStatus::Closed,
        ),
    ];

    for (req, status) in &samples {
        insert_audit(pool, req, *status).await?;
    }

    Ok(())
}
