use crate::AuditCommands;
use crate::util::{api_request, parse_json_arg};

pub async fn run(api_url: &str, command: AuditCommands) -> i32 {
    match command {
        AuditCommands::List {
            skip,
            limit,
            audit_id,
            audit_type,
            status,
            lead_auditor,
            site,
        } => {
            let mut query: Vec<(String, String)> = Vec::new();
            if let Some(skip) = skip {
                query.push(("skip".to_string(), skip.to_string()));
            }
            if let Some(limit) = limit {
                query.push(("limit".to_string(), limit.to_string()));
            }
            for (name, value) in [
                ("audit_id", audit_id),
                ("audit_type", audit_type),
                ("status", status),
                ("lead_auditor", lead_auditor),
                ("site", site),
            ] {
                if let Some(value) = value {
                    query.push((name.to_string(), value));
                }
            }
            api_request(api_url, reqwest::Method::GET, "/audits", None, &query).await
        }
        AuditCommands::Get { audit_id } => {
            api_request(
                api_url,
                reqwest::Method::GET,
                &format!("/audits/{audit_id}"),
                None,
                &[],
            )
            .await
        }
        AuditCommands::Create { body } => {
            let body = parse_json_arg("body", &body);
            api_request(api_url, reqwest::Method::POST, "/audits", Some(body), &[]).await
        }
        AuditCommands::Update { audit_id, body } => {
            let body = parse_json_arg("body", &body);
            api_request(
                api_url,
                reqwest::Method::PUT,
                &format!("/audits/{audit_id}"),
                Some(body),
                &[],
            )
            .await
        }
        AuditCommands::Delete { audit_id } => {
            api_request(
                api_url,
                reqwest::Method::DELETE,
                &format!("/audits/{audit_id}"),
                None,
                &[],
            )
            .await
        }
        AuditCommands::Summary => {
            api_request(api_url, reqwest::Method::GET, "/audits-summary", None, &[]).await
        }
    }
}
