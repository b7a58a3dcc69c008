use serde_json::Value;

use super::select::{HIGH_RISK_RECORD_CAP, OPEN_EVENTS_RECORD_CAP, TRENDS_RECORD_CAP};

// Every prompt follows the same discipline: demand JSON-only output up
// front, show the exact schema as a literal example, embed a bounded
// serialization of the selected records, append the caller's query, and
// close by restating the JSON-only constraint.

fn bounded(records: &[Value], cap: usize) -> Value {
    Value::Array(records.iter().take(cap).cloned().collect())
}

pub fn high_risk(query: &str, records: &[Value]) -> String {
    let data = bounded(records, HIGH_RISK_RECORD_CAP);
    format!(
        r#"IMPORTANT: You must respond with ONLY valid JSON, no additional text, explanations, or markdown formatting.

As a QMS expert, analyze the audit data and identify high-risk events. Return ONLY this JSON structure:

{{
    "high_risk_audits": [
        {{
            "audit_id": "string",
            "risk_score": 8,
            "risk_factors": ["Regulatory audit", "Critical materials"],
            "recommendations": ["Immediate review required"]
        }}
    ],
    "summary": "Brief summary of findings",
    "total_high_risk": 3
}}

Query: {query}
Audit Data: {data}

Criteria for high-risk:
- Regulatory audits (score 9-10)
- Supplier/Vendor audits with critical materials (score 7-8)
- Overdue or delayed audits (score 6-8)
- Audits with broad scope (score 6-7)
- Multi-site or international audits (score 5-7)

Return only the JSON response:
"#
    )
}

pub fn open_events(query: &str, records: &[Value], open_count: usize) -> String {
    let data = bounded(records, OPEN_EVENTS_RECORD_CAP);
    format!(
        r#"IMPORTANT: Respond with ONLY valid JSON, no markdown or additional text.

Analyze open audits and return this exact JSON structure:

{{
    "executive_summary": "Brief summary of open audits",
    "breakdown": {{
        "by_type": {{"Internal": 5, "Regulatory": 2}},
        "by_status": {{"Planned": 3, "In Progress": 4}}
    }},
    "upcoming_deadlines": ["Audit AUD-2025-001 due Dec 15", "Audit AUD-2025-002 due Jan 10"],
    "resource_insights": "Team allocation and workload insights",
    "key_concerns": ["Concern 1", "Concern 2"],
    "total_open": {open_count}
}}

Query: {query}
Open Audits Data: {data}

Return only JSON:
"#
    )
}

pub fn next_steps(query: &str, audit: &Value) -> String {
    format!(
        r#"IMPORTANT: Return ONLY valid JSON, no markdown or explanations.

Provide recommendations for this audit. Return this exact JSON structure:

{{
    "immediate_actions": ["Action 1", "Action 2"],
    "medium_term_actions": ["Action 1", "Action 2"],
    "long_term_considerations": ["Consideration 1"],
    "risk_mitigation": ["Risk strategy 1"],
    "resource_requirements": ["Resource need 1"],
    "key_stakeholders": ["Stakeholder 1"],
    "timeline_recommendations": "Timeline guidance"
}}

Query: {query}
Audit: {audit}

Return only JSON:
"#
    )
}

pub fn trends(query: &str, records: &[Value]) -> String {
    let data = bounded(records, TRENDS_RECORD_CAP);
    format!(
        r#"IMPORTANT: Return ONLY valid JSON with no additional text.

Analyze trends and return this exact JSON structure:

{{
    "frequency_trends": "Trend description",
    "type_distribution": {{"Internal": 45, "Regulatory": 30, "Supplier": 25}},
    "geographic_distribution": {{"US": 40, "Europe": 35, "Asia": 25}},
    "auditor_workload": {{"John Smith": 12, "Jane Doe": 8}},
    "seasonal_patterns": "Pattern description",
    "completion_metrics": {{"average_days": 14, "completion_rate": 85}},
    "risk_areas": ["Risk area 1", "Risk area 2"],
    "recommendations": ["Recommendation 1", "Recommendation 2"]
}}

Query: {query}
Data: {data}

Return only JSON:
"#
    )
}

pub fn notification(query: &str, notification_type: &str, audit: Option<&Value>) -> String {
    let audit_context = match audit {
        Some(details) => details.to_string(),
        None => "General notification".to_string(),
    };
    format!(
        r#"IMPORTANT: Return ONLY valid JSON with no markdown formatting.

Generate notifications and return this exact JSON structure:

{{
    "notifications": {{
        "commencement": {{
            "subject": "Audit Commencement Notice",
            "body": "Email body text",
            "recipients": ["primary.contact@company.com"]
        }},
        "completion": {{
            "subject": "Audit Completion Notice",
            "body": "Email body text",
            "recipients": ["primary.contact@company.com"]
        }},
        "follow_up": {{
            "subject": "Action Items Follow-up",
            "body": "Email body text",
            "recipients": ["primary.contact@company.com"]
        }},
        "closure": {{
            "subject": "Audit Closure Notification",
            "body": "Email body text",
            "recipients": ["primary.contact@company.com"]
        }},
        "escalation": {{
            "subject": "Audit Escalation Required",
            "body": "Email body text",
            "recipients": ["manager@company.com"]
        }}
    }},
    "recommended_type": "completion"
}}

Query: {query}
Type: {notification_type}
Audit: {audit_context}

Return only JSON:
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn digests(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "audit_id": format!("AUD-2025-{:08X}", i) }))
            .collect()
    }

    #[test]
    fn high_risk_prompt_caps_embedded_records() {
        let prompt = high_risk("any risks?", &digests(15));
        assert!(prompt.contains("AUD-2025-00000009"));
        assert!(!prompt.contains("AUD-2025-0000000A"));
    }

    #[test]
    fn trends_prompt_caps_embedded_records() {
        let prompt = trends("patterns?", &digests(35));
        assert!(prompt.contains("AUD-2025-0000001D"));
        assert!(!prompt.contains("AUD-2025-0000001E"));
    }

    #[test]
    fn every_prompt_demands_json_only_and_echoes_the_query() {
        let records = digests(2);
        let detail = json!({ "audit_id": "AUD-2025-AAAAAAAA" });
        let prompts = [
            high_risk("q-high", &records),
            open_events("q-open", &records, 2),
            next_steps("q-next", &detail),
            trends("q-trend", &records),
            notification("q-notify", "general", None),
        ];
        for prompt in &prompts {
            assert!(prompt.contains("ONLY valid JSON"), "missing directive: {prompt}");
        }
        assert!(prompts[0].contains("Query: q-high"));
        assert!(prompts[1].contains("Query: q-open"));
        assert!(prompts[2].contains("Query: q-next"));
        assert!(prompts[3].contains("Query: q-trend"));
        assert!(prompts[4].contains("Query: q-notify"));
    }

    #[test]
    fn open_events_prompt_embeds_the_real_open_count() {
        let prompt = open_events("how many open?", &digests(3), 3);
        assert!(prompt.contains("\"total_open\": 3"));
    }

    #[test]
    fn next_steps_prompt_shows_the_expected_schema() {
        let detail = json!({ "audit_id": "AUD-2025-AAAAAAAA" });
        let prompt = next_steps("what now?", &detail);
        assert!(prompt.contains("\"immediate_actions\""));
        assert!(prompt.contains("\"timeline_recommendations\""));
        assert!(prompt.contains("AUD-2025-AAAAAAAA"));
    }

    #[test]
    fn notification_prompt_without_audit_says_general() {
        let prompt = notification("draft please", "completion", None);
        assert!(prompt.contains("Audit: General notification"));
        assert!(prompt.contains("Type: completion"));
    }
}
