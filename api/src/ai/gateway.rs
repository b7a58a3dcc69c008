use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Per-request ceiling. The upstream endpoint gives no latency guarantee;
/// this bound is an added safety margin, not inherited behavior.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model endpoint returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("model reply carried no usable text")]
    EmptyReply,
}

/// Text-generation endpoint the AI tools call with a rendered prompt.
/// A trait so the dispatcher receives the client explicitly and tests can
/// substitute a scripted gateway. Implementations: `GeminiGateway` (real
/// API), `MockGateway` (fixed reply).
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn first_candidate_text(reply: GenerateContentResponse) -> Result<String, GatewayError> {
    let candidate = reply
        .candidates
        .into_iter()
        .next()
        .ok_or(GatewayError::EmptyReply)?;
    let content = candidate.content.ok_or(GatewayError::EmptyReply)?;
    let text: String = content.parts.into_iter().map(|p| p.text).collect();
    if text.is_empty() {
        return Err(GatewayError::EmptyReply);
    }
    Ok(text)
}

/// Gemini `generateContent` client. One instance is built at startup and
/// shared across all tool invocations; reqwest handles its own pooling.
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGateway {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                model = %self.model,
                "model endpoint returned non-success status"
            );
            return Err(GatewayError::Status(response.status()));
        }

        let reply = response.json::<GenerateContentResponse>().await?;
        first_candidate_text(reply)
    }
}

/// Scripted gateway: returns its canned reply for any prompt. For tests
/// and offline development.
pub struct MockGateway {
    reply: String,
}

impl MockGateway {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn generate(&self, _prompt: &str) -> Result<String, GatewayError> {
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_candidate_text_concatenates_parts() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    { "content": { "parts": [ {"text": "{\"a\":"}, {"text": " 1}"} ] } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(reply).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn missing_candidates_is_an_empty_reply() {
        let reply: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            first_candidate_text(reply),
            Err(GatewayError::EmptyReply)
        ));
    }

    #[test]
    fn candidate_without_content_is_an_empty_reply() {
        let reply: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{}]}"#).unwrap();
        assert!(matches!(
            first_candidate_text(reply),
            Err(GatewayError::EmptyReply)
        ));
    }

    #[tokio::test]
    async fn mock_gateway_returns_its_script() {
        let gateway = MockGateway::replying("{\"ok\": true}");
        assert_eq!(gateway.generate("anything").await.unwrap(), "{\"ok\": true}");
    }
}
