//! Client for the external generative-language API.

use crate::error::GeminiError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Upper bound on the characters of page text forwarded upstream.
pub const MAX_INPUT_CHARS: usize = 8000;

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// No timeout when `None`.
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        }
    }
}

/// Returns at most the first `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Instruction wrapped around the page text.
pub fn build_prompt(text: &str) -> String {
    let trimmed = truncate_chars(text, MAX_INPUT_CHARS);
    format!(
        "\nYou are an accessibility assistant. Summarize the following web page content in 5 short bullet points. \n\
         Use simple English, suitable for students, and avoid technical jargon.\n\
         \n\
         TEXT:\n\
         {trimmed}\n"
    )
}

/// Why a response carried no summary text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SummaryParseError {
    NoCandidates,
    NoParts,
    NoText,
}

impl fmt::Display for SummaryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryParseError::NoCandidates => write!(f, "response has no candidates"),
            SummaryParseError::NoParts => write!(f, "first candidate has no content parts"),
            SummaryParseError::NoText => write!(f, "first part has no text"),
        }
    }
}

impl std::error::Error for SummaryParseError {}

/// Reads `candidates[0].content.parts[0].text`, trimmed.
pub fn parse_summary(response: &Value) -> Result<String, SummaryParseError> {
    let candidate = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .ok_or(SummaryParseError::NoCandidates)?;
    let part = candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .ok_or(SummaryParseError::NoParts)?;
    part.get("text")
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or(SummaryParseError::NoText)
}

pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Sends `prompt` and returns the raw JSON response.
    pub async fn generate_content(&self, prompt: String) -> Result<Value, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        debug!(model = %self.config.model, chars = prompt.len(), "generate_content");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GeminiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn prompt_embeds_only_first_8000_chars() {
        let text = format!("{}{}", "a".repeat(MAX_INPUT_CHARS), "TAIL");
        let prompt = build_prompt(&text);
        assert!(prompt.contains("5 short bullet points"));
        assert!(prompt.contains(&"a".repeat(MAX_INPUT_CHARS)));
        assert!(!prompt.contains("TAIL"));
    }

    #[test]
    fn parse_summary_reports_missing_fields() {
        assert_eq!(
            parse_summary(&json!({})),
            Err(SummaryParseError::NoCandidates)
        );
        assert_eq!(
            parse_summary(&json!({ "candidates": [] })),
            Err(SummaryParseError::NoCandidates)
        );
        assert_eq!(
            parse_summary(&json!({ "candidates": [{ "content": {} }] })),
            Err(SummaryParseError::NoParts)
        );
        assert_eq!(
            parse_summary(&json!({ "candidates": [{ "content": { "parts": [{}] } }] })),
            Err(SummaryParseError::NoText)
        );
        assert_eq!(
            parse_summary(&json!({
                "candidates": [{ "content": { "parts": [{ "text": "  - one\n- two \n" }] } }]
            })),
            Ok("- one\n- two".to_string())
        );
    }

    #[tokio::test]
    async fn client_posts_prompt_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(GeminiConfig {
            base_url: server.uri(),
            model: "test-model".into(),
            ..GeminiConfig::new("secret")
        })
        .unwrap();
        let value = client.generate_content("hello".into()).await.unwrap();
        assert_eq!(parse_summary(&value).unwrap(), "ok");

        let requests = server.received_requests().await.unwrap();
        let body: GenerateContentRequest = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body.contents[0].parts[0].text, "hello");
    }

    #[tokio::test]
    async fn client_surfaces_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(GeminiConfig {
            base_url: server.uri(),
            ..GeminiConfig::new("secret")
        })
        .unwrap();
        match client.generate_content("hello".into()).await {
            Err(GeminiError::Upstream { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
