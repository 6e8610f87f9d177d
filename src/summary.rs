use crate::error::SummaryError;
use crate::gemini::{MAX_INPUT_CHARS, truncate_chars};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000/summarize";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummarizeResponse {
    #[serde(default)]
    pub summary: String,
}

/// Source of AI summaries for the popup.
#[async_trait]
pub trait SummaryClient: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

/// Posts page text to the summarization relay.
pub struct RelayClient {
    client: Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, SummaryError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SummaryClient for RelayClient {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let request = SummarizeRequest {
            text: truncate_chars(text, MAX_INPUT_CHARS).to_string(),
        };
        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SummaryError::Status(status.as_u16()));
        }
        let payload: SummarizeResponse = response.json().await?;
        Ok(payload.summary)
    }
}
