use thiserror::Error;

/// Failures of the synchronized settings storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage payload is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage is unavailable")]
    Unavailable,
}

/// Failures crossing the popup/page boundary.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("no active tab")]
    NoActiveTab,
    #[error("page did not answer: {0}")]
    Disconnected(String),
}

/// Failures talking to the summarization relay from the popup.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI summarization failed (status {0})")]
    Status(u16),
}

/// Failures talking to the external generative-language API.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {status}")]
    Upstream { status: u16, body: String },
    #[error("upstream payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}
