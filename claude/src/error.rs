use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

/// Failures talking to the Messages endpoint.
#[derive(Debug, Error)]
pub enum Error {
    #[error("ANTHROPIC_API_KEY is not set")]
    NoApiKey,

    #[error("API key cannot be sent as a header: {0}")]
    InvalidKey(#[from] InvalidHeaderValue),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable response body: {0}")]
    Decode(#[source] reqwest::Error),
}
