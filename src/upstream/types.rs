//! Core types for the upstream layer

use thiserror::Error;

/// Failures raised while talking to an upstream API
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Status(u16),

    /// 403 or a literal `Forbidden` body: the service key has not been activated yet
    #[error("upstream API key is not activated yet")]
    NotActivated,

    #[error("invalid JSON body: {snippet}")]
    InvalidJson { snippet: String },

    /// Result code in the body said the call failed
    #[error("upstream reported an error: {0}")]
    Rejected(String),

    #[error("invalid upstream URL: {0}")]
    Url(String),
}
