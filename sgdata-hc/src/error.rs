//! Error types for sgdata-hc

use crate::models::ClosureFeed;
use thiserror::Error;

/// Result type for hawker closure operations
pub type Result<T> = std::result::Result<T, HcError>;

/// Hawker closure processor errors
#[derive(Debug, Error)]
pub enum HcError {
    /// Request could not be sent or the body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("API error {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body is not the expected JSON shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Pagination stopped early after some pages were read
    ///
    /// Carries the accumulated feed so the caller can use it for this run.
    /// Never cached.
    #[error("Pagination stopped after {pages} page(s): {reason}")]
    PartialFetch {
        feed: ClosureFeed,
        pages: usize,
        reason: String,
    },
}

impl From<reqwest::Error> for HcError {
    fn from(e: reqwest::Error) -> Self {
        HcError::Network(e.to_string())
    }
}
