//! Network capability used by the pipeline.
//!
//! The core never opens sockets itself. A [`Transport`] performs the full
//! body fetch and the metadata-only conditional probe; redirects, timeouts,
//! and connection reuse are the implementation's business.

use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a [`Transport`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

/// Interpretation of a conditional probe response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Content changed (or no precondition was sent).
    Changed,
    /// The stored marker is still current.
    NotModified,
    /// Any other status; carried so the caller can report it.
    Other(u16),
}

impl ProbeStatus {
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200 => ProbeStatus::Changed,
            304 => ProbeStatus::NotModified,
            other => ProbeStatus::Other(other),
        }
    }
}

/// Result of [`Transport::probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: ProbeStatus,
    /// Freshness marker reported by the source (e.g. `Last-Modified`).
    pub marker: Option<String>,
    pub http_status: u16,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the full body of `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// Metadata-only request, conditional on `marker` when one is given.
    async fn probe(&self, url: &str, marker: Option<&str>)
        -> Result<ProbeResponse, TransportError>;
}
