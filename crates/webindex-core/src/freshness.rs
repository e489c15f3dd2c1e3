//! Conditional re-fetch decision.

use crate::transport::{ProbeStatus, Transport, TransportError};

/// Outcome of a freshness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    pub needs_update: bool,
    /// Marker to store with the document. On "not modified" this is the
    /// previous marker unchanged; on "changed" it is whatever the source
    /// reported, possibly empty.
    pub marker: String,
}

/// Probe `url`, sending `previous_marker` as a precondition when non-empty.
///
/// Any status other than changed/not-modified is an error and signals no
/// update.
pub async fn check_freshness<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    previous_marker: &str,
) -> Result<Freshness, TransportError> {
    let precondition = (!previous_marker.is_empty()).then_some(previous_marker);
    let response = transport.probe(url, precondition).await?;

    match response.status {
        ProbeStatus::Changed => Ok(Freshness {
            needs_update: true,
            marker: response.marker.unwrap_or_default(),
        }),
        ProbeStatus::NotModified => Ok(Freshness {
            needs_update: false,
            marker: previous_marker.to_string(),
        }),
        ProbeStatus::Other(status) => Err(TransportError::UnexpectedStatus {
            url: url.to_string(),
            status,
        }),
    }
}
