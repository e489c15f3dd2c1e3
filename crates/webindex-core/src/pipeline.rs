//! The per-URL indexing pipeline.
//!
//! Each URL is classified once as [`DocumentState::New`],
//! [`DocumentState::ChangedExisting`], or [`DocumentState::UnchangedExisting`],
//! and that state drives a single linear sequence:
//!
//! ```text
//! lookup ─▶ freshness ─▶ fetch ─▶ extract ─▶ persist
//! ```
//!
//! Unchanged documents stop after the freshness step. URLs are processed
//! strictly one after another.

use uuid::Uuid;

use crate::error::IndexError;
use crate::extract::{extract_content, ExtractedContent};
use crate::freshness::check_freshness;
use crate::models::{DocumentRecord, DocumentState, StoredDocument};
use crate::store::Store;
use crate::transport::Transport;
use crate::writer::{self, WriteSummary};

pub use crate::writer::IndexOptions;

/// Result of indexing one URL successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOutcome {
    pub url: String,
    pub doc_id: String,
    pub state: DocumentState,
    /// Distinct terms written (zero when unchanged).
    pub terms: usize,
    /// Batches submitted (zero when unchanged).
    pub batches: usize,
}

/// One entry of an [`index_documents`] run.
#[derive(Debug)]
pub struct DocumentReport {
    pub url: String,
    pub result: Result<IndexOutcome, IndexError>,
}

struct Plan {
    state: DocumentState,
    doc_id: String,
    marker: String,
}

/// Index a single URL.
pub async fn index_document<S, T>(
    store: &S,
    transport: &T,
    url: &str,
    options: &IndexOptions,
) -> Result<IndexOutcome, IndexError>
where
    S: Store + ?Sized,
    T: Transport + ?Sized,
{
    let stored = store
        .find_document(url)
        .await
        .map_err(|e| IndexError::read("document lookup by url", e))?;

    let plan = match stored {
        None => plan_new(transport, url).await,
        Some(existing) => plan_existing(transport, url, existing).await,
    };
    if plan.state == DocumentState::UnchangedExisting {
        return Ok(IndexOutcome {
            url: url.to_string(),
            doc_id: plan.doc_id,
            state: plan.state,
            terms: 0,
            batches: 0,
        });
    }

    let body = transport.fetch(url).await?;
    let ExtractedContent {
        title,
        links,
        terms,
        total_tokens,
    } = extract_content(&body)?;

    let record = DocumentRecord {
        doc_id: plan.doc_id,
        title,
        url: url.to_string(),
        last_updated: plan.marker,
        content: body,
        links,
        total_tokens,
    };
    let WriteSummary { terms: written, batches } =
        writer::persist(store, &record, &terms, plan.state, options).await?;

    tracing::info!(
        url,
        doc_id = %record.doc_id,
        state = plan.state.as_str(),
        terms = written,
        batches,
        "indexed"
    );
    Ok(IndexOutcome {
        url: record.url,
        doc_id: record.doc_id,
        state: plan.state,
        terms: written,
        batches,
    })
}

/// Never-seen URL: the probe only supplies a marker, and its failure does
/// not stop the fetch.
async fn plan_new<T: Transport + ?Sized>(transport: &T, url: &str) -> Plan {
    let marker = match check_freshness(transport, url, "").await {
        Ok(freshness) => freshness.marker,
        Err(err) => {
            tracing::warn!(url, error = %err, "probe failed for new document; fetching anyway");
            String::new()
        }
    };
    Plan {
        state: DocumentState::New,
        doc_id: Uuid::new_v4().to_string(),
        marker,
    }
}

/// Known URL: a failed probe leaves the document as it is.
async fn plan_existing<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    existing: StoredDocument,
) -> Plan {
    let unchanged = |existing: StoredDocument| Plan {
        state: DocumentState::UnchangedExisting,
        doc_id: existing.doc_id,
        marker: existing.last_updated,
    };
    let probed = check_freshness(transport, url, &existing.last_updated).await;
    match probed {
        Ok(freshness) if freshness.needs_update => {
            // A source that stops sending a marker keeps the old one.
            let marker = if freshness.marker.is_empty() {
                existing.last_updated
            } else {
                freshness.marker
            };
            Plan {
                state: DocumentState::ChangedExisting,
                doc_id: existing.doc_id,
                marker,
            }
        }
        Ok(_) => {
            tracing::debug!(url, doc_id = %existing.doc_id, "not modified");
            unchanged(existing)
        }
        Err(err) => {
            tracing::warn!(url, doc_id = %existing.doc_id, error = %err, "probe failed; skipping re-index");
            unchanged(existing)
        }
    }
}

/// Index `urls` one after another. A failure is recorded for its URL and
/// the run continues; reports come back in input order.
pub async fn index_documents<S, T, U>(
    store: &S,
    transport: &T,
    urls: &[U],
    options: &IndexOptions,
) -> Vec<DocumentReport>
where
    S: Store + ?Sized,
    T: Transport + ?Sized,
    U: AsRef<str>,
{
    let mut reports = Vec::with_capacity(urls.len());
    for url in urls {
        let url = url.as_ref();
        let result = index_document(store, transport, url, options).await;
        if let Err(err) = &result {
            tracing::warn!(url, error = %err, "indexing failed");
        }
        reports.push(DocumentReport {
            url: url.to_string(),
            result,
        });
    }
    reports
}
