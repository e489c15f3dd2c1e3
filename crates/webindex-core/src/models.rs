//! Records that flow from extraction into the store.

use serde::Serialize;

/// A document row as written to the `documents` table.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    /// Assigned once at first indexing, never reassigned.
    pub doc_id: String,
    pub title: String,
    pub url: String,
    /// Opaque freshness marker from the source, used only for comparison.
    pub last_updated: String,
    pub content: Vec<u8>,
    pub links: Vec<String>,
    pub total_tokens: u64,
}

/// The part of a stored document needed to decide whether to re-index it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub doc_id: String,
    pub last_updated: String,
}

/// Lightweight document metadata for search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub url: String,
    pub title: String,
    pub total_tokens: u64,
}

/// Where a URL stands before indexing, decided once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// URL has never been indexed.
    New,
    /// Stored and the source reports no change (or could not be probed).
    UnchangedExisting,
    /// Stored and the source reports a change.
    ChangedExisting,
}

impl DocumentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentState::New => "new",
            DocumentState::UnchangedExisting => "unchanged",
            DocumentState::ChangedExisting => "changed",
        }
    }
}
