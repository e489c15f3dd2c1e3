//! Storage abstraction for the index.
//!
//! The [`Store`] trait is the only way the core touches persistent state.
//! Writes are expressed as typed [`Statement`]s, executed one at a time or
//! grouped into a [`Batch`]; reads are a handful of point lookups plus one
//! scalar count. The store offers per-statement atomicity only. A
//! [`BatchMode::Logged`] batch is all-or-nothing within itself, but there
//! is no transaction spanning batches.
//!
//! Schema (four logical tables):
//!
//! | Table | Key | Columns |
//! |-------|-----|---------|
//! | `documents` | `doc_id`, `url` unique | title, last_updated, content, links, total_tokens |
//! | `term_frequency` | (`term`, `doc_id`) | frequency |
//! | `document_frequency` | `term` | doc_count |
//! | `tfidf_scores` | (`term`, `doc_id`) | tfidf_score |

pub mod memory;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DocumentRecord, DocumentSummary, StoredDocument};

/// The four logical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Documents,
    TermFrequency,
    DocumentFrequency,
    TfIdfScores,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Documents => "documents",
            Table::TermFrequency => "term_frequency",
            Table::DocumentFrequency => "document_frequency",
            Table::TfIdfScores => "tfidf_scores",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single parameterized write.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Insert a document under a fresh identity.
    InsertDocument(DocumentRecord),
    /// Overwrite every field of an existing document, identity unchanged.
    UpdateDocument(DocumentRecord),
    /// Record the freshness marker of an existing document.
    SetDocumentMarker { doc_id: String, last_updated: String },
    /// Insert the row, or overwrite the count of an existing one.
    InsertTermFrequency {
        term: String,
        doc_id: String,
        frequency: u64,
    },
    DeleteTermFrequency { term: String, doc_id: String },
    /// Insert the row with count 1, or add 1 to an existing row.
    IncrementDocumentFrequency { term: String },
    /// Subtract 1 from an existing row, never below zero.
    DecrementDocumentFrequency { term: String },
    /// Remove all score rows of a document.
    DeleteTfIdfScores { doc_id: String },
    InsertTfIdfScore {
        term: String,
        doc_id: String,
        score: f64,
    },
}

impl Statement {
    pub fn table(&self) -> Table {
        match self {
            Statement::InsertDocument(_)
            | Statement::UpdateDocument(_)
            | Statement::SetDocumentMarker { .. } => Table::Documents,
            Statement::InsertTermFrequency { .. } | Statement::DeleteTermFrequency { .. } => {
                Table::TermFrequency
            }
            Statement::IncrementDocumentFrequency { .. }
            | Statement::DecrementDocumentFrequency { .. } => Table::DocumentFrequency,
            Statement::DeleteTfIdfScores { .. } | Statement::InsertTfIdfScore { .. } => {
                Table::TfIdfScores
            }
        }
    }

    /// Human-readable row key, used in error reports.
    pub fn key(&self) -> String {
        match self {
            Statement::InsertDocument(doc) | Statement::UpdateDocument(doc) => {
                format!("doc_id={} url={}", doc.doc_id, doc.url)
            }
            Statement::SetDocumentMarker { doc_id, .. }
            | Statement::DeleteTfIdfScores { doc_id } => format!("doc_id={}", doc_id),
            Statement::InsertTermFrequency { term, doc_id, .. }
            | Statement::DeleteTermFrequency { term, doc_id }
            | Statement::InsertTfIdfScore { term, doc_id, .. } => {
                format!("term={} doc_id={}", term, doc_id)
            }
            Statement::IncrementDocumentFrequency { term }
            | Statement::DecrementDocumentFrequency { term } => format!("term={}", term),
        }
    }
}

/// How a batch is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// All statements apply or none do.
    #[default]
    Logged,
    /// Statements apply in order; the first failure stops the rest.
    Unlogged,
}

impl BatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "logged" => Some(BatchMode::Logged),
            "unlogged" => Some(BatchMode::Unlogged),
            _ => None,
        }
    }
}

/// A group of statements submitted in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub mode: BatchMode,
    pub statements: Vec<Statement>,
}

impl Batch {
    pub fn new(mode: BatchMode) -> Self {
        Self {
            mode,
            statements: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Table of the first statement.
    pub fn table(&self) -> Option<Table> {
        self.statements.first().map(Statement::table)
    }

    /// Statements per table, tables in order of first appearance.
    pub fn table_counts(&self) -> Vec<(Table, usize)> {
        let mut counts: Vec<(Table, usize)> = Vec::new();
        for table in self.statements.iter().map(Statement::table) {
            match counts.iter_mut().find(|(t, _)| *t == table) {
                Some((_, n)) => *n += 1,
                None => counts.push((table, 1)),
            }
        }
        counts
    }

    /// Key range covered by the batch, for error reports.
    pub fn key_range(&self) -> String {
        match (self.statements.first(), self.statements.last()) {
            (Some(first), Some(last)) if self.statements.len() > 1 => {
                format!("{} .. {} ({} rows)", first.key(), last.key(), self.len())
            }
            (Some(only), _) => only.key(),
            _ => String::new(),
        }
    }
}

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_document`](Store::find_document) | Identity and marker by URL |
/// | [`document_terms`](Store::document_terms) | Terms currently attributed to a document |
/// | [`document_frequency`](Store::document_frequency) | Per-term document count |
/// | [`document_count`](Store::document_count) | Corpus size |
/// | [`execute`](Store::execute) | One statement |
/// | [`execute_batch`](Store::execute_batch) | A group of statements |
/// | [`term_scores`](Store::term_scores) | Score rows for one term |
/// | [`document_summary`](Store::document_summary) | Metadata for display |
///
/// "Not found" is always `Ok(None)` (or an empty list), never an error.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_document(&self, url: &str) -> Result<Option<StoredDocument>>;

    async fn document_terms(&self, doc_id: &str) -> Result<Vec<String>>;

    async fn document_frequency(&self, term: &str) -> Result<Option<u64>>;

    async fn document_count(&self) -> Result<u64>;

    async fn execute(&self, statement: &Statement) -> Result<()>;

    async fn execute_batch(&self, batch: &Batch) -> Result<()>;

    /// `(doc_id, tfidf_score)` for every document containing `term`.
    async fn term_scores(&self, term: &str) -> Result<Vec<(String, f64)>>;

    async fn document_summary(&self, doc_id: &str) -> Result<Option<DocumentSummary>>;
}
