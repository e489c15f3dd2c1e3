//! Index writer: persists one document and its derived rows.
//!
//! Write order for a document that needs indexing:
//!
//! 1. Previous term attribution is read (existing documents only).
//! 2. The document row is inserted or fully overwritten, with an empty
//!    freshness marker.
//! 3. Term attribution is applied in batches. A term new to the document
//!    gets its document-frequency increment and its term-frequency row in
//!    the same batch; a dropped term loses both together; a kept term only
//!    has its count overwritten.
//! 4. Corpus size and per-term document frequency are read.
//! 5. TF-IDF rows are deleted and re-inserted in batches.
//! 6. The freshness marker is recorded.
//!
//! The first failure stops the remaining steps. Rows already written stay
//! written, and the marker is still empty, so the next run re-indexes the
//! document regardless of what the source reports.
//!
//! A term-frequency row is the attribution record for its term: with
//! logged batches it exists exactly when the document was counted in that
//! term's document frequency.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::batch::{BatchWriter, DEFAULT_BATCH_SIZE};
use crate::error::IndexError;
use crate::models::{DocumentRecord, DocumentState};
use crate::stats;
use crate::store::{BatchMode, Statement, Store};

/// Batching knobs for the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Terms per attribution batch, rows per score batch.
    pub batch_size: usize,
    pub batch_mode: BatchMode,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_mode: BatchMode::Logged,
        }
    }
}

/// What [`persist`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Distinct terms written for the document.
    pub terms: usize,
    /// Batches submitted across all tables.
    pub batches: usize,
}

/// Persist `document` with its term counts.
///
/// `state` must come from the pipeline's classification: `New` inserts,
/// `ChangedExisting` overwrites and replaces derived rows, and
/// `UnchangedExisting` writes nothing. `document.last_updated` is stored
/// only after every derived row is written.
pub async fn persist<S: Store + ?Sized>(
    store: &S,
    document: &DocumentRecord,
    terms: &BTreeMap<String, u64>,
    state: DocumentState,
    options: &IndexOptions,
) -> Result<WriteSummary, IndexError> {
    let existing = match state {
        DocumentState::UnchangedExisting => return Ok(WriteSummary::default()),
        DocumentState::New => false,
        DocumentState::ChangedExisting => true,
    };

    if document.total_tokens == 0 || terms.is_empty() {
        return Err(IndexError::Precondition(format!(
            "{} has no tokens; refusing to index",
            document.url
        )));
    }

    let doc_id = document.doc_id.as_str();
    let previous: BTreeSet<String> = if existing {
        store
            .document_terms(doc_id)
            .await
            .map_err(|e| IndexError::read("previous term attribution", e))?
            .into_iter()
            .collect()
    } else {
        BTreeSet::new()
    };

    let unmarked = DocumentRecord {
        last_updated: String::new(),
        ..document.clone()
    };
    let statement = if existing {
        Statement::UpdateDocument(unmarked)
    } else {
        Statement::InsertDocument(unmarked)
    };
    execute(store, &statement).await?;

    let mut summary = WriteSummary {
        terms: terms.len(),
        batches: 0,
    };

    // Term attribution
    let mut writer = BatchWriter::new(store, options.batch_mode, options.batch_size);
    for (term, &frequency) in terms {
        let row = Statement::InsertTermFrequency {
            term: term.clone(),
            doc_id: doc_id.to_string(),
            frequency,
        };
        let unit = if previous.contains(term) {
            vec![row]
        } else {
            vec![Statement::IncrementDocumentFrequency { term: term.clone() }, row]
        };
        writer.push_unit(unit).await?;
    }
    let dropped: Vec<&String> = previous.iter().filter(|t| !terms.contains_key(*t)).collect();
    for term in &dropped {
        writer
            .push_unit(vec![
                Statement::DeleteTermFrequency {
                    term: term.to_string(),
                    doc_id: doc_id.to_string(),
                },
                Statement::DecrementDocumentFrequency {
                    term: term.to_string(),
                },
            ])
            .await?;
    }
    summary.batches += writer.finish().await?;

    let total_documents = store
        .document_count()
        .await
        .map_err(|e| IndexError::read("corpus document count", e))?;
    let mut frequencies = HashMap::with_capacity(terms.len());
    for term in terms.keys() {
        let df = store
            .document_frequency(term)
            .await
            .map_err(|e| IndexError::read("document frequency", e))?;
        frequencies.insert(term.as_str(), df);
    }
    let scores = stats::score_document(terms, document.total_tokens, total_documents, |term| {
        frequencies.get(term).copied().flatten()
    })?;

    // TF-IDF
    if existing {
        execute(
            store,
            &Statement::DeleteTfIdfScores {
                doc_id: doc_id.to_string(),
            },
        )
        .await?;
    }
    let mut writer = BatchWriter::new(store, options.batch_mode, options.batch_size);
    for score in scores {
        writer
            .push(Statement::InsertTfIdfScore {
                term: score.term,
                doc_id: doc_id.to_string(),
                score: score.tfidf,
            })
            .await?;
    }
    summary.batches += writer.finish().await?;

    if !document.last_updated.is_empty() {
        execute(
            store,
            &Statement::SetDocumentMarker {
                doc_id: doc_id.to_string(),
                last_updated: document.last_updated.clone(),
            },
        )
        .await?;
    }

    tracing::debug!(
        url = %document.url,
        doc_id,
        terms = summary.terms,
        dropped = dropped.len(),
        batches = summary.batches,
        total_documents,
        "document persisted"
    );
    Ok(summary)
}

async fn execute<S: Store + ?Sized>(store: &S, statement: &Statement) -> Result<(), IndexError> {
    store
        .execute(statement)
        .await
        .map_err(|e| IndexError::write(statement.table(), statement.key(), e))
}
