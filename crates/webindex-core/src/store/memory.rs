//! In-memory [`Store`] implementation for tests and embedding.
//!
//! All four tables live in ordered maps behind one `std::sync::RwLock`.
//! Logged batches are applied to a copy of the tables and swapped in only
//! when every statement succeeds.
//!
//! Besides the [`Store`] surface, the store keeps a small write log and can
//! be told to reject writes to a given table, which lets callers observe
//! batching and exercise partial-failure paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{DocumentRecord, DocumentSummary, StoredDocument};

use super::{Batch, BatchMode, Statement, Store, Table};

#[derive(Debug, Clone, Default)]
struct Tables {
    documents: BTreeMap<String, DocumentRecord>,
    term_frequency: BTreeMap<(String, String), u64>,
    document_frequency: BTreeMap<String, u64>,
    tfidf_scores: BTreeMap<(String, String), f64>,
}

impl Tables {
    fn url_taken(&self, url: &str, except: &str) -> bool {
        self.documents
            .values()
            .any(|doc| doc.url == url && doc.doc_id != except)
    }

    fn apply(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::InsertDocument(doc) => {
                if self.documents.contains_key(&doc.doc_id) {
                    bail!("duplicate doc_id {}", doc.doc_id);
                }
                if self.url_taken(&doc.url, &doc.doc_id) {
                    bail!("duplicate url {}", doc.url);
                }
                self.documents.insert(doc.doc_id.clone(), doc.clone());
            }
            Statement::UpdateDocument(doc) => {
                if !self.documents.contains_key(&doc.doc_id) {
                    bail!("no document with doc_id {}", doc.doc_id);
                }
                if self.url_taken(&doc.url, &doc.doc_id) {
                    bail!("duplicate url {}", doc.url);
                }
                self.documents.insert(doc.doc_id.clone(), doc.clone());
            }
            Statement::SetDocumentMarker {
                doc_id,
                last_updated,
            } => match self.documents.get_mut(doc_id) {
                Some(doc) => doc.last_updated = last_updated.clone(),
                None => bail!("no document with doc_id {}", doc_id),
            },
            Statement::InsertTermFrequency {
                term,
                doc_id,
                frequency,
            } => {
                self.term_frequency
                    .insert((term.clone(), doc_id.clone()), *frequency);
            }
            Statement::DeleteTermFrequency { term, doc_id } => {
                self.term_frequency.remove(&(term.clone(), doc_id.clone()));
            }
            Statement::IncrementDocumentFrequency { term } => {
                *self.document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            Statement::DecrementDocumentFrequency { term } => {
                if let Some(count) = self.document_frequency.get_mut(term) {
                    *count = count.saturating_sub(1);
                }
            }
            Statement::DeleteTfIdfScores { doc_id } => {
                self.tfidf_scores.retain(|(_, d), _| d != doc_id);
            }
            Statement::InsertTfIdfScore {
                term,
                doc_id,
                score,
            } => {
                self.tfidf_scores
                    .insert((term.clone(), doc_id.clone()), *score);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct WriteLog {
    statements: usize,
    batches: Vec<(Table, usize)>,
    failing: HashSet<Table>,
}

/// In-memory store for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    log: RwLock<WriteLog>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every later write that touches `table`.
    pub fn fail_writes_to(&self, table: Table) {
        if let Ok(mut log) = self.log.write() {
            log.failing.insert(table);
        }
    }

    /// Stop rejecting writes.
    pub fn clear_failures(&self) {
        if let Ok(mut log) = self.log.write() {
            log.failing.clear();
        }
    }

    /// Number of statements applied so far, batched or not.
    pub fn write_count(&self) -> usize {
        self.log.read().map(|log| log.statements).unwrap_or(0)
    }

    /// Statements per submitted batch that touched `table`, in order.
    pub fn batches_for(&self, table: Table) -> Vec<usize> {
        self.log
            .read()
            .map(|log| {
                log.batches
                    .iter()
                    .filter(|(t, _)| *t == table)
                    .map(|(_, n)| *n)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn document_by_url(&self, url: &str) -> Option<DocumentRecord> {
        let tables = self.tables.read().ok()?;
        tables.documents.values().find(|d| d.url == url).cloned()
    }

    pub fn term_frequency(&self, term: &str, doc_id: &str) -> Option<u64> {
        let tables = self.tables.read().ok()?;
        tables
            .term_frequency
            .get(&(term.to_string(), doc_id.to_string()))
            .copied()
    }

    pub fn tfidf_score(&self, term: &str, doc_id: &str) -> Option<f64> {
        let tables = self.tables.read().ok()?;
        tables
            .tfidf_scores
            .get(&(term.to_string(), doc_id.to_string()))
            .copied()
    }

    /// Score rows held for `doc_id`, sorted by term.
    pub fn scores_for(&self, doc_id: &str) -> Vec<(String, f64)> {
        self.tables
            .read()
            .map(|tables| {
                tables
                    .tfidf_scores
                    .iter()
                    .filter(|((_, d), _)| d == doc_id)
                    .map(|((t, _), s)| (t.clone(), *s))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn read_tables(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write_tables(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write_log(&self) -> Result<RwLockWriteGuard<'_, WriteLog>> {
        self.log
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn check_allowed(log: &WriteLog, statement: &Statement) -> Result<()> {
        let table = statement.table();
        if log.failing.contains(&table) {
            bail!("injected write failure on {}", table);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_document(&self, url: &str) -> Result<Option<StoredDocument>> {
        let tables = self.read_tables()?;
        Ok(tables
            .documents
            .values()
            .find(|d| d.url == url)
            .map(|d| StoredDocument {
                doc_id: d.doc_id.clone(),
                last_updated: d.last_updated.clone(),
            }))
    }

    async fn document_terms(&self, doc_id: &str) -> Result<Vec<String>> {
        let tables = self.read_tables()?;
        Ok(tables
            .term_frequency
            .keys()
            .filter(|(_, d)| d == doc_id)
            .map(|(t, _)| t.clone())
            .collect())
    }

    async fn document_frequency(&self, term: &str) -> Result<Option<u64>> {
        let tables = self.read_tables()?;
        Ok(tables.document_frequency.get(term).copied())
    }

    async fn document_count(&self) -> Result<u64> {
        let tables = self.read_tables()?;
        Ok(tables.documents.len() as u64)
    }

    async fn execute(&self, statement: &Statement) -> Result<()> {
        let mut log = self.write_log()?;
        Self::check_allowed(&log, statement)?;
        self.write_tables()?.apply(statement)?;
        log.statements += 1;
        Ok(())
    }

    async fn execute_batch(&self, batch: &Batch) -> Result<()> {
        let mut log = self.write_log()?;
        log.batches.extend(batch.table_counts());
        let mut tables = self.write_tables()?;

        match batch.mode {
            BatchMode::Logged => {
                let mut staged = tables.clone();
                for statement in &batch.statements {
                    Self::check_allowed(&log, statement)?;
                    staged.apply(statement)?;
                }
                *tables = staged;
                log.statements += batch.len();
            }
            BatchMode::Unlogged => {
                for statement in &batch.statements {
                    Self::check_allowed(&log, statement)?;
                    tables.apply(statement)?;
                    log.statements += 1;
                }
            }
        }
        Ok(())
    }

    async fn term_scores(&self, term: &str) -> Result<Vec<(String, f64)>> {
        let tables = self.read_tables()?;
        Ok(tables
            .tfidf_scores
            .iter()
            .filter(|((t, _), _)| t == term)
            .map(|((_, d), s)| (d.clone(), *s))
            .collect())
    }

    async fn document_summary(&self, doc_id: &str) -> Result<Option<DocumentSummary>> {
        let tables = self.read_tables()?;
        Ok(tables.documents.get(doc_id).map(|d| DocumentSummary {
            doc_id: d.doc_id.clone(),
            url: d.url.clone(),
            title: d.title.clone(),
            total_tokens: d.total_tokens,
        }))
    }
}
