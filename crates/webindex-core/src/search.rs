//! Keyword search over stored TF-IDF scores.
//!
//! The query goes through the same normalizer as document text, so
//! `"Rust, Async!"` looks up the terms `rust` and `async`. A document's
//! score is the sum of its TF-IDF scores for the query terms it contains.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use serde::Serialize;

use crate::normalize::tokenize;
use crate::store::Store;

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub url: String,
    pub title: String,
    pub score: f64,
}

/// Rank documents for `query`, highest score first, ties broken by URL.
///
/// An empty query (or one made only of punctuation) returns no results.
/// Score rows whose document has vanished are skipped.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let terms: BTreeSet<String> = tokenize(query).into_iter().collect();
    if terms.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut totals: HashMap<String, f64> = HashMap::new();
    for term in &terms {
        for (doc_id, score) in store.term_scores(term).await? {
            *totals.entry(doc_id).or_insert(0.0) += score;
        }
    }

    let mut hits = Vec::with_capacity(totals.len());
    for (doc_id, score) in totals {
        if let Some(summary) = store.document_summary(&doc_id).await? {
            hits.push(SearchHit {
                doc_id,
                url: summary.url,
                title: summary.title,
                score,
            });
        }
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.url.cmp(&b.url))
    });
    hits.truncate(limit);
    Ok(hits)
}
