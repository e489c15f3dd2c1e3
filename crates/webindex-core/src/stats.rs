//! Corpus statistics: term frequency, smoothed inverse document frequency,
//! and TF-IDF.
//!
//! ```text
//! tf    = count / total_tokens
//! idf   = 1 + log2(total_documents / document_frequency)
//! tfidf = tf * idf
//! ```
//!
//! A term with no document-frequency row is treated as appearing in one
//! document (this one). The `+ 1` keeps terms present in every document at
//! a positive weight.

use std::collections::BTreeMap;

use crate::error::IndexError;

/// Computed weights for one term of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct TermScore {
    pub term: String,
    pub term_frequency: f64,
    pub inverse_document_frequency: f64,
    pub tfidf: f64,
}

pub fn term_frequency(count: u64, total_tokens: u64) -> Result<f64, IndexError> {
    if total_tokens == 0 {
        return Err(IndexError::Precondition(
            "total token count is zero; term frequency is undefined".to_string(),
        ));
    }
    Ok(count as f64 / total_tokens as f64)
}

/// `None` or zero document frequency counts as 1. The corpus size is
/// raised to at least the document frequency, since both are read without
/// coordination and may disagree briefly.
pub fn inverse_document_frequency(total_documents: u64, document_frequency: Option<u64>) -> f64 {
    let df = document_frequency.filter(|&df| df > 0).unwrap_or(1);
    let n = total_documents.max(df);
    1.0 + (n as f64 / df as f64).log2()
}

/// Score every term of a document. `lookup` returns the corpus document
/// frequency of a term, or `None` when the term has no row.
pub fn score_document<F>(
    terms: &BTreeMap<String, u64>,
    total_tokens: u64,
    total_documents: u64,
    lookup: F,
) -> Result<Vec<TermScore>, IndexError>
where
    F: Fn(&str) -> Option<u64>,
{
    if total_tokens == 0 {
        return Err(IndexError::Precondition(
            "document has no tokens to score".to_string(),
        ));
    }

    terms
        .iter()
        .map(|(term, &count)| {
            let tf = term_frequency(count, total_tokens)?;
            let idf = inverse_document_frequency(total_documents, lookup(term));
            Ok(TermScore {
                term: term.clone(),
                term_frequency: tf,
                inverse_document_frequency: idf,
                tfidf: tf * idf,
            })
        })
        .collect()
}
