//! Per-document failure taxonomy.
//!
//! Every variant is fatal to the document being indexed and to nothing
//! else; [`crate::pipeline::index_documents`] reports it and moves on.

use thiserror::Error;

use crate::extract::ParseError;
use crate::store::Table;
use crate::transport::TransportError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Fetch or probe failed, or returned an unexpected status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Content could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A lookup failed for a reason other than "not found".
    #[error("store read failed ({purpose}): {source}")]
    StoreRead {
        purpose: &'static str,
        #[source]
        source: BoxError,
    },

    /// An insert, update, delete, or batch failed. Writes already applied
    /// for this document stay applied.
    #[error("write to {table} failed for {key}: {source}")]
    StoreWrite {
        table: Table,
        key: String,
        #[source]
        source: BoxError,
    },

    /// Input violated a computation precondition (e.g. zero tokens).
    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl IndexError {
    pub(crate) fn read(purpose: &'static str, source: anyhow::Error) -> Self {
        IndexError::StoreRead {
            purpose,
            source: source.into(),
        }
    }

    pub(crate) fn write(table: Table, key: impl Into<String>, source: anyhow::Error) -> Self {
        IndexError::StoreWrite {
            table,
            key: key.into(),
            source: source.into(),
        }
    }
}
