//! Fixed-size statement batching.

use crate::error::IndexError;
use crate::store::{Batch, BatchMode, Statement, Store};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Accumulates statements and submits them to the store in groups of
/// `limit` units. A unit is one statement, or several pushed together with
/// [`push_unit`](BatchWriter::push_unit); a unit is never split across
/// batches. Each submitted group is one [`Batch`].
pub struct BatchWriter<'a, S: Store + ?Sized> {
    store: &'a S,
    mode: BatchMode,
    limit: usize,
    pending: Vec<Statement>,
    units: usize,
    submitted: usize,
}

impl<'a, S: Store + ?Sized> BatchWriter<'a, S> {
    pub fn new(store: &'a S, mode: BatchMode, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            store,
            mode,
            limit,
            pending: Vec::with_capacity(limit),
            units: 0,
            submitted: 0,
        }
    }

    /// Queue a statement, submitting the group once it is full.
    pub async fn push(&mut self, statement: Statement) -> Result<(), IndexError> {
        self.push_unit(vec![statement]).await
    }

    /// Queue statements that must land in the same batch.
    pub async fn push_unit(&mut self, statements: Vec<Statement>) -> Result<(), IndexError> {
        if statements.is_empty() {
            return Ok(());
        }
        self.pending.extend(statements);
        self.units += 1;
        if self.units >= self.limit {
            self.flush().await?;
        }
        Ok(())
    }

    /// Submit whatever is queued and return how many batches were sent.
    pub async fn finish(mut self) -> Result<usize, IndexError> {
        self.flush().await?;
        Ok(self.submitted)
    }

    async fn flush(&mut self) -> Result<(), IndexError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let table = self.pending[0].table();
        let batch = Batch {
            mode: self.mode,
            statements: std::mem::take(&mut self.pending),
        };
        self.units = 0;
        self.store
            .execute_batch(&batch)
            .await
            .map_err(|err| IndexError::write(table, batch.key_range(), err))?;
        tracing::debug!(%table, statements = batch.len(), "batch submitted");
        self.submitted += 1;
        Ok(())
    }
}
