//! SQLite-backed [`Store`] implementation.
//!
//! Each [`Statement`] maps to exactly one SQL statement. Logged batches run
//! inside a transaction; unlogged batches and single statements run on a
//! plain pooled connection, so each statement commits on its own.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

use webindex_core::models::{DocumentRecord, DocumentSummary, StoredDocument};
use webindex_core::store::{Batch, BatchMode, Statement, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{} out of range: {}", what, value))
}

fn to_u64(value: i64, what: &str) -> Result<u64> {
    u64::try_from(value).with_context(|| format!("{} is negative: {}", what, value))
}

async fn insert_document(conn: &mut SqliteConnection, doc: &DocumentRecord) -> Result<()> {
    let links = serde_json::to_string(&doc.links)?;
    sqlx::query(
        r#"
        INSERT INTO documents (doc_id, title, url, last_updated, content, links, total_tokens)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&doc.doc_id)
    .bind(&doc.title)
    .bind(&doc.url)
    .bind(&doc.last_updated)
    .bind(doc.content.as_slice())
    .bind(&links)
    .bind(to_i64(doc.total_tokens, "total_tokens")?)
    .execute(conn)
    .await?;
    Ok(())
}

async fn update_document(conn: &mut SqliteConnection, doc: &DocumentRecord) -> Result<()> {
    let links = serde_json::to_string(&doc.links)?;
    let result = sqlx::query(
        r#"
        UPDATE documents SET
            title = ?,
            url = ?,
            last_updated = ?,
            content = ?,
            links = ?,
            total_tokens = ?
        WHERE doc_id = ?
        "#,
    )
    .bind(&doc.title)
    .bind(&doc.url)
    .bind(&doc.last_updated)
    .bind(doc.content.as_slice())
    .bind(&links)
    .bind(to_i64(doc.total_tokens, "total_tokens")?)
    .bind(&doc.doc_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        bail!("no document with doc_id {}", doc.doc_id);
    }
    Ok(())
}

/// Run one statement on `conn`.
async fn apply(conn: &mut SqliteConnection, statement: &Statement) -> Result<()> {
    match statement {
        Statement::InsertDocument(doc) => insert_document(conn, doc).await?,
        Statement::UpdateDocument(doc) => update_document(conn, doc).await?,
        Statement::SetDocumentMarker {
            doc_id,
            last_updated,
        } => {
            let result = sqlx::query("UPDATE documents SET last_updated = ? WHERE doc_id = ?")
                .bind(last_updated)
                .bind(doc_id)
                .execute(conn)
                .await?;
            if result.rows_affected() == 0 {
                bail!("no document with doc_id {}", doc_id);
            }
        }
        Statement::InsertTermFrequency {
            term,
            doc_id,
            frequency,
        } => {
            sqlx::query(
                r#"
                INSERT INTO term_frequency (term, doc_id, frequency)
                VALUES (?, ?, ?)
                ON CONFLICT(term, doc_id) DO UPDATE SET frequency = excluded.frequency
                "#,
            )
            .bind(term)
            .bind(doc_id)
            .bind(to_i64(*frequency, "frequency")?)
            .execute(conn)
            .await?;
        }
        Statement::DeleteTermFrequency { term, doc_id } => {
            sqlx::query("DELETE FROM term_frequency WHERE term = ? AND doc_id = ?")
                .bind(term)
                .bind(doc_id)
                .execute(conn)
                .await?;
        }
        Statement::IncrementDocumentFrequency { term } => {
            sqlx::query(
                r#"
                INSERT INTO document_frequency (term, doc_count)
                VALUES (?, 1)
                ON CONFLICT(term) DO UPDATE SET doc_count = doc_count + 1
                "#,
            )
            .bind(term)
            .execute(conn)
            .await?;
        }
        Statement::DecrementDocumentFrequency { term } => {
            sqlx::query(
                "UPDATE document_frequency SET doc_count = MAX(doc_count - 1, 0) WHERE term = ?",
            )
            .bind(term)
            .execute(conn)
            .await?;
        }
        Statement::DeleteTfIdfScores { doc_id } => {
            sqlx::query("DELETE FROM tfidf_scores WHERE doc_id = ?")
                .bind(doc_id)
                .execute(conn)
                .await?;
        }
        Statement::InsertTfIdfScore {
            term,
            doc_id,
            score,
        } => {
            sqlx::query(
                r#"
                INSERT INTO tfidf_scores (term, doc_id, tfidf_score)
                VALUES (?, ?, ?)
                ON CONFLICT(term, doc_id) DO UPDATE SET tfidf_score = excluded.tfidf_score
                "#,
            )
            .bind(term)
            .bind(doc_id)
            .bind(*score)
            .execute(conn)
            .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_document(&self, url: &str) -> Result<Option<StoredDocument>> {
        let row = sqlx::query("SELECT doc_id, last_updated FROM documents WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| StoredDocument {
            doc_id: r.get("doc_id"),
            last_updated: r.get("last_updated"),
        }))
    }

    async fn document_terms(&self, doc_id: &str) -> Result<Vec<String>> {
        let terms: Vec<String> =
            sqlx::query_scalar("SELECT term FROM term_frequency WHERE doc_id = ? ORDER BY term")
                .bind(doc_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(terms)
    }

    async fn document_frequency(&self, term: &str) -> Result<Option<u64>> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT doc_count FROM document_frequency WHERE term = ?")
                .bind(term)
                .fetch_optional(&self.pool)
                .await?;
        count.map(|c| to_u64(c, "doc_count")).transpose()
    }

    async fn document_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        to_u64(count, "document count")
    }

    async fn execute(&self, statement: &Statement) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        apply(&mut *conn, statement).await
    }

    async fn execute_batch(&self, batch: &Batch) -> Result<()> {
        match batch.mode {
            BatchMode::Logged => {
                let mut tx = self.pool.begin().await?;
                for statement in &batch.statements {
                    apply(&mut *tx, statement).await?;
                }
                tx.commit().await?;
            }
            BatchMode::Unlogged => {
                let mut conn = self.pool.acquire().await?;
                for statement in &batch.statements {
                    apply(&mut *conn, statement).await?;
                }
            }
        }
        Ok(())
    }

    async fn term_scores(&self, term: &str) -> Result<Vec<(String, f64)>> {
        let rows = sqlx::query("SELECT doc_id, tfidf_score FROM tfidf_scores WHERE term = ?")
            .bind(term)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get::<String, _>("doc_id"), r.get::<f64, _>("tfidf_score")))
            .collect())
    }

    async fn document_summary(&self, doc_id: &str) -> Result<Option<DocumentSummary>> {
        let row =
            sqlx::query("SELECT doc_id, url, title, total_tokens FROM documents WHERE doc_id = ?")
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| {
            Ok(DocumentSummary {
                doc_id: r.get("doc_id"),
                url: r.get("url"),
                title: r.get("title"),
                total_tokens: to_u64(r.get("total_tokens"), "total_tokens")?,
            })
        })
        .transpose()
    }
}
