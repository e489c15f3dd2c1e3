//! Schema creation for the four index tables.
//!
//! Every statement is `IF NOT EXISTS`, so `widx init` can run any number
//! of times.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const SCHEMA: &[(&str, &str)] = &[
    (
        "documents",
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            doc_id TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL UNIQUE,
            last_updated TEXT NOT NULL DEFAULT '',
            content BLOB NOT NULL,
            links TEXT NOT NULL DEFAULT '[]',
            total_tokens INTEGER NOT NULL
        )
        "#,
    ),
    (
        "term_frequency",
        r#"
        CREATE TABLE IF NOT EXISTS term_frequency (
            term TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            frequency INTEGER NOT NULL,
            PRIMARY KEY (term, doc_id)
        )
        "#,
    ),
    (
        "document_frequency",
        r#"
        CREATE TABLE IF NOT EXISTS document_frequency (
            term TEXT PRIMARY KEY,
            doc_count INTEGER NOT NULL
        )
        "#,
    ),
    (
        "tfidf_scores",
        r#"
        CREATE TABLE IF NOT EXISTS tfidf_scores (
            term TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            tfidf_score REAL NOT NULL,
            PRIMARY KEY (term, doc_id)
        )
        "#,
    ),
    (
        "idx_term_frequency_doc",
        "CREATE INDEX IF NOT EXISTS idx_term_frequency_doc ON term_frequency(doc_id)",
    ),
    (
        "idx_tfidf_scores_doc",
        "CREATE INDEX IF NOT EXISTS idx_tfidf_scores_doc ON tfidf_scores(doc_id)",
    ),
];

/// Open the configured database and create the schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create any missing tables and indexes on an open pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for (name, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {}", name))?;
    }
    Ok(())
}
