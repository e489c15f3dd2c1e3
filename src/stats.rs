//! `widx stats`: row counts for each index table.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Row counts across the four tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCounts {
    pub documents: i64,
    /// Distinct terms with a document-frequency row above zero.
    pub terms: i64,
    pub term_frequency_rows: i64,
    pub score_rows: i64,
}

pub async fn collect_counts(pool: &SqlitePool) -> Result<IndexCounts> {
    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;

    let terms: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM document_frequency WHERE doc_count > 0")
            .fetch_one(pool)
            .await?;

    let term_frequency_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM term_frequency")
        .fetch_one(pool)
        .await?;

    let score_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tfidf_scores")
        .fetch_one(pool)
        .await?;

    Ok(IndexCounts {
        documents,
        terms,
        term_frequency_rows,
        score_rows,
    })
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let counts = collect_counts(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("webindex database stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", counts.documents);
    println!("  Terms:       {}", counts.terms);
    println!("  TF rows:     {}", counts.term_frequency_rows);
    println!("  Score rows:  {}", counts.score_rows);
    println!();

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_byte_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
