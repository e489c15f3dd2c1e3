//! `widx search`: ranked keyword lookup over stored TF-IDF scores.

use anyhow::{bail, Result};

use webindex_core::search::search;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub const DEFAULT_LIMIT: usize = 10;

pub async fn run_search(config: &Config, query: &str, limit: usize, json: bool) -> Result<()> {
    if limit == 0 {
        bail!("--limit must be >= 1");
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let hits = search(&store, query, limit).await?;
    store.pool().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let title = if hit.title.is_empty() {
            "(untitled)"
        } else {
            hit.title.as_str()
        };
        println!("{}. [{:.4}] {}", i + 1, hit.score, title);
        println!("    url: {}", hit.url);
        println!("    id: {}", hit.doc_id);
        println!();
    }
    Ok(())
}
