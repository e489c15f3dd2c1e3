//! `widx index`: drive the core pipeline over a list of URLs.
//!
//! URLs come from the command line and/or a file with one URL per line.
//! Documents are indexed strictly in order; a failure is printed and the
//! run moves on to the next URL.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use webindex_core::models::DocumentState;
use webindex_core::pipeline::{index_documents, DocumentReport};

use crate::config::Config;
use crate::db;
use crate::http::HttpTransport;
use crate::sqlite_store::SqliteStore;

/// Per-run tallies printed after the last document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl IndexSummary {
    pub fn from_reports(reports: &[DocumentReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match &report.result {
                Ok(outcome) => match outcome.state {
                    DocumentState::New => summary.new += 1,
                    DocumentState::ChangedExisting => summary.updated += 1,
                    DocumentState::UnchangedExisting => summary.unchanged += 1,
                },
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.new + self.updated + self.unchanged + self.failed
    }
}

/// Read URLs from `path`, one per line. Blank lines and lines starting
/// with `#` are skipped.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub async fn run_index(config: &Config, urls: Vec<String>, file: Option<PathBuf>) -> Result<()> {
    let mut urls = urls;
    if let Some(path) = file {
        urls.extend(read_url_list(&path)?);
    }
    if urls.is_empty() {
        bail!("No URLs to index. Pass URLs as arguments or use --file.");
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let transport = HttpTransport::new(&config.http)?;
    let options = config.index.options();

    tracing::info!(urls = urls.len(), batch_size = options.batch_size, "index run starting");
    let reports = index_documents(&store, &transport, &urls, &options).await;

    println!("index");
    for report in &reports {
        match &report.result {
            Ok(outcome) => match outcome.state {
                DocumentState::New => println!(
                    "  indexed new  {} ({} terms, {} batches)",
                    report.url, outcome.terms, outcome.batches
                ),
                DocumentState::ChangedExisting => println!(
                    "  updated      {} ({} terms, {} batches)",
                    report.url, outcome.terms, outcome.batches
                ),
                DocumentState::UnchangedExisting => println!("  unchanged    {}", report.url),
            },
            Err(err) => println!("  failed       {}: {}", report.url, err),
        }
    }

    let summary = IndexSummary::from_reports(&reports);
    println!(
        "  {} documents: {} new, {} updated, {} unchanged, {} failed",
        summary.total(),
        summary.new,
        summary.updated,
        summary.unchanged,
        summary.failed
    );

    store.pool().close().await;

    if summary.failed > 0 {
        bail!("{} of {} documents failed", summary.failed, summary.total());
    }
    println!("ok");
    Ok(())
}
