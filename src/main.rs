//! # webindex CLI (`widx`)
//!
//! ```bash
//! widx --config ./config/widx.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `widx init` | Create the SQLite database and the index tables |
//! | `widx index <url>...` | Fetch, extract, score, and store documents |
//! | `widx search "<query>"` | Rank stored documents by TF-IDF |
//! | `widx stats` | Row counts per table |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use webindex::{config, ingest, migrate, search, stats};

/// webindex: TF-IDF indexing of web documents into SQLite.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/widx.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "widx", version, about = "Index web documents for keyword search with TF-IDF")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/widx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite file and the documents, term_frequency,
    /// document_frequency, and tfidf_scores tables. Safe to run repeatedly.
    Init,

    /// Index one or more URLs.
    ///
    /// Known URLs are re-fetched only when the server reports a change.
    Index {
        /// URLs to index, in order.
        urls: Vec<String>,

        /// Read additional URLs from a file, one per line.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Search indexed documents.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = search::DEFAULT_LIMIT)]
        limit: usize,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show row counts for each index table.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index { urls, file } => {
            ingest::run_index(&cfg, urls, file).await?;
        }
        Commands::Search { query, limit, json } => {
            search::run_search(&cfg, &query, limit, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
