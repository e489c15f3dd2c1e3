//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/widx.sqlite"
//!
//! [http]
//! user_agent = "webindex/0.1"
//! timeout_secs = 12
//! connect_timeout_secs = 5
//! max_redirects = 5
//! max_content_bytes = 2097152
//!
//! [index]
//! batch_size = 10
//! batch_mode = "logged"
//! ```
//!
//! Only `[db]` is required.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use webindex_core::pipeline::IndexOptions;
use webindex_core::store::BatchMode;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_content_bytes: default_max_content_bytes(),
        }
    }
}

fn default_user_agent() -> String {
    format!("webindex/{}", env!("CARGO_PKG_VERSION"))
}
fn default_timeout_secs() -> u64 {
    12
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_max_redirects() -> usize {
    5
}
fn default_max_content_bytes() -> u64 {
    2 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_mode")]
    pub batch_mode: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_mode: default_batch_mode(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_batch_mode() -> String {
    "logged".to_string()
}

impl IndexConfig {
    /// Writer options; `batch_mode` has already been validated by
    /// [`load_config`], anything unrecognized falls back to logged.
    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            batch_size: self.batch_size,
            batch_mode: BatchMode::parse(&self.batch_mode).unwrap_or_default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate http
    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be > 0");
    }
    if config.http.max_content_bytes == 0 {
        anyhow::bail!("http.max_content_bytes must be > 0");
    }

    // Validate index
    if config.index.batch_size == 0 {
        anyhow::bail!("index.batch_size must be > 0");
    }
    if BatchMode::parse(&config.index.batch_mode).is_none() {
        anyhow::bail!(
            "Unknown index.batch_mode: '{}'. Must be logged or unlogged.",
            config.index.batch_mode
        );
    }

    Ok(config)
}
