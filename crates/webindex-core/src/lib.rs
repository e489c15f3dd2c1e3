//! # webindex core
//!
//! Storage- and network-agnostic logic for webindex: text normalization,
//! HTML term extraction, conditional-fetch freshness checks, TF-IDF
//! statistics, and the index writer that keeps the four derived tables
//! consistent across repeated indexing runs.
//!
//! This crate contains no tokio, sqlx, or HTTP client. The calling
//! application supplies a [`store::Store`] and a [`transport::Transport`]
//! and drives [`pipeline::index_documents`] with a list of URLs.
//!
//! ```text
//! freshness ──▶ fetch ──▶ extract ──▶ writer ──▶ Store
//!                                       │
//!                                     stats
//! ```

pub mod batch;
pub mod error;
pub mod extract;
pub mod freshness;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod search;
pub mod stats;
pub mod store;
pub mod transport;
pub mod writer;
