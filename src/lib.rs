//! # webindex
//!
//! Keyword search over web documents, scored with TF-IDF and stored in
//! SQLite.
//!
//! The indexing logic lives in `webindex_core`; this crate supplies the
//! concrete collaborators it needs and the `widx` command line.
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────┐
//! │   HTTP   │──▶│ webindex_core  │──▶│  SQLite   │
//! │ reqwest  │   │ extract+score  │   │  4 tables │
//! └──────────┘   └────────────────┘   └────┬─────┘
//!                                          ▼
//!                                     ┌──────────┐
//!                                     │   widx   │
//!                                     └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`http`] | reqwest `Transport` implementation |
//! | [`ingest`] | `widx index` |
//! | [`search`] | `widx search` |
//! | [`stats`] | `widx stats` |

pub mod config;
pub mod db;
pub mod http;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod sqlite_store;
pub mod stats;
