// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Ripple chat relay.
//!
//! Provides the identity store that reconciles users and messages from every
//! protocol into one key space, a plain-text logger, and the offline import
//! job with its streaming dedup merge. All SQLite access goes through one
//! `tokio-rusqlite` connection, whose background thread is the single lock
//! around the database; uniqueness constraints are the backstop against
//! writers in other processes.

pub mod cache;
pub mod database;
pub mod import;
pub mod merge;
pub mod queries;
pub mod schema;
pub mod store;
pub mod text_log;

pub use database::Database;
pub use import::{ImportStats, import_jsonl};
pub use merge::{DedupMerge, MergePolicy};
pub use store::SqliteStore;
pub use text_log::TextLogger;
