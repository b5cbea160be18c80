// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ripple import` command implementation.

use std::path::PathBuf;

use tracing::info;

use ripple_config::RippleConfig;
use ripple_core::{Collaborator, MessageLogger, RippleError};
use ripple_storage::{MergePolicy, SqliteStore, import_jsonl};

pub async fn run_import(
    config: RippleConfig,
    files: &[PathBuf],
    slack: i64,
    priority: Vec<String>,
) -> Result<(), RippleError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("ripple={},warn", config.bot.log_level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut policy = MergePolicy {
        slack_secs: slack,
        ..MergePolicy::default()
    };
    if !priority.is_empty() {
        policy.priority = priority;
    }
    info!(files = files.len(), db = %config.storage.database_path, "importing logs");

    let store = SqliteStore::open(&config.storage, config.dispatch.message_cache_size).await?;
    let stats = import_jsonl(&store, files, policy).await;
    store.commit().await?;
    store.close().await?;
    let stats = stats?;

    println!(
        "read {} messages ({} malformed lines skipped), merged {}, wrote {}, {} already stored",
        stats.read, stats.skipped, stats.merged, stats.written, stats.duplicates
    );
    Ok(())
}
