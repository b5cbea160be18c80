// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline import of historical message logs.
//!
//! Each input file holds one JSON-encoded [`Message`] per line, usually one
//! file per source protocol. The files are interleaved by time, run through
//! [`DedupMerge`], and written through the store's normal logging path, so
//! the identity reconciliation and uniqueness rules match live traffic.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use ripple_core::{Message, RippleError};

use crate::merge::{DedupMerge, MergePolicy, interleave};
use crate::store::SqliteStore;

/// Counters reported by [`import_jsonl`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Lines parsed into messages.
    pub read: usize,
    /// Lines that were not valid messages.
    pub skipped: usize,
    /// Messages folded into another record by the merge.
    pub merged: usize,
    /// Rows written to the store.
    pub written: usize,
    /// Messages the store already had.
    pub duplicates: usize,
}

/// Parse one log file. Blank lines are ignored and malformed lines counted.
pub async fn read_jsonl(path: &Path) -> Result<(Vec<Message>, usize), RippleError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| RippleError::Storage {
            source: Box::new(e),
        })?;
    let mut lines = BufReader::new(file).lines();
    let mut messages = Vec::new();
    let mut skipped = 0;
    let mut lineno = 0usize;

    while let Some(line) = lines.next_line().await.map_err(|e| RippleError::Storage {
        source: Box::new(e),
    })? {
        lineno += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Message>(line) {
            Ok(msg) => messages.push(msg),
            Err(e) => {
                warn!(path = %path.display(), line = lineno, error = %e, "skipping malformed log line");
                skipped += 1;
            }
        }
    }
    debug!(path = %path.display(), messages = messages.len(), "log file read");
    Ok((messages, skipped))
}

/// Merge the given log files into `store`.
pub async fn import_jsonl(
    store: &SqliteStore,
    paths: &[PathBuf],
    policy: MergePolicy,
) -> Result<ImportStats, RippleError> {
    let mut stats = ImportStats::default();
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let (messages, skipped) = read_jsonl(path).await?;
        stats.read += messages.len();
        stats.skipped += skipped;
        sources.push(messages);
    }

    let mut merge = DedupMerge::new(interleave(sources).into_iter(), policy);
    for msg in merge.by_ref() {
        match store.log_message(&msg).await? {
            Some(_) => stats.written += 1,
            None => stats.duplicates += 1,
        }
    }
    stats.merged = merge.merged();

    info!(
        read = stats.read,
        merged = stats.merged,
        written = stats.written,
        duplicates = stats.duplicates,
        "import finished"
    );
    Ok(stats)
}
