// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup and schema creation.
//!
//! All statements run on tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use ripple_core::RippleError;
use tracing::debug;

/// Handle to the chat log database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, RippleError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| RippleError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn, wal_mode).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, RippleError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| RippleError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn, false).await
    }

    async fn prepare(conn: tokio_rusqlite::Connection, wal_mode: bool) -> Result<Self, RippleError> {
        let added = conn
            .call(move |conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
                if wal_mode {
                    // journal_mode returns a row, so it cannot go through execute_batch.
                    let _mode: String =
                        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                }
                crate::schema::apply(conn)
            })
            .await
            .map_err(map_tr_err)?;
        for column in &added {
            debug!(column = %column, "schema upgraded");
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), RippleError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RippleError {
    RippleError::Storage {
        source: Box::new(e),
    }
}

/// True if `e` is a uniqueness or other constraint violation.
pub fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chatlog.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()
            })
            .await
            .map_err(map_tr_err)
            .unwrap();
        assert_eq!(tables, vec!["messages", "state", "users"]);
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chatlog.db");
        let path = path.to_str().unwrap();
        Database::open(path, true).await.unwrap().checkpoint().await.unwrap();
        Database::open(path, true).await.unwrap();
    }
}
