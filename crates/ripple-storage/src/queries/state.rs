// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small persisted key/value runtime state.

use rusqlite::{OptionalExtension, params};

use ripple_core::RippleError;

use crate::database::{Database, map_tr_err};

/// Read the JSON value stored under `key`.
pub async fn load(db: &Database, key: &str) -> Result<Option<serde_json::Value>, RippleError> {
    let key = key.to_string();
    let raw: Option<String> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT value_json FROM state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    raw.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| RippleError::Storage {
            source: Box::new(e),
        })
}

/// Store `value` under `key`, replacing any previous value.
pub async fn save(db: &Database, key: &str, value: &serde_json::Value) -> Result<(), RippleError> {
    let key = key.to_string();
    let raw = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO state (key, value_json) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value_json = excluded.value_json",
                params![key, raw],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
