// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table definitions.
//!
//! The schema is versioned by the presence of columns rather than by a
//! migration history: tables are created if missing, then any column an
//! older database lacks is added in place.

use rusqlite::Connection;

const TABLES: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    protocol TEXT NOT NULL,
    type INTEGER NOT NULL,
    native_id INTEGER NOT NULL DEFAULT 0,
    username TEXT NOT NULL DEFAULT '',
    first_name TEXT,
    last_name TEXT,
    alias TEXT,
    UNIQUE (protocol, type, native_id, username)
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY,
    protocol TEXT NOT NULL,
    native_id INTEGER,
    src_user_id INTEGER REFERENCES users(id),
    dest_user_id INTEGER REFERENCES users(id),
    text TEXT,
    media_json TEXT,
    time INTEGER NOT NULL,
    fwd_src_user_id INTEGER REFERENCES users(id),
    fwd_time INTEGER,
    reply_id INTEGER,
    UNIQUE (protocol, native_id)
);

CREATE TABLE IF NOT EXISTS state (
    key TEXT PRIMARY KEY,
    value_json TEXT NOT NULL
);
";

/// Columns added after the first schema, with their declarations.
const LATE_COLUMNS: &[(&str, &str, &str)] = &[
    ("users", "alias", "TEXT"),
    ("messages", "fwd_src_user_id", "INTEGER REFERENCES users(id)"),
    ("messages", "fwd_time", "INTEGER"),
    ("messages", "reply_id", "INTEGER"),
];

/// Indexes created after all columns are in place.
const INDEXES: &str = "
CREATE UNIQUE INDEX IF NOT EXISTS users_native_id
    ON users (protocol, type, native_id) WHERE native_id != 0;
CREATE INDEX IF NOT EXISTS messages_time ON messages (time);
CREATE INDEX IF NOT EXISTS messages_src ON messages (src_user_id);
";

/// Create missing tables, columns and indexes. Returns the `table.column`
/// names that were added to an existing table.
pub fn apply(conn: &mut Connection) -> Result<Vec<String>, rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute_batch(TABLES)?;

    let mut added = Vec::new();
    for (table, column, decl) in LATE_COLUMNS {
        if !has_column(&tx, table, column)? {
            tx.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl};"))?;
            added.push(format!("{table}.{column}"));
        }
    }

    tx.execute_batch(INDEXES)?;
    tx.commit()?;
    Ok(added)
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrades_old_messages_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, protocol TEXT NOT NULL,
                type INTEGER NOT NULL, native_id INTEGER NOT NULL DEFAULT 0,
                username TEXT NOT NULL DEFAULT '', first_name TEXT, last_name TEXT,
                UNIQUE (protocol, type, native_id, username));
             CREATE TABLE messages (id INTEGER PRIMARY KEY, protocol TEXT NOT NULL,
                native_id INTEGER, src_user_id INTEGER, dest_user_id INTEGER,
                text TEXT, media_json TEXT, time INTEGER NOT NULL,
                UNIQUE (protocol, native_id));",
        )
        .unwrap();

        let added = apply(&mut conn).unwrap();
        assert_eq!(
            added,
            vec![
                "users.alias",
                "messages.fwd_src_user_id",
                "messages.fwd_time",
                "messages.reply_id"
            ]
        );
        assert!(has_column(&conn, "messages", "reply_id").unwrap());
        assert!(apply(&mut conn).unwrap().is_empty());
    }
}
