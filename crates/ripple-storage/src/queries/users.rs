// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User rows.

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use ripple_core::{User, UserType};

use crate::database::is_constraint_violation;

pub const USER_COLUMNS: &str =
    "id, protocol, type, native_id, username, first_name, last_name, alias";

/// Decode a row selected with [`USER_COLUMNS`].
pub fn user_from_row(row: &Row<'_>) -> Result<User, rusqlite::Error> {
    let code: i64 = row.get(2)?;
    let user_type = UserType::from_code(code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, format!("user type {code}").into())
    })?;
    let pid: i64 = row.get(3)?;
    let username: String = row.get(4)?;
    Ok(User {
        id: Some(row.get(0)?),
        protocol: row.get(1)?,
        user_type,
        pid: (pid != 0).then_some(pid),
        username: (!username.is_empty()).then_some(username),
        first_name: row.get(5)?,
        last_name: row.get(6)?,
        alias: row.get(7)?,
    })
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()
}

/// Look a user up by identity key.
pub fn find_by_key(conn: &Connection, user: &User) -> Result<Option<User>, rusqlite::Error> {
    let key = user.key();
    if key.pid != 0 {
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE protocol = ?1 AND type = ?2 AND native_id = ?3"),
            params![key.protocol, key.user_type.code(), key.pid],
            user_from_row,
        )
        .optional()
    } else {
        conn.query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE protocol = ?1 AND type = ?2 AND native_id = 0 AND username = ?3"
            ),
            params![key.protocol, key.user_type.code(), key.username],
            user_from_row,
        )
        .optional()
    }
}

pub fn insert(conn: &Connection, user: &User) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO users (protocol, type, native_id, username, first_name, last_name, alias)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.protocol,
            user.user_type.code(),
            user.known_pid().unwrap_or(0),
            user.username.as_deref().unwrap_or_default(),
            user.first_name,
            user.last_name,
            user.alias,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the mutable fields of the row `user.id`.
pub fn update(conn: &Connection, id: i64, user: &User) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, alias = ?4 WHERE id = ?5",
        params![
            user.username.as_deref().unwrap_or_default(),
            user.first_name,
            user.last_name,
            user.alias,
            id,
        ],
    )?;
    Ok(())
}

/// Find the row for `user`'s identity key, inserting one if there is none.
///
/// Returns the stored row and whether it already existed. An insert that
/// loses a race against another writer is recovered by re-reading.
pub fn find_or_insert(conn: &Connection, user: &User) -> Result<(User, bool), rusqlite::Error> {
    if let Some(found) = find_by_key(conn, user)? {
        return Ok((found, true));
    }
    match insert(conn, user) {
        Ok(id) => Ok((user.with_id(id), false)),
        Err(e) if is_constraint_violation(&e) => {
            tracing::warn!(protocol = %user.protocol, username = ?user.username, "conflicting user insert, re-reading");
            find_by_key(conn, user)?
                .map(|found| (found, true))
                .ok_or(rusqlite::Error::QueryReturnedNoRows)
        }
        Err(e) => Err(e),
    }
}

pub fn all(conn: &Connection) -> Result<Vec<User>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users"))?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.collect()
}
