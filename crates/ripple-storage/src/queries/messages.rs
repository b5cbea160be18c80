// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message rows.

use rusqlite::{Connection, OptionalExtension, params};

use ripple_core::{Media, Message};

use crate::database::is_constraint_violation;

/// A stored message with its user references still as ids.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: i64,
    pub protocol: String,
    pub native_id: Option<i64>,
    pub src_user_id: Option<i64>,
    pub dest_user_id: Option<i64>,
    pub text: Option<String>,
    pub media: Option<Media>,
    pub time: i64,
    pub fwd_src_user_id: Option<i64>,
    pub fwd_time: Option<i64>,
    pub reply_id: Option<i64>,
}

/// Resolved user ids for a message about to be inserted.
#[derive(Debug, Clone, Copy)]
pub struct MessageRefs {
    pub src: i64,
    pub dest: i64,
    pub fwd_src: Option<i64>,
    pub reply: Option<i64>,
}

/// Insert a message. Returns `None` when `(protocol, native_id)` is already
/// stored.
pub fn insert(conn: &Connection, msg: &Message, refs: MessageRefs) -> Result<Option<i64>, rusqlite::Error> {
    let media = msg
        .media
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let result = conn.execute(
        "INSERT INTO messages (protocol, native_id, src_user_id, dest_user_id, text, media_json,
                               time, fwd_src_user_id, fwd_time, reply_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            msg.protocol,
            msg.pid,
            refs.src,
            refs.dest,
            msg.text,
            media,
            msg.time,
            refs.fwd_src,
            msg.fwd_time,
            refs.reply,
        ],
    );
    match result {
        Ok(_) => Ok(Some(conn.last_insert_rowid())),
        Err(e) if is_constraint_violation(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<MessageRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, protocol, native_id, src_user_id, dest_user_id, text, media_json,
                time, fwd_src_user_id, fwd_time, reply_id
         FROM messages WHERE id = ?1",
        params![id],
        |row| {
            let media: Option<String> = row.get(6)?;
            Ok(MessageRow {
                id: row.get(0)?,
                protocol: row.get(1)?,
                native_id: row.get(2)?,
                src_user_id: row.get(3)?,
                dest_user_id: row.get(4)?,
                text: row.get(5)?,
                // Unreadable payloads are dropped rather than failing the row.
                media: media.and_then(|m| serde_json::from_str(&m).ok()),
                time: row.get(7)?,
                fwd_src_user_id: row.get(8)?,
                fwd_time: row.get(9)?,
                reply_id: row.get(10)?,
            })
        },
    )
    .optional()
}

/// Durable id of the message with the given protocol-native id.
pub fn id_by_native(conn: &Connection, protocol: &str, native_id: i64) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row(
        "SELECT id FROM messages WHERE protocol = ?1 AND native_id = ?2",
        params![protocol, native_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn count(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT count(*) FROM messages", [], |row| row.get(0))
}
