// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ad-hoc read queries with dynamically typed rows.

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, params_from_iter};

use ripple_core::SqlValue;

fn to_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(v),
        SqlValue::Real(v) => Value::Real(v),
        SqlValue::Text(v) => Value::Text(v),
    }
}

fn from_sql(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(v) | ValueRef::Blob(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
    }
}

/// Run `sql` with positional `args` and collect every row.
pub fn rows(conn: &Connection, sql: &str, args: Vec<SqlValue>) -> Result<Vec<Vec<SqlValue>>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(rusqlite::Error::InvalidQuery);
    }
    let width = stmt.column_count();
    let mut rows = stmt.query(params_from_iter(args.into_iter().map(to_sql)))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(from_sql(row.get_ref(i)?));
        }
        out.push(values);
    }
    Ok(out)
}
