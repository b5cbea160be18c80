// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands reading the group message log.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use tracing::debug;

use ripple_bus::{CommandContext, CommandHandler, HandlerResult, Reply};
use ripple_core::naming::DEFAULT_NAME_LIMIT;
use ripple_core::{
    Message, MessageStore, Request, Response, ResponseFormat, ResponseInfo, RippleError, SqlValue,
    smartname, unix_now,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NOTHING: &str = "Found nothing.";

/// Characters of context kept around a search hit.
const SNIPPET_CONTEXT: usize = 50;
/// Longest text shown per search result.
const SNIPPET_MAX: usize = 100;

static RESULT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)(,[0-9]+)?").expect("result count pattern is valid"));

fn format_time(time: i64, tz: FixedOffset) -> String {
    DateTime::from_timestamp(time, 0)
        .map(|t| t.with_timezone(&tz).format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// `[id|time] name: text`, the line format shared by the log commands.
fn log_line(msg: &Message, tz: FixedOffset) -> String {
    format!(
        "[{}|{}] {}: {}",
        msg.id.unwrap_or_default(),
        format_time(msg.time, tz),
        smartname(&msg.src, DEFAULT_NAME_LIMIT),
        msg.display_text()
    )
}

/// A response forwarding `messages`, with their log lines as the text.
fn forward_response(messages: &[Message], tz: FixedOffset) -> Option<Reply> {
    if messages.is_empty() {
        return None;
    }
    let text = messages
        .iter()
        .map(|m| log_line(m, tz))
        .collect::<Vec<_>>()
        .join("\n");
    Some(Reply::from(Response {
        text,
        info: ResponseInfo {
            format: ResponseFormat::Forward {
                message_ids: messages.iter().filter_map(|m| m.id).collect(),
            },
            ..ResponseInfo::default()
        },
        reply: None,
    }))
}

/// Cut `text` down to the part around the first case-insensitive match of
/// `find`, marking cut ends with an ellipsis.
pub fn ellipsis_around(text: &str, find: &str, context: usize) -> String {
    if find.is_empty() {
        return text.to_string();
    }
    let fold = |c: char| c.to_lowercase().next().unwrap_or(c);
    let chars: Vec<char> = text.chars().collect();
    let haystack: Vec<char> = chars.iter().map(|&c| fold(c)).collect();
    let needle: Vec<char> = find.chars().map(fold).collect();
    let Some(at) = haystack
        .windows(needle.len())
        .position(|w| w == needle.as_slice())
    else {
        return text.to_string();
    };
    let start = at.saturating_sub(context);
    let end = (at + context).min(chars.len());
    let snippet = chars[start..end].iter().collect::<String>().trim().to_string();
    if snippet.chars().count() < chars.len() {
        format!("… {snippet} …")
    } else {
        snippet
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Parsed arguments of `/search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub username: Option<String>,
    pub keyword: String,
    /// Every word except the result count, for when the username is unknown.
    pub words: String,
    pub limit: i64,
    pub offset: i64,
}

impl SearchQuery {
    pub fn parse(args: &str) -> Self {
        let mut query = SearchQuery {
            username: None,
            keyword: String::new(),
            words: String::new(),
            limit: 5,
            offset: 0,
        };
        if args.is_empty() {
            return query;
        }
        let mut words: Vec<&str> = args.split(' ').collect();
        if words.len() > 1
            && let Some(last) = words.last()
            && let Some(caps) = RESULT_COUNT.captures(last)
        {
            let limit: i64 = caps[1].parse().unwrap_or(5);
            query.limit = limit.clamp(1, 20);
            query.offset = caps
                .get(2)
                .and_then(|m| m.as_str()[1..].parse().ok())
                .unwrap_or(0);
            words.pop();
        }
        query.words = words.join(" ");
        match words.first().and_then(|w| w.strip_prefix('@')) {
            Some(name) => {
                query.username = Some(name.to_string());
                query.keyword = words[1..].join(" ");
            }
            None => query.keyword = query.words.clone(),
        }
        query
    }
}

/// Searches the group log for recent messages.
pub struct Search {
    tz: FixedOffset,
}

impl Search {
    pub const USAGE: &'static str = "/search [@username] [keyword] [number=5|number,offset] \
         Search the group log for recent messages. max(number)=20";

    pub fn new(tz: FixedOffset) -> Self {
        Self { tz }
    }

    async fn user_id(store: &dyn MessageStore, username: &str) -> Result<Option<i64>, RippleError> {
        let rows = store
            .select(
                "SELECT id FROM users WHERE username = ?1 ORDER BY id LIMIT 1",
                vec![SqlValue::from(username)],
            )
            .await?;
        Ok(rows.first().and_then(|r| r.first()).and_then(SqlValue::as_i64))
    }
}

#[async_trait]
impl CommandHandler for Search {
    async fn call(&self, ctx: &CommandContext<'_>, req: &Request) -> HandlerResult {
        let Some(store) = ctx.store() else {
            return Ok(None);
        };
        let mut query = SearchQuery::parse(req.args.trim());
        let uid = match &query.username {
            Some(name) => Self::user_id(store, name).await?,
            None => None,
        };
        if query.username.is_some() && uid.is_none() {
            query.keyword = query.words.clone();
        }
        debug!(keyword = %query.keyword, user_id = ?uid, limit = query.limit, "searching log");

        let pattern = SqlValue::from(format!("%{}%", query.keyword));
        let rows = match uid {
            Some(uid) => {
                store
                    .select(
                        "SELECT id, src_user_id, text, time FROM messages \
                         WHERE src_user_id = ?1 AND text LIKE ?2 ORDER BY time DESC LIMIT ?3 OFFSET ?4",
                        vec![uid.into(), pattern, query.limit.into(), query.offset.into()],
                    )
                    .await?
            }
            None => {
                store
                    .select(
                        "SELECT id, src_user_id, text, time FROM messages \
                         WHERE text LIKE ?1 ORDER BY time DESC LIMIT ?2 OFFSET ?3",
                        vec![pattern, query.limit.into(), query.offset.into()],
                    )
                    .await?
            }
        };

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let [id, src, text, time] = row.as_slice() else {
                continue;
            };
            let text = ellipsis_around(text.as_str().unwrap_or_default(), &query.keyword, SNIPPET_CONTEXT);
            let text = truncate_chars(&text, SNIPPET_MAX);
            let stamp = format_time(time.as_i64().unwrap_or_default(), self.tz);
            let id = id.as_i64().unwrap_or_default();
            if uid.is_some() {
                lines.push(format!("[{id}|{stamp}] {text}"));
            } else {
                let name = match src.as_i64() {
                    Some(src) => store
                        .get_user(src)
                        .await?
                        .map(|u| smartname(&u, DEFAULT_NAME_LIMIT))
                        .unwrap_or_default(),
                    None => String::new(),
                };
                lines.push(format!("[{id}|{stamp}] {name}: {text}"));
            }
        }
        if lines.is_empty() {
            return Ok(Some(Reply::from(NOTHING)));
        }
        Ok(Some(Reply::from(lines.join("\n"))))
    }
}

/// Shows a logged message with its neighbours.
pub struct Context {
    tz: FixedOffset,
}

impl Context {
    pub const USAGE: &'static str =
        "/context <message_id> [number=2] Show the specified message and its context. max=10";

    pub fn new(tz: FixedOffset) -> Self {
        Self { tz }
    }

    fn parse(args: &str) -> Option<(i64, i64)> {
        let words: Vec<&str> = args.split(' ').collect();
        match words.as_slice() {
            [id] => Some((id.parse().ok()?, 2)),
            [id, n, ..] => Some((id.parse::<i64>().ok()?.max(1), n.parse::<i64>().ok()?.clamp(1, 10))),
            [] => None,
        }
    }
}

#[async_trait]
impl CommandHandler for Context {
    async fn call(&self, ctx: &CommandContext<'_>, req: &Request) -> HandlerResult {
        let Some(store) = ctx.store() else {
            return Ok(None);
        };
        let Some((id, around)) = Self::parse(req.args.trim()) else {
            return Ok(Some(Reply::from(format!("Syntax error. Usage: {}", Self::USAGE))));
        };
        let mut messages = Vec::new();
        for mid in (id - around).max(1)..=id + around {
            if let Some(msg) = store.get_message(mid).await? {
                messages.push(msg);
            }
        }
        Ok(forward_response(&messages, self.tz).or_else(|| Some(Reply::from(NOTHING))))
    }
}

/// Sends a random message from today, or from any day if today is empty.
pub struct Quote {
    tz: FixedOffset,
}

impl Quote {
    pub const USAGE: &'static str = "/quote Send a today's random message.";

    pub fn new(tz: FixedOffset) -> Self {
        Self { tz }
    }

    /// Unix time of the most recent local midnight.
    fn day_start(now: i64, tz: FixedOffset) -> i64 {
        let offset = i64::from(tz.local_minus_utc());
        (now + offset).div_euclid(86_400) * 86_400 - offset
    }
}

#[async_trait]
impl CommandHandler for Quote {
    async fn call(&self, ctx: &CommandContext<'_>, _req: &Request) -> HandlerResult {
        let Some(store) = ctx.store() else {
            return Ok(None);
        };
        let start = Self::day_start(unix_now(), self.tz);
        let mut rows = store
            .select(
                "SELECT id FROM messages WHERE time >= ?1 AND time < ?2 ORDER BY RANDOM() LIMIT 1",
                vec![start.into(), (start + 86_400).into()],
            )
            .await?;
        if rows.is_empty() {
            rows = store
                .select("SELECT id FROM messages ORDER BY RANDOM() LIMIT 1", vec![])
                .await?;
        }
        let Some(id) = rows.first().and_then(|r| r.first()).and_then(SqlValue::as_i64) else {
            return Ok(None);
        };
        let message = store.get_message(id).await?;
        Ok(forward_response(message.as_slice(), self.tz))
    }
}
