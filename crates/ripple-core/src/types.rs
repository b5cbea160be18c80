// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical data model shared by every protocol adapter and logger.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::media::{Media, ResponseInfo};

/// Coarse participant type. Stored as an integer in the `users` table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Individual,
    Group,
    Channel,
}

impl UserType {
    /// Integer code persisted in storage.
    pub fn code(self) -> i64 {
        match self {
            UserType::Individual => 1,
            UserType::Group => 2,
            UserType::Channel => 3,
        }
    }

    /// Inverse of [`UserType::code`].
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(UserType::Individual),
            2 => Some(UserType::Group),
            3 => Some(UserType::Channel),
            _ => None,
        }
    }
}

/// A participant or conversation on some protocol.
///
/// `id` is `None` until the identity store has resolved the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub protocol: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Identity key of a user within a protocol and type.
///
/// A known protocol id alone determines identity; otherwise the username
/// (empty when absent) is the discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub protocol: String,
    pub user_type: UserType,
    pub pid: i64,
    pub username: String,
}

impl User {
    /// Build an unresolved individual user known only by handle.
    ///
    /// The alias is left unset so resolving keeps one chosen with `nick`.
    pub fn named(protocol: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: None,
            protocol: protocol.into(),
            user_type: UserType::Individual,
            pid: None,
            alias: None,
            username: Some(username.into()),
            first_name: None,
            last_name: None,
        }
    }

    /// The protocol id, treating `0` as unknown.
    pub fn known_pid(&self) -> Option<i64> {
        self.pid.filter(|p| *p != 0)
    }

    pub fn key(&self) -> IdentityKey {
        match self.known_pid() {
            Some(pid) => IdentityKey {
                protocol: self.protocol.clone(),
                user_type: self.user_type,
                pid,
                username: String::new(),
            },
            None => IdentityKey {
                protocol: self.protocol.clone(),
                user_type: self.user_type,
                pid: 0,
                username: self.username.clone().unwrap_or_default(),
            },
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }

    /// A copy of this user carrying the given durable id.
    pub fn with_id(&self, id: i64) -> Self {
        Self {
            id: Some(id),
            ..self.clone()
        }
    }
}

/// Conversation class of a message, used for eligibility filtering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationClass {
    #[default]
    Group,
    OtherGroup,
    Private,
}

/// A chat message in canonical form.
///
/// `reply` holds a snapshot of the replied-to message, one level deep; the
/// identity store remains the owner of every persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<i64>,
    pub protocol: String,
    #[serde(default)]
    pub pid: Option<i64>,
    pub src: User,
    pub chat: User,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    pub time: i64,
    #[serde(default)]
    pub fwd_src: Option<User>,
    #[serde(default)]
    pub fwd_time: Option<i64>,
    #[serde(default)]
    pub reply: Option<Arc<Message>>,
    #[serde(default)]
    pub class: ConversationClass,
    #[serde(default)]
    pub alt_text: Option<String>,
}

impl Message {
    /// Minimal text message from `src` in `chat`.
    pub fn text(
        protocol: impl Into<String>,
        src: User,
        chat: User,
        text: impl Into<String>,
        time: i64,
        class: ConversationClass,
    ) -> Self {
        Self {
            id: None,
            protocol: protocol.into(),
            pid: None,
            src,
            chat,
            text: Some(text.into()),
            media: None,
            time,
            fwd_src: None,
            fwd_time: None,
            reply: None,
            class,
            alt_text: None,
        }
    }

    /// Text used for display: the alternate text when present, else the primary text.
    pub fn display_text(&self) -> &str {
        self.alt_text
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }

    pub fn is_group(&self) -> bool {
        self.class == ConversationClass::Group
    }

    /// Seconds elapsed between the message timestamp and `now`.
    pub fn age(&self, now: i64) -> i64 {
        now - self.time
    }
}

/// A parsed command invocation. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub cmd: String,
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub kwargs: RequestKwargs,
}

/// Keyword arguments attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestKwargs {
    /// The message that triggered the request, when there is one.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Request {
    pub fn new(cmd: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args: args.into(),
            kwargs: RequestKwargs::default(),
        }
    }
}

/// A reply to be materialized by each adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    #[serde(default)]
    pub info: ResponseInfo,
    #[serde(default)]
    pub reply: Option<Message>,
}

impl Response {
    /// Wrap a bare string as a plain response to `reply`.
    pub fn plain(text: impl Into<String>, reply: Option<Message>) -> Self {
        Self {
            text: text.into(),
            info: ResponseInfo::default(),
            reply,
        }
    }
}

/// Item accepted by the bus: a backend message or a direct request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Inbound {
    Message(Message),
    Request(Request),
}

impl From<Message> for Inbound {
    fn from(msg: Message) -> Self {
        Inbound::Message(msg)
    }
}

impl From<Request> for Inbound {
    fn from(req: Request) -> Self {
        Inbound::Request(req)
    }
}

/// Chat status shown to other participants while a reply is prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Typing,
    UploadPhoto,
    UploadDocument,
}

/// Health status reported by collaborator health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Kind of collaborator registered with the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CollaboratorKind {
    Protocol,
    Logger,
}

/// A dynamically typed SQL value for ad-hoc reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}
