// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media payloads attached to messages and materialization hints attached to
//! responses.
//!
//! Both are closed unions over the kinds the relay understands, each with an
//! opaque fallback that carries raw key/value pairs so payloads written by
//! newer adapters survive a round trip through older code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service or media information carried by a [`crate::Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Media {
    Known(KnownMedia),
    Opaque(Map<String, Value>),
}

/// Media kinds with a cross-protocol meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KnownMedia {
    /// A `/me`-style action; the text is the action body.
    Action,
    /// A file-like attachment such as a photo, sticker or document.
    Attachment {
        media_type: String,
        #[serde(default)]
        file_id: Option<String>,
        #[serde(default)]
        caption: Option<String>,
    },
    MemberJoined {
        #[serde(default)]
        user: Option<String>,
    },
    MemberLeft {
        #[serde(default)]
        user: Option<String>,
    },
    ChatTitle {
        title: String,
    },
}

/// Attachment keys used by the bot-API log format.
const BOT_API_ATTACHMENTS: &[&str] = &[
    "audio", "document", "photo", "sticker", "video", "voice", "contact", "location", "venue",
];

/// Comparison shape of a media payload. File ids and private keys are
/// dropped because the same attachment gets different ids per protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaShape {
    Action,
    Attachment(String),
    MemberJoined,
    MemberLeft,
    ChatTitle(String),
    Other(String),
}

impl Media {
    pub fn action() -> Self {
        Media::Known(KnownMedia::Action)
    }

    pub fn is_action(&self) -> bool {
        self.shape() == MediaShape::Action
    }

    /// Normalize into a shape comparable across protocols.
    pub fn shape(&self) -> MediaShape {
        match self {
            Media::Known(KnownMedia::Action) => MediaShape::Action,
            Media::Known(KnownMedia::Attachment { media_type, .. }) => {
                MediaShape::Attachment(media_type.clone())
            }
            Media::Known(KnownMedia::MemberJoined { .. }) => MediaShape::MemberJoined,
            Media::Known(KnownMedia::MemberLeft { .. }) => MediaShape::MemberLeft,
            Media::Known(KnownMedia::ChatTitle { title }) => MediaShape::ChatTitle(title.clone()),
            Media::Opaque(map) => opaque_shape(map),
        }
    }

    /// True if both payloads describe the same event once protocol-specific
    /// encodings are normalized away.
    pub fn equivalent(a: Option<&Media>, b: Option<&Media>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.shape() == b.shape(),
            (Some(m), None) | (None, Some(m)) => match m {
                // Payloads with only private keys carry nothing comparable.
                Media::Opaque(map) => map.keys().all(|k| k.starts_with('_')),
                Media::Known(_) => false,
            },
        }
    }
}

fn opaque_shape(map: &Map<String, Value>) -> MediaShape {
    if map.get("action").and_then(Value::as_bool) == Some(true) {
        return MediaShape::Action;
    }
    for key in BOT_API_ATTACHMENTS {
        if map.contains_key(*key) {
            return MediaShape::Attachment((*key).to_string());
        }
    }
    if map.contains_key("new_chat_participant") || map.contains_key("new_chat_member") {
        return MediaShape::MemberJoined;
    }
    if map.contains_key("left_chat_participant") || map.contains_key("left_chat_member") {
        return MediaShape::MemberLeft;
    }
    if let Some(title) = map.get("new_chat_title").and_then(Value::as_str) {
        return MediaShape::ChatTitle(title.to_string());
    }
    let mut keys: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|k| !k.starts_with('_'))
        .collect();
    keys.sort_unstable();
    MediaShape::Other(keys.join(","))
}

/// How an adapter should materialize a response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Plain,
    /// Text uses `*bold*` and `_italic_` markup.
    Markdown,
    /// Forward a bundle of stored messages.
    Forward { message_ids: Vec<i64> },
    /// Send typed media.
    Media { media: Media },
    Opaque { fields: Map<String, Value> },
}

/// Materialization hints for a [`crate::Response`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseInfo {
    #[serde(default)]
    pub format: ResponseFormat,
    /// Text for adapters that cannot render the primary format.
    #[serde(default)]
    pub alt_text: Option<String>,
    /// Per-protocol format overrides.
    #[serde(default)]
    pub overrides: BTreeMap<String, ResponseFormat>,
}

impl ResponseInfo {
    pub fn markdown() -> Self {
        Self {
            format: ResponseFormat::Markdown,
            ..Self::default()
        }
    }

    /// The format to use on `protocol`.
    pub fn format_for(&self, protocol: &str) -> &ResponseFormat {
        self.overrides.get(protocol).unwrap_or(&self.format)
    }
}
