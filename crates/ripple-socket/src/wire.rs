// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-delimited JSON frames.
//!
//! Client -> relay:
//! ```json
//! {"type": "message", "user": "alice", "text": "hi", "private": false}
//! {"type": "request", "id": "r1", "cmd": "search", "args": "hello"}
//! ```
//!
//! Relay -> client:
//! ```json
//! {"type": "message", "message": {...}}
//! {"type": "response", "id": "r1", "text": "...", "info": {...}}
//! {"type": "error", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};

use ripple_core::{Message, ResponseInfo};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Message(ClientMessage),
    Request {
        /// Echoed back on the response frame.
        #[serde(default)]
        id: Option<String>,
        cmd: String,
        #[serde(default)]
        args: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientMessage {
    pub user: String,
    /// Display name of the sender.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub private: bool,
    /// Client-side message id.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub action: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Message {
        message: Message,
    },
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        text: String,
        info: ResponseInfo,
        /// Recipient of a private reply.
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
    },
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    /// Serialized frame without the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
