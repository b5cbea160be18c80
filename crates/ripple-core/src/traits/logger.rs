// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message logger and durable store traits.

use async_trait::async_trait;

use crate::error::RippleError;
use crate::traits::collaborator::Collaborator;
use crate::types::{Message, SqlValue, User};

/// Sink for group messages.
#[async_trait]
pub trait MessageLogger: Collaborator {
    /// Records a message. Duplicate deliveries are absorbed, never reported.
    async fn log(&self, msg: &Message) -> Result<(), RippleError>;

    /// Flushes buffered writes.
    async fn commit(&self) -> Result<(), RippleError> {
        Ok(())
    }

    /// The queryable store behind this logger, if it has one.
    fn as_store(&self) -> Option<&dyn MessageStore> {
        None
    }
}

/// Durable identity and message store.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Returns `user` with its durable id populated, creating or updating
    /// the stored row as needed.
    async fn resolve(&self, user: &User) -> Result<User, RippleError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, RippleError>;

    /// Loads a message with its source, chat and one level of reply resolved.
    async fn get_message(&self, id: i64) -> Result<Option<Message>, RippleError>;

    /// Runs an ad-hoc read query.
    async fn select(&self, sql: &str, args: Vec<SqlValue>)
    -> Result<Vec<Vec<SqlValue>>, RippleError>;

    async fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>, RippleError>;

    async fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<(), RippleError>;
}
