// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ripple chat relay.

use thiserror::Error;

/// The primary error type used across all Ripple collaborators and core operations.
#[derive(Debug, Error)]
pub enum RippleError {
    /// Configuration errors (unknown protocol or logger names, missing fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A uniqueness constraint rejected a write. Expected under duplicate delivery.
    #[error("conflict: {what}")]
    Conflict { what: String },

    /// Protocol adapter errors (disconnects, malformed frames, send failures).
    #[error("{protocol} protocol error: {message}")]
    Protocol {
        protocol: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A command or general handler failed.
    #[error("handler `{name}` failed: {message}")]
    Handler { name: String, message: String },

    /// The collaborator does not support the requested operation.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RippleError {
    /// Shorthand for a protocol error without an underlying source.
    pub fn protocol(protocol: impl Into<String>, message: impl Into<String>) -> Self {
        RippleError::Protocol {
            protocol: protocol.into(),
            message: message.into(),
            source: None,
        }
    }

    /// True for errors that signal a benign duplicate write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RippleError::Conflict { .. })
    }
}
