// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ripple chat relay.
//!
//! This crate provides the canonical message model, the error type, and the
//! collaborator traits that protocol adapters and loggers implement.

pub mod bus;
pub mod error;
pub mod media;
pub mod naming;
pub mod traits;
pub mod types;

pub use bus::{BusHandle, Envelope};
pub use error::RippleError;
pub use media::{KnownMedia, Media, MediaShape, ResponseFormat, ResponseInfo};
pub use naming::smartname;
pub use types::{
    CollaboratorKind, ConversationClass, HealthStatus, IdentityKey, Inbound, Message, Request,
    RequestKwargs, Response, SqlValue, StatusAction, User, UserType,
};

pub use traits::{
    Collaborator, MessageLogger, MessageStore, NoPastebin, Pastebin, ProtocolAdapter,
};

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ripple_error_displays_context() {
        let e = RippleError::protocol("irc", "connection reset");
        assert_eq!(e.to_string(), "irc protocol error: connection reset");
        let e = RippleError::NotFound {
            kind: "message".into(),
            id: "7".into(),
        };
        assert_eq!(e.to_string(), "message not found: 7");
        assert!(RippleError::Conflict { what: "x".into() }.is_conflict());
    }

    #[test]
    fn conversation_class_parses() {
        assert_eq!(
            ConversationClass::from_str("other_group").unwrap(),
            ConversationClass::OtherGroup
        );
        assert_eq!(ConversationClass::Private.to_string(), "private");
    }

    #[tokio::test]
    async fn no_pastebin_is_not_supported() {
        let err = NoPastebin.paste_text("x").await.unwrap_err();
        assert!(matches!(err, RippleError::NotSupported(_)));
    }
}
