// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Protocol adapters and loggers both extend [`Collaborator`] and use
//! `#[async_trait]` so they can be held as trait objects in the dispatcher's
//! name-keyed registry.

pub mod collaborator;
pub mod logger;
pub mod pastebin;
pub mod protocol;

pub use collaborator::Collaborator;
pub use logger::{MessageLogger, MessageStore};
pub use pastebin::{NoPastebin, Pastebin};
pub use protocol::ProtocolAdapter;
