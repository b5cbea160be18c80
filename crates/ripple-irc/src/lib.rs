// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IRC protocol adapter for the Ripple chat relay.
//!
//! Relays a single channel: channel lines and private lines addressed to the
//! bot are posted to the bus, responses and forwards are laid out to fit the
//! PRIVMSG byte limit and sent through a rate-limited outbox.

pub mod adapter;
pub mod format;
pub mod inbound;
pub mod outbox;
pub mod wrap;

pub use adapter::{IrcAdapter, LinkState};
