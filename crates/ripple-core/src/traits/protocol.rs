// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol adapter trait for chat backends (IRC, local socket, bot APIs).

use async_trait::async_trait;

use crate::error::RippleError;
use crate::traits::collaborator::Collaborator;
use crate::types::{Message, Response, StatusAction, User};

/// Adapter translating one chat backend to and from the canonical model.
///
/// Adapters post inbound traffic through a [`crate::BusHandle`] obtained at
/// construction; the methods here cover the outbound half.
#[async_trait]
pub trait ProtocolAdapter: Collaborator {
    /// The bot's own user on this backend.
    fn identity(&self) -> User;

    /// Handles that address the bot in `/cmd@handle` syntax.
    fn handles(&self) -> Vec<String> {
        self.identity().username.into_iter().collect()
    }

    /// Runs the receive loop until the adapter is closed.
    ///
    /// Transient backend failures are handled inside the loop; an error return
    /// means the adapter cannot continue.
    async fn start_polling(&self) -> Result<(), RippleError>;

    /// Delivers a response. `protocol` is the key this adapter is registered
    /// under. Returns the message as it was sent, when the adapter produces one.
    async fn send(
        &self,
        response: &Response,
        protocol: &str,
        forwarded: Option<&Message>,
    ) -> Result<Option<Message>, RippleError>;

    /// Relays a message that originated on another protocol.
    async fn forward(&self, msg: &Message, protocol: &str) -> Result<Option<Message>, RippleError>;

    /// Shows a chat status such as "typing". Backends without one ignore it.
    async fn status(&self, _dest: &User, _action: StatusAction) -> Result<(), RippleError> {
        Ok(())
    }
}
