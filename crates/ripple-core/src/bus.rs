// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handle used by protocol adapters to hand inbound items to the bus.

use tokio::sync::{mpsc, oneshot};

use crate::error::RippleError;
use crate::types::{Inbound, Response, StatusAction, User};

/// Items carried on the bus channel.
#[derive(Debug)]
pub enum Envelope {
    /// Fire-and-forget: process and respond through the adapters.
    Post(Inbound),
    /// Process and hand the result back to the caller without responding.
    Sync(Inbound, oneshot::Sender<Option<Response>>),
    /// Show a chat status on every adapter serving `User`.
    Status(User, StatusAction),
}

/// Cloneable sender side of the bus.
#[derive(Debug, Clone)]
pub struct BusHandle {
    tx: mpsc::Sender<Envelope>,
}

impl BusHandle {
    pub fn new(tx: mpsc::Sender<Envelope>) -> Self {
        Self { tx }
    }

    /// Create a handle together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Queue an inbound item for processing.
    pub async fn post(&self, item: impl Into<Inbound>) -> Result<(), RippleError> {
        self.tx
            .send(Envelope::Post(item.into()))
            .await
            .map_err(|_| RippleError::Internal("bus is closed".into()))
    }

    /// Process an inbound item and wait for its response.
    pub async fn post_sync(&self, item: impl Into<Inbound>) -> Result<Option<Response>, RippleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope::Sync(item.into(), reply_tx))
            .await
            .map_err(|_| RippleError::Internal("bus is closed".into()))?;
        reply_rx
            .await
            .map_err(|_| RippleError::Internal("bus dropped the request".into()))
    }

    pub async fn status(&self, dest: User, action: StatusAction) -> Result<(), RippleError> {
        self.tx
            .send(Envelope::Status(dest, action))
            .await
            .map_err(|_| RippleError::Internal("bus is closed".into()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
