// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bus loop: consumes envelopes posted by adapters and drives the
//! dispatcher.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ripple_core::{BusHandle, Envelope, Inbound, RippleError};

use crate::dispatcher::{Disposition, Dispatcher};
use crate::pool::TaskPool;

/// Default capacity of the inbound envelope channel.
pub const DEFAULT_CAPACITY: usize = 512;

pub struct Bus {
    dispatcher: Arc<Dispatcher>,
    pool: Arc<TaskPool>,
    rx: mpsc::Receiver<Envelope>,
}

impl Bus {
    /// Create the bus and the handle adapters post through.
    pub fn new(dispatcher: Arc<Dispatcher>, pool: Arc<TaskPool>, capacity: usize) -> (Self, BusHandle) {
        let (handle, rx) = BusHandle::channel(capacity);
        (Self::with_receiver(dispatcher, pool, rx), handle)
    }

    /// Create the bus over a channel opened earlier, for adapters that need
    /// their handle before the dispatcher exists.
    pub fn with_receiver(
        dispatcher: Arc<Dispatcher>,
        pool: Arc<TaskPool>,
        rx: mpsc::Receiver<Envelope>,
    ) -> Self {
        Self {
            dispatcher,
            pool,
            rx,
        }
    }

    /// Consume envelopes until `cancel` fires or every handle is dropped,
    /// then drain the pool.
    ///
    /// Fan-out runs inline so each collaborator sees messages in arrival
    /// order; dispatch and delivery run on the pool.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("bus running");
        loop {
            tokio::select! {
                envelope = self.rx.recv() => {
                    match envelope {
                        Some(envelope) => self.accept(envelope),
                        None => {
                            debug!("all bus handles dropped");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("bus stopping");
                    break;
                }
            }
        }
        self.rx.close();
        while let Ok(envelope) = self.rx.try_recv() {
            self.accept(envelope);
        }
        self.pool.close().await;
        info!("bus stopped");
    }

    fn accept(&self, envelope: Envelope) {
        match envelope {
            Envelope::Post(item) => {
                let Some(item) = self.admit(item) else {
                    return;
                };
                let dispatcher = Arc::clone(&self.dispatcher);
                self.pool.spawn_guarded("process", async move {
                    if let Some(resp) = dispatch(&dispatcher, item).await {
                        dispatcher.respond(resp);
                    }
                    Ok::<_, RippleError>(())
                });
            }
            Envelope::Sync(item, reply) => {
                let Some(item) = self.admit(item) else {
                    let _ = reply.send(None);
                    return;
                };
                let dispatcher = Arc::clone(&self.dispatcher);
                self.pool.spawn_guarded("process_sync", async move {
                    let resp = dispatch(&dispatcher, item).await;
                    let _ = reply.send(resp);
                    Ok::<_, RippleError>(())
                });
            }
            Envelope::Status(dest, action) => self.dispatcher.status(dest, action),
        }
    }

    /// Run the fan-out step for messages. Returns the item if it goes on to
    /// dispatch.
    fn admit(&self, item: Inbound) -> Option<Inbound> {
        match item {
            Inbound::Message(msg) => match self.dispatcher.fan_out(&msg) {
                Disposition::Dispatch => Some(Inbound::Message(msg)),
                Disposition::Stale | Disposition::Duplicate => None,
            },
            request => Some(request),
        }
    }
}

async fn dispatch(dispatcher: &Dispatcher, item: Inbound) -> Option<ripple_core::Response> {
    match item {
        Inbound::Message(msg) => dispatcher.handle_message(msg).await,
        Inbound::Request(req) => dispatcher.handle_request(req).await,
    }
}
