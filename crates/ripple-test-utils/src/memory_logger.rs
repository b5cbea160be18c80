// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory message logger.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use ripple_core::{
    Collaborator, CollaboratorKind, HealthStatus, Message, MessageLogger, RippleError,
};

/// A logger that keeps every message it receives.
pub struct MemoryLogger {
    name: String,
    logged: Mutex<Vec<Message>>,
    notify: Notify,
}

impl MemoryLogger {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            logged: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    pub async fn logged(&self) -> Vec<Message> {
        self.logged.lock().await.clone()
    }

    /// Wait until at least `n` messages were logged, or `timeout` elapses.
    pub async fn wait_logged(&self, n: usize, timeout: Duration) -> Vec<Message> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.logged.lock().await.len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.logged().await
    }
}

#[async_trait]
impl Collaborator for MemoryLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Logger
    }

    async fn health_check(&self) -> Result<HealthStatus, RippleError> {
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), RippleError> {
        Ok(())
    }
}

#[async_trait]
impl MessageLogger for MemoryLogger {
    async fn log(&self, msg: &Message) -> Result<(), RippleError> {
        self.logged.lock().await.push(msg.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}
