// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock protocol adapter for deterministic testing.
//!
//! `MockProtocol` implements `ProtocolAdapter` and captures everything sent
//! through it. Delivery from the dispatcher is asynchronous, so the `wait_*`
//! helpers block until the expected number of items has arrived.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use ripple_core::{
    Collaborator, CollaboratorKind, HealthStatus, Message, ProtocolAdapter, Response,
    RippleError, StatusAction, User, unix_now,
};

/// One captured `send` call.
#[derive(Debug, Clone)]
pub struct SentResponse {
    pub response: Response,
    pub protocol: String,
}

/// A mock protocol adapter.
///
/// `send` echoes the response back as a message from the bot's identity, so
/// a mock registered as the main protocol feeds the response logging path.
pub struct MockProtocol {
    name: String,
    identity: User,
    sent: Mutex<Vec<SentResponse>>,
    forwarded: Mutex<Vec<Message>>,
    statuses: Mutex<Vec<(User, StatusAction)>>,
    notify: Notify,
    fail_sends: AtomicBool,
    closes: AtomicUsize,
}

impl MockProtocol {
    /// Create a mock registered as `name` with a bot handle of `ripplebot`.
    pub fn new(name: &str) -> Self {
        Self::with_handle(name, "ripplebot")
    }

    pub fn with_handle(name: &str, handle: &str) -> Self {
        Self {
            name: name.to_string(),
            identity: User::named(name, handle),
            sent: Mutex::new(Vec::new()),
            forwarded: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
            notify: Notify::new(),
            fail_sends: AtomicBool::new(false),
            closes: AtomicUsize::new(0),
        }
    }

    /// Make every following `send` and `forward` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentResponse> {
        self.sent.lock().await.clone()
    }

    pub async fn forwarded(&self) -> Vec<Message> {
        self.forwarded.lock().await.clone()
    }

    pub async fn statuses(&self) -> Vec<(User, StatusAction)> {
        self.statuses.lock().await.clone()
    }

    /// Number of times `close` was called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` responses were sent, or `timeout` elapses.
    pub async fn wait_sent(&self, n: usize, timeout: Duration) -> Vec<SentResponse> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.sent.lock().await.len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.sent().await
    }

    /// Wait until at least `n` messages were forwarded, or `timeout` elapses.
    pub async fn wait_forwarded(&self, n: usize, timeout: Duration) -> Vec<Message> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.forwarded.lock().await.len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.forwarded().await
    }

    fn check_failure(&self) -> Result<(), RippleError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RippleError::protocol(&self.name, "send failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl Collaborator for MockProtocol {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Protocol
    }

    async fn health_check(&self) -> Result<HealthStatus, RippleError> {
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), RippleError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProtocolAdapter for MockProtocol {
    fn identity(&self) -> User {
        self.identity.clone()
    }

    async fn start_polling(&self) -> Result<(), RippleError> {
        Ok(())
    }

    async fn send(
        &self,
        response: &Response,
        protocol: &str,
        _forwarded: Option<&Message>,
    ) -> Result<Option<Message>, RippleError> {
        self.check_failure()?;
        self.sent.lock().await.push(SentResponse {
            response: response.clone(),
            protocol: protocol.to_string(),
        });
        self.notify.notify_waiters();

        let Some(reply) = &response.reply else {
            return Ok(None);
        };
        let mut echo = Message::text(
            protocol,
            self.identity.clone(),
            reply.chat.clone(),
            response.text.clone(),
            unix_now(),
            reply.class,
        );
        echo.reply = Some(std::sync::Arc::new(reply.clone()));
        Ok(Some(echo))
    }

    async fn forward(&self, msg: &Message, _protocol: &str) -> Result<Option<Message>, RippleError> {
        self.check_failure()?;
        self.forwarded.lock().await.push(msg.clone());
        self.notify.notify_waiters();
        Ok(None)
    }

    async fn status(&self, dest: &User, action: StatusAction) -> Result<(), RippleError> {
        self.statuses.lock().await.push((dest.clone(), action));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::group_message;

    #[tokio::test]
    async fn send_echoes_reply_chat() {
        let mock = MockProtocol::new("irc");
        let msg = group_message("irc", "alice", "/help");
        let resp = Response::plain("Commands: /help", Some(msg.clone()));
        let echo = mock.send(&resp, "irc", None).await.unwrap().unwrap();
        assert_eq!(echo.chat, msg.chat);
        assert_eq!(echo.src.username.as_deref(), Some("ripplebot"));
        assert_eq!(mock.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn failing_mock_records_nothing() {
        let mock = MockProtocol::new("irc");
        mock.fail_sends(true);
        let msg = group_message("irc", "alice", "hi");
        assert!(mock.forward(&msg, "irc").await.is_err());
        assert!(mock.forwarded().await.is_empty());
    }

    #[tokio::test]
    async fn wait_sent_returns_after_timeout() {
        let mock = MockProtocol::new("irc");
        let sent = mock.wait_sent(1, Duration::from_millis(20)).await;
        assert!(sent.is_empty());
    }
}
