// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local socket protocol adapter for the Ripple chat relay.
//!
//! Listens on a Unix domain socket. Every connection speaks line-delimited
//! JSON (see [`wire`]): messages are posted to the bus, requests are
//! dispatched synchronously and answered on the same connection, and
//! forwards and responses are pushed to connected clients.

pub mod wire;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use ripple_config::model::{BotConfig, SocketConfig};
use ripple_core::{
    BusHandle, Collaborator, CollaboratorKind, ConversationClass, HealthStatus, Media, Message,
    ProtocolAdapter, Request, Response, RippleError, User, UserType, unix_now,
};

use crate::wire::{ClientFrame, ClientMessage, ServerFrame};

const NAME: &str = "socket";
const PEER_QUEUE: usize = 64;

/// A connected client.
struct Peer {
    tx: mpsc::Sender<String>,
    /// Users this client has spoken for, for routing private replies.
    users: DashSet<String>,
}

struct Shared {
    bus: BusHandle,
    group: User,
    peers: DashMap<String, Peer>,
    cancel: CancellationToken,
}

pub struct SocketAdapter {
    path: PathBuf,
    identity: User,
    shared: Arc<Shared>,
    listening: AtomicBool,
    closed: AtomicBool,
}

impl SocketAdapter {
    pub fn new(config: &SocketConfig, bot: &BotConfig, bus: BusHandle) -> Result<Self, RippleError> {
        if config.path.trim().is_empty() {
            return Err(RippleError::Config("socket.path is required for the socket adapter".into()));
        }
        let identity = User {
            first_name: Some(bot.fullname.clone()),
            alias: Some(bot.nickname.clone()),
            ..User::named(NAME, bot.nickname.clone())
        };
        let group = User {
            user_type: UserType::Group,
            first_name: Some(bot.group_name.clone()),
            ..User::named(NAME, "group")
        };
        Ok(Self {
            path: PathBuf::from(&config.path),
            identity,
            shared: Arc::new(Shared {
                bus,
                group,
                peers: DashMap::new(),
                cancel: CancellationToken::new(),
            }),
            listening: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn connected(&self) -> usize {
        self.shared.peers.len()
    }

    fn bind(&self) -> Result<UnixListener, RippleError> {
        if self.path.exists() {
            debug!(path = %self.path.display(), "removing stale socket");
            std::fs::remove_file(&self.path)
                .map_err(|e| RippleError::protocol(NAME, format!("cannot remove stale socket: {e}")))?;
        }
        UnixListener::bind(&self.path).map_err(|e| {
            RippleError::protocol(NAME, format!("cannot bind {}: {e}", self.path.display()))
        })
    }
}

impl Shared {
    fn to_message(&self, frame: ClientMessage) -> Message {
        let src = User {
            first_name: frame.name,
            ..User::named(NAME, frame.user)
        };
        let (chat, class) = if frame.private {
            (src.clone(), ConversationClass::Private)
        } else {
            (self.group.clone(), ConversationClass::Group)
        };
        let time = frame.time.unwrap_or_else(unix_now);
        let mut msg = Message::text(NAME, src, chat, frame.text, time, class);
        msg.pid = frame.id;
        if frame.action {
            msg.media = Some(Media::action());
        }
        msg
    }

    /// Push `frame` to every peer accepted by `filter`.
    async fn push(&self, frame: &ServerFrame, filter: impl Fn(&Peer) -> bool) -> Result<usize, RippleError> {
        let line = frame
            .to_line()
            .map_err(|e| RippleError::Internal(format!("cannot encode frame: {e}")))?;
        let targets: Vec<(String, mpsc::Sender<String>)> = self
            .peers
            .iter()
            .filter(|p| filter(p.value()))
            .map(|p| (p.key().clone(), p.value().tx.clone()))
            .collect();
        let mut delivered = 0;
        for (id, tx) in targets {
            if tx.send(line.clone()).await.is_ok() {
                delivered += 1;
            } else {
                self.peers.remove(&id);
            }
        }
        Ok(delivered)
    }

    async fn serve(self: Arc<Self>, stream: UnixStream) {
        let peer_id = uuid::Uuid::new_v4().to_string();
        let (reader, mut writer) = stream.into_split();
        let (tx, mut rx) = mpsc::channel::<String>(PEER_QUEUE);
        self.peers.insert(
            peer_id.clone(),
            Peer {
                tx: tx.clone(),
                users: DashSet::new(),
            },
        );
        debug!(peer = %peer_id, "socket client connected");

        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err()
                    || writer.write_all(b"\n").await.is_err()
                {
                    break;
                }
            }
        });

        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = tokio::select! {
                _ = self.cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(peer = %peer_id, error = %e, "socket read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ClientFrame>(&line) {
                Ok(frame) => self.accept(&peer_id, &tx, frame).await,
                Err(e) => {
                    debug!(peer = %peer_id, error = %e, "invalid socket frame");
                    reply(&tx, &ServerFrame::error(format!("invalid frame: {e}"))).await;
                }
            }
        }

        self.peers.remove(&peer_id);
        drop(tx);
        let _ = writer_task.await;
        debug!(peer = %peer_id, "socket client disconnected");
    }

    async fn accept(&self, peer_id: &str, tx: &mpsc::Sender<String>, frame: ClientFrame) {
        match frame {
            ClientFrame::Message(frame) => {
                if let Some(peer) = self.peers.get(peer_id) {
                    peer.users.insert(frame.user.clone());
                }
                let msg = self.to_message(frame);
                if let Err(e) = self.bus.post(msg).await {
                    warn!(error = %e, "dropping socket message");
                }
            }
            ClientFrame::Request { id, cmd, args } => {
                debug!(peer = %peer_id, cmd = %cmd, "socket request");
                let frame = match self.bus.post_sync(Request::new(cmd, args)).await {
                    Ok(Some(resp)) => ServerFrame::Response {
                        id,
                        text: resp.text,
                        info: resp.info,
                        to: None,
                    },
                    Ok(None) => ServerFrame::Response {
                        id,
                        text: String::new(),
                        info: Default::default(),
                        to: None,
                    },
                    Err(e) => ServerFrame::error(e.to_string()),
                };
                reply(tx, &frame).await;
            }
        }
    }
}

async fn reply(tx: &mpsc::Sender<String>, frame: &ServerFrame) {
    match frame.to_line() {
        Ok(line) => {
            let _ = tx.send(line).await;
        }
        Err(e) => warn!(error = %e, "cannot encode frame"),
    }
}

#[async_trait]
impl Collaborator for SocketAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Protocol
    }

    async fn health_check(&self) -> Result<HealthStatus, RippleError> {
        if self.listening.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("socket not listening".into()))
        }
    }

    async fn close(&self) -> Result<(), RippleError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("socket adapter closing");
            self.shared.cancel.cancel();
        }
        Ok(())
    }
}

#[async_trait]
impl ProtocolAdapter for SocketAdapter {
    fn identity(&self) -> User {
        self.identity.clone()
    }

    async fn start_polling(&self) -> Result<(), RippleError> {
        if self.shared.cancel.is_cancelled() {
            return Ok(());
        }
        let listener = self.bind()?;
        self.listening.store(true, Ordering::SeqCst);
        info!(path = %self.path.display(), "socket listening");

        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                _ = self.shared.cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        tracker.spawn(Arc::clone(&self.shared).serve(stream));
                    }
                    Err(e) => warn!(error = %e, "socket accept failed"),
                },
            }
        }

        self.listening.store(false, Ordering::SeqCst);
        tracker.close();
        tracker.wait().await;
        drop(listener);
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            debug!(error = %e, "socket file already gone");
        }
        info!("socket adapter stopped");
        Ok(())
    }

    async fn send(
        &self,
        response: &Response,
        _protocol: &str,
        _forwarded: Option<&Message>,
    ) -> Result<Option<Message>, RippleError> {
        let reply = response.reply.as_ref();
        let private_to = reply
            .filter(|m| m.class == ConversationClass::Private)
            .and_then(|m| m.chat.username.clone());
        let frame = ServerFrame::Response {
            id: None,
            text: response.text.clone(),
            info: response.info.clone(),
            to: private_to.clone(),
        };
        let delivered = match &private_to {
            Some(user) => self.shared.push(&frame, |p| p.users.contains(user)).await?,
            None => self.shared.push(&frame, |_| true).await?,
        };
        debug!(delivered, "socket response pushed");

        let (chat, class) = match (reply, private_to) {
            (Some(m), Some(_)) => (m.chat.clone(), ConversationClass::Private),
            _ => (self.shared.group.clone(), ConversationClass::Group),
        };
        let mut echo = Message::text(NAME, self.identity.clone(), chat, &response.text, unix_now(), class);
        echo.reply = reply.cloned().map(Arc::new);
        Ok(Some(echo))
    }

    /// Clients receive the canonical message; nothing is echoed.
    async fn forward(&self, msg: &Message, _protocol: &str) -> Result<Option<Message>, RippleError> {
        let frame = ServerFrame::Message { message: msg.clone() };
        self.shared.push(&frame, |_| true).await?;
        Ok(None)
    }
}
