// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end relay tests: a socket client, a mock line protocol, the SQLite
//! store and the built-in commands wired together the way `serve` does it.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ripple_bus::{Bus, Collaborators, DispatchSettings, Dispatcher, ForwardSwitches, Registry, TaskPool};
use ripple_commands::builtin::Search;
use ripple_commands::{BuiltinOptions, register_builtins};
use ripple_config::model::{BotConfig, SocketConfig, StorageConfig};
use ripple_core::{BusHandle, Collaborator, ProtocolAdapter};
use ripple_socket::SocketAdapter;
use ripple_storage::SqliteStore;
use ripple_test_utils::MockProtocol;

struct Relay {
    socket_path: PathBuf,
    socket: Arc<SocketAdapter>,
    irc: Arc<MockProtocol>,
    store: Arc<SqliteStore>,
    polling: JoinHandle<()>,
    bus_cancel: CancellationToken,
    bus_task: JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl Relay {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("ripple.sock");
        let storage = StorageConfig {
            database_path: dir.path().join("chatlog.db").display().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(&storage, 16).await.unwrap());

        let (bus_handle, bus_rx) = BusHandle::channel(64);
        let socket_config = SocketConfig {
            enabled: true,
            path: socket_path.display().to_string(),
        };
        let socket = Arc::new(SocketAdapter::new(&socket_config, &BotConfig::default(), bus_handle).unwrap());
        let irc = Arc::new(MockProtocol::new("irc"));

        let mut collaborators = Collaborators::new();
        collaborators.add_logger(store.clone()).unwrap();
        collaborators.add_protocol(irc.clone()).unwrap();
        collaborators.add_protocol(socket.clone()).unwrap();

        let mut registry = Registry::new();
        register_builtins(&mut registry, &BuiltinOptions::default());

        let pool = Arc::new(TaskPool::new(4));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(registry),
            Arc::new(collaborators),
            Arc::clone(&pool),
            Arc::new(ForwardSwitches::new()),
            DispatchSettings {
                forward: vec!["irc".into(), "socket".into()],
                ..DispatchSettings::default()
            },
        ));
        let bus_cancel = CancellationToken::new();
        let bus_task = tokio::spawn(Bus::with_receiver(dispatcher, pool, bus_rx).run(bus_cancel.clone()));

        let polling = {
            let socket = Arc::clone(&socket);
            tokio::spawn(async move {
                socket.start_polling().await.unwrap();
            })
        };

        Self {
            socket_path,
            socket,
            irc,
            store,
            polling,
            bus_cancel,
            bus_task,
            _dir: dir,
        }
    }

    async fn stop(self) {
        self.socket.close().await.unwrap();
        self.polling.await.unwrap();
        self.bus_cancel.cancel();
        self.bus_task.await.unwrap();
    }

    async fn wait_logged(&self, n: i64) {
        for _ in 0..250 {
            if self.store.message_count().await.unwrap() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("store never reached {n} messages");
    }
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(path: &Path) -> Self {
        for _ in 0..100 {
            if let Ok(stream) = UnixStream::connect(path).await {
                let (reader, writer) = stream.into_split();
                return Self {
                    lines: BufReader::new(reader).lines(),
                    writer,
                };
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("socket never came up");
    }

    async fn send(&mut self, frame: Value) {
        let line = frame.to_string();
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }
}

#[tokio::test]
async fn group_messages_are_logged_and_forwarded() {
    let relay = Relay::start().await;
    let mut alice = Client::connect(&relay.socket_path).await;

    alice
        .send(serde_json::json!({"type": "message", "user": "alice", "text": "hello world"}))
        .await;

    let forwarded = relay.irc.wait_forwarded(1, Duration::from_secs(5)).await;
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].text.as_deref(), Some("hello world"));
    assert_eq!(forwarded[0].src.username.as_deref(), Some("alice"));
    relay.wait_logged(1).await;

    relay.stop().await;
}

#[tokio::test]
async fn private_search_is_answered_to_the_sender() {
    let relay = Relay::start().await;
    let mut alice = Client::connect(&relay.socket_path).await;

    alice
        .send(serde_json::json!({"type": "message", "user": "alice", "text": "the relay works"}))
        .await;
    relay.wait_logged(1).await;

    alice
        .send(serde_json::json!({
            "type": "message", "user": "alice", "text": "/search relay", "private": true
        }))
        .await;
    let frame = alice.recv().await;
    assert_eq!(frame["type"], "response");
    assert_eq!(frame["to"], "alice");
    let text = frame["text"].as_str().unwrap();
    assert!(text.ends_with("alice: the relay works"), "unexpected answer: {text}");

    assert!(relay.irc.sent().await.is_empty());
    assert_eq!(relay.store.message_count().await.unwrap(), 1);
    relay.stop().await;
}

#[tokio::test]
async fn requests_are_answered_synchronously() {
    let relay = Relay::start().await;
    let mut client = Client::connect(&relay.socket_path).await;

    client
        .send(serde_json::json!({"type": "request", "id": "q1", "cmd": "help", "args": "search"}))
        .await;
    let frame = client.recv().await;
    assert_eq!(frame["id"], "q1");
    assert_eq!(frame["text"], Search::USAGE);

    relay.stop().await;
}
