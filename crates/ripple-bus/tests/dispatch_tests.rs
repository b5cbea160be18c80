// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for dispatch, fan-out and response delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ripple_bus::{
    Bus, CommandContext, Collaborators, DispatchSettings, Dispatcher, FnCommand, FnHandler,
    ForwardSwitches, GeneralHandler, HandlerResult, Registry, Reply, Spec, TaskPool,
};
use ripple_core::{ConversationClass, Message, Request, RippleError};
use ripple_test_utils::fixtures::{aged, group_message, private_message};
use ripple_test_utils::{MemoryLogger, MockProtocol};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

struct Relay {
    dispatcher: Arc<Dispatcher>,
    pool: Arc<TaskPool>,
    irc: Arc<MockProtocol>,
    socket: Arc<MockProtocol>,
    log: Arc<MemoryLogger>,
}

fn counting(
    calls: &Arc<AtomicUsize>,
    reply: &'static str,
) -> impl ripple_bus::CommandHandler + use<> {
    let calls = Arc::clone(calls);
    FnCommand(move |_: &CommandContext<'_>, _: &Request| -> HandlerResult {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Reply::from(reply)))
    })
}

fn relay(registry: Registry, logger_name: &str, main: Option<&str>) -> Relay {
    let irc = Arc::new(MockProtocol::new("irc"));
    let socket = Arc::new(MockProtocol::new("socket"));
    let log = Arc::new(MemoryLogger::new(logger_name));
    let mut collaborators = Collaborators::new();
    collaborators.add_protocol(irc.clone()).unwrap();
    collaborators.add_protocol(socket.clone()).unwrap();
    collaborators.add_logger(log.clone()).unwrap();

    let settings = DispatchSettings {
        main_protocol: main.map(str::to_string),
        forward: vec!["irc".into(), "socket".into()],
        ..DispatchSettings::default()
    };
    let pool = Arc::new(TaskPool::new(4));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        Arc::new(collaborators),
        Arc::clone(&pool),
        Arc::new(ForwardSwitches::new()),
        settings,
    ));
    Relay {
        dispatcher,
        pool,
        irc,
        socket,
        log,
    }
}

#[tokio::test]
async fn stale_message_is_logged_but_not_forwarded_or_dispatched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_command(Spec::new("ping"), counting(&calls, "pong"));
    let r = relay(registry, "text", None);

    let stale = aged(group_message("irc", "alice", "/ping"), 300);
    let resp = r.dispatcher.process(stale.into()).await;
    r.pool.close().await;

    assert!(resp.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(r.log.logged().await.len(), 1);
    assert!(r.socket.forwarded().await.is_empty());
    assert!(r.irc.forwarded().await.is_empty());
}

#[tokio::test]
async fn live_message_is_forwarded_to_other_protocols_and_dispatched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_command(Spec::new("ping"), counting(&calls, "pong"));
    let r = relay(registry, "text", None);

    let resp = r
        .dispatcher
        .process(group_message("irc", "alice", "/ping").into())
        .await
        .unwrap();
    r.pool.close().await;

    assert_eq!(resp.text, "pong");
    assert_eq!(resp.reply.unwrap().text.as_deref(), Some("/ping"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(r.socket.forwarded().await.len(), 1);
    assert!(r.irc.forwarded().await.is_empty());
}

#[tokio::test]
async fn protocol_restricted_command_ignores_other_protocols() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_command(Spec::new("t2i").protocols(["irc"]), counting(&calls, "ok"));
    let r = relay(registry, "text", None);

    let from_socket = r
        .dispatcher
        .process(group_message("socket", "bob", "/t2i").into())
        .await;
    assert!(from_socket.is_none());

    let direct = r.dispatcher.process(Request::new("t2i", "").into()).await;
    assert!(direct.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let from_irc = r
        .dispatcher
        .process(group_message("irc", "bob", "/t2i").into())
        .await;
    assert!(from_irc.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dependency_must_be_an_active_collaborator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let spec = || Spec::new("search").dependency("sqlite");

    let mut registry = Registry::new();
    registry.register_command(spec(), counting(&calls, "found"));
    let without = relay(registry, "text", None);
    let resp = without
        .dispatcher
        .process(Request::new("search", "x").into())
        .await;
    assert!(resp.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let mut registry = Registry::new();
    registry.register_command(spec(), counting(&calls, "found"));
    let with = relay(registry, "sqlite", None);
    let resp = with
        .dispatcher
        .process(Request::new("search", "x").into())
        .await;
    assert_eq!(resp.unwrap().text, "found");
}

#[tokio::test]
async fn redelivered_message_is_logged_and_forwarded_once() {
    let r = relay(Registry::new(), "text", None);
    let mut msg = group_message("irc", "alice", "hello");
    msg.pid = Some(42);

    r.dispatcher.process(msg.clone().into()).await;
    r.dispatcher.process(msg.into()).await;
    r.pool.close().await;

    assert_eq!(r.log.logged().await.len(), 1);
    assert_eq!(r.socket.forwarded().await.len(), 1);
}

#[tokio::test]
async fn private_messages_are_neither_logged_nor_forwarded() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_command(Spec::new("ping"), counting(&calls, "pong"));
    let r = relay(registry, "text", None);

    let resp = r
        .dispatcher
        .process(private_message("socket", "carol", "/ping").into())
        .await
        .unwrap();
    r.dispatcher.respond(resp);
    r.pool.close().await;

    assert!(r.log.logged().await.is_empty());
    assert!(r.irc.forwarded().await.is_empty());
    assert_eq!(r.socket.sent().await.len(), 1);
    assert!(r.irc.sent().await.is_empty());
}

#[tokio::test]
async fn group_reply_reaches_every_adapter_and_main_echo_is_logged() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_command(Spec::new("ping"), counting(&calls, "pong"));
    let r = relay(registry, "text", Some("irc"));

    let resp = r
        .dispatcher
        .process(group_message("socket", "dave", "/ping").into())
        .await
        .unwrap();
    r.dispatcher.respond(resp);
    r.pool.close().await;

    let irc_sent = r.irc.sent().await;
    let socket_sent = r.socket.sent().await;
    assert_eq!(irc_sent.len(), 1);
    assert_eq!(irc_sent[0].protocol, "irc");
    assert_eq!(socket_sent.len(), 1);
    assert_eq!(socket_sent[0].protocol, "socket");

    let logged = r.log.logged().await;
    assert_eq!(logged.len(), 2, "the inbound message and one echo");
    assert_eq!(logged[1].text.as_deref(), Some("pong"));
    assert_eq!(logged[1].protocol, "irc");
}

#[tokio::test]
async fn failing_command_yields_no_response() {
    let mut registry = Registry::new();
    registry.register_command(
        Spec::new("boom"),
        FnCommand(|_: &CommandContext<'_>, _: &Request| -> HandlerResult {
            Err(RippleError::Internal("broken".into()))
        }),
    );
    registry.register_command(
        Spec::new("panic"),
        FnCommand(|_: &CommandContext<'_>, _: &Request| -> HandlerResult {
            panic!("handler bug")
        }),
    );
    let r = relay(registry, "text", None);
    assert!(
        r.dispatcher
            .process(Request::new("boom", "").into())
            .await
            .is_none()
    );
    assert!(
        r.dispatcher
            .process(Request::new("panic", "").into())
            .await
            .is_none()
    );
}

struct Failing;

#[async_trait::async_trait]
impl GeneralHandler for Failing {
    async fn call(&self, _ctx: &CommandContext<'_>, _msg: &Message) -> HandlerResult {
        Err(RippleError::Internal("handler down".into()))
    }
}

#[tokio::test]
async fn first_non_empty_general_handler_wins() {
    let mut registry = Registry::new();
    registry.register_handler(Spec::new("failing"), Failing);
    registry.register_handler(
        Spec::new("silent"),
        FnHandler(|_: &CommandContext<'_>, _: &Message| -> HandlerResult { Ok(Some(Reply::from(""))) }),
    );
    registry.register_handler(
        Spec::new("private").classes([ConversationClass::Private]),
        FnHandler(|_: &CommandContext<'_>, _: &Message| -> HandlerResult {
            Ok(Some(Reply::from("private")))
        }),
    );
    registry.register_handler(
        Spec::new("echo"),
        FnHandler(|_: &CommandContext<'_>, m: &Message| -> HandlerResult {
            Ok(m.text.clone().map(Reply::from))
        }),
    );
    let r = relay(registry, "text", None);

    let resp = r
        .dispatcher
        .process(group_message("irc", "erin", "hello").into())
        .await
        .unwrap();
    assert_eq!(resp.text, "hello");

    let resp = r
        .dispatcher
        .process(private_message("irc", "erin", "hello").into())
        .await
        .unwrap();
    assert_eq!(resp.text, "private");
}

#[tokio::test]
async fn unknown_command_is_silent_and_skips_general_handlers() {
    let mut registry = Registry::new();
    registry.register_handler(
        Spec::new("echo"),
        FnHandler(|_: &CommandContext<'_>, m: &Message| -> HandlerResult {
            Ok(m.text.clone().map(Reply::from))
        }),
    );
    let r = relay(registry, "text", None);
    let resp = r
        .dispatcher
        .process(group_message("irc", "erin", "/nosuch").into())
        .await;
    assert!(resp.is_none());
}

#[tokio::test]
async fn bus_post_responds_and_post_sync_returns() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_command(Spec::new("ping"), counting(&calls, "pong"));
    let r = relay(registry, "text", None);

    let (bus, handle) = Bus::new(Arc::clone(&r.dispatcher), Arc::clone(&r.pool), 16);
    let cancel = CancellationToken::new();
    let running = tokio::spawn(bus.run(cancel.clone()));

    let resp = handle.post_sync(Request::new("ping", "")).await.unwrap();
    assert_eq!(resp.unwrap().text, "pong");
    assert!(r.irc.sent().await.is_empty());

    handle
        .post(group_message("socket", "frank", "/ping"))
        .await
        .unwrap();
    let sent = r.irc.wait_sent(1, WAIT).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].response.text, "pong");

    cancel.cancel();
    running.await.unwrap();
    assert!(r.pool.is_closed());
}
