// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite identity store and import job.

use std::io::Write;
use std::sync::Arc;

use ripple_core::{
    ConversationClass, Message, MessageLogger, MessageStore, SqlValue, User, UserType,
};
use ripple_storage::{Database, MergePolicy, SqliteStore, import_jsonl};

async fn store() -> SqliteStore {
    let db = Database::open_in_memory().await.unwrap();
    SqliteStore::with_database(db, 8).await.unwrap()
}

fn group(protocol: &str, name: &str) -> User {
    User {
        user_type: UserType::Group,
        ..User::named(protocol, name)
    }
}

fn message(protocol: &str, pid: i64, from: &str, text: &str, time: i64) -> Message {
    let mut m = Message::text(
        protocol,
        User::named(protocol, from),
        group(protocol, "#chan"),
        text,
        time,
        ConversationClass::Group,
    );
    m.pid = Some(pid);
    m
}

#[tokio::test]
async fn resolving_same_key_returns_same_id() {
    let store = store().await;
    let alice = User::named("irc", "alice");
    let first = store.resolve_user(&alice).await.unwrap();
    let second = store.resolve_user(&alice).await.unwrap();
    let third = store.resolve_user(&first).await.unwrap();
    assert!(first.id.is_some());
    assert_eq!(first.id, second.id);
    assert_eq!(first.id, third.id);
}

#[tokio::test]
async fn resolve_updates_changed_fields() {
    let store = store().await;
    let mut bob = User::named("telegram", "bob");
    bob.pid = Some(42);
    let stored = store.resolve_user(&bob).await.unwrap();

    let mut renamed = bob.clone();
    renamed.username = Some("robert".into());
    renamed.first_name = Some("Robert".into());
    let updated = store.resolve_user(&renamed).await.unwrap();
    assert_eq!(updated.id, stored.id);

    let id = stored.id.unwrap();
    let loaded = store.get_user(id).await.unwrap().unwrap();
    assert_eq!(loaded.username.as_deref(), Some("robert"));
    assert_eq!(loaded.first_name.as_deref(), Some("Robert"));
}

#[tokio::test]
async fn resolve_reuses_rows_from_previous_process() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.db");
    let path = path.to_str().unwrap();

    let first = {
        let store = SqliteStore::with_database(Database::open(path, true).await.unwrap(), 8)
            .await
            .unwrap();
        store.resolve_user(&User::named("irc", "carol")).await.unwrap()
    };
    let store = SqliteStore::with_database(Database::open(path, true).await.unwrap(), 8)
        .await
        .unwrap();
    let again = store.resolve_user(&User::named("irc", "carol")).await.unwrap();
    assert_eq!(first.id, again.id);
}

#[tokio::test]
async fn concurrent_first_sight_creates_one_row() {
    let store = Arc::new(store().await);
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store.resolve_user(&User::named("irc", "dave")).await.unwrap()
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().id.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let rows = store
        .select(
            "SELECT count(*) FROM users WHERE protocol = ?1 AND username = ?2",
            vec!["irc".into(), "dave".into()],
        )
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![SqlValue::Integer(1)]]);
}

#[tokio::test]
async fn duplicate_native_id_is_logged_once() {
    let store = store().await;
    let msg = message("irc", 100, "alice", "hello", 1_000);
    let first = store.log_message(&msg).await.unwrap();
    assert!(first.is_some());
    let second = store.log_message(&msg).await.unwrap();
    assert_eq!(second, None);
    store.log(&msg).await.unwrap();
    assert_eq!(store.message_count().await.unwrap(), 1);
}

#[tokio::test]
async fn private_messages_are_not_logged() {
    let store = store().await;
    let mut msg = message("irc", 1, "alice", "psst", 1_000);
    msg.class = ConversationClass::Private;
    assert_eq!(store.log_message(&msg).await.unwrap(), None);
    assert_eq!(store.message_count().await.unwrap(), 0);
}

#[tokio::test]
async fn get_message_resolves_reply_one_level() {
    let store = store().await;
    let root = message("irc", 1, "alice", "question?", 1_000);
    let root_id = store.log_message(&root).await.unwrap().unwrap();

    let mut answer = message("irc", 2, "bob", "answer", 1_010);
    answer.reply = Some(Arc::new(root.clone()));
    let answer_id = store.log_message(&answer).await.unwrap().unwrap();

    let mut follow = message("irc", 3, "alice", "thanks", 1_020);
    follow.reply = Some(Arc::new(Message {
        id: Some(answer_id),
        ..answer.clone()
    }));
    let follow_id = store.log_message(&follow).await.unwrap().unwrap();

    // A fresh store on the same database bypasses the message ring.
    let cold = SqliteStore::with_database(store.database().clone(), 8)
        .await
        .unwrap();
    let loaded = cold.get_message(follow_id).await.unwrap().unwrap();
    assert_eq!(loaded.text.as_deref(), Some("thanks"));
    assert_eq!(loaded.src.username.as_deref(), Some("alice"));
    let reply = loaded.reply.as_deref().unwrap();
    assert_eq!(reply.id, Some(answer_id));
    assert!(reply.reply.is_none());

    let answer_loaded = cold.get_message(answer_id).await.unwrap().unwrap();
    assert_eq!(answer_loaded.reply.as_deref().unwrap().id, Some(root_id));
    assert!(cold.get_message(9_999).await.unwrap().is_none());
}

#[tokio::test]
async fn state_round_trips_through_store_trait() {
    let store = store().await;
    let key = "forward.irc";
    assert_eq!(store.load_state(key).await.unwrap(), None);
    store.save_state(key, &serde_json::json!(false)).await.unwrap();
    assert_eq!(
        store.load_state(key).await.unwrap(),
        Some(serde_json::json!(false))
    );
}

#[tokio::test]
async fn select_rejects_writes() {
    let store = store().await;
    assert!(store.select("DELETE FROM users", vec![]).await.is_err());
}

fn write_log(dir: &std::path::Path, name: &str, messages: &[Message]) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for m in messages {
        writeln!(file, "{}", serde_json::to_string(m).unwrap()).unwrap();
    }
    writeln!(file, "not json").unwrap();
    path
}

#[tokio::test]
async fn import_merges_duplicates_across_sources() {
    let dir = tempfile::tempdir().unwrap();
    let chat = group("telegram", "group");
    let mut alice = User::named("telegram", "alice");
    alice.pid = Some(7);

    let record = |protocol: &str, pid: i64, text: &str, time: i64| {
        let mut m = Message::text(
            protocol,
            alice.clone(),
            chat.clone(),
            text,
            time,
            ConversationClass::Group,
        );
        m.pid = Some(pid);
        m
    };
    let bot = record("telegrambot", 1, "hi", 100);
    let cli = record("telegramcli", 9001, "hi", 101);
    let later = record("telegramcli", 9002, "bye", 200);

    let a = write_log(dir.path(), "bot.jsonl", &[bot]);
    let b = write_log(dir.path(), "cli.jsonl", &[cli, later]);

    let store = store().await;
    let stats = import_jsonl(&store, &[a, b], MergePolicy::default()).await.unwrap();
    assert_eq!(stats.read, 3);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.merged, 1);
    assert_eq!(stats.written, 2);

    let rows = store
        .select("SELECT protocol, text FROM messages ORDER BY time", vec![])
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![SqlValue::from("telegrambot"), SqlValue::from("hi")],
            vec![SqlValue::from("telegramcli"), SqlValue::from("bye")],
        ]
    );
}

#[tokio::test]
async fn alias_survives_later_sightings_without_one() {
    let store = store().await;
    let carol = User::named("irc", "carol");
    let seen = store.resolve_user(&carol).await.unwrap();

    let mut nicked = carol.clone();
    nicked.alias = Some("Caz".into());
    store.resolve_user(&nicked).await.unwrap();

    let again = store.resolve_user(&carol).await.unwrap();
    assert_eq!(again.id, seen.id);
    assert_eq!(again.alias.as_deref(), Some("Caz"));
    let loaded = store.get_user(seen.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.alias.as_deref(), Some("Caz"));
}

#[tokio::test]
async fn nickname_is_kept_when_the_sender_posts_again() {
    let store = store().await;
    let first = store.resolve_user(&User::named("irc", "alice_")).await.unwrap();

    let mut renamed = User::named("irc", "alice_");
    renamed.alias = Some("Bob".into());
    store.resolve_user(&renamed).await.unwrap();

    store
        .log(&message("irc", 1, "alice_", "still here", 1_700_000_000))
        .await
        .unwrap();

    let loaded = store.get_user(first.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.alias.as_deref(), Some("Bob"));
    assert_eq!(loaded.username.as_deref(), Some("alice_"));
}
