// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory caches in front of the identity store.
//!
//! Users are cached for the lifetime of the process under both their durable
//! id and their identity key. Messages use a small ring of the most recently
//! logged or loaded entries.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use ripple_core::{IdentityKey, Message, User};

/// Normalize the storage encoding of absent fields: empty strings and a
/// zero protocol id mean "unknown".
pub fn normalize_user(user: &User) -> User {
    let blank = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
    User {
        id: user.id,
        protocol: user.protocol.clone(),
        user_type: user.user_type,
        pid: user.known_pid(),
        username: blank(&user.username),
        first_name: blank(&user.first_name),
        last_name: blank(&user.last_name),
        alias: blank(&user.alias),
    }
}

#[derive(Default)]
pub struct UserCache {
    by_id: DashMap<i64, User>,
    by_key: DashMap<IdentityKey, User>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(&self, id: i64) -> Option<User> {
        self.by_id.get(&id).map(|u| u.clone())
    }

    pub fn by_key(&self, key: &IdentityKey) -> Option<User> {
        self.by_key.get(key).map(|u| u.clone())
    }

    /// Store a resolved user under both slots. Unresolved users are ignored.
    pub fn insert(&self, user: &User) {
        if let Some(id) = user.id {
            let user = normalize_user(user);
            self.by_key.insert(user.key(), user.clone());
            self.by_id.insert(id, user);
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Bounded ring of recently seen messages, looked up by durable id.
pub struct MessageRing {
    capacity: usize,
    entries: Mutex<VecDeque<Message>>,
}

impl MessageRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn get(&self, id: i64) -> Option<Message> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().find(|m| m.id == Some(id)).cloned()
    }

    pub fn insert(&self, msg: Message) {
        if msg.id.is_none() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|m| m.id != msg.id);
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(msg);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
