// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the identity store and message logger.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use ripple_config::model::StorageConfig;
use ripple_core::{
    Collaborator, CollaboratorKind, ConversationClass, HealthStatus, Message, MessageLogger,
    MessageStore, RippleError, SqlValue, User,
};

use crate::cache::{MessageRing, UserCache, normalize_user};
use crate::database::{Database, map_tr_err};
use crate::queries::messages::{self as message_rows, MessageRefs};
use crate::queries::{select, state, users};

/// Identity store backed by SQLite.
///
/// Every read and write goes through the database's single connection
/// thread. Users are cached for the life of the process under both their
/// durable id and their identity key, so a user posting repeatedly costs no
/// storage round trip.
pub struct SqliteStore {
    db: Database,
    users: UserCache,
    messages: MessageRing,
}

impl SqliteStore {
    /// Open the configured database and warm the user cache.
    pub async fn open(config: &StorageConfig, message_cache_size: usize) -> Result<Self, RippleError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store opened");
        Self::with_database(db, message_cache_size).await
    }

    pub async fn with_database(db: Database, message_cache_size: usize) -> Result<Self, RippleError> {
        let all = db.connection().call(|conn| users::all(conn)).await.map_err(map_tr_err)?;
        let cache = UserCache::new();
        for user in &all {
            cache.insert(user);
        }
        debug!(users = cache.len(), "user cache loaded");
        Ok(Self {
            db,
            users: cache,
            messages: MessageRing::new(message_cache_size),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Resolve `user` to its durable row.
    ///
    /// | durable id | cached | action |
    /// |---|---|---|
    /// | known | equal | none |
    /// | known | differs or absent | update row and cache |
    /// | unknown | yes | adopt cached id, update if fields differ |
    /// | unknown | no | look up by key; adopt and update, or insert |
    pub async fn resolve_user(&self, user: &User) -> Result<User, RippleError> {
        let candidate = normalize_user(user);
        let key = candidate.key();

        match (candidate.id, self.users.by_key(&key)) {
            (Some(id), Some(cached)) => {
                let adopted = keep_alias(candidate, &cached);
                if adopted != cached {
                    self.update_user(id, &adopted).await?;
                }
                Ok(adopted)
            }
            (Some(id), None) => {
                self.update_user(id, &candidate).await?;
                Ok(candidate)
            }
            (None, Some(cached)) => {
                let Some(id) = cached.id else {
                    return Err(RippleError::Internal("cached user without id".into()));
                };
                let adopted = keep_alias(candidate.with_id(id), &cached);
                if adopted != cached {
                    self.update_user(id, &adopted).await?;
                }
                Ok(adopted)
            }
            (None, None) => {
                let lookup = candidate.clone();
                let (stored, existed) = self
                    .db
                    .connection()
                    .call(move |conn| users::find_or_insert(conn, &lookup))
                    .await
                    .map_err(map_tr_err)?;
                let Some(id) = stored.id else {
                    return Err(RippleError::Internal("stored user without id".into()));
                };
                let adopted = keep_alias(candidate.with_id(id), &stored);
                if existed && adopted != stored {
                    self.update_user(id, &adopted).await?;
                } else {
                    self.users.insert(&adopted);
                }
                if !existed {
                    debug!(user_id = id, protocol = %adopted.protocol, "new user");
                }
                Ok(adopted)
            }
        }
    }

    async fn update_user(&self, id: i64, user: &User) -> Result<(), RippleError> {
        let row = user.clone();
        let updated = self
            .db
            .connection()
            .call(move |conn| match users::update(conn, id, &row) {
                Ok(()) => Ok(true),
                Err(e) if crate::database::is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            })
            .await
            .map_err(map_tr_err)?;
        if updated {
            self.users.insert(&user.with_id(id));
        } else {
            debug!(user_id = id, "user update conflicts with another row, keeping stored fields");
        }
        Ok(())
    }

    /// Persist a group message. Returns the new durable id, or `None` when
    /// the message is not a group message or was already stored.
    pub async fn log_message(&self, msg: &Message) -> Result<Option<i64>, RippleError> {
        if !msg.is_group() {
            debug!(protocol = %msg.protocol, "not logging non-group message");
            return Ok(None);
        }

        let dest = self.resolve_user(&msg.chat).await?;
        let src = self.resolve_user(&msg.src).await?;
        let fwd_src = match &msg.fwd_src {
            Some(u) => Some(self.resolve_user(u).await?),
            None => None,
        };
        let reply = match &msg.reply {
            Some(r) => self.reply_id(r).await?,
            None => None,
        };
        let refs = MessageRefs {
            src: src.id.unwrap_or_default(),
            dest: dest.id.unwrap_or_default(),
            fwd_src: fwd_src.as_ref().and_then(|u| u.id),
            reply,
        };

        let row = msg.clone();
        let inserted = self
            .db
            .connection()
            .call(move |conn| message_rows::insert(conn, &row, refs))
            .await
            .map_err(map_tr_err)?;

        match inserted {
            Some(id) => {
                self.messages.insert(Message {
                    id: Some(id),
                    src,
                    chat: dest,
                    fwd_src,
                    ..msg.clone()
                });
                Ok(Some(id))
            }
            None => {
                debug!(protocol = %msg.protocol, native_id = ?msg.pid, "duplicate message ignored");
                Ok(None)
            }
        }
    }

    /// Durable id of a replied-to message, by id or by protocol-native id.
    async fn reply_id(&self, reply: &Message) -> Result<Option<i64>, RippleError> {
        if reply.id.is_some() {
            return Ok(reply.id);
        }
        let Some(native) = reply.pid else {
            return Ok(None);
        };
        let protocol = reply.protocol.clone();
        self.db
            .connection()
            .call(move |conn| message_rows::id_by_native(conn, &protocol, native))
            .await
            .map_err(map_tr_err)
    }

    pub async fn user(&self, id: i64) -> Result<Option<User>, RippleError> {
        if let Some(user) = self.users.by_id(id) {
            return Ok(Some(user));
        }
        let user = self
            .db
            .connection()
            .call(move |conn| users::find_by_id(conn, id))
            .await
            .map_err(map_tr_err)?;
        if let Some(u) = &user {
            self.users.insert(u);
        }
        Ok(user)
    }

    async fn user_or_missing(&self, id: Option<i64>) -> Result<User, RippleError> {
        let id = id.ok_or_else(|| RippleError::NotFound {
            kind: "user".into(),
            id: "null".into(),
        })?;
        self.user(id).await?.ok_or_else(|| RippleError::NotFound {
            kind: "user".into(),
            id: id.to_string(),
        })
    }

    async fn message_row(&self, id: i64) -> Result<Option<message_rows::MessageRow>, RippleError> {
        self.db
            .connection()
            .call(move |conn| message_rows::find_by_id(conn, id))
            .await
            .map_err(map_tr_err)
    }

    async fn assemble(
        &self,
        row: message_rows::MessageRow,
        reply: Option<Message>,
    ) -> Result<Message, RippleError> {
        let fwd_src = match row.fwd_src_user_id {
            Some(uid) => self.user(uid).await?,
            None => None,
        };
        Ok(Message {
            id: Some(row.id),
            protocol: row.protocol,
            pid: row.native_id,
            src: self.user_or_missing(row.src_user_id).await?,
            chat: self.user_or_missing(row.dest_user_id).await?,
            text: row.text,
            media: row.media,
            time: row.time,
            fwd_src,
            fwd_time: row.fwd_time,
            reply: reply.map(Arc::new),
            class: ConversationClass::Group,
            alt_text: None,
        })
    }

    /// Load a message with its reply resolved one level deep.
    pub async fn message(&self, id: i64) -> Result<Option<Message>, RippleError> {
        if let Some(msg) = self.messages.get(id) {
            return Ok(Some(msg));
        }
        let Some(row) = self.message_row(id).await? else {
            return Ok(None);
        };

        let reply = match row.reply_id {
            Some(reply_id) => match self.messages.get(reply_id) {
                Some(cached) => Some(Message {
                    reply: None,
                    ..cached
                }),
                None => match self.message_row(reply_id).await? {
                    Some(reply_row) => Some(self.assemble(reply_row, None).await?),
                    None => None,
                },
            },
            None => None,
        };

        let msg = self.assemble(row, reply).await?;
        self.messages.insert(msg.clone());
        Ok(Some(msg))
    }

    pub async fn message_count(&self) -> Result<i64, RippleError> {
        self.db
            .connection()
            .call(|conn| message_rows::count(conn))
            .await
            .map_err(map_tr_err)
    }
}

/// Adapters never know the alias set through `nick`, so an incoming user
/// without one keeps the stored alias.
fn keep_alias(mut incoming: User, stored: &User) -> User {
    if incoming.alias.is_none() {
        incoming.alias = stored.alias.clone();
    }
    incoming
}

#[async_trait]
impl Collaborator for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Logger
    }

    async fn health_check(&self) -> Result<HealthStatus, RippleError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), RippleError> {
        if let Err(e) = self.db.checkpoint().await {
            warn!(error = %e, "WAL checkpoint on close failed");
        }
        Ok(())
    }
}

#[async_trait]
impl MessageLogger for SqliteStore {
    async fn log(&self, msg: &Message) -> Result<(), RippleError> {
        self.log_message(msg).await.map(|_| ())
    }

    fn as_store(&self) -> Option<&dyn MessageStore> {
        Some(self)
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn resolve(&self, user: &User) -> Result<User, RippleError> {
        self.resolve_user(user).await
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RippleError> {
        self.user(id).await
    }

    async fn get_message(&self, id: i64) -> Result<Option<Message>, RippleError> {
        self.message(id).await
    }

    async fn select(&self, sql: &str, args: Vec<SqlValue>) -> Result<Vec<Vec<SqlValue>>, RippleError> {
        let sql = sql.to_string();
        self.db
            .connection()
            .call(move |conn| select::rows(conn, &sql, args))
            .await
            .map_err(map_tr_err)
    }

    async fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>, RippleError> {
        state::load(&self.db, key).await
    }

    async fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<(), RippleError> {
        state::save(&self.db, key, value).await
    }
}
