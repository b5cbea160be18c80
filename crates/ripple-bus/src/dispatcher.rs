// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatcher: fans inbound messages out to loggers and forward targets,
//! runs at most one command or general handler per item, and delivers the
//! resulting response through the adapters.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tracing::{debug, error, warn};

use ripple_config::model::DispatchConfig;
use ripple_core::{Inbound, Message, Request, Response, RippleError, StatusAction, User, unix_now};

use crate::collaborators::Collaborators;
use crate::forwarding::ForwardSwitches;
use crate::parse::parse_command;
use crate::pool::{TaskPool, panic_message};
use crate::registry::{CommandContext, HandlerResult, Registry};

/// How many recent `(protocol, native id)` pairs are remembered to detect
/// redelivered messages.
const RECENT_DELIVERIES: usize = 256;

/// Tunables of the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub prefixes: Vec<char>,
    /// Maximum message age, in seconds, that is still forwarded and dispatched.
    pub liveness_window: i64,
    /// Adapter whose echo of a group response is logged.
    pub main_protocol: Option<String>,
    /// Adapters that receive forwards of group messages.
    pub forward: Vec<String>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            prefixes: vec!['/', '\''],
            liveness_window: 120,
            main_protocol: None,
            forward: Vec::new(),
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            prefixes: config.command_prefixes.chars().collect(),
            liveness_window: i64::try_from(config.liveness_window_secs).unwrap_or(i64::MAX),
            main_protocol: config.main_protocol.clone(),
            forward: config.forward.clone(),
        }
    }
}

/// Outcome of the fan-out step for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Live message: go on to command and handler dispatch.
    Dispatch,
    /// Older than the liveness window: logged only.
    Stale,
    /// Same protocol and native id as a recent message: dropped.
    Duplicate,
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    collaborators: Arc<Collaborators>,
    pool: Arc<TaskPool>,
    forwarding: Arc<ForwardSwitches>,
    settings: DispatchSettings,
    handles: Vec<String>,
    recent: Mutex<VecDeque<(String, i64)>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        collaborators: Arc<Collaborators>,
        pool: Arc<TaskPool>,
        forwarding: Arc<ForwardSwitches>,
        settings: DispatchSettings,
    ) -> Self {
        let handles = collaborators.handles();
        Self {
            registry,
            collaborators,
            pool,
            forwarding,
            settings,
            handles,
            recent: Mutex::new(VecDeque::with_capacity(RECENT_DELIVERIES)),
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &Arc<Collaborators> {
        &self.collaborators
    }

    fn context(&self) -> CommandContext<'_> {
        CommandContext {
            registry: &self.registry,
            collaborators: &self.collaborators,
            settings: &self.settings,
            forwarding: &self.forwarding,
        }
    }

    /// Process one inbound item and return its response, if any. The
    /// response is not delivered; see [`Dispatcher::respond`].
    pub async fn process(&self, item: Inbound) -> Option<Response> {
        match item {
            Inbound::Request(req) => self.handle_request(req).await,
            Inbound::Message(msg) => match self.fan_out(&msg) {
                Disposition::Dispatch => self.handle_message(msg).await,
                Disposition::Stale | Disposition::Duplicate => None,
            },
        }
    }

    /// Queue the side effects of `msg` and decide whether it is dispatched.
    ///
    /// Group messages are logged and, while live, forwarded to every other
    /// forward target. Submission happens before this returns, so calling it
    /// in arrival order keeps each collaborator's queue in arrival order.
    pub fn fan_out(&self, msg: &Message) -> Disposition {
        if !self.first_delivery(msg) {
            debug!(protocol = %msg.protocol, native_id = ?msg.pid, "redelivered message dropped");
            return Disposition::Duplicate;
        }
        let live = msg.age(unix_now()) <= self.settings.liveness_window;
        if msg.is_group() {
            let shared = Arc::new(msg.clone());
            log_everywhere(&self.pool, &self.collaborators, &shared);
            if live {
                self.forward(&shared);
            }
        }
        if live {
            Disposition::Dispatch
        } else {
            debug!(protocol = %msg.protocol, age = msg.age(unix_now()), "stale message not dispatched");
            Disposition::Stale
        }
    }

    fn first_delivery(&self, msg: &Message) -> bool {
        let Some(pid) = msg.pid else {
            return true;
        };
        let key = (msg.protocol.clone(), pid);
        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        if recent.contains(&key) {
            return false;
        }
        if recent.len() >= RECENT_DELIVERIES {
            recent.pop_front();
        }
        recent.push_back(key);
        true
    }

    fn forward(&self, msg: &Arc<Message>) {
        for target in &self.settings.forward {
            if *target == msg.protocol || !self.forwarding.is_enabled(target) {
                continue;
            }
            let Some(adapter) = self.collaborators.protocol(target) else {
                warn!(protocol = %target, "forward target is not an active protocol");
                continue;
            };
            let adapter = Arc::clone(adapter);
            let msg = Arc::clone(msg);
            let name = target.clone();
            self.pool.submit_guarded(target, "forward", async move {
                adapter.forward(&msg, &name).await
            });
        }
    }

    /// Parse and dispatch a live message.
    pub async fn handle_message(&self, msg: Message) -> Option<Response> {
        let parsed = msg
            .text
            .as_deref()
            .and_then(|t| parse_command(t, &self.settings.prefixes, &self.handles));
        match parsed {
            Some(req) => {
                debug!(command = %req.cmd, args = %req.args, "parsed request");
                self.dispatch(req, Some(&msg)).await
            }
            None => self.dispatch_general(&msg).await,
        }
    }

    /// Dispatch a direct request. An attached originating message takes part
    /// in eligibility checks.
    pub async fn handle_request(&self, req: Request) -> Option<Response> {
        let msg = req.kwargs.message.clone();
        self.dispatch(req, msg.as_ref()).await
    }

    async fn dispatch(&self, mut req: Request, msg: Option<&Message>) -> Option<Response> {
        let entry = self.registry.command(&req.cmd)?;
        if !entry.rule.admits(msg, &self.collaborators) {
            debug!(command = %req.cmd, "command not eligible");
            return None;
        }
        if let Some(m) = msg {
            req.kwargs.message = Some(m.clone());
        }
        let ctx = self.context();
        let result = guarded(entry.handler.call(&ctx, &req)).await;
        match result {
            Ok(reply) => reply.and_then(|r| r.into_response(msg)),
            Err(e) => {
                error!(command = %req.cmd, args = %req.args, error = %e, "command failed");
                None
            }
        }
    }

    /// Try general handlers in order; the first non-empty result wins.
    async fn dispatch_general(&self, msg: &Message) -> Option<Response> {
        let ctx = self.context();
        for entry in self.registry.handlers() {
            if !entry.rule.admits(Some(msg), &self.collaborators) {
                continue;
            }
            match guarded(entry.handler.call(&ctx, msg)).await {
                Ok(reply) => {
                    if let Some(resp) = reply.and_then(|r| r.into_response(Some(msg))) {
                        return Some(resp);
                    }
                }
                Err(e) => {
                    error!(
                        handler = %entry.name,
                        protocol = %msg.protocol,
                        text = msg.text.as_deref().unwrap_or_default(),
                        error = %e,
                        "general handler failed"
                    );
                }
            }
        }
        None
    }

    /// Deliver `resp` through the adapters.
    ///
    /// Group replies go to every adapter, and the main protocol's echo of
    /// the reply is logged. Private replies go back only to the adapter the
    /// conversation came from.
    pub fn respond(&self, resp: Response) {
        let Some(reply) = resp.reply.clone() else {
            warn!(text = %resp.text, "response has no message to reply to");
            return;
        };
        let resp = Arc::new(resp);

        if !reply.is_group() {
            let Some(adapter) = self.collaborators.protocol(&reply.protocol) else {
                warn!(protocol = %reply.protocol, "no adapter for private reply");
                return;
            };
            let adapter = Arc::clone(adapter);
            let name = reply.protocol.clone();
            self.pool.submit_guarded(&reply.protocol, "send", async move {
                adapter.send(&resp, &name, None).await
            });
            return;
        }

        for (name, adapter) in self.collaborators.protocols() {
            let adapter = Arc::clone(adapter);
            let resp = Arc::clone(&resp);
            let protocol = name.to_string();
            if self.settings.main_protocol.as_deref() == Some(name) {
                let pool = Arc::clone(&self.pool);
                let collaborators = Arc::clone(&self.collaborators);
                self.pool.submit_guarded(name, "send", async move {
                    match adapter.send(&resp, &protocol, None).await? {
                        Some(echo) => log_everywhere(&pool, &collaborators, &Arc::new(echo)),
                        None => warn!(protocol = %protocol, "main protocol send returned no message"),
                    }
                    Ok::<_, RippleError>(())
                });
            } else {
                self.pool.submit_guarded(name, "send", async move {
                    adapter.send(&resp, &protocol, None).await
                });
            }
        }
    }

    /// Show a chat status on every adapter.
    pub fn status(&self, dest: User, action: StatusAction) {
        let dest = Arc::new(dest);
        for (name, adapter) in self.collaborators.protocols() {
            let adapter = Arc::clone(adapter);
            let dest = Arc::clone(&dest);
            self.pool.submit_guarded(name, "status", async move {
                adapter.status(&dest, action).await
            });
        }
    }
}

fn log_everywhere(pool: &TaskPool, collaborators: &Collaborators, msg: &Arc<Message>) {
    for (name, logger) in collaborators.loggers() {
        let logger = Arc::clone(logger);
        let msg = Arc::clone(msg);
        pool.submit_guarded(name, "log", async move { logger.log(&msg).await });
    }
}

/// Run a handler, turning a panic into a handler error.
async fn guarded<F>(fut: F) -> HandlerResult
where
    F: std::future::Future<Output = HandlerResult>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(RippleError::Handler {
            name: "panic".into(),
            message: panic_message(panic.as_ref()),
        }),
    }
}
