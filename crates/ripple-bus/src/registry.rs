// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command and general handler registry.
//!
//! The registry is built once at startup by a sequence of `register_*`
//! calls and is read-only afterwards. Commands are looked up by exact name;
//! general handlers are tried in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use ripple_core::{ConversationClass, Message, MessageStore, Request, Response, RippleError};

use crate::collaborators::Collaborators;
use crate::dispatcher::DispatchSettings;
use crate::forwarding::ForwardSwitches;

/// What a handler returns: a bare string or a full response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Response(Response),
}

impl Reply {
    /// Normalize into a response to `msg`. Empty text means no response.
    pub fn into_response(self, msg: Option<&Message>) -> Option<Response> {
        match self {
            Reply::Text(text) if text.is_empty() => None,
            Reply::Text(text) => Some(Response::plain(text, msg.cloned())),
            Reply::Response(mut resp) => {
                if resp.reply.is_none() {
                    resp.reply = msg.cloned();
                }
                Some(resp)
            }
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<Response> for Reply {
    fn from(resp: Response) -> Self {
        Reply::Response(resp)
    }
}

pub type HandlerResult = Result<Option<Reply>, RippleError>;

/// Read access to the running relay, handed to every handler call.
pub struct CommandContext<'a> {
    pub registry: &'a Registry,
    pub collaborators: &'a Collaborators,
    pub settings: &'a DispatchSettings,
    pub forwarding: &'a ForwardSwitches,
}

impl<'a> CommandContext<'a> {
    pub fn store(&self) -> Option<&'a dyn MessageStore> {
        self.collaborators.store()
    }

    /// The prefix used when showing command names to users.
    pub fn prefix(&self) -> char {
        self.settings.prefixes.first().copied().unwrap_or('/')
    }

    /// Commands `msg` could invoke, in registration order.
    pub fn eligible_commands(&self, msg: Option<&Message>) -> Vec<&'a CommandEntry> {
        self.registry
            .commands()
            .filter(|c| c.rule.admits(msg, self.collaborators))
            .collect()
    }
}

/// An explicit command such as `/help`.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, ctx: &CommandContext<'_>, req: &Request) -> HandlerResult;
}

/// A passive reaction to messages that are not commands.
#[async_trait]
pub trait GeneralHandler: Send + Sync {
    async fn call(&self, ctx: &CommandContext<'_>, msg: &Message) -> HandlerResult;
}

/// Wraps a synchronous closure as a [`CommandHandler`].
pub struct FnCommand<F>(pub F);

#[async_trait]
impl<F> CommandHandler for FnCommand<F>
where
    F: Fn(&CommandContext<'_>, &Request) -> HandlerResult + Send + Sync,
{
    async fn call(&self, ctx: &CommandContext<'_>, req: &Request) -> HandlerResult {
        (self.0)(ctx, req)
    }
}

/// Wraps a synchronous closure as a [`GeneralHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> GeneralHandler for FnHandler<F>
where
    F: Fn(&CommandContext<'_>, &Message) -> HandlerResult + Send + Sync,
{
    async fn call(&self, ctx: &CommandContext<'_>, msg: &Message) -> HandlerResult {
        (self.0)(ctx, msg)
    }
}

/// Eligibility predicates of a command or handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    pub protocols: Option<Vec<String>>,
    pub classes: Option<Vec<ConversationClass>>,
    pub dependency: Option<String>,
}

impl Rule {
    /// True if an entry with this rule may run for `msg`.
    ///
    /// A protocol-restricted entry needs an originating message. The class
    /// filter only applies when there is one.
    pub fn admits(&self, msg: Option<&Message>, active: &Collaborators) -> bool {
        if let Some(protocols) = &self.protocols {
            match msg {
                Some(m) if protocols.iter().any(|p| *p == m.protocol) => {}
                _ => return false,
            }
        }
        if let (Some(classes), Some(m)) = (&self.classes, msg)
            && !classes.contains(&m.class)
        {
            return false;
        }
        match &self.dependency {
            Some(dep) => active.provides(dep),
            None => true,
        }
    }
}

/// Registration record for a command or handler.
#[derive(Debug, Clone)]
pub struct Spec {
    name: String,
    usage: Option<String>,
    rule: Rule,
    enabled: bool,
}

impl Spec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: None,
            rule: Rule::default(),
            enabled: true,
        }
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule.protocols = Some(protocols.into_iter().map(Into::into).collect());
        self
    }

    pub fn classes<I>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = ConversationClass>,
    {
        self.rule.classes = Some(classes.into_iter().collect());
        self
    }

    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.rule.dependency = Some(name.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

pub struct CommandEntry {
    pub name: String,
    pub usage: Option<String>,
    pub rule: Rule,
    pub handler: Arc<dyn CommandHandler>,
}

pub struct HandlerEntry {
    pub name: String,
    pub rule: Rule,
    pub handler: Arc<dyn GeneralHandler>,
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("rule", &self.rule)
            .finish()
    }
}

#[derive(Default)]
pub struct Registry {
    commands: Vec<CommandEntry>,
    index: HashMap<String, usize>,
    handlers: Vec<HandlerEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Disabled specs are skipped; returns whether the command
    /// was added. Re-registering a name replaces the entry in place.
    pub fn register_command(&mut self, spec: Spec, handler: impl CommandHandler + 'static) -> bool {
        if !spec.enabled {
            debug!(command = %spec.name, "command disabled, not registered");
            return false;
        }
        let entry = CommandEntry {
            name: spec.name.clone(),
            usage: spec.usage,
            rule: spec.rule,
            handler: Arc::new(handler),
        };
        match self.index.get(&spec.name) {
            Some(&i) => self.commands[i] = entry,
            None => {
                self.index.insert(spec.name, self.commands.len());
                self.commands.push(entry);
            }
        }
        true
    }

    /// Add a general handler. Disabled specs are skipped.
    pub fn register_handler(&mut self, spec: Spec, handler: impl GeneralHandler + 'static) -> bool {
        if !spec.enabled {
            debug!(handler = %spec.name, "handler disabled, not registered");
            return false;
        }
        self.handlers.push(HandlerEntry {
            name: spec.name,
            rule: spec.rule,
            handler: Arc::new(handler),
        });
        true
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.index.get(name).map(|&i| &self.commands[i])
    }

    /// Commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandEntry> {
        self.commands.iter()
    }

    /// General handlers in registration order.
    pub fn handlers(&self) -> &[HandlerEntry] {
        &self.handlers
    }
}
