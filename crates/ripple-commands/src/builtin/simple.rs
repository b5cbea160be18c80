// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Introductory commands: `/start`, `/help`, and the private-chat fallback.

use std::collections::HashSet;

use async_trait::async_trait;

use ripple_bus::{CommandContext, CommandHandler, GeneralHandler, HandlerResult, Reply};
use ripple_core::{ConversationClass, Message, Request};

pub struct Start {
    greeting: String,
}

impl Start {
    pub fn new(bot_name: &str) -> Self {
        Self {
            greeting: format!("This is {bot_name}.\nSend me /help for help."),
        }
    }
}

#[async_trait]
impl CommandHandler for Start {
    async fn call(&self, _ctx: &CommandContext<'_>, _req: &Request) -> HandlerResult {
        Ok(Some(Reply::from(self.greeting.as_str())))
    }
}

/// Lists commands, or shows the usage line of one.
///
/// In a private chat on a protocol that can take multi-line replies, every
/// usage line is listed; elsewhere a compact one-line summary is sent.
pub struct Help;

impl Help {
    pub const USAGE: &'static str =
        "/help [command] List available commands or show help for some command.";
}

#[async_trait]
impl CommandHandler for Help {
    async fn call(&self, ctx: &CommandContext<'_>, req: &Request) -> HandlerResult {
        let msg = req.kwargs.message.as_ref();
        let arg = req.args.trim();
        if !arg.is_empty() {
            let name = arg.trim_start_matches(|c| ctx.settings.prefixes.contains(&c));
            let text = match ctx.registry.command(name) {
                Some(entry) => match &entry.usage {
                    Some(usage) => usage.clone(),
                    None => format!("Help is not available for {name}"),
                },
                None => "Command not found.".to_string(),
            };
            return Ok(Some(Reply::from(text)));
        }

        let eligible = ctx.eligible_commands(msg);
        let verbose = msg.is_some_and(|m| m.class == ConversationClass::Private && m.protocol != "irc");
        if verbose {
            let mut seen = HashSet::new();
            let lines: Vec<&str> = eligible
                .iter()
                .filter_map(|c| c.usage.as_deref())
                .filter(|u| seen.insert(*u))
                .collect();
            return Ok(Some(Reply::from(lines.join("\n"))));
        }

        let prefix = ctx.prefix();
        let names: Vec<String> = eligible.iter().map(|c| format!("{prefix}{}", c.name)).collect();
        Ok(Some(Reply::from(format!(
            "Commands: {}. For usage: {prefix}help [cmd]",
            names.join(", ")
        ))))
    }
}

/// Answers private messages that are not commands.
pub struct PrivateFallback {
    hint: String,
}

impl PrivateFallback {
    pub fn new(bot_name: &str) -> Self {
        Self {
            hint: format!("This is {bot_name}. Send me /help for help."),
        }
    }
}

#[async_trait]
impl GeneralHandler for PrivateFallback {
    async fn call(&self, _ctx: &CommandContext<'_>, msg: &Message) -> HandlerResult {
        if msg.class != ConversationClass::Private || msg.text.as_deref().is_none_or(str::is_empty) {
            return Ok(None);
        }
        Ok(Some(Reply::from(self.hint.as_str())))
    }
}
