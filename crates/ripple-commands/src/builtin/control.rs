// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands that change relay state: nicknames and forwarding switches.

use async_trait::async_trait;
use tracing::info;

use ripple_bus::{CommandContext, CommandHandler, HandlerResult, Reply};
use ripple_core::{Request, User};

/// Sets the alias other protocols see for the sender.
pub struct Nick;

impl Nick {
    pub const USAGE: &'static str = "/nick <name> Set your nickname on other platforms";
}

#[async_trait]
impl CommandHandler for Nick {
    async fn call(&self, ctx: &CommandContext<'_>, req: &Request) -> HandlerResult {
        let (Some(msg), Some(store)) = (req.kwargs.message.as_ref(), ctx.store()) else {
            return Ok(None);
        };
        let nick = req.args.trim();
        if nick.is_empty() {
            return Ok(Some(Reply::from(format!("Usage: {}", Self::USAGE))));
        }
        let renamed = User {
            alias: Some(nick.to_string()),
            ..msg.src.clone()
        };
        let stored = store.resolve(&renamed).await?;
        info!(user_id = ?stored.id, protocol = %stored.protocol, alias = nick, "nickname set");
        Ok(Some(Reply::from(format!("Set your nickname to {nick}"))))
    }
}

/// Turns forwarding into one protocol on or off, or toggles it.
pub struct Forward;

impl Forward {
    pub const USAGE: &'static str =
        "/forward <protocol> [on|off] Turn forwarding of group messages into <protocol> on or off.";
}

#[async_trait]
impl CommandHandler for Forward {
    async fn call(&self, ctx: &CommandContext<'_>, req: &Request) -> HandlerResult {
        let Some(store) = ctx.store() else {
            return Ok(None);
        };
        let mut words = req.args.split_whitespace();
        let (Some(protocol), state, None) = (words.next(), words.next(), words.next()) else {
            return Ok(Some(Reply::from(format!("Syntax error. Usage: {}", Self::USAGE))));
        };
        if ctx.collaborators.protocol(protocol).is_none() {
            return Ok(Some(Reply::from(format!("Unknown protocol: {protocol}"))));
        }
        let enabled = match state {
            Some("on") => true,
            Some("off") => false,
            None => !ctx.forwarding.is_enabled(protocol),
            Some(_) => {
                return Ok(Some(Reply::from(format!("Syntax error. Usage: {}", Self::USAGE))));
            }
        };
        ctx.forwarding.save(store, protocol, enabled).await?;
        info!(protocol, enabled, "forward switch changed");
        let word = if enabled { "enabled" } else { "disabled" };
        Ok(Some(Reply::from(format!("Forwarding to {protocol} {word}."))))
    }
}
