// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in commands and general handlers for the Ripple chat relay.
//!
//! Everything here is registered into a [`ripple_bus::Registry`] at startup.
//! Commands that need the message log declare a dependency on the `sqlite`
//! logger and stay invisible while it is not configured.

pub mod builtin;
pub mod external;
pub mod pastebin;

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};

use ripple_bus::{Registry, Spec};
use ripple_config::model::RippleConfig;

pub use builtin::register_builtins;
pub use external::{ExternalCommand, ExternalHelper};
pub use pastebin::{CommandPastebin, pastebin_from_config};

/// Name of the collaborator storage-backed commands depend on.
pub const STORAGE: &str = "sqlite";

/// Settings the built-in commands read.
#[derive(Debug, Clone)]
pub struct BuiltinOptions {
    /// Name the bot introduces itself with.
    pub bot_name: String,
    /// Offset used when printing message times.
    pub timezone: FixedOffset,
}

impl BuiltinOptions {
    pub fn from_config(config: &RippleConfig) -> Self {
        let seconds = config.bot.timezone_offset_hours.saturating_mul(3600);
        Self {
            bot_name: config.bot.fullname.clone(),
            timezone: FixedOffset::east_opt(seconds).unwrap_or_else(utc),
        }
    }
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        Self {
            bot_name: "Ripple".to_string(),
            timezone: utc(),
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Register one command per name, each answered by `helper`.
pub fn register_external(registry: &mut Registry, helper: &Arc<ExternalHelper>, names: &[String]) {
    for name in names {
        registry.register_command(
            Spec::new(name.as_str()).usage(format!("/{name} [args] Ask the helper for {name}.")),
            ExternalCommand::new(name.as_str(), Arc::clone(helper)),
        );
    }
}
