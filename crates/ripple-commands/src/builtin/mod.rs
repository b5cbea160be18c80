// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands that ship with the relay.

pub mod control;
pub mod history;
pub mod simple;

use ripple_bus::{Registry, Spec};
use ripple_core::ConversationClass;

use crate::{BuiltinOptions, STORAGE};

pub use control::{Forward, Nick};
pub use history::{Context, Quote, Search};
pub use simple::{Help, PrivateFallback, Start};

/// Register every built-in command and general handler.
///
/// Registration order is the order `/help` lists commands in.
pub fn register_builtins(registry: &mut Registry, options: &BuiltinOptions) {
    registry.register_command(
        Spec::new("start")
            .protocols(["telegrambot"])
            .classes([ConversationClass::Private]),
        Start::new(&options.bot_name),
    );
    registry.register_command(
        Spec::new("help").usage(Help::USAGE),
        Help,
    );
    registry.register_command(
        Spec::new("context").usage(Context::USAGE).dependency(STORAGE),
        Context::new(options.timezone),
    );
    registry.register_command(
        Spec::new("quote").usage(Quote::USAGE).dependency(STORAGE),
        Quote::new(options.timezone),
    );
    registry.register_command(
        Spec::new("search").usage(Search::USAGE).dependency(STORAGE),
        Search::new(options.timezone),
    );
    registry.register_command(
        Spec::new("nick")
            .usage(Nick::USAGE)
            .classes([ConversationClass::Private, ConversationClass::Group])
            .dependency(STORAGE),
        Nick,
    );
    registry.register_command(
        Spec::new("forward")
            .usage(Forward::USAGE)
            .classes([ConversationClass::Group])
            .dependency(STORAGE),
        Forward,
    );
    registry.register_handler(
        Spec::new("private").classes([ConversationClass::Private]),
        PrivateFallback::new(&options.bot_name),
    );
}
