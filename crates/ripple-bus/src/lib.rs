// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing for the Ripple chat relay.
//!
//! The [`Bus`] receives everything adapters post and hands it to the
//! [`Dispatcher`], which:
//! - logs group messages through every logger
//! - forwards live group messages to the other protocols
//! - parses commands and runs the matching command or general handler
//! - delivers the response through the adapters
//!
//! Side effects run on a [`TaskPool`] with one FIFO lane per collaborator.

pub mod bus;
pub mod collaborators;
pub mod dispatcher;
pub mod forwarding;
pub mod parse;
pub mod pool;
pub mod registry;

pub use bus::Bus;
pub use collaborators::Collaborators;
pub use dispatcher::{DispatchSettings, Dispatcher, Disposition};
pub use forwarding::ForwardSwitches;
pub use parse::parse_command;
pub use pool::TaskPool;
pub use registry::{
    CommandContext, CommandEntry, CommandHandler, FnCommand, FnHandler, GeneralHandler,
    HandlerResult, Registry, Reply, Rule, Spec,
};
