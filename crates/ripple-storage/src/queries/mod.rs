// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules.
//!
//! `users` and `messages` are synchronous helpers meant to run inside a
//! single `Connection::call` closure, so that a multi-statement operation
//! holds the database thread for its whole duration.

pub mod messages;
pub mod select;
pub mod state;
pub mod users;
