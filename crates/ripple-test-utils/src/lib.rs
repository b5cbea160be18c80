// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ripple integration tests.
//!
//! Provides mock collaborators and message fixtures for fast, deterministic
//! tests without a network or a database.
//!
//! # Components
//!
//! - [`MockProtocol`] - protocol adapter capturing sends, forwards and statuses
//! - [`MemoryLogger`] - logger keeping every logged message in memory
//! - [`fixtures`] - builders for users and messages

pub mod fixtures;
pub mod memory_logger;
pub mod mock_protocol;

pub use memory_logger::MemoryLogger;
pub use mock_protocol::{MockProtocol, SentResponse};
