// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by protocol adapters and loggers.

use async_trait::async_trait;

use crate::error::RippleError;
use crate::types::{CollaboratorKind, HealthStatus};

/// A named participant in dispatch: either a protocol adapter or a logger.
///
/// The name is the key under which the collaborator is registered and the
/// name that command dependencies refer to.
#[async_trait]
pub trait Collaborator: Send + Sync + 'static {
    /// Returns the registry key of this collaborator instance.
    fn name(&self) -> &str;

    fn kind(&self) -> CollaboratorKind;

    /// Performs a health check and returns the collaborator's current status.
    async fn health_check(&self) -> Result<HealthStatus, RippleError>;

    /// Releases held resources. Must be idempotent.
    async fn close(&self) -> Result<(), RippleError>;
}
