// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime on/off switches for forwarding into each protocol.
//!
//! Switches start enabled, can be restored from the store at startup, and
//! are flipped by the `forward` command, which also persists them.

use dashmap::DashMap;
use tracing::{debug, warn};

use ripple_core::{MessageStore, RippleError};

#[derive(Debug, Default)]
pub struct ForwardSwitches {
    disabled: DashMap<String, bool>,
}

impl ForwardSwitches {
    pub fn new() -> Self {
        Self::default()
    }

    /// State key under which the switch for `protocol` is persisted.
    pub fn state_key(protocol: &str) -> String {
        format!("forward.{protocol}")
    }

    pub fn is_enabled(&self, protocol: &str) -> bool {
        !self.disabled.get(protocol).is_some_and(|d| *d)
    }

    pub fn set(&self, protocol: &str, enabled: bool) {
        self.disabled.insert(protocol.to_string(), !enabled);
    }

    /// Set and persist the switch for `protocol`.
    pub async fn save(
        &self,
        store: &dyn MessageStore,
        protocol: &str,
        enabled: bool,
    ) -> Result<(), RippleError> {
        self.set(protocol, enabled);
        store
            .save_state(&Self::state_key(protocol), &serde_json::Value::Bool(enabled))
            .await
    }

    /// Restore the persisted switches of `protocols`.
    pub async fn restore(&self, store: &dyn MessageStore, protocols: &[String]) {
        for protocol in protocols {
            match store.load_state(&Self::state_key(protocol)).await {
                Ok(Some(serde_json::Value::Bool(enabled))) => {
                    debug!(protocol = %protocol, enabled, "restored forward switch");
                    self.set(protocol, enabled);
                }
                Ok(Some(other)) => {
                    warn!(protocol = %protocol, value = %other, "ignoring malformed forward switch");
                }
                Ok(None) => {}
                Err(e) => warn!(protocol = %protocol, error = %e, "failed to load forward switch"),
            }
        }
    }
}
