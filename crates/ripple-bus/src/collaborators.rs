// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Name-keyed registry of active protocol adapters and loggers.
//!
//! Protocols and loggers share one namespace. A command dependency is a
//! plain membership test against these names.

use std::sync::Arc;

use tracing::warn;

use ripple_core::{MessageLogger, MessageStore, ProtocolAdapter, RippleError};

#[derive(Default)]
pub struct Collaborators {
    protocols: Vec<(String, Arc<dyn ProtocolAdapter>)>,
    loggers: Vec<(String, Arc<dyn MessageLogger>)>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol adapter under its own name.
    pub fn add_protocol(&mut self, adapter: Arc<dyn ProtocolAdapter>) -> Result<(), RippleError> {
        let name = adapter.name().to_string();
        self.check_free(&name)?;
        self.protocols.push((name, adapter));
        Ok(())
    }

    /// Register a logger under its own name.
    pub fn add_logger(&mut self, logger: Arc<dyn MessageLogger>) -> Result<(), RippleError> {
        let name = logger.name().to_string();
        self.check_free(&name)?;
        self.loggers.push((name, logger));
        Ok(())
    }

    fn check_free(&self, name: &str) -> Result<(), RippleError> {
        if self.provides(name) {
            return Err(RippleError::Config(format!(
                "collaborator '{name}' is registered twice"
            )));
        }
        Ok(())
    }

    /// True if a collaborator is registered as `name`.
    pub fn provides(&self, name: &str) -> bool {
        self.protocols.iter().any(|(n, _)| n == name) || self.loggers.iter().any(|(n, _)| n == name)
    }

    pub fn protocol(&self, name: &str) -> Option<&Arc<dyn ProtocolAdapter>> {
        self.protocols
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    /// Protocol adapters in registration order.
    pub fn protocols(&self) -> impl Iterator<Item = (&str, &Arc<dyn ProtocolAdapter>)> {
        self.protocols.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Loggers in registration order.
    pub fn loggers(&self) -> impl Iterator<Item = (&str, &Arc<dyn MessageLogger>)> {
        self.loggers.iter().map(|(n, l)| (n.as_str(), l))
    }

    /// The first logger backed by a queryable store.
    pub fn store(&self) -> Option<&dyn MessageStore> {
        self.loggers.iter().find_map(|(_, l)| l.as_store())
    }

    /// Every handle the bot answers to in `/cmd@handle` syntax.
    pub fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self
            .protocols
            .iter()
            .flat_map(|(_, p)| p.handles())
            .collect();
        handles.sort();
        handles.dedup();
        handles
    }

    /// Close every protocol adapter. Errors are logged.
    pub async fn close_protocols(&self) {
        for (name, adapter) in &self.protocols {
            if let Err(e) = adapter.close().await {
                warn!(protocol = %name, error = %e, "protocol close failed");
            }
        }
    }

    /// Flush and close every logger. Errors are logged.
    pub async fn close_loggers(&self) {
        for (name, logger) in &self.loggers {
            if let Err(e) = logger.commit().await {
                warn!(logger = %name, error = %e, "logger commit failed");
            }
            if let Err(e) = logger.close().await {
                warn!(logger = %name, error = %e, "logger close failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_test_utils::{MemoryLogger, MockProtocol};

    #[test]
    fn names_are_unique_across_kinds() {
        let mut c = Collaborators::new();
        c.add_protocol(Arc::new(MockProtocol::new("irc"))).unwrap();
        c.add_logger(Arc::new(MemoryLogger::new("sqlite"))).unwrap();
        assert!(c.provides("irc"));
        assert!(c.provides("sqlite"));
        assert!(!c.provides("socket"));

        let err = c.add_logger(Arc::new(MemoryLogger::new("irc"))).unwrap_err();
        assert!(matches!(err, RippleError::Config(_)));
    }

    #[test]
    fn handles_are_deduplicated() {
        let mut c = Collaborators::new();
        c.add_protocol(Arc::new(MockProtocol::with_handle("irc", "ripple")))
            .unwrap();
        c.add_protocol(Arc::new(MockProtocol::with_handle("socket", "ripple")))
            .unwrap();
        c.add_protocol(Arc::new(MockProtocol::with_handle("tg", "ripple_bot")))
            .unwrap();
        assert_eq!(c.handles(), vec!["ripple", "ripple_bot"]);
    }

    #[tokio::test]
    async fn close_protocols_reaches_every_adapter() {
        let mock = Arc::new(MockProtocol::new("irc"));
        let mut c = Collaborators::new();
        c.add_protocol(mock.clone()).unwrap();
        c.close_protocols().await;
        c.close_protocols().await;
        assert_eq!(mock.close_count(), 2);
        assert!(c.store().is_none());
    }
}
