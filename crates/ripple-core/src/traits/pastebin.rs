// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::RippleError;

/// Text hosting service used when content is too long for a backend.
#[async_trait]
pub trait Pastebin: Send + Sync + 'static {
    /// Uploads `text` and returns its URL.
    async fn paste_text(&self, text: &str) -> Result<String, RippleError>;
}

/// Pastebin used when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPastebin;

#[async_trait]
impl Pastebin for NoPastebin {
    async fn paste_text(&self, _text: &str) -> Result<String, RippleError> {
        Err(RippleError::NotSupported("no pastebin configured".into()))
    }
}
