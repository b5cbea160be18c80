// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pastebin backed by an external program.
//!
//! The program receives the text on stdin and prints the paste URL as the
//! first line of its stdout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use ripple_config::model::{PastebinConfig, PastebinKind};
use ripple_core::{NoPastebin, Pastebin, RippleError};

const PASTE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CommandPastebin {
    argv: Vec<String>,
    max_size: usize,
}

impl CommandPastebin {
    pub fn new(argv: Vec<String>, max_size: usize) -> Self {
        Self { argv, max_size }
    }

    async fn run(&self, text: &str) -> Result<String, RippleError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| RippleError::Config("pastebin.command is empty".into()))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RippleError::Internal(format!("failed to spawn {program}: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| RippleError::Internal(format!("writing to {program} failed: {e}")))?;
        }
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RippleError::Internal(format!("{program} failed: {e}")))?;
        if !output.status.success() {
            return Err(RippleError::Internal(format!(
                "{program} exited with {}",
                output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().next().map(str::trim) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(url.to_string()),
            other => Err(RippleError::Internal(format!(
                "{program} printed no URL: {:?}",
                other.unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl Pastebin for CommandPastebin {
    async fn paste_text(&self, text: &str) -> Result<String, RippleError> {
        if text.len() > self.max_size {
            return Err(RippleError::NotSupported(format!(
                "text of {} bytes exceeds the paste limit",
                text.len()
            )));
        }
        match tokio::time::timeout(PASTE_TIMEOUT, self.run(text)).await {
            Ok(Ok(url)) => {
                debug!(url = %url, bytes = text.len(), "text pasted");
                Ok(url)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "paste failed");
                Err(e)
            }
            Err(_) => Err(RippleError::Timeout {
                duration: PASTE_TIMEOUT,
            }),
        }
    }
}

/// Build the configured pastebin.
pub fn pastebin_from_config(config: &PastebinConfig) -> Arc<dyn Pastebin> {
    match config.kind {
        PastebinKind::None => Arc::new(NoPastebin),
        PastebinKind::Command => Arc::new(CommandPastebin::new(config.command.clone(), config.max_size)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn first_stdout_line_is_the_url() {
        let paste = CommandPastebin::new(sh("cat >/dev/null; echo https://paste.example/abc; echo extra"), 1024);
        assert_eq!(paste.paste_text("long text").await.unwrap(), "https://paste.example/abc");
    }

    #[tokio::test]
    async fn non_url_output_is_an_error() {
        let paste = CommandPastebin::new(sh("cat >/dev/null; echo oops"), 1024);
        assert!(paste.paste_text("x").await.is_err());
    }

    #[tokio::test]
    async fn failing_program_is_an_error() {
        let paste = CommandPastebin::new(sh("cat >/dev/null; exit 3"), 1024);
        assert!(paste.paste_text("x").await.is_err());
    }

    #[tokio::test]
    async fn oversized_text_is_not_supported() {
        let paste = CommandPastebin::new(sh("echo https://never"), 4);
        assert!(matches!(
            paste.paste_text("too long").await,
            Err(RippleError::NotSupported(_))
        ));
    }

    #[tokio::test]
    async fn none_kind_pastes_nothing() {
        let paste = pastebin_from_config(&PastebinConfig::default());
        assert!(paste.paste_text("x").await.is_err());
    }
}
