// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text message logger.
//!
//! The file is reopened for every line so external log rotation can move it
//! away at any time.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use ripple_core::{
    Collaborator, CollaboratorKind, HealthStatus, Message, MessageLogger, RippleError, smartname,
};

pub struct TextLogger {
    path: PathBuf,
    offset: FixedOffset,
    write_lock: Mutex<()>,
}

impl TextLogger {
    pub fn new(path: impl Into<PathBuf>, timezone_offset_hours: i32) -> Self {
        let offset =
            FixedOffset::east_opt(timezone_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
        Self {
            path: path.into(),
            offset,
            write_lock: Mutex::new(()),
        }
    }

    /// One log line, without the trailing newline.
    pub fn format_line(&self, msg: &Message) -> String {
        let time = DateTime::from_timestamp(msg.time, 0)
            .map(|t| t.with_timezone(&self.offset).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| msg.time.to_string());
        let native = msg.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        let name = msg
            .src
            .alias
            .clone()
            .unwrap_or_else(|| smartname(&msg.src, 20));
        format!(
            "{time} [{}:{native}] {name} >> {}",
            msg.protocol,
            msg.text.as_deref().unwrap_or_default()
        )
    }
}

fn io_err(e: std::io::Error) -> RippleError {
    RippleError::Storage {
        source: Box::new(e),
    }
}

#[async_trait]
impl Collaborator for TextLogger {
    fn name(&self) -> &str {
        "text"
    }

    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Logger
    }

    async fn health_check(&self) -> Result<HealthStatus, RippleError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => Ok(HealthStatus::Unhealthy(
                format!("log directory {} does not exist", dir.display()),
            )),
            _ => Ok(HealthStatus::Healthy),
        }
    }

    async fn close(&self) -> Result<(), RippleError> {
        Ok(())
    }
}

#[async_trait]
impl MessageLogger for TextLogger {
    async fn log(&self, msg: &Message) -> Result<(), RippleError> {
        if !msg.is_group() {
            return Ok(());
        }
        let mut line = self.format_line(msg);
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{ConversationClass, User};

    fn message(text: &str) -> Message {
        let mut m = Message::text(
            "irc",
            User::named("irc", "alice"),
            User::named("irc", "#chan"),
            text,
            1_700_000_000,
            ConversationClass::Group,
        );
        m.pid = Some(12);
        m
    }

    #[test]
    fn formats_line_in_local_time() {
        let logger = TextLogger::new("/dev/null", 8);
        assert_eq!(
            logger.format_line(&message("hello")),
            "2023-11-15 06:13:20 [irc:12] alice >> hello"
        );
    }

    #[tokio::test]
    async fn appends_group_messages_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");
        let logger = TextLogger::new(&path, 0);

        logger.log(&message("one")).await.unwrap();
        let mut private = message("secret");
        private.class = ConversationClass::Private;
        logger.log(&private).await.unwrap();
        logger.log(&message("two")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("alice >> one"));
        assert!(lines[1].ends_with("alice >> two"));
    }
}
