// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ripple chat relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Ripple configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RippleConfig {
    /// Bot identity and process settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Dispatcher and bus settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Active message loggers.
    #[serde(default)]
    pub loggers: LoggersConfig,

    /// Long-text hosting.
    #[serde(default)]
    pub pastebin: PastebinConfig,

    /// IRC adapter.
    #[serde(default)]
    pub irc: IrcConfig,

    /// Local socket adapter.
    #[serde(default)]
    pub socket: SocketConfig,

    /// External command helper process.
    #[serde(default)]
    pub external: ExternalConfig,
}

impl RippleConfig {
    /// Names of the protocol adapters enabled by this configuration.
    pub fn enabled_protocols(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.irc.enabled {
            names.push("irc");
        }
        if self.socket.enabled {
            names.push("socket");
        }
        names
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Short name the bot answers to.
    #[serde(default = "default_nickname")]
    pub nickname: String,

    /// Full display name.
    #[serde(default = "default_fullname")]
    pub fullname: String,

    /// Display name of the relayed group.
    #[serde(default = "default_group_name")]
    pub group_name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Offset from UTC applied when formatting timestamps for people.
    #[serde(default)]
    pub timezone_offset_hours: i32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            fullname: default_fullname(),
            group_name: default_group_name(),
            log_level: default_log_level(),
            timezone_offset_hours: 0,
        }
    }
}

fn default_nickname() -> String {
    "ripple".to_string()
}

fn default_fullname() -> String {
    "Ripple Relay".to_string()
}

fn default_group_name() -> String {
    "Group".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Characters that start a command.
    #[serde(default = "default_command_prefixes")]
    pub command_prefixes: String,

    /// Maximum message age for forwarding and command dispatch.
    #[serde(default = "default_liveness_window_secs")]
    pub liveness_window_secs: u64,

    /// Adapter whose echo of a bot reply is logged.
    #[serde(default)]
    pub main_protocol: Option<String>,

    /// Adapters that receive forwards of group messages.
    #[serde(default)]
    pub forward: Vec<String>,

    /// Maximum concurrently running fan-out tasks.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Recently logged messages kept in memory.
    #[serde(default = "default_message_cache_size")]
    pub message_cache_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            command_prefixes: default_command_prefixes(),
            liveness_window_secs: default_liveness_window_secs(),
            main_protocol: None,
            forward: Vec::new(),
            pool_size: default_pool_size(),
            message_cache_size: default_message_cache_size(),
        }
    }
}

fn default_command_prefixes() -> String {
    "/'".to_string()
}

fn default_liveness_window_secs() -> u64 {
    120
}

fn default_pool_size() -> usize {
    10
}

fn default_message_cache_size() -> usize {
    50
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ripple").join("chatlog.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatlog.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Logger selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggersConfig {
    /// Log group messages to the SQLite store.
    #[serde(default = "default_true")]
    pub sqlite: bool,

    /// Also append a plain-text log to this file.
    #[serde(default)]
    pub text: Option<String>,
}

impl Default for LoggersConfig {
    fn default() -> Self {
        Self {
            sqlite: true,
            text: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Kind of pastebin backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PastebinKind {
    #[default]
    None,
    /// Pipe the text into an external program that prints a URL.
    Command,
}

/// Pastebin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PastebinConfig {
    #[serde(default)]
    pub kind: PastebinKind,

    /// Program and arguments for `kind = "command"`.
    #[serde(default)]
    pub command: Vec<String>,

    /// Texts larger than this many bytes are refused.
    #[serde(default = "default_paste_max_size")]
    pub max_size: usize,
}

impl Default for PastebinConfig {
    fn default() -> Self {
        Self {
            kind: PastebinKind::None,
            command: Vec::new(),
            max_size: default_paste_max_size(),
        }
    }
}

fn default_paste_max_size() -> usize {
    64 * 1024
}

/// A relay bot on the IRC channel re-broadcasting another network.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Protocol name attributed to relayed messages.
    pub protocol: String,
    /// Regex matched against the relay bot's nick.
    pub nick: String,
    /// Regex with two groups: original sender and text.
    pub pattern: String,
}

/// IRC adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IrcConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub server: String,

    #[serde(default = "default_irc_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub tls: bool,

    /// Nickname used on the network.
    #[serde(default)]
    pub nickname: String,

    #[serde(default)]
    pub ident: Option<String>,

    #[serde(default)]
    pub realname: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// The single channel relayed by this adapter.
    #[serde(default)]
    pub channel: String,

    /// Regex of nicks whose messages are dropped.
    #[serde(default)]
    pub ignored_user: Option<String>,

    /// Color sender names in forwarded lines.
    #[serde(default)]
    pub colored: bool,

    /// Maximum UTF-8 byte length of one PRIVMSG body.
    #[serde(default = "default_line_length")]
    pub line_length: usize,

    /// Minimum interval between two sends.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Receive loop tick.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub proxies: Vec<ProxyConfig>,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: String::new(),
            port: default_irc_port(),
            tls: true,
            nickname: String::new(),
            ident: None,
            realname: None,
            password: None,
            channel: String::new(),
            ignored_user: None,
            colored: false,
            line_length: default_line_length(),
            send_interval_ms: default_send_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            proxies: Vec::new(),
        }
    }
}

fn default_irc_port() -> u16 {
    6697
}

fn default_line_length() -> usize {
    420
}

fn default_send_interval_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    200
}

/// Local socket adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SocketConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Filesystem path of the Unix domain socket.
    #[serde(default = "default_socket_path")]
    pub path: String,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_socket_path(),
        }
    }
}

fn default_socket_path() -> String {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ripple.sock")
        .display()
        .to_string()
}

/// External command helper configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Program and arguments of the helper.
    #[serde(default)]
    pub command: Vec<String>,

    /// Command names answered by the helper.
    #[serde(default)]
    pub commands: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RippleConfig::default();
        assert_eq!(config.dispatch.command_prefixes, "/'");
        assert_eq!(config.dispatch.liveness_window_secs, 120);
        assert_eq!(config.dispatch.pool_size, 10);
        assert_eq!(config.dispatch.message_cache_size, 50);
        assert_eq!(config.irc.line_length, 420);
        assert_eq!(config.irc.send_interval_ms, 500);
        assert_eq!(config.irc.poll_interval_ms, 200);
        assert!(config.loggers.sqlite);
        assert!(config.enabled_protocols().is_empty());
    }

    #[test]
    fn enabled_protocols_lists_adapters() {
        let mut config = RippleConfig::default();
        config.irc.enabled = true;
        config.socket.enabled = true;
        assert_eq!(config.enabled_protocols(), vec!["irc", "socket"]);
    }
}
