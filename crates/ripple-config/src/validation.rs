// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: cross-references between
//! sections, regex syntax, and required fields of enabled adapters.

use regex::Regex;

use crate::diagnostic::ConfigError;
use crate::model::{PastebinKind, RippleConfig};

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &RippleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let protocols = config.enabled_protocols();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path", "must not be empty"));
    }

    let dispatch = &config.dispatch;
    if dispatch.command_prefixes.is_empty() {
        errors.push(ConfigError::invalid(
            "dispatch.command_prefixes",
            "must contain at least one character",
        ));
    }
    if dispatch.pool_size == 0 {
        errors.push(ConfigError::invalid("dispatch.pool_size", "must be at least 1"));
    }
    if dispatch.liveness_window_secs == 0 {
        errors.push(ConfigError::invalid(
            "dispatch.liveness_window_secs",
            "must be at least 1",
        ));
    }
    if dispatch.message_cache_size == 0 {
        errors.push(ConfigError::invalid(
            "dispatch.message_cache_size",
            "must be at least 1",
        ));
    }
    for name in &dispatch.forward {
        if !protocols.contains(&name.as_str()) {
            errors.push(ConfigError::invalid(
                "dispatch.forward",
                format!("`{name}` is not an enabled protocol"),
            ));
        }
    }
    if let Some(main) = &dispatch.main_protocol
        && !protocols.contains(&main.as_str())
    {
        errors.push(ConfigError::invalid(
            "dispatch.main_protocol",
            format!("`{main}` is not an enabled protocol"),
        ));
    }

    if config.irc.enabled {
        let irc = &config.irc;
        for (key, value) in [
            ("irc.server", &irc.server),
            ("irc.nickname", &irc.nickname),
            ("irc.channel", &irc.channel),
        ] {
            if value.trim().is_empty() {
                errors.push(ConfigError::invalid(key, "required when irc is enabled"));
            }
        }
        if !irc.channel.is_empty() && !irc.channel.starts_with(['#', '&']) {
            errors.push(ConfigError::invalid(
                "irc.channel",
                format!("`{}` is not a channel name", irc.channel),
            ));
        }
        if irc.line_length < 64 {
            errors.push(ConfigError::invalid("irc.line_length", "must be at least 64"));
        }
        if let Some(pattern) = &irc.ignored_user {
            check_regex(&mut errors, "irc.ignored_user", pattern);
        }
        for (i, proxy) in irc.proxies.iter().enumerate() {
            check_regex(&mut errors, &format!("irc.proxies[{i}].nick"), &proxy.nick);
            if let Some(re) = check_regex(&mut errors, &format!("irc.proxies[{i}].pattern"), &proxy.pattern)
                && re.captures_len() < 3
            {
                errors.push(ConfigError::invalid(
                    format!("irc.proxies[{i}].pattern"),
                    "needs two capture groups (sender, text)",
                ));
            }
        }
    }

    if config.socket.enabled && config.socket.path.trim().is_empty() {
        errors.push(ConfigError::invalid("socket.path", "required when socket is enabled"));
    }

    if config.external.enabled && config.external.command.is_empty() {
        errors.push(ConfigError::invalid(
            "external.command",
            "required when external is enabled",
        ));
    }

    if config.pastebin.kind == PastebinKind::Command && config.pastebin.command.is_empty() {
        errors.push(ConfigError::invalid(
            "pastebin.command",
            "required when pastebin.kind = \"command\"",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_regex(errors: &mut Vec<ConfigError>, key: &str, pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            errors.push(ConfigError::invalid(key, format!("invalid regex: {e}")));
            None
        }
    }
}
