// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ripple.toml` > `~/.config/ripple/ripple.toml` > `/etc/ripple/ripple.toml`
//! with environment variable overrides via `RIPPLE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RippleConfig;

/// Top-level sections that environment variables may address.
const SECTIONS: &[&str] = &[
    "bot", "dispatch", "storage", "loggers", "pastebin", "irc", "socket", "external",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ripple/ripple.toml`
/// 3. `~/.config/ripple/ripple.toml`
/// 4. `./ripple.toml`
/// 5. `RIPPLE_*` environment variables
pub fn load_config() -> Result<RippleConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RippleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RippleConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RippleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RippleConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RippleConfig::default()))
        .merge(Toml::file("/etc/ripple/ripple.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ripple/ripple.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ripple.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `RIPPLE_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `RIPPLE_DISPATCH_LIVENESS_WINDOW_SECS` maps to `dispatch.liveness_window_secs`.
fn env_provider() -> Env {
    Env::prefixed("RIPPLE_").map(|key| map_env_key(key.as_str()).into())
}

/// Figment hands over the key as written in the environment, so it is
/// lowercased before matching section names.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}
