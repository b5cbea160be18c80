// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! mIRC formatting codes.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use ripple_core::User;

pub const BOLD: char = '\x02';
pub const COLOR: char = '\x03';
pub const RESET: char = '\x0f';
pub const ITALIC: char = '\x1d';

/// Gray, used for reply and forward markers.
const MARKER_COLOR: &str = "15";

/// Colors that read well on both light and dark backgrounds.
const PALETTE: [u8; 9] = [2, 3, 4, 5, 6, 7, 10, 12, 13];

static FORMAT_CODES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x02\x1D\x1F\x16\x0F\x06]|\x03(?:\d+(?:,\d+)?)?").expect("format code pattern is valid")
});

/// Remove bold, italic, underline, reverse, reset and color codes.
pub fn strip_formatting(text: &str) -> String {
    FORMAT_CODES.replace_all(text, "").into_owned()
}

/// Map `*bold*` and `_italic_` markup onto IRC toggles.
pub fn markdown_to_irc(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '*' => BOLD,
            '_' => ITALIC,
            other => other,
        })
        .collect()
}

/// `text` in the gray marker color, reset afterwards.
pub fn gray(text: &str) -> String {
    format!("{COLOR}{MARKER_COLOR}{text}{RESET}")
}

/// Palette color for `user`, stable across restarts.
pub fn color_of(user: &User) -> u8 {
    let seed = user
        .pid
        .filter(|pid| *pid != 0)
        .map(|pid| pid.unsigned_abs())
        .or_else(|| {
            user.username
                .as_deref()
                .filter(|u| !u.is_empty())
                .map(name_hash)
        })
        .or_else(|| user.id.map(i64::unsigned_abs))
        .unwrap_or(0);
    PALETTE[(seed % PALETTE.len() as u64) as usize]
}

fn name_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// `name` wrapped in the color assigned to `user`.
pub fn colored(user: &User, name: &str) -> String {
    format!("{COLOR}{:02}{name}{COLOR}", color_of(user))
}
