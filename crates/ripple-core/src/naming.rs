// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display-name helpers.

use crate::types::User;

/// Default width used by adapters when prefixing relayed lines.
pub const DEFAULT_NAME_LIMIT: usize = 20;

/// Pick the most recognizable short display name for `user`.
///
/// Handles are preferred on protocols where they are the visible name; the
/// bot-API family shows real names, so the alias or first/last name wins
/// there. Names longer than `limit` characters are cut back to a word
/// boundary when possible.
pub fn smartname(user: &User, limit: usize) -> String {
    let username = user.username.as_deref().filter(|s| !s.is_empty());
    let alias = user.alias.as_deref().filter(|s| !s.is_empty());
    let first = user.first_name.as_deref().filter(|s| !s.is_empty());

    let mut name = if let (false, Some(u)) = (user.protocol.starts_with("telegram"), username) {
        u.to_string()
    } else if let Some(a) = alias {
        a.to_string()
    } else if let Some(f) = first {
        match user.last_name.as_deref().filter(|s| !s.is_empty()) {
            Some(l) => format!("{f} {l}"),
            None => f.to_string(),
        }
    } else if let Some(u) = username {
        u.to_string()
    } else {
        let unknown: String = "Unknown".chars().take(limit.saturating_sub(2)).collect();
        format!("<{unknown}>")
    };

    while name.chars().count() > limit {
        match name.rsplit_once(' ') {
            Some((head, _)) => name = head.to_string(),
            None => name = name.chars().take(limit).collect(),
        }
    }
    name.trim_end_matches([' ', '-', '|', '[', ']']).to_string()
}
