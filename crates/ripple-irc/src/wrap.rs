// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fitting text into IRC lines.
//!
//! A PRIVMSG body has a hard byte limit. Text is split on newlines, every
//! line that does not fit together with its prefix is cut at the last
//! character boundary that does, and text that would need too many lines is
//! pasted elsewhere or shortened.

use tracing::{debug, warn};

use ripple_core::{Pastebin, RippleError};

/// Marker appended where text was dropped.
pub const ELLIPSIS: &str = " […]";

/// Bytes taken by the CTCP ACTION envelope.
pub const ACTION_OVERHEAD: usize = "\x01ACTION \x01".len();

/// Split `text` into pieces such that `prefix` plus each piece is at most
/// `max_bytes` long. Empty lines are dropped.
///
/// Pieces never split a character. If the prefix leaves no room for even
/// one character, each piece holds exactly one character.
pub fn line_wrap(text: &str, prefix: &str, max_bytes: usize) -> Vec<String> {
    let budget = max_bytes.saturating_sub(prefix.len());
    let mut out = Vec::new();
    for line in text.lines() {
        let mut rest = line;
        while rest.len() > budget {
            let cut = cut_point(rest, budget);
            out.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
    out
}

/// The largest char boundary of `s` not past `budget`, and at least one
/// character in.
fn cut_point(s: &str, budget: usize) -> usize {
    let mut cut = 0;
    for (i, c) in s.char_indices() {
        let end = i + c.len_utf8();
        if end > budget {
            break;
        }
        cut = end;
    }
    if cut == 0 {
        s.chars().next().map_or(0, char::len_utf8)
    } else {
        cut
    }
}

/// Line count thresholds above which text goes to the pastebin.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// For relayed messages.
    pub forward: usize,
    /// For command replies.
    pub reply: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            forward: 5,
            reply: 2,
        }
    }
}

/// Everything needed to lay out one outgoing message.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    /// Prepended to every line, e.g. the sender name.
    pub prefix: &'a str,
    /// Prepended to the text once, e.g. a reply marker.
    pub lead: &'a str,
    /// Text to paste instead of the wire text, if different.
    pub paste_text: Option<&'a str>,
    pub action: bool,
    pub reply: bool,
}

/// Lay out `text` as IRC lines, pasting or shortening it when it is long.
pub async fn long_text(
    text: &str,
    layout: Layout<'_>,
    line_length: usize,
    thresholds: Thresholds,
    pastebin: &dyn Pastebin,
) -> Vec<String> {
    let limit = if layout.action {
        line_length.saturating_sub(ACTION_OVERHEAD)
    } else {
        line_length
    };
    let body = format!("{}{}", layout.lead, text);
    let lines = line_wrap(&body, layout.prefix, limit);
    let max_lines = if layout.reply {
        thresholds.reply
    } else {
        thresholds.forward
    };

    if lines.len() <= max_lines {
        return lines.into_iter().map(|l| format!("{}{l}", layout.prefix)).collect();
    }

    match pastebin.paste_text(layout.paste_text.unwrap_or(text)).await {
        Ok(url) => {
            debug!(lines = lines.len(), url = %url, "long text pasted");
            return vec![format!("{}{}<long text> {url}", layout.prefix, layout.lead)];
        }
        Err(RippleError::NotSupported(_)) => {}
        Err(e) => warn!(error = %e, "failed to paste long text"),
    }
    shorten(&body, layout, limit)
}

/// Keep the head (and for replies the tail) of `body`, marking the cut.
fn shorten(body: &str, layout: Layout<'_>, limit: usize) -> Vec<String> {
    let lines = line_wrap(body, layout.prefix, limit.saturating_sub(ELLIPSIS.len()));
    let mut kept: Vec<String> = if layout.reply {
        let mut both = Vec::with_capacity(2);
        both.extend(lines.first().map(|first| format!("{first}{ELLIPSIS}")));
        both.extend(lines.last().cloned());
        both
    } else {
        lines.into_iter().take(3).collect()
    };
    if !layout.reply
        && let Some(last) = kept.last_mut()
    {
        last.push_str(ELLIPSIS);
    }
    for line in &mut kept {
        line.insert_str(0, layout.prefix);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;

    struct FixedPaste(Result<&'static str, &'static str>);

    #[async_trait]
    impl Pastebin for FixedPaste {
        async fn paste_text(&self, _text: &str) -> Result<String, RippleError> {
            match self.0 {
                Ok(url) => Ok(url.to_string()),
                Err(why) => Err(RippleError::Internal(why.to_string())),
            }
        }
    }

    fn forward(prefix: &str) -> Layout<'_> {
        Layout {
            prefix,
            lead: "",
            paste_text: None,
            action: false,
            reply: false,
        }
    }

    #[test]
    fn short_lines_are_untouched() {
        assert_eq!(line_wrap("hello\n\nworld", "[a] ", 100), vec!["hello", "world"]);
    }

    #[test]
    fn wraps_at_char_boundaries() {
        let text = "ééééé";
        let lines = line_wrap(text, "> ", 7);
        assert_eq!(lines, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn oversized_prefix_still_progresses() {
        assert_eq!(line_wrap("abc", "0123456789", 4), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn few_lines_get_the_prefix() {
        let lines = long_text("one\ntwo", forward("[a] "), 420, Thresholds::default(), &ripple_core::NoPastebin).await;
        assert_eq!(lines, vec!["[a] one", "[a] two"]);
    }

    #[tokio::test]
    async fn many_lines_are_pasted() {
        let text = (1..=8).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let paste = FixedPaste(Ok("https://paste.example/x"));
        let lines = long_text(&text, forward("[a] "), 420, Thresholds::default(), &paste).await;
        assert_eq!(lines, vec!["[a] <long text> https://paste.example/x"]);
    }

    #[tokio::test]
    async fn failed_paste_keeps_three_lines_for_forwards() {
        let text = (1..=8).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let paste = FixedPaste(Err("down"));
        let lines = long_text(&text, forward("[a] "), 420, Thresholds::default(), &paste).await;
        assert_eq!(lines, vec!["[a] 1", "[a] 2", "[a] 3 […]"]);
    }

    #[tokio::test]
    async fn failed_paste_keeps_head_and_tail_for_replies() {
        let layout = Layout {
            reply: true,
            ..forward("bob: ")
        };
        let lines = long_text("a\nb\nc\nd", layout, 420, Thresholds::default(), &ripple_core::NoPastebin).await;
        assert_eq!(lines, vec!["bob: a […]", "bob: d"]);
    }

    #[tokio::test]
    async fn action_lines_leave_room_for_ctcp() {
        let layout = Layout {
            action: true,
            ..forward("")
        };
        let text = "x".repeat(30);
        let lines = long_text(&text, layout, 20, Thresholds::default(), &ripple_core::NoPastebin).await;
        assert!(lines.iter().all(|l| l.len() + ACTION_OVERHEAD <= 20));
    }

    proptest! {
        #[test]
        fn every_line_fits_and_text_survives(
            text in "[a-zé漢😀 ]{0,300}",
            prefix in "[a-z\\[\\] ]{0,12}",
            limit in 20usize..120,
        ) {
            let lines = line_wrap(&text, &prefix, limit);
            for line in &lines {
                prop_assert!(prefix.len() + line.len() <= limit);
            }
            prop_assert_eq!(lines.concat(), text);
        }
    }
}
