// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming deduplication of time-ordered message logs.
//!
//! Historical logs from several protocols usually record the same
//! conversation more than once: the bot-API log, the IRC log with relayed
//! lines, and a client export all contain the same messages a few seconds
//! apart. [`DedupMerge`] keeps a short window of pending messages, folds
//! each new arrival into a matching pending one, and emits pending messages
//! in arrival order once they fall out of the window.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

use ripple_core::{Media, Message};

/// A relayed line on the line protocol: `[name] text`.
static RELAYED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.+?)\] (.*)$").expect("relayed line pattern is valid"));

/// Tuning for [`DedupMerge`].
#[derive(Debug, Clone)]
pub struct MergePolicy {
    /// Maximum time distance between two records of the same message.
    pub slack_secs: i64,
    /// Protocols from highest to lowest priority.
    pub priority: Vec<String>,
    /// Protocol whose relayed lines may quote another protocol's text.
    pub line_protocol: String,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            slack_secs: 4,
            priority: vec!["telegrambot".into(), "irc".into(), "telegramcli".into()],
            line_protocol: "irc".into(),
        }
    }
}

impl MergePolicy {
    fn rank(&self, protocol: &str) -> usize {
        self.priority
            .iter()
            .position(|p| p == protocol)
            .unwrap_or(self.priority.len())
    }

    /// The record to keep out of two duplicates. Ties keep the earlier one.
    pub fn winner(&self, kept: Message, arrived: Message) -> Message {
        if self.rank(&arrived.protocol) < self.rank(&kept.protocol) {
            arrived
        } else {
            kept
        }
    }

    /// True if `a` and `b` record the same message.
    pub fn same_message(&self, a: &Message, b: &Message) -> bool {
        if a.pid.is_some() && a.pid == b.pid && a.chat.key() == b.chat.key() {
            return true;
        }
        if a.src.key() == b.src.key()
            && a.chat.key() == b.chat.key()
            && a.text == b.text
            && a.fwd_src.as_ref().map(|u| u.key()) == b.fwd_src.as_ref().map(|u| u.key())
            && Media::equivalent(a.media.as_ref(), b.media.as_ref())
        {
            return true;
        }
        self.quotes(a, b) || self.quotes(b, a)
    }

    /// True if `relay` is a relayed line whose text contains all of `other`'s.
    fn quotes(&self, relay: &Message, other: &Message) -> bool {
        if relay.protocol != self.line_protocol || other.protocol == self.line_protocol {
            return false;
        }
        match (relay.text.as_deref(), other.text.as_deref()) {
            (Some(line), Some(text)) if !text.is_empty() => {
                RELAYED_LINE.is_match(line) && line.contains(text)
            }
            _ => false,
        }
    }
}

/// Iterator adapter removing duplicates from a time-ordered message stream.
pub struct DedupMerge<I> {
    input: I,
    policy: MergePolicy,
    window: VecDeque<Message>,
    ready: VecDeque<Message>,
    merged: usize,
}

impl<I: Iterator<Item = Message>> DedupMerge<I> {
    pub fn new(input: I, policy: MergePolicy) -> Self {
        Self {
            input,
            policy,
            window: VecDeque::new(),
            ready: VecDeque::new(),
            merged: 0,
        }
    }

    /// Number of duplicates folded so far.
    pub fn merged(&self) -> usize {
        self.merged
    }

    fn accept(&mut self, msg: Message) {
        while let Some(front) = self.window.front() {
            if msg.time - front.time > self.policy.slack_secs {
                if let Some(expired) = self.window.pop_front() {
                    self.ready.push_back(expired);
                }
            } else {
                break;
            }
        }

        let matched = self
            .window
            .iter()
            .position(|pending| self.policy.same_message(pending, &msg));
        match matched {
            Some(i) => {
                let kept = self.window[i].clone();
                self.window[i] = self.policy.winner(kept, msg);
                self.merged += 1;
            }
            None => self.window.push_back(msg),
        }
    }
}

impl<I: Iterator<Item = Message>> Iterator for DedupMerge<I> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        loop {
            if let Some(msg) = self.ready.pop_front() {
                return Some(msg);
            }
            match self.input.next() {
                Some(msg) => self.accept(msg),
                None => return self.window.pop_front(),
            }
        }
    }
}

/// Merge per-source streams into one stream ordered by `(time, native id)`.
/// The sort is stable, so equal keys keep source order.
pub fn interleave(sources: Vec<Vec<Message>>) -> Vec<Message> {
    let mut all: Vec<Message> = sources.into_iter().flatten().collect();
    all.sort_by_key(|m| (m.time, m.pid.unwrap_or(0)));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{ConversationClass, User, UserType};

    fn tg_user(pid: i64, username: &str) -> User {
        User {
            id: None,
            protocol: "telegram".into(),
            user_type: UserType::Individual,
            pid: Some(pid),
            username: Some(username.into()),
            first_name: None,
            last_name: None,
            alias: None,
        }
    }

    fn tg_group() -> User {
        User {
            user_type: UserType::Group,
            ..tg_user(-100, "group")
        }
    }

    fn msg(protocol: &str, src: User, chat: User, text: &str, time: i64) -> Message {
        Message::text(protocol, src, chat, text, time, ConversationClass::Group)
    }

    #[test]
    fn duplicate_within_slack_keeps_higher_priority() {
        let policy = MergePolicy::default();
        let a = msg("telegramcli", tg_user(1, "alice"), tg_group(), "hi all", 100);
        let b = msg("telegrambot", tg_user(1, "alice"), tg_group(), "hi all", 101);
        let out: Vec<Message> = DedupMerge::new(vec![a, b].into_iter(), policy).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].protocol, "telegrambot");
    }

    #[test]
    fn same_text_outside_slack_is_kept_twice() {
        let a = msg("telegramcli", tg_user(1, "alice"), tg_group(), "+1", 100);
        let b = msg("telegrambot", tg_user(1, "alice"), tg_group(), "+1", 110);
        let out: Vec<Message> =
            DedupMerge::new(vec![a, b].into_iter(), MergePolicy::default()).collect();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn native_id_match_ignores_text() {
        let mut a = msg("telegramcli", tg_user(1, "alice"), tg_group(), "edited", 100);
        let mut b = msg("telegrambot", tg_user(1, "alice"), tg_group(), "original", 102);
        a.pid = Some(555);
        b.pid = Some(555);
        let mut merge = DedupMerge::new(vec![a, b].into_iter(), MergePolicy::default());
        let out: Vec<Message> = merge.by_ref().collect();
        assert_eq!(out.len(), 1);
        assert_eq!(merge.merged(), 1);
    }

    #[test]
    fn relayed_irc_line_matches_quoted_text() {
        let irc_chan = User {
            user_type: UserType::Group,
            ..User::named("irc", "#chan")
        };
        let relay = msg(
            "irc",
            User::named("irc", "relaybot"),
            irc_chan,
            "[alice] see you tomorrow",
            200,
        );
        let original = msg("telegrambot", tg_user(1, "alice"), tg_group(), "see you tomorrow", 199);
        let out: Vec<Message> =
            DedupMerge::new(vec![original, relay].into_iter(), MergePolicy::default()).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].protocol, "telegrambot");
    }

    #[test]
    fn emits_in_arrival_order() {
        let texts = ["a", "b", "c", "d"];
        let input: Vec<Message> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| msg("irc", User::named("irc", "bob"), tg_group(), t, i as i64 * 3))
            .collect();
        let out: Vec<String> = DedupMerge::new(input.into_iter(), MergePolicy::default())
            .filter_map(|m| m.text)
            .collect();
        assert_eq!(out, texts);
    }

    #[test]
    fn interleave_orders_by_time_then_native_id() {
        let mut a = msg("irc", User::named("irc", "x"), tg_group(), "2", 5);
        a.pid = Some(2);
        let mut b = msg("irc", User::named("irc", "x"), tg_group(), "1", 5);
        b.pid = Some(1);
        let c = msg("irc", User::named("irc", "x"), tg_group(), "0", 1);
        let out = interleave(vec![vec![a], vec![c, b]]);
        let texts: Vec<&str> = out.iter().filter_map(|m| m.text.as_deref()).collect();
        assert_eq!(texts, vec!["0", "1", "2"]);
    }
}
