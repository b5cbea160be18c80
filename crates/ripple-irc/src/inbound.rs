// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning PRIVMSG lines into canonical messages.

use std::collections::VecDeque;
use std::sync::{LazyLock, Mutex};

use regex::Regex;
use tracing::{debug, warn};

use ripple_config::model::{IrcConfig, ProxyConfig};
use ripple_core::{ConversationClass, Media, Message, RippleError, User, smartname};

use crate::format::strip_formatting;

static ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x01ACTION (.*)\x01$").expect("action pattern is valid"));

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)(\s*[:,：].+$|$)").expect("mention pattern is valid"));

/// Recently shown display names and the handles behind them.
///
/// When someone on IRC answers `Name: ...` to a relayed line, the name can be
/// turned back into an `@handle` mention for the other protocols.
#[derive(Debug)]
pub struct NickCache {
    entries: Mutex<VecDeque<(String, String)>>,
    capacity: usize,
}

impl NickCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn insert(&self, name: &str, handle: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.retain(|(n, _)| n != name);
        entries.push_front((name.to_string(), handle.to_string()));
        entries.truncate(self.capacity);
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        let at = entries.iter().position(|(n, _)| n == name)?;
        let entry = entries.remove(at)?;
        let handle = entry.1.clone();
        entries.push_front(entry);
        Some(handle)
    }

    /// Display name of `user`, remembered for mention lookups.
    pub fn smartname(&self, user: &User, limit: usize) -> String {
        let name = smartname(user, limit);
        if let Some(handle) = user.username.as_deref().filter(|h| !h.is_empty()) {
            self.insert(&name, handle);
        }
        name
    }

    /// Rewrite a leading `Name:` into `@handle:` when the name is known.
    pub fn identify_mention(&self, text: &str) -> String {
        if let Some(caps) = MENTION.captures(text)
            && let Some(handle) = self.get(&caps[1])
        {
            let rest = caps.get(2).map_or("", |m| m.as_str());
            return format!("@{handle}{rest}");
        }
        text.to_string()
    }
}

struct Proxy {
    protocol: String,
    nick: Regex,
    pattern: Regex,
}

/// Channel-side context needed to classify a line.
#[derive(Debug, Clone)]
pub struct Channel<'a> {
    /// Our current nickname.
    pub own_nick: &'a str,
    pub channel: &'a str,
    /// The conversation user for the channel.
    pub chat: &'a User,
}

/// Ignore filter and proxy re-attribution for incoming lines.
pub struct InboundFilter {
    ignored: Option<Regex>,
    proxies: Vec<Proxy>,
}

impl InboundFilter {
    pub fn new(config: &IrcConfig) -> Result<Self, RippleError> {
        let ignored = config
            .ignored_user
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| anchored(p, "irc.ignored_user"))
            .transpose()?;
        let proxies = config
            .proxies
            .iter()
            .map(Self::proxy)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ignored, proxies })
    }

    fn proxy(p: &ProxyConfig) -> Result<Proxy, RippleError> {
        Ok(Proxy {
            protocol: p.protocol.clone(),
            nick: anchored(&p.nick, "irc.proxies.nick")?,
            pattern: anchored(&p.pattern, "irc.proxies.pattern")?,
        })
    }

    /// Protocols that proxies on the channel speak for.
    pub fn proxy_protocols(&self) -> impl Iterator<Item = &str> {
        self.proxies.iter().map(|p| p.protocol.as_str())
    }

    pub fn is_ignored(&self, nick: &str) -> bool {
        self.ignored.as_ref().is_some_and(|re| re.is_match(nick))
    }

    /// Build the message for a PRIVMSG from `nick` to `target`.
    ///
    /// Returns `None` for ignored senders and for targets that are neither
    /// us nor the relayed channel.
    pub fn normalize(
        &self,
        nick: &str,
        target: &str,
        line: &str,
        at: &Channel<'_>,
        nicks: &NickCache,
        time: i64,
    ) -> Option<Message> {
        if self.is_ignored(nick) {
            debug!(nick, "ignoring line from filtered user");
            return None;
        }
        let (class, mut src, chat) = if target.eq_ignore_ascii_case(at.own_nick) {
            let user = irc_user(nick, "irc");
            (ConversationClass::Private, user.clone(), user)
        } else if target.eq_ignore_ascii_case(at.channel) {
            (ConversationClass::Group, irc_user(nick, "irc"), at.chat.clone())
        } else {
            return None;
        };

        let (mut text, media) = match ACTION.captures(line) {
            Some(caps) => (caps[1].trim().to_string(), Some(Media::action())),
            None => (line.trim().to_string(), None),
        };

        let mut protocol = "irc".to_string();
        if let Some(proxy) = self.proxies.iter().find(|p| p.nick.is_match(nick))
            && let Some(caps) = proxy.pattern.captures(&text)
            && let (Some(name), Some(body)) = (caps.get(1), caps.get(2))
        {
            protocol = proxy.protocol.clone();
            src = irc_user(name.as_str(), &proxy.protocol);
            text = body.as_str().to_string();
        }

        let alt = nicks.identify_mention(&strip_formatting(&text));
        let alt_text = (alt != text).then_some(alt);
        let mut msg = Message::text(protocol, src, chat, text, time, class);
        msg.media = media;
        msg.alt_text = alt_text;
        Some(msg)
    }
}

/// Compile `pattern` so it must match from the start, like `re.match`.
fn anchored(pattern: &str, field: &str) -> Result<Regex, RippleError> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
        warn!(field, error = %e, "invalid regex");
        RippleError::Config(format!("{field}: {e}"))
    })
}

/// A user seen on the channel, keyed by nick.
pub fn irc_user(nick: &str, protocol: &str) -> User {
    User::named(protocol, nick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::UserType;
    use ripple_core::naming::DEFAULT_NAME_LIMIT;

    fn chat() -> User {
        User {
            user_type: UserType::Group,
            ..User::named("irc", "#ripple")
        }
    }

    fn filter(config: IrcConfig) -> InboundFilter {
        InboundFilter::new(&config).unwrap()
    }

    fn config() -> IrcConfig {
        IrcConfig {
            ignored_user: Some("bot_.*".into()),
            proxies: vec![ProxyConfig {
                protocol: "tox".into(),
                nick: "OrzTox".into(),
                pattern: r"\[(.+?)\] (.*)".into(),
            }],
            ..IrcConfig::default()
        }
    }

    fn at<'a>(chat: &'a User) -> Channel<'a> {
        Channel {
            own_nick: "ripple",
            channel: "#ripple",
            chat,
        }
    }

    #[test]
    fn channel_and_private_lines_are_classified() {
        let f = filter(config());
        let nicks = NickCache::new(4);
        let chat = chat();

        let group = f.normalize("alice", "#Ripple", "hi", &at(&chat), &nicks, 10).unwrap();
        assert_eq!(group.class, ConversationClass::Group);
        assert_eq!(group.chat, chat);
        assert_eq!(group.src.username.as_deref(), Some("alice"));

        let private = f.normalize("alice_", "ripple", "psst", &at(&chat), &nicks, 10).unwrap();
        assert_eq!(private.class, ConversationClass::Private);
        assert_eq!(private.chat, private.src);
        assert_eq!(private.src.username.as_deref(), Some("alice_"));
        assert!(private.src.alias.is_none());

        assert!(f.normalize("alice", "#other", "x", &at(&chat), &nicks, 10).is_none());
    }

    #[test]
    fn ignored_users_are_dropped() {
        let f = filter(config());
        let chat = chat();
        assert!(
            f.normalize("bot_relay", "#ripple", "x", &at(&chat), &NickCache::new(1), 0)
                .is_none()
        );
        assert!(!f.is_ignored("robot_x"));
    }

    #[test]
    fn actions_are_unwrapped() {
        let f = filter(IrcConfig::default());
        let chat = chat();
        let msg = f
            .normalize("alice", "#ripple", "\x01ACTION waves \x01", &at(&chat), &NickCache::new(1), 0)
            .unwrap();
        assert_eq!(msg.text.as_deref(), Some("waves"));
        assert!(msg.media.as_ref().is_some_and(Media::is_action));
    }

    #[test]
    fn proxy_lines_are_reattributed() {
        let f = filter(config());
        let chat = chat();
        let msg = f
            .normalize("OrzTox", "#ripple", "[carol] hello", &at(&chat), &NickCache::new(1), 0)
            .unwrap();
        assert_eq!(msg.protocol, "tox");
        assert_eq!(msg.src.protocol, "tox");
        assert_eq!(msg.src.username.as_deref(), Some("carol"));
        assert_eq!(msg.text.as_deref(), Some("hello"));

        let plain = f
            .normalize("OrzTox", "#ripple", "no brackets", &at(&chat), &NickCache::new(1), 0)
            .unwrap();
        assert_eq!(plain.protocol, "irc");
        assert_eq!(f.proxy_protocols().collect::<Vec<_>>(), vec!["tox"]);
    }

    #[test]
    fn formatting_and_mentions_go_to_alt_text() {
        let f = filter(IrcConfig::default());
        let nicks = NickCache::new(4);
        let chat = chat();
        let dave = User::named("telegrambot", "dave99");
        let dave = User {
            first_name: Some("Dave".into()),
            alias: None,
            ..dave
        };
        assert_eq!(nicks.smartname(&dave, DEFAULT_NAME_LIMIT), "Dave");

        let msg = f
            .normalize("alice", "#ripple", "Dave: \x02look\x02", &at(&chat), &nicks, 0)
            .unwrap();
        assert_eq!(msg.alt_text.as_deref(), Some("@dave99: look"));

        let unchanged = f.normalize("alice", "#ripple", "plain", &at(&chat), &nicks, 0).unwrap();
        assert!(unchanged.alt_text.is_none());
    }

    #[test]
    fn nick_cache_evicts_least_recent() {
        let nicks = NickCache::new(2);
        nicks.insert("A", "a");
        nicks.insert("B", "b");
        assert_eq!(nicks.get("A").as_deref(), Some("a"));
        nicks.insert("C", "c");
        assert!(nicks.get("B").is_none());
        assert_eq!(nicks.get("A").as_deref(), Some("a"));
    }

    #[test]
    fn invalid_regex_is_a_config_error() {
        let bad = IrcConfig {
            ignored_user: Some("(".into()),
            ..IrcConfig::default()
        };
        assert!(matches!(InboundFilter::new(&bad), Err(RippleError::Config(_))));
    }
}
