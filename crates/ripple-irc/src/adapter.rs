// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The IRC protocol adapter.
//!
//! One adapter relays one channel. The receive loop owns the connection;
//! `send` and `forward` only lay out lines and queue them in the outbox,
//! which the loop drains at the configured rate once the channel is joined.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use irc::client::prelude::{Client, Command, Config};
use irc::proto::Message as IrcMessage;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ripple_config::model::{BotConfig, IrcConfig};
use ripple_core::naming::DEFAULT_NAME_LIMIT;
use ripple_core::{
    BusHandle, Collaborator, CollaboratorKind, ConversationClass, HealthStatus, Message,
    Pastebin, ProtocolAdapter, Response, ResponseFormat, RippleError, User, UserType, unix_now,
};

use crate::format::{colored, gray, markdown_to_irc};
use crate::inbound::{Channel, InboundFilter, NickCache};
use crate::outbox::{Outbox, Outgoing, Priority};
use crate::wrap::{Layout, Thresholds, long_text};

const NAME: &str = "irc";
const NICK_CACHE_SIZE: usize = 32;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Connection progress, as seen by health checks and the send loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Joined,
}

pub struct IrcAdapter {
    config: IrcConfig,
    identity: User,
    dest: User,
    bus: BusHandle,
    pastebin: Arc<dyn Pastebin>,
    filter: InboundFilter,
    nicks: NickCache,
    outbox: Mutex<Outbox>,
    queued: Notify,
    state: watch::Sender<LinkState>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl IrcAdapter {
    pub fn new(
        config: IrcConfig,
        bot: &BotConfig,
        bus: BusHandle,
        pastebin: Arc<dyn Pastebin>,
    ) -> Result<Self, RippleError> {
        for (field, value) in [
            ("irc.server", &config.server),
            ("irc.nickname", &config.nickname),
            ("irc.channel", &config.channel),
        ] {
            if value.trim().is_empty() {
                return Err(RippleError::Config(format!("{field} is required for the IRC adapter")));
            }
        }

        let identity = User {
            first_name: Some(bot.fullname.clone()),
            alias: Some(bot.nickname.clone()),
            ..User::named(NAME, config.nickname.clone())
        };
        let dest = User {
            user_type: UserType::Group,
            first_name: Some(config.channel.clone()),
            alias: Some(bot.group_name.clone()),
            ..User::named(NAME, config.channel.clone())
        };
        let filter = InboundFilter::new(&config)?;
        let outbox = Outbox::new(Duration::from_millis(config.send_interval_ms));
        let (state, _) = watch::channel(LinkState::Disconnected);

        Ok(Self {
            config,
            identity,
            dest,
            bus,
            pastebin,
            filter,
            nicks: NickCache::new(NICK_CACHE_SIZE),
            outbox: Mutex::new(outbox),
            queued: Notify::new(),
            state,
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// The relayed channel as a conversation user.
    pub fn channel_user(&self) -> &User {
        &self.dest
    }

    pub fn link_state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Lines waiting to be sent, in send order.
    pub async fn pending_lines(&self) -> Vec<Outgoing> {
        self.outbox.lock().await.snapshot()
    }

    fn irc_config(&self) -> Config {
        Config {
            nickname: Some(self.config.nickname.clone()),
            username: self.config.ident.clone(),
            realname: self.config.realname.clone(),
            server: Some(self.config.server.clone()),
            port: Some(self.config.port),
            use_tls: Some(self.config.tls),
            password: self.config.password.clone(),
            channels: vec![self.config.channel.clone()],
            ..Config::default()
        }
    }

    fn name_prefix(&self, user: &User) -> String {
        let name = self.nicks.smartname(user, DEFAULT_NAME_LIMIT);
        if self.config.colored {
            format!("[{}] ", colored(user, &name))
        } else {
            format!("[{name}] ")
        }
    }

    fn marker(&self, text: &str) -> String {
        if self.config.colored {
            format!("{} ", gray(text))
        } else {
            format!("{text} ")
        }
    }

    async fn enqueue(&self, priority: Priority, time: i64, target: &str, lines: Vec<String>) {
        let mut outbox = self.outbox.lock().await;
        for line in lines {
            outbox.push(priority, time, target, line);
        }
        drop(outbox);
        self.queued.notify_one();
    }

    /// One connection: connect, identify, relay until the link drops or
    /// the adapter is closed.
    async fn session(&self) -> Result<(), RippleError> {
        self.state.send_replace(LinkState::Connecting);
        let mut client = Client::from_config(self.irc_config())
            .await
            .map_err(|e| RippleError::protocol(NAME, format!("connect failed: {e}")))?;
        client
            .identify()
            .map_err(|e| RippleError::protocol(NAME, format!("identify failed: {e}")))?;
        let mut stream = client
            .stream()
            .map_err(|e| RippleError::protocol(NAME, e.to_string()))?;
        info!(server = %self.config.server, channel = %self.config.channel, "connected to IRC");

        let tick = Duration::from_millis(self.config.poll_interval_ms.max(1));
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = client.send_quit("");
                    return Ok(());
                }
                item = stream.next() => match item {
                    Some(Ok(message)) => self.handle(&client, message).await,
                    Some(Err(e)) => {
                        return Err(RippleError::protocol(NAME, format!("stream error: {e}")));
                    }
                    None => return Err(RippleError::protocol(NAME, "connection closed")),
                },
                _ = self.queued.notified() => {}
                _ = tokio::time::sleep(tick) => {}
            }
            self.flush(&client).await?;
        }
    }

    /// Send at most what the rate limit allows right now.
    async fn flush(&self, client: &Client) -> Result<(), RippleError> {
        if self.link_state() != LinkState::Joined {
            return Ok(());
        }
        let mut outbox = self.outbox.lock().await;
        while outbox.wait(Instant::now()).is_zero() {
            let Some(item) = outbox.pop() else {
                break;
            };
            if let Err(e) = client.send_privmsg(&item.target, &item.line) {
                outbox.requeue(item);
                return Err(RippleError::protocol(NAME, format!("send failed: {e}")));
            }
            outbox.mark_sent(Instant::now());
        }
        Ok(())
    }

    async fn handle(&self, client: &Client, message: IrcMessage) {
        let nick = message.source_nickname().map(str::to_string);
        let own = client.current_nickname().to_string();
        match message.command {
            Command::JOIN(ref chan, _, _) if nick.as_deref() == Some(own.as_str()) => {
                if chan.eq_ignore_ascii_case(&self.config.channel) {
                    info!(channel = %chan, "joined channel");
                    self.state.send_replace(LinkState::Joined);
                } else {
                    debug!(channel = %chan, "leaving unexpected channel");
                    let _ = client.send_part(chan.as_str());
                    let _ = client.send_join(&self.config.channel);
                }
            }
            Command::KICK(ref chan, ref victim, _)
                if victim.eq_ignore_ascii_case(&own) && chan.eq_ignore_ascii_case(&self.config.channel) =>
            {
                warn!(channel = %chan, "kicked from channel, rejoining");
                self.state.send_replace(LinkState::Connecting);
                let _ = client.send_join(&self.config.channel);
            }
            Command::PRIVMSG(ref target, ref text) => {
                let Some(nick) = nick else {
                    return;
                };
                let at = Channel {
                    own_nick: &own,
                    channel: &self.config.channel,
                    chat: &self.dest,
                };
                if let Some(msg) = self
                    .filter
                    .normalize(&nick, target, text, &at, &self.nicks, unix_now())
                    && let Err(e) = self.bus.post(msg).await
                {
                    warn!(error = %e, "dropping inbound IRC message");
                }
            }
            _ => {}
        }
    }

    fn echo(&self, chat: User, text: String, class: ConversationClass) -> Message {
        Message::text(NAME, self.identity.clone(), chat, text, unix_now(), class)
    }
}

#[async_trait]
impl Collaborator for IrcAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Protocol
    }

    async fn health_check(&self) -> Result<HealthStatus, RippleError> {
        Ok(match self.link_state() {
            LinkState::Joined => HealthStatus::Healthy,
            LinkState::Connecting => HealthStatus::Degraded("joining channel".into()),
            LinkState::Disconnected => HealthStatus::Degraded("not connected".into()),
        })
    }

    async fn close(&self) -> Result<(), RippleError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("IRC adapter closing");
            self.cancel.cancel();
        }
        Ok(())
    }
}

#[async_trait]
impl ProtocolAdapter for IrcAdapter {
    fn identity(&self) -> User {
        self.identity.clone()
    }

    async fn start_polling(&self) -> Result<(), RippleError> {
        let mut backoff = Duration::from_secs(1);
        while !self.cancel.is_cancelled() {
            let started = Instant::now();
            let result = self.session().await;
            self.state.send_replace(LinkState::Disconnected);
            match result {
                Ok(()) => break,
                Err(e) => warn!(error = %e, retry_in = ?backoff, "IRC session ended"),
            }
            if started.elapsed() > MAX_BACKOFF {
                backoff = Duration::from_secs(1);
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
        info!("IRC adapter stopped");
        Ok(())
    }

    async fn send(
        &self,
        response: &Response,
        protocol: &str,
        _forwarded: Option<&Message>,
    ) -> Result<Option<Message>, RippleError> {
        let text = match response.info.format_for(protocol) {
            ResponseFormat::Markdown => markdown_to_irc(&response.text),
            ResponseFormat::Plain | ResponseFormat::Forward { .. } => response.text.clone(),
            ResponseFormat::Media { .. } | ResponseFormat::Opaque { .. } => response
                .info
                .alt_text
                .clone()
                .unwrap_or_else(|| response.text.clone()),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }

        let reply = response.reply.as_ref();
        let private = reply.is_some_and(|m| m.class == ConversationClass::Private);
        let (target, chat, class) = match reply {
            Some(m) if private => (
                m.chat.username.clone().unwrap_or_default(),
                m.chat.clone(),
                ConversationClass::Private,
            ),
            _ => (self.config.channel.clone(), self.dest.clone(), ConversationClass::Group),
        };
        if target.is_empty() {
            return Err(RippleError::protocol(NAME, "reply target has no nick"));
        }

        let prefix = match reply {
            Some(m) if !private => {
                let name = self.nicks.smartname(&m.src, DEFAULT_NAME_LIMIT);
                self.marker(&format!("{name}:"))
            }
            _ => String::new(),
        };
        let layout = Layout {
            prefix: &prefix,
            lead: "",
            paste_text: Some(&response.text),
            action: false,
            reply: true,
        };
        let lines = long_text(
            &text,
            layout,
            self.config.line_length,
            Thresholds::default(),
            self.pastebin.as_ref(),
        )
        .await;
        self.enqueue(Priority::Reply, unix_now(), &target, lines).await;

        let mut echo = self.echo(chat, text, class);
        echo.alt_text = Some(response.text.clone()).filter(|t| Some(t) != echo.text.as_ref());
        echo.reply = reply.cloned().map(Arc::new);
        Ok(Some(echo))
    }

    async fn forward(&self, msg: &Message, _protocol: &str) -> Result<Option<Message>, RippleError> {
        if self.filter.proxy_protocols().any(|p| p == msg.protocol) {
            return Ok(None);
        }
        let Some(text) = msg
            .text
            .as_deref()
            .or(msg.alt_text.as_deref())
            .filter(|t| !t.trim().is_empty())
        else {
            return Ok(None);
        };

        let prefix = self.name_prefix(&msg.src);
        let lead = if let Some(fwd) = &msg.fwd_src {
            let name = self.nicks.smartname(fwd, DEFAULT_NAME_LIMIT);
            self.marker(&format!("Fwd {name}:"))
        } else if let Some(reply) = &msg.reply {
            let name = self.nicks.smartname(&reply.src, DEFAULT_NAME_LIMIT);
            self.marker(&format!("{name}:"))
        } else {
            String::new()
        };
        let action = msg.media.as_ref().is_some_and(|m| m.is_action());
        let layout = Layout {
            prefix: &prefix,
            lead: &lead,
            paste_text: None,
            action,
            reply: false,
        };
        let mut lines = long_text(
            text,
            layout,
            self.config.line_length,
            Thresholds::default(),
            self.pastebin.as_ref(),
        )
        .await;
        if action {
            for line in &mut lines {
                *line = format!("\x01ACTION {line}\x01");
            }
        }
        let wire = lines.join("\n");
        let channel = self.config.channel.clone();
        self.enqueue(Priority::Forward, msg.time, &channel, lines).await;

        let mut echo = self.echo(self.dest.clone(), wire, ConversationClass::Group);
        echo.media = msg.media.clone();
        Ok(Some(echo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{Media, NoPastebin};

    fn adapter(colored: bool) -> IrcAdapter {
        let config = IrcConfig {
            enabled: true,
            server: "irc.example.net".into(),
            nickname: "ripple".into(),
            channel: "#ripple".into(),
            colored,
            ..IrcConfig::default()
        };
        let (bus, _rx) = BusHandle::channel(4);
        IrcAdapter::new(config, &BotConfig::default(), bus, Arc::new(NoPastebin)).unwrap()
    }

    fn from(protocol: &str, name: &str, text: &str, time: i64) -> Message {
        let chat = User {
            user_type: UserType::Group,
            ..User::named(protocol, "group")
        };
        Message::text(protocol, User::named(protocol, name), chat, text, time, ConversationClass::Group)
    }

    #[test]
    fn missing_channel_is_rejected() {
        let (bus, _rx) = BusHandle::channel(1);
        let config = IrcConfig {
            server: "irc.example.net".into(),
            nickname: "ripple".into(),
            ..IrcConfig::default()
        };
        let err = IrcAdapter::new(config, &BotConfig::default(), bus, Arc::new(NoPastebin));
        assert!(matches!(err, Err(RippleError::Config(_))));
    }

    #[tokio::test]
    async fn forward_prefixes_sender_and_marks_replies() {
        let irc = adapter(false);
        let mut msg = from("socket", "alice", "sure", 5);
        msg.reply = Some(Arc::new(from("socket", "bob", "ok?", 4)));

        let echo = irc.forward(&msg, "irc").await.unwrap().unwrap();
        assert_eq!(echo.text.as_deref(), Some("[alice] bob: sure"));
        assert_eq!(echo.src, irc.identity());

        let queued = irc.pending_lines().await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].target, "#ripple");
        assert_eq!(queued[0].priority, Priority::Forward);
    }

    #[tokio::test]
    async fn actions_become_ctcp() {
        let irc = adapter(false);
        let mut msg = from("socket", "alice", "waves", 1);
        msg.media = Some(Media::action());
        irc.forward(&msg, "irc").await.unwrap();
        let queued = irc.pending_lines().await;
        assert_eq!(queued[0].line, "\x01ACTION [alice] waves\x01");
    }

    #[tokio::test]
    async fn colored_names_and_forward_marker() {
        let irc = adapter(true);
        let mut msg = from("socket", "alice", "look", 1);
        msg.fwd_src = Some(User::named("socket", "carol"));
        irc.forward(&msg, "irc").await.unwrap();
        let line = &irc.pending_lines().await[0].line;
        assert!(line.starts_with(&format!("[{}] ", colored(&msg.src, "alice"))));
        assert!(line.ends_with(&format!("{} look", gray("Fwd carol:"))));
    }

    #[tokio::test]
    async fn replies_jump_the_queue() {
        let irc = adapter(false);
        irc.forward(&from("socket", "alice", "first", 1), "irc").await.unwrap();
        let question = from("irc", "dave", "/help", 2);
        let resp = Response::plain("*Commands*", Some(question));
        let echo = irc.send(&resp, "irc", None).await.unwrap().unwrap();
        assert_eq!(echo.chat, *irc.channel_user());

        let lines: Vec<String> = irc.pending_lines().await.into_iter().map(|o| o.line).collect();
        assert_eq!(lines, vec!["dave: *Commands*", "[alice] first"]);
    }

    #[tokio::test]
    async fn private_replies_go_to_the_nick() {
        let irc = adapter(false);
        let dave = User::named("irc", "dave");
        let question = Message::text("irc", dave.clone(), dave, "/help", 1, ConversationClass::Private);
        let mut resp = Response::plain("*bold*", Some(question));
        resp.info = ripple_core::ResponseInfo::markdown();

        let echo = irc.send(&resp, "irc", None).await.unwrap().unwrap();
        assert_eq!(echo.class, ConversationClass::Private);
        assert_eq!(echo.alt_text.as_deref(), Some("*bold*"));

        let queued = irc.pending_lines().await;
        assert_eq!(queued[0].target, "dave");
        assert_eq!(queued[0].line, "\x02bold\x02");
    }

    #[tokio::test]
    async fn long_replies_keep_head_and_tail() {
        let irc = adapter(false);
        let resp = Response::plain("a\nb\nc\nd", None);
        irc.send(&resp, "irc", None).await.unwrap();
        let lines: Vec<String> = irc.pending_lines().await.into_iter().map(|o| o.line).collect();
        assert_eq!(lines, vec!["a […]", "d"]);
    }

    #[tokio::test]
    async fn proxied_protocols_are_not_echoed_back() {
        let mut config = IrcConfig {
            server: "irc.example.net".into(),
            nickname: "ripple".into(),
            channel: "#ripple".into(),
            ..IrcConfig::default()
        };
        config.proxies.push(ripple_config::model::ProxyConfig {
            protocol: "tox".into(),
            nick: "OrzTox".into(),
            pattern: r"\[(.+?)\] (.*)".into(),
        });
        let (bus, _rx) = BusHandle::channel(1);
        let irc = IrcAdapter::new(config, &BotConfig::default(), bus, Arc::new(NoPastebin)).unwrap();
        assert!(irc.forward(&from("tox", "x", "hi", 1), "irc").await.unwrap().is_none());
        assert!(irc.pending_lines().await.is_empty());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_polling() {
        let irc = adapter(false);
        irc.close().await.unwrap();
        irc.close().await.unwrap();
        irc.start_polling().await.unwrap();
        assert_eq!(irc.link_state(), LinkState::Disconnected);
        assert!(matches!(irc.health_check().await.unwrap(), HealthStatus::Degraded(_)));
    }
}
