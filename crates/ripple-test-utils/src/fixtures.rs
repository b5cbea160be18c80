// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for users and messages.

use ripple_core::{ConversationClass, Message, User, UserType, unix_now};

/// An individual user known by handle.
pub fn user(protocol: &str, name: &str) -> User {
    User::named(protocol, name)
}

/// The shared group conversation on `protocol`.
pub fn group_chat(protocol: &str) -> User {
    User {
        user_type: UserType::Group,
        ..User::named(protocol, "#ripple")
    }
}

/// A fresh group message from `from` on `protocol`.
pub fn group_message(protocol: &str, from: &str, text: &str) -> Message {
    Message::text(
        protocol,
        user(protocol, from),
        group_chat(protocol),
        text,
        unix_now(),
        ConversationClass::Group,
    )
}

/// A fresh private message from `from` to the bot on `protocol`.
pub fn private_message(protocol: &str, from: &str, text: &str) -> Message {
    let sender = user(protocol, from);
    Message::text(
        protocol,
        sender.clone(),
        sender,
        text,
        unix_now(),
        ConversationClass::Private,
    )
}

/// A copy of `msg` timestamped `secs` seconds in the past.
pub fn aged(mut msg: Message, secs: i64) -> Message {
    msg.time -= secs;
    msg
}
