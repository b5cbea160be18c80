// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limited send queue.
//!
//! Command replies go out before relayed lines; relayed lines go out in the
//! order their source messages were written.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Reply = 0,
    Forward = 1,
}

/// One PRIVMSG waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Outgoing {
    pub priority: Priority,
    /// Source message time, for relayed lines.
    pub time: i64,
    seq: u64,
    pub target: String,
    pub line: String,
}

#[derive(Debug)]
pub struct Outbox {
    queue: BinaryHeap<Reverse<Outgoing>>,
    seq: u64,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl Outbox {
    pub fn new(interval: Duration) -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
            interval,
            last_sent: None,
        }
    }

    pub fn push(&mut self, priority: Priority, time: i64, target: &str, line: String) {
        self.seq += 1;
        self.queue.push(Reverse(Outgoing {
            priority,
            time,
            seq: self.seq,
            target: target.to_string(),
            line,
        }));
    }

    pub fn pop(&mut self) -> Option<Outgoing> {
        self.queue.pop().map(|Reverse(item)| item)
    }

    /// Put back a line whose send failed, keeping its place.
    pub fn requeue(&mut self, item: Outgoing) {
        self.queue.push(Reverse(item));
    }

    pub fn mark_sent(&mut self, at: Instant) {
        self.last_sent = Some(at);
    }

    /// How long to wait before the next line may go out.
    pub fn wait(&self, now: Instant) -> Duration {
        match self.last_sent {
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued lines in send order.
    pub fn snapshot(&self) -> Vec<Outgoing> {
        let mut items: Vec<Outgoing> = self.queue.iter().map(|Reverse(o)| o.clone()).collect();
        items.sort();
        items
    }
}
