//! Incoming chat log and outgoing flood-limited send queue (§4.7).

use std::collections::VecDeque;

use crate::core::Tick;
use crate::player::state::PlayerId;

const INCOMING_CAPACITY: usize = 64;
const PRIVATE_SENDER_CAPACITY: usize = 5;
const OUTGOING_CAPACITY: usize = 128;

/// Standard chat packet type codes (wire `chat_type` byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatType {
    Arena = 0,
    PublicMacro = 1,
    Public = 2,
    Team = 3,
    OtherTeam = 4,
    Private = 5,
    Warning = 6,
    RemotePrivate = 7,
}

/// One received chat line, as kept in the 64-slot incoming ring.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatEntry {
    pub sender_id: PlayerId,
    pub sender_name: String,
    pub chat_type: u8,
    pub sound: u8,
    pub message: String,
}

/// The incoming side: a bounded ring of received lines plus the 5-slot
/// most-recently-used list of remote-private senders (for reply-to-last).
#[derive(Default)]
pub struct IncomingLog {
    entries: VecDeque<ChatEntry>,
    private_senders: VecDeque<String>,
}

impl IncomingLog {
    pub fn new() -> Self {
        IncomingLog::default()
    }

    pub fn push(&mut self, entry: ChatEntry) {
        if self.entries.len() == INCOMING_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a remote-private sender name as most-recently-used, moving it
    /// to the front if already present and evicting the oldest past 5.
    pub fn note_private_sender(&mut self, name: &str) {
        if let Some(pos) = self.private_senders.iter().position(|n| n == name) {
            self.private_senders.remove(pos);
        }
        self.private_senders.push_front(name.to_string());
        self.private_senders.truncate(PRIVATE_SENDER_CAPACITY);
    }

    pub fn most_recent_private_sender(&self) -> Option<&str> {
        self.private_senders.front().map(|s| s.as_str())
    }

    pub fn private_senders(&self) -> impl Iterator<Item = &str> {
        self.private_senders.iter().map(|s| s.as_str())
    }
}

/// Where an outgoing chat message is addressed.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatTarget {
    Public,
    Team,
    Frequency(u16),
    /// By player name: resolved to an in-arena `Private` or a `RemotePrivate`
    /// payload at send time, depending on whether the name is on the roster.
    Private(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMessage {
    pub target: ChatTarget,
    pub message: String,
}

/// Per-message send cost for the leaky-bucket regulator (§4.7): commands
/// (`?foo`, not `??`) cost 2, public messages cost 3, everything else 1.
pub fn message_cost(target: &ChatTarget, message: &str) -> u32 {
    let is_command = message.starts_with('?') && !message.starts_with("??");
    if is_command {
        2
    } else if matches!(target, ChatTarget::Public) {
        3
    } else {
        1
    }
}

/// A bounded FIFO of outgoing messages drained by a leaky-bucket flood
/// limiter. New pushes past capacity are dropped (the producer is expected
/// to back off, not the queue).
pub struct OutgoingQueue {
    queue: VecDeque<OutgoingMessage>,
    sent_message_count: u32,
    last_check_tick: Tick,
    flood_limit: u32,
}

impl OutgoingQueue {
    pub fn new(flood_limit: u32) -> Self {
        OutgoingQueue {
            queue: VecDeque::new(),
            sent_message_count: 0,
            last_check_tick: Tick(0),
            flood_limit,
        }
    }

    /// Returns `false` if the queue was already full and the message was
    /// dropped.
    pub fn push(&mut self, target: ChatTarget, message: String) -> bool {
        if self.queue.len() >= OUTGOING_CAPACITY {
            return false;
        }
        self.queue.push_back(OutgoingMessage { target, message });
        true
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Decay the leak-bucket counter for elapsed whole seconds, halving it
    /// once per second of simulation time.
    fn decay(&mut self, tick: Tick) {
        let elapsed_ticks = tick.diff(self.last_check_tick).max(0) as u32;
        let seconds = elapsed_ticks / 100;
        if seconds > 0 {
            self.sent_message_count >>= seconds.min(31);
            self.last_check_tick = self.last_check_tick + seconds * 100;
        }
    }

    /// Drain as many queued messages as the flood limiter permits this
    /// tick, handing each to `send`. Returns how many were sent.
    pub fn drain(&mut self, tick: Tick, mut send: impl FnMut(&OutgoingMessage)) -> u32 {
        self.decay(tick);
        let mut sent = 0;
        while self.sent_message_count < self.flood_limit.saturating_sub(1) {
            let Some(next) = self.queue.pop_front() else { break };
            let cost = message_cost(&next.target, &next.message);
            send(&next);
            self.sent_message_count += cost;
            sent += 1;
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_log_evicts_oldest_past_capacity() {
        let mut log = IncomingLog::new();
        for i in 0..INCOMING_CAPACITY + 10 {
            log.push(ChatEntry {
                sender_id: PlayerId(0),
                sender_name: "a".into(),
                chat_type: 2,
                sound: 0,
                message: format!("msg {i}"),
            });
        }
        assert_eq!(log.len(), INCOMING_CAPACITY);
        assert_eq!(log.entries().next().unwrap().message, format!("msg {}", 10));
    }

    #[test]
    fn private_sender_mru_keeps_five_most_recent() {
        let mut log = IncomingLog::new();
        for name in ["a", "b", "c", "d", "e", "f"] {
            log.note_private_sender(name);
        }
        let names: Vec<_> = log.private_senders().collect();
        assert_eq!(names.len(), 5);
        assert_eq!(names[0], "f");
        assert!(!names.contains(&"a"));
    }

    #[test]
    fn command_costs_more_than_plain_private_message() {
        assert_eq!(message_cost(&ChatTarget::Private("x".into()), "?help"), 2);
        assert_eq!(message_cost(&ChatTarget::Private("x".into()), "hello"), 1);
        assert_eq!(message_cost(&ChatTarget::Public, "hello"), 3);
        assert_eq!(message_cost(&ChatTarget::Public, "??not-a-command"), 3);
    }

    #[test]
    fn flood_limiter_halves_every_second() {
        let mut queue = OutgoingQueue::new(10);
        for i in 0..20 {
            queue.push(ChatTarget::Public, format!("m{i}"));
        }

        let sent_first = queue.drain(Tick(0), |_| {});
        assert!(sent_first > 0);
        assert!(queue.sent_message_count >= queue.flood_limit - 1 || queue.is_empty());

        let sent_later = queue.drain(Tick(300), |_| {});
        assert!(sent_later > 0);
    }
}
