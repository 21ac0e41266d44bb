//! Chat dispatch: incoming packet handling and outgoing send regulation
//! (§4.7).

use crate::chat::queue::{ChatEntry, ChatTarget, ChatType, IncomingLog, OutgoingQueue};
use crate::events::{EventBus, GameEvent};
use crate::net::packet::{write_chat, ChatPacket};
use crate::player::state::{PlayerId, PlayerManager};

/// Frequency addressed by a team message: "any player on this frequency".
fn players_on_frequency<'a>(players: &'a PlayerManager, frequency: u16) -> impl Iterator<Item = &'a crate::player::state::Player> {
    players.iter().filter(move |p| p.frequency == frequency)
}

/// Split a `RemotePrivate` payload of the form `(name)rest of message` into
/// the sender's name and the message body. Returns the whole payload as the
/// message, with no name, if it isn't bracketed.
fn split_remote_private(payload: &str) -> (Option<&str>, &str) {
    if let Some(rest) = payload.strip_prefix('(') {
        if let Some(end) = rest.find(')') {
            return (Some(&rest[..end]), &rest[end + 1..]);
        }
    }
    (None, payload)
}

pub struct ChatController {
    pub incoming: IncomingLog,
    outgoing: OutgoingQueue,
}

impl ChatController {
    pub fn new(flood_limit: u32) -> Self {
        ChatController {
            incoming: IncomingLog::new(),
            outgoing: OutgoingQueue::new(flood_limit),
        }
    }

    /// Handle one incoming chat packet: resolve the sender's name, push to
    /// the ring, note remote-private senders for reply-to-last, and raise
    /// [`GameEvent::ChatReceived`].
    pub fn on_incoming(&mut self, packet: &ChatPacket, players: &PlayerManager, events: &mut EventBus) {
        let sender_id = PlayerId(packet.sender_id);
        let (remote_name, message) = if packet.chat_type == ChatType::RemotePrivate as u8 {
            split_remote_private(&packet.message)
        } else {
            (None, packet.message.as_str())
        };

        let sender_name = remote_name
            .map(|n| n.to_string())
            .or_else(|| players.get(sender_id).map(|p| p.name.clone()))
            .unwrap_or_default();

        if packet.chat_type == ChatType::RemotePrivate as u8 {
            if !sender_name.is_empty() {
                self.incoming.note_private_sender(&sender_name);
            }
        }

        self.incoming.push(ChatEntry {
            sender_id,
            sender_name,
            chat_type: packet.chat_type,
            sound: packet.sound,
            message: message.to_string(),
        });

        events.publish(GameEvent::ChatReceived {
            sender_id,
            chat_type: packet.chat_type,
        });
    }

    pub fn send_public(&mut self, message: impl Into<String>) {
        self.outgoing.push(ChatTarget::Public, message.into());
    }

    pub fn send_team(&mut self, message: impl Into<String>) {
        self.outgoing.push(ChatTarget::Team, message.into());
    }

    pub fn send_frequency(&mut self, frequency: u16, message: impl Into<String>) {
        self.outgoing.push(ChatTarget::Frequency(frequency), message.into());
    }

    pub fn send_private(&mut self, target_name: impl Into<String>, message: impl Into<String>) {
        self.outgoing.push(ChatTarget::Private(target_name.into()), message.into());
    }

    /// Reply to whoever sent the most recent `RemotePrivate` message, if any.
    pub fn reply_to_last_private(&mut self, message: impl Into<String>) -> bool {
        let Some(name) = self.incoming.most_recent_private_sender().map(str::to_string) else {
            return false;
        };
        self.send_private(name, message);
        true
    }

    pub fn outgoing_len(&self) -> usize {
        self.outgoing.len()
    }

    /// Drain as many outgoing messages as the flood limiter allows this
    /// tick, handing each assembled wire packet to `send`.
    pub fn update(&mut self, tick: crate::core::Tick, players: &PlayerManager, mut send: impl FnMut(Vec<u8>)) -> u32 {
        self.outgoing.drain(tick, |msg| {
            let packets = resolve_target(&msg.target, &msg.message, players);
            for packet in packets {
                send(packet);
            }
        })
    }
}

fn resolve_target(target: &ChatTarget, message: &str, players: &PlayerManager) -> Vec<Vec<u8>> {
    match target {
        ChatTarget::Public => vec![write_chat(ChatType::Public as u8, 0, 0, message)],
        ChatTarget::Team => vec![write_chat(ChatType::Team as u8, 0, 0, message)],
        ChatTarget::Frequency(freq) => players_on_frequency(players, *freq)
            .map(|p| write_chat(ChatType::Team as u8, 0, p.id.0, message))
            .collect(),
        ChatTarget::Private(name) => {
            if let Some(player) = players.get_by_name(name) {
                vec![write_chat(ChatType::Private as u8, 0, player.id.0, message)]
            } else {
                let payload = format!(":{name}:{message}");
                vec![write_chat(ChatType::RemotePrivate as u8, 0, 0, &payload)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_public_message_is_queued_and_events_fire() {
        let mut controller = ChatController::new(10);
        let mut players = PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(1), &mut events);
        if let Some(p) = players.get_mut(PlayerId(1)) {
            p.name = "alice".into();
        }

        let mut seen = 0;
        events.subscribe(move |_| seen += 1);

        let packet = ChatPacket {
            chat_type: ChatType::Public as u8,
            sound: 0,
            sender_id: 1,
            message: "hello arena".into(),
        };
        controller.on_incoming(&packet, &players, &mut events);

        assert_eq!(controller.incoming.len(), 1);
        let entry = controller.incoming.entries().next().unwrap();
        assert_eq!(entry.sender_name, "alice");
        assert_eq!(entry.message, "hello arena");
    }

    #[test]
    fn remote_private_payload_parses_sender_and_notes_mru() {
        let mut controller = ChatController::new(10);
        let players = PlayerManager::new();
        let mut events = EventBus::new();

        let packet = ChatPacket {
            chat_type: ChatType::RemotePrivate as u8,
            sound: 0,
            sender_id: 0,
            message: "(bob)hey there".into(),
        };
        controller.on_incoming(&packet, &players, &mut events);

        let entry = controller.incoming.entries().next().unwrap();
        assert_eq!(entry.sender_name, "bob");
        assert_eq!(entry.message, "hey there");
        assert_eq!(controller.incoming.most_recent_private_sender(), Some("bob"));
    }

    #[test]
    fn private_to_unknown_name_uses_remote_private_payload() {
        let players = PlayerManager::new();
        let packets = resolve_target(&ChatTarget::Private("ghost".into()), "where are you", &players);
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn send_public_is_drained_on_update() {
        let mut controller = ChatController::new(10);
        let players = PlayerManager::new();
        controller.send_public("hi");
        assert_eq!(controller.outgoing_len(), 1);

        let mut sent = Vec::new();
        controller.update(crate::core::Tick(0), &players, |bytes| sent.push(bytes));
        assert_eq!(sent.len(), 1);
        assert_eq!(controller.outgoing_len(), 0);
    }
}
