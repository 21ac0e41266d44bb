//! Event bus.
//!
//! Several systems (most notably [`crate::energy::HeuristicEnergyTracker`])
//! need to observe what other systems are doing without those systems
//! depending back on them. The original design used a process-wide
//! `Event::Dispatch` singleton; here it's an explicit `EventBus` value owned
//! by [`crate::game::GameState`] and threaded through each tick, per the
//! redesign guidance to replace singleton dispatch with an explicit context
//! object.

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::weapon::WeaponType;

/// A cross-system notification raised during a tick.
///
/// This is intentionally narrower than the wire protocol: it only carries
/// the events other *internal* systems need to react to, not every incoming
/// packet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player fired a weapon, paying its energy cost.
    WeaponFire {
        /// Player who fired.
        player_id: PlayerId,
        /// What was fired.
        weapon_type: WeaponType,
        /// Weapon level at time of fire.
        level: u8,
    },
    /// A weapon hit `target_id`, dealing damage computed by the shooter's
    /// weapon formulas.
    WeaponHit {
        /// Player whose weapon hit.
        shooter_id: PlayerId,
        /// Player hit.
        target_id: PlayerId,
        /// What hit them.
        weapon_type: WeaponType,
        /// Weapon level.
        level: u8,
        /// Whether the hit weapon was EMP-flagged.
        emp: bool,
    },
    /// A player changed frequency and/or ship.
    PlayerFreqAndShipChange {
        /// Player who changed.
        player_id: PlayerId,
    },
    /// A player entered the arena.
    PlayerEnter {
        /// Player who entered.
        player_id: PlayerId,
    },
    /// A player left the arena.
    PlayerLeave {
        /// Player who left.
        player_id: PlayerId,
    },
    /// A player was attached as a turret to `parent_id`.
    PlayerAttach {
        /// Player who attached.
        player_id: PlayerId,
        /// Ship they attached to.
        parent_id: PlayerId,
    },
    /// A player was detached from whatever they were attached to.
    PlayerDetach {
        /// Player who detached.
        player_id: PlayerId,
    },
    /// A player (re)spawned.
    PlayerSpawn {
        /// Player who spawned.
        player_id: PlayerId,
    },
    /// A player died (for any reason: weapon, bomb, self).
    PlayerDeath {
        /// Player who died.
        player_id: PlayerId,
    },
    /// A player's energy reached its maximum.
    FullEnergy {
        /// Player whose energy capped out.
        player_id: PlayerId,
    },
    /// A player lost energy due to an EMP weapon.
    EmpLoss {
        /// Player affected.
        player_id: PlayerId,
    },
    /// A player's safety-tile status toggled.
    SafetyToggle {
        /// Player affected.
        player_id: PlayerId,
        /// New safety state.
        on: bool,
    },
    /// A chat line was received and queued for dispatch.
    ChatReceived {
        /// Sender, if resolvable to a roster entry (remote-private senders
        /// not on the roster still raise this with their name looked up
        /// from the payload instead).
        sender_id: PlayerId,
        /// Wire `chat_type` byte (see [`crate::chat::queue::ChatType`]).
        chat_type: u8,
    },
    /// A powerball settled in (or was reported settled in) a goal region.
    BallGoal {
        /// Which ball scored.
        ball_id: u8,
        /// Last player to have touched the ball before it scored, if known.
        owner: Option<PlayerId>,
    },
}

/// Subscriber callback: observes an event, does not mutate the bus.
type Listener = Box<dyn FnMut(&GameEvent) + Send>;

/// Explicit, owned event dispatch context.
///
/// `EventBus` has no global state: it's created once by [`crate::game::GameState`]
/// and passed by mutable reference to whichever system needs to publish.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        EventBus {
            listeners: Vec::new(),
        }
    }

    /// Register a listener invoked for every published event.
    pub fn subscribe(&mut self, listener: impl FnMut(&GameEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Publish an event to every subscriber, in subscription order.
    pub fn publish(&mut self, event: GameEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Number of registered listeners, mainly for tests.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn publish_reaches_all_subscribers_in_order() {
        let mut bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_a = log.clone();
        bus.subscribe(move |event| {
            log_a.lock().unwrap().push(format!("a:{event:?}"));
        });
        let log_b = log.clone();
        bus.subscribe(move |event| {
            log_b.lock().unwrap().push(format!("b:{event:?}"));
        });

        bus.publish(GameEvent::PlayerEnter {
            player_id: PlayerId(1),
        });

        let entries = log.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("a:"));
        assert!(entries[1].starts_with("b:"));
    }

    #[test]
    fn bus_with_no_subscribers_does_not_panic() {
        let mut bus = EventBus::new();
        bus.publish(GameEvent::PlayerDeath {
            player_id: PlayerId(0),
        });
        assert_eq!(bus.listener_count(), 0);
    }
}
