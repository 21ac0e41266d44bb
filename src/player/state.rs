//! Player roster: identity, the swap-and-pop player table, and the
//! id-to-index lookup invariant.
//!
//! Grounded on `PlayerManager`'s `players[1024]`/`player_lookup[65536]` pair
//! in `PlayerManager.cpp`/`.h`. Lookups treat `u16::MAX` as the sentinel for
//! "no such player" rather than a bound that can never actually be hit (see
//! `DESIGN.md`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{SmallTick, Tick, Vec2};
use crate::events::{EventBus, GameEvent};
use crate::player::attach::{ArenaIndex, AttachArena};

/// Minimal inline "bitflags"-shaped status type, since togglable status is a
/// single byte with five meaningful bits rather than a large flag set that
/// would justify pulling in the `bitflags` crate.
macro_rules! bitflags_like_status {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $ty:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $name($ty);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub const fn from_bits(bits: $ty) -> Self {
                $name(bits)
            }

            pub const fn bits(self) -> $ty {
                self.0
            }

            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn set(&mut self, other: $name, value: bool) {
                if value {
                    self.0 |= other.0;
                } else {
                    self.0 &= !other.0;
                }
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

/// A player id as carried on the wire. `PlayerId::INVALID` (`0xFFFF`) marks
/// "no player" in fields like `attach_parent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

impl PlayerId {
    pub const INVALID: PlayerId = PlayerId(0xFFFF);

    #[inline]
    pub fn is_invalid(self) -> bool {
        self == PlayerId::INVALID
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        PlayerId::INVALID
    }
}

bitflags_like_status! {
    /// Per-player togglable capability bits carried in position packets.
    pub struct PlayerStatus: u8 {
        const STEALTH  = 1 << 0;
        const CLOAK    = 1 << 1;
        const XRADAR   = 1 << 2;
        const ANTIWARP = 1 << 3;
        const FLASH    = 1 << 4;
    }
}

/// Counts of held non-weapon-slot items, carried in the extended position
/// packet trailer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub shields: bool,
    pub super_: bool,
    pub bursts: u8,
    pub repels: u8,
    pub thors: u8,
    pub bricks: u8,
    pub decoys: u8,
    pub rockets: u8,
    pub portals: u8,
}

/// One connected player (or the local self).
#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub squad: String,
    pub ship: u8,
    pub frequency: u16,
    pub kill_points: u32,
    pub flag_points: u32,
    pub wins: u16,
    pub losses: u16,
    pub koth: bool,

    pub position: Vec2,
    pub velocity: Vec2,
    pub orientation: f32,
    pub status: PlayerStatus,
    pub ping: u16,
    pub bounty: u32,
    pub energy: u32,
    pub weapon: u16,
    pub timestamp: SmallTick,
    pub last_extra_timestamp: u32,

    pub flags: u16,
    pub flag_timer: u32,
    pub items: ItemCounts,
    pub ball_carrier: bool,

    pub attach_parent: PlayerId,
    pub children: Option<ArenaIndex>,

    pub enter_delay: f32,
    pub warp_anim_t: f32,
    pub explode_anim_t: f32,
    pub bombflash_anim_t: f32,

    pub lerp_time: f32,
    pub lerp_velocity: Vec2,
    pub last_bounce_tick: Tick,
    pub last_repel_timestamp: Tick,
}

impl Player {
    pub(crate) fn new(id: PlayerId) -> Self {
        Player {
            id,
            name: String::new(),
            squad: String::new(),
            ship: 8,
            frequency: 0,
            kill_points: 0,
            flag_points: 0,
            wins: 0,
            losses: 0,
            koth: false,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            orientation: 0.0,
            status: PlayerStatus::empty(),
            ping: 0,
            bounty: 0,
            energy: 0,
            weapon: 0,
            timestamp: SmallTick::INVALID,
            last_extra_timestamp: 0,
            flags: 0,
            flag_timer: 0,
            items: ItemCounts::default(),
            ball_carrier: false,
            attach_parent: PlayerId::INVALID,
            children: None,
            enter_delay: 0.0,
            warp_anim_t: ANIM_DURATION_SHIP_WARP,
            explode_anim_t: ANIM_DURATION_SHIP_EXPLODE,
            bombflash_anim_t: ANIM_DURATION_BOMB_FLASH,
            lerp_time: 0.0,
            lerp_velocity: Vec2::ZERO,
            last_bounce_tick: Tick(0),
            last_repel_timestamp: Tick(0),
        }
    }

    pub fn is_spectator(&self) -> bool {
        self.ship >= 8
    }
}

pub const ANIM_DURATION_SHIP_WARP: f32 = 0.5;
pub const ANIM_DURATION_SHIP_EXPLODE: f32 = 0.8;
pub const ANIM_DURATION_BOMB_FLASH: f32 = 0.12;

/// How stale a player's last position timestamp may be before it's treated
/// as "not synchronized" and excluded from antiwarp/weapon-collision checks.
pub const PLAYER_TIMEOUT_DEFAULT: i32 = 500;

const INVALID_INDEX: u16 = u16::MAX;

/// The player roster: a dense, swap-and-pop array plus an id-to-index
/// lookup table maintained as an invariant across every enter/leave.
pub struct PlayerManager {
    pub self_id: PlayerId,
    players: Vec<Player>,
    lookup: Box<[u16; 65536]>,
    pub attach: AttachArena,
    pub received_initial_list: bool,
}

impl Default for PlayerManager {
    fn default() -> Self {
        PlayerManager {
            self_id: PlayerId::INVALID,
            players: Vec::new(),
            lookup: Box::new([INVALID_INDEX; 65536]),
            attach: AttachArena::new(),
            received_initial_list: false,
        }
    }
}

impl PlayerManager {
    pub fn new() -> Self {
        PlayerManager::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        let index = self.lookup[id.0 as usize];
        if index == INVALID_INDEX {
            None
        } else {
            self.players.get(index as usize)
        }
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        let index = self.lookup[id.0 as usize];
        if index == INVALID_INDEX {
            None
        } else {
            self.players.get_mut(index as usize)
        }
    }

    pub fn get_self(&self) -> Option<&Player> {
        self.get(self.self_id)
    }

    pub fn get_self_mut(&mut self) -> Option<&mut Player> {
        let id = self.self_id;
        self.get_mut(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Reset the roster when the local player's own id changes (e.g. on
    /// reconnect), invalidating every lookup entry.
    pub fn on_player_id_change(&mut self, new_id: PlayerId) {
        self.self_id = new_id;
        self.players.clear();
        self.received_initial_list = false;
        self.lookup.fill(INVALID_INDEX);
    }

    /// Insert a newly-entering player, returning a mutable handle to it so
    /// the caller can finish populating its fields from the packet.
    pub fn on_player_enter(&mut self, id: PlayerId, events: &mut EventBus) -> &mut Player {
        let index = self.players.len() as u16;
        self.players.push(Player::new(id));
        self.lookup[id.0 as usize] = index;
        events.publish(GameEvent::PlayerEnter { player_id: id });
        &mut self.players[index as usize]
    }

    /// Remove a leaving player, maintaining the lookup-table invariant via
    /// the exact three-step swap-and-pop sequence: repoint the
    /// about-to-move last player's lookup entry, invalidate the leaver's
    /// own entry, then move the last player into the vacated slot.
    pub fn on_player_leave(&mut self, id: PlayerId, events: &mut EventBus) {
        if self.lookup[id.0 as usize] == INVALID_INDEX {
            return;
        }

        self.detach_player(id, events);
        self.detach_all_children(id);
        events.publish(GameEvent::PlayerLeave { player_id: id });

        let index = self.lookup[id.0 as usize] as usize;
        let last = self.players.len() - 1;
        let last_id = self.players[last].id;

        self.lookup[last_id.0 as usize] = index as u16;
        self.lookup[id.0 as usize] = INVALID_INDEX;
        self.players.swap_remove(index);
    }

    /// Walk `player`'s attach parent chain and remove it from its parent's
    /// children list, then clear its own `attach_parent`/`timestamp`.
    pub fn detach_player(&mut self, id: PlayerId, events: &mut EventBus) {
        let parent_id = match self.get(id) {
            Some(p) if !p.attach_parent.is_invalid() => p.attach_parent,
            _ => PlayerId::INVALID,
        };

        if !parent_id.is_invalid() {
            if let Some(parent) = self.get(parent_id) {
                let head = parent.children;
                let new_head = self.attach.remove(head, id);
                if let Some(parent) = self.get_mut(parent_id) {
                    parent.children = new_head;
                }
                events.publish(GameEvent::PlayerDetach { player_id: id });
            }
        }

        if let Some(player) = self.get_mut(id) {
            player.attach_parent = PlayerId::INVALID;
            player.timestamp = SmallTick::INVALID;
        }
    }

    /// Detach every child attached to `player`, invalidating each child's
    /// `attach_parent`/`timestamp` in turn.
    pub fn detach_all_children(&mut self, id: PlayerId) {
        let head = match self.get(id) {
            Some(p) => p.children,
            None => return,
        };

        for child_id in self.attach.children(head).collect::<Vec<_>>() {
            if let Some(child) = self.get_mut(child_id) {
                if child.attach_parent == id {
                    child.attach_parent = PlayerId::INVALID;
                    child.timestamp = SmallTick::INVALID;
                }
            }
        }

        let head = self.attach.clear(head);
        if let Some(player) = self.get_mut(id) {
            player.children = head;
        }
    }

    /// True if `player` has reported a position within the synchronization
    /// timeout, or is the local self (who is always synchronized to
    /// themselves).
    pub fn is_synchronized(&self, player: &Player, current_small_tick: SmallTick, timeout: i32) -> bool {
        if player.id == self.self_id {
            return true;
        }
        if player.timestamp.is_invalid() {
            return false;
        }
        crate::core::tick::small_tick_diff(current_small_tick.0, player.timestamp.0).abs() < timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_events() -> EventBus {
        EventBus::new()
    }

    #[test]
    fn enter_then_lookup_resolves_to_same_player() {
        let mut manager = PlayerManager::new();
        let mut events = new_events();
        manager.on_player_enter(PlayerId(5), &mut events);
        assert_eq!(manager.get(PlayerId(5)).unwrap().id, PlayerId(5));
        assert!(manager.get(PlayerId(6)).is_none());
    }

    #[test]
    fn swap_and_pop_keeps_lookup_consistent_across_rapid_enter_leave() {
        let mut manager = PlayerManager::new();
        let mut events = new_events();

        for id in 0..10u16 {
            manager.on_player_enter(PlayerId(id), &mut events);
        }

        // Remove from the middle; the formerly-last player (9) must now
        // resolve to the vacated slot, and 5 must resolve to nothing.
        manager.on_player_leave(PlayerId(5), &mut events);

        assert!(manager.get(PlayerId(5)).is_none());
        for id in [0, 1, 2, 3, 4, 6, 7, 8, 9] {
            assert_eq!(manager.get(PlayerId(id)).unwrap().id, PlayerId(id));
        }
        assert_eq!(manager.len(), 9);

        // Repeated enter/leave cycles must never desync the table.
        for round in 0..50u16 {
            let id = PlayerId(100 + round);
            manager.on_player_enter(id, &mut events);
            manager.on_player_leave(id, &mut events);
            assert!(manager.get(id).is_none());
        }
        assert_eq!(manager.len(), 9);
    }

    #[test]
    fn on_player_id_change_invalidates_whole_table() {
        let mut manager = PlayerManager::new();
        let mut events = new_events();
        manager.on_player_enter(PlayerId(1), &mut events);
        manager.on_player_id_change(PlayerId(1));
        assert!(manager.get(PlayerId(1)).is_none());
        assert_eq!(manager.len(), 0);
    }
}
