//! Turf flags and prize greens (§3): the flag/green half of the
//! map/flag/green tick phase, kept thin since ownership is always
//! server-adjudicated — this only mirrors what the server reports.

use crate::core::{Tick, Vec2};
use crate::net::packet::{CollectedPrizePacket, FlagClaimPacket, FlagPositionPacket};
use crate::player::state::{PlayerId, PlayerManager};

pub const MAX_FLAGS: usize = 256;
pub const MAX_GREENS: usize = 256;

/// Unowned-flag sentinel for `GameFlag::owner`.
pub const FLAG_UNOWNED: u16 = 0xFFFF;

/// `GameFlag`'s own status bits: two flags don't justify pulling in the
/// `bitflags` crate, so this mirrors `player::state`'s inline status shape
/// directly rather than duplicating the macro across modules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlagStatus(u8);

impl FlagStatus {
    pub const DROPPED: FlagStatus = FlagStatus(1 << 0);
    pub const TURF: FlagStatus = FlagStatus(1 << 1);

    pub const fn empty() -> Self {
        FlagStatus(0)
    }

    pub fn contains(self, other: FlagStatus) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: FlagStatus, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

/// One arena flag.
#[derive(Clone, Copy, Debug)]
pub struct GameFlag {
    pub id: u16,
    pub owner: u16,
    pub position: Vec2,
    pub status: FlagStatus,
    pub hidden_end_tick: Tick,
    pub last_pickup_request_tick: Tick,
}

impl GameFlag {
    fn new(id: u16) -> Self {
        GameFlag {
            id,
            owner: FLAG_UNOWNED,
            position: Vec2::ZERO,
            status: FlagStatus::empty(),
            hidden_end_tick: Tick(0),
            last_pickup_request_tick: Tick(0),
        }
    }

    pub fn is_owned(&self) -> bool {
        self.owner != FLAG_UNOWNED
    }
}

/// A timed prize pickup on the ground.
#[derive(Clone, Copy, Debug)]
pub struct PrizeGreen {
    pub position: Vec2,
    pub end_tick: Tick,
    pub prize_id: i16,
}

/// Owns the arena's flags and prize greens, mirroring server-sent state.
pub struct FlagManager {
    flags: Vec<GameFlag>,
    greens: Vec<PrizeGreen>,
}

impl FlagManager {
    pub fn new(flag_count: u16) -> Self {
        FlagManager {
            flags: (0..flag_count.min(MAX_FLAGS as u16)).map(GameFlag::new).collect(),
            greens: Vec::new(),
        }
    }

    pub fn flag(&self, id: u16) -> Option<&GameFlag> {
        self.flags.iter().find(|f| f.id == id)
    }

    fn flag_mut(&mut self, id: u16) -> Option<&mut GameFlag> {
        self.flags.iter_mut().find(|f| f.id == id)
    }

    pub fn flags(&self) -> impl Iterator<Item = &GameFlag> {
        self.flags.iter()
    }

    pub fn greens(&self) -> impl Iterator<Item = &PrizeGreen> {
        self.greens.iter()
    }

    /// Server-reported flag position/ownership update.
    pub fn on_flag_position(&mut self, packet: &FlagPositionPacket) {
        if let Some(flag) = self.flag_mut(packet.id) {
            flag.position = Vec2::new(packet.x as f32 / 16.0, packet.y as f32 / 16.0);
            flag.owner = packet.owner;
        }
    }

    /// A player claimed (picked up) a flag; ownership transfers to the
    /// claiming player's frequency.
    pub fn on_flag_claim(&mut self, packet: &FlagClaimPacket, players: &PlayerManager, current_tick: Tick) {
        let frequency = players.get(PlayerId(packet.pid)).map(|p| p.frequency);
        if let Some(flag) = self.flag_mut(packet.id) {
            if let Some(frequency) = frequency {
                flag.owner = frequency;
            }
            flag.status.set(FlagStatus::DROPPED, false);
            flag.last_pickup_request_tick = current_tick;
        }
    }

    /// A player dropped their carried flag; it becomes pickupable again
    /// only after `flag_drop_delay` ticks.
    pub fn on_drop_flag(&mut self, packet: &FlagClaimPacket, current_tick: Tick, flag_drop_delay: u32) {
        if let Some(flag) = self.flag_mut(packet.id) {
            flag.status.set(FlagStatus::DROPPED, true);
            flag.hidden_end_tick = current_tick + flag_drop_delay;
        }
    }

    /// Bulk turf-ownership refresh: `teams[i]` is the owning frequency of
    /// the `i`-th turf flag, in flag-id order.
    pub fn on_turf_flag_update(&mut self, teams: &[u16]) {
        for (flag, &team) in self.flags.iter_mut().filter(|f| f.status.contains(FlagStatus::TURF)).zip(teams) {
            flag.owner = team;
        }
    }

    /// Whether a pickup request for `flag_id` is currently allowed: not
    /// still hidden after a drop, and not spamming the request within the
    /// same tick window.
    pub fn can_request_pickup(&self, flag_id: u16, current_tick: Tick) -> bool {
        let Some(flag) = self.flag(flag_id) else { return false };
        if flag.status.contains(FlagStatus::DROPPED) && current_tick.diff(flag.hidden_end_tick) < 0 {
            return false;
        }
        current_tick.diff(flag.last_pickup_request_tick) > 0
    }

    pub fn record_pickup_request(&mut self, flag_id: u16, current_tick: Tick) {
        if let Some(flag) = self.flag_mut(flag_id) {
            flag.last_pickup_request_tick = current_tick;
        }
    }

    /// Place a timed prize green, evicting the oldest if at capacity.
    pub fn spawn_green(&mut self, position: Vec2, prize_id: i16, current_tick: Tick, lifetime_ticks: u32) {
        if self.greens.len() >= MAX_GREENS {
            self.greens.remove(0);
        }
        self.greens.push(PrizeGreen {
            position,
            end_tick: current_tick + lifetime_ticks,
            prize_id,
        });
    }

    /// Drop expired greens past their `end_tick`.
    pub fn expire_greens(&mut self, current_tick: Tick) {
        self.greens.retain(|g| current_tick.diff(g.end_tick) < 0);
    }

    /// A green was collected (by self or another player); remove the
    /// nearest unexpired one matching the reported prize id.
    pub fn on_collected_prize(&mut self, packet: &CollectedPrizePacket, at: Vec2) {
        let _ = packet.count;
        if let Some(pos) = self
            .greens
            .iter()
            .position(|g| g.prize_id == packet.prize_id)
        {
            let nearest = self
                .greens
                .iter()
                .enumerate()
                .filter(|(_, g)| g.prize_id == packet.prize_id)
                .min_by(|(_, a), (_, b)| a.position.distance_squared(at).total_cmp(&b.position.distance_squared(at)))
                .map(|(i, _)| i)
                .unwrap_or(pos);
            self.greens.remove(nearest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_position_updates_owner_and_coordinates() {
        let mut manager = FlagManager::new(4);
        manager.on_flag_position(&FlagPositionPacket { id: 0, x: 1600, y: 1600, owner: 7 });
        let flag = manager.flag(0).unwrap();
        assert_eq!(flag.owner, 7);
        assert_eq!(flag.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn dropped_flag_is_hidden_until_drop_delay_elapses() {
        let mut manager = FlagManager::new(1);
        manager.on_drop_flag(&FlagClaimPacket { id: 0, pid: 1 }, Tick(100), 50);
        assert!(!manager.can_request_pickup(0, Tick(120)));
        assert!(manager.can_request_pickup(0, Tick(151)));
    }

    #[test]
    fn greens_expire_past_their_end_tick() {
        let mut manager = FlagManager::new(0);
        manager.spawn_green(Vec2::ZERO, 3, Tick(0), 100);
        manager.expire_greens(Tick(50));
        assert_eq!(manager.greens().count(), 1);
        manager.expire_greens(Tick(150));
        assert_eq!(manager.greens().count(), 0);
    }

    #[test]
    fn green_capacity_evicts_oldest() {
        let mut manager = FlagManager::new(0);
        for i in 0..MAX_GREENS + 5 {
            manager.spawn_green(Vec2::ZERO, i as i16, Tick(0), 1000);
        }
        assert_eq!(manager.greens().count(), MAX_GREENS);
    }
}
