//! Heuristic tracker for other players' energy (§4.11).
//!
//! The wire protocol only reports another player's exact energy when
//! `Settings::extra_position_data`/see-energy privileges allow it; otherwise
//! this estimates it tick-by-tick from recharge and weapon events, the same
//! way the original bot behavior layer did to judge "is this target safe to
//! engage" without the server's help.

use crate::core::Tick;
use crate::events::GameEvent;
use crate::net::connection::Settings;
use crate::player::state::{Player, PlayerId};
use crate::weapon::damage::base_damage;
use crate::weapon::types::WeaponType;

const MAX_CATCHUP_TICKS: u32 = 1000;

/// Which of a ship's three energy constants to track towards when no exact
/// value has been observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EnergyPolicy {
    /// Don't track; `tracked_energy` always returns `None`.
    None,
    Initial,
    #[default]
    Maximum,
    Average,
}

impl EnergyPolicy {
    fn target(self, ship: &crate::net::connection::ShipSettings) -> u32 {
        match self {
            EnergyPolicy::None => 0,
            EnergyPolicy::Initial => ship.initial_energy,
            EnergyPolicy::Maximum => ship.maximum_energy,
            EnergyPolicy::Average => (ship.initial_energy + ship.maximum_energy) / 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct TrackedEnergy {
    energy: i64,
    emp_ticks: u32,
}

/// Fire-cost estimate per weapon type, used since exact fire cost isn't
/// negotiated over the wire. Proportional to level, floored at a small
/// constant to avoid a zero-cost exploit reading as "always full energy".
fn fire_cost(weapon_type: WeaponType, level: u8) -> i64 {
    let base = match weapon_type {
        WeaponType::Bullet | WeaponType::BouncingBullet => 5,
        WeaponType::Bomb | WeaponType::ProximityBomb => 20,
        WeaponType::Thor => 50,
        WeaponType::Burst => 15,
        WeaponType::Repel => 20,
        WeaponType::Decoy => 30,
    };
    base + base * level as i64 / 2
}

/// Estimates every other player's energy from recharge and weapon events,
/// keyed by the full 65535-id space the same way `PlayerManager` is.
pub struct HeuristicEnergyTracker {
    policy: EnergyPolicy,
    last_tick: Tick,
    energies: Box<[TrackedEnergy]>,
}

impl HeuristicEnergyTracker {
    pub fn new(policy: EnergyPolicy) -> Self {
        HeuristicEnergyTracker {
            policy,
            last_tick: Tick(0),
            energies: vec![TrackedEnergy::default(); 65535].into_boxed_slice(),
        }
    }

    fn slot_mut(&mut self, id: PlayerId) -> &mut TrackedEnergy {
        &mut self.energies[id.0 as usize % self.energies.len()]
    }

    /// Reset a player's tracked state to the policy's starting value.
    pub fn reset(&mut self, id: PlayerId, ship: &crate::net::connection::ShipSettings) {
        let target = self.policy.target(ship);
        let slot = self.slot_mut(id);
        slot.energy = target as i64;
        slot.emp_ticks = 0;
    }

    /// Advance recharge for one player by the elapsed ticks, capped to avoid
    /// a pathological catch-up after a long gap.
    pub fn tick(&mut self, id: PlayerId, current_tick: Tick, ship: &crate::net::connection::ShipSettings) {
        if self.policy == EnergyPolicy::None {
            return;
        }
        let elapsed = current_tick.diff(self.last_tick).max(0).min(MAX_CATCHUP_TICKS as i32) as u32;
        self.last_tick = current_tick;
        let target_max = self.policy.target(ship).max(ship.maximum_energy);
        let slot = self.slot_mut(id);
        for _ in 0..elapsed {
            if slot.emp_ticks > 0 {
                slot.emp_ticks -= 1;
                continue;
            }
            slot.energy = (slot.energy + ship.initial_recharge as i64 / 1000).min(target_max as i64);
        }
    }

    pub fn on_event(&mut self, event: &GameEvent, settings: &Settings) {
        match *event {
            GameEvent::WeaponFire { player_id, weapon_type, level } => {
                let slot = self.slot_mut(player_id);
                slot.energy = (slot.energy - fire_cost(weapon_type, level)).max(0);
            }
            GameEvent::WeaponHit { target_id, weapon_type, level, emp, .. } => {
                let damage = base_damage(settings, weapon_type, level, false, 0) as i64;
                let slot = self.slot_mut(target_id);
                slot.energy = (slot.energy - damage).max(0);
                if emp {
                    let bomb_damage = settings.bomb_damage_level / 1000;
                    let seconds = crate::weapon::damage::emp_shutdown_seconds(settings, damage.max(0) as u32, bomb_damage);
                    slot.emp_ticks = (seconds * 100.0).max(0.0) as u32;
                }
            }
            GameEvent::PlayerFreqAndShipChange { player_id }
            | GameEvent::PlayerEnter { player_id }
            | GameEvent::PlayerDeath { player_id } => {
                let slot = self.slot_mut(player_id);
                slot.energy = 0;
                slot.emp_ticks = 0;
            }
            _ => {}
        }
    }

    /// The server-reported value if fresh this tick, else the tracked
    /// estimate (or `None` under policy `None`).
    pub fn energy_of(&self, player: &Player) -> Option<u32> {
        if player.timestamp.is_invalid() {
            if self.policy == EnergyPolicy::None {
                return None;
            }
            return Some(self.energies[player.id.0 as usize % self.energies.len()].energy.max(0) as u32);
        }
        Some(player.energy as u32)
    }

    pub fn tracked_energy(&self, id: PlayerId) -> Option<u32> {
        if self.policy == EnergyPolicy::None {
            return None;
        }
        Some(self.energies[id.0 as usize % self.energies.len()].energy.max(0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ShipSettings;

    fn ship() -> ShipSettings {
        ShipSettings {
            initial_energy: 1000,
            maximum_energy: 1000,
            initial_recharge: 1000,
            ..ShipSettings::default()
        }
    }

    #[test]
    fn recharges_towards_policy_max_each_tick() {
        let mut tracker = HeuristicEnergyTracker::new(EnergyPolicy::Maximum);
        let ship = ship();
        tracker.reset(PlayerId(1), &ship);
        tracker.slot_mut(PlayerId(1)).energy = 0;
        tracker.tick(PlayerId(1), Tick(1), &ship);
        assert_eq!(tracker.tracked_energy(PlayerId(1)), Some(1));
    }

    #[test]
    fn weapon_fire_subtracts_cost() {
        let mut tracker = HeuristicEnergyTracker::new(EnergyPolicy::Maximum);
        let ship = ship();
        tracker.reset(PlayerId(2), &ship);
        tracker.on_event(
            &GameEvent::WeaponFire { player_id: PlayerId(2), weapon_type: WeaponType::Bomb, level: 0 },
            &Settings::default(),
        );
        assert_eq!(tracker.tracked_energy(PlayerId(2)), Some(980));
    }

    #[test]
    fn freq_and_ship_change_resets_to_zero_until_next_reset_call() {
        let mut tracker = HeuristicEnergyTracker::new(EnergyPolicy::Maximum);
        let ship = ship();
        tracker.reset(PlayerId(3), &ship);
        tracker.on_event(&GameEvent::PlayerFreqAndShipChange { player_id: PlayerId(3) }, &Settings::default());
        assert_eq!(tracker.tracked_energy(PlayerId(3)), Some(0));
    }

    #[test]
    fn policy_none_never_tracks() {
        let mut tracker = HeuristicEnergyTracker::new(EnergyPolicy::None);
        let ship = ship();
        tracker.reset(PlayerId(4), &ship);
        tracker.tick(PlayerId(4), Tick(10), &ship);
        assert_eq!(tracker.tracked_energy(PlayerId(4)), None);
    }
}
