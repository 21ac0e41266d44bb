//! Self-spawn placement: disk sampling around a per-ship, per-frequency-parity
//! zone, accepted against the tile map's solidity.
//!
//! Grounded on `PlayerManager::SpawnPlayer`'s up-to-100-sample loop (§4.4):
//! each candidate is a uniformly sampled point inside the configured radius
//! of the zone center, accepted on the first [`TileMap::can_fit`] hit and
//! falling back to the bare zone center if every sample collides.

use crate::core::{Tick, Vec2, VieRng};
use crate::events::{EventBus, GameEvent};
use crate::map::tile::TileMap;
use crate::net::connection::Settings;
use crate::player::state::{Player, PlayerId, PlayerStatus};

const MAX_SPAWN_SAMPLES: u32 = 100;

/// Spawn `player` into a ship, sampling a legal tile position around the
/// ship's frequency-parity zone (or the zone default if the ship defines no
/// explicit per-parity entry). Sets `Flash`, zeroes velocity, and publishes
/// [`GameEvent::PlayerSpawn`].
pub fn spawn_player(
    player_id: PlayerId,
    players: &mut crate::player::state::PlayerManager,
    ship: u8,
    settings: &Settings,
    map: &TileMap,
    rng: &mut VieRng,
    current_tick: Tick,
    events: &mut EventBus,
) {
    let radius = settings.ships[ship.min(7) as usize].get_radius();
    let Some(player) = players.get_mut(player_id) else { return };

    let parity = (player.frequency % 4) as usize;
    let zone = settings.ships[ship.min(7) as usize].spawn[parity.min(3)];
    let (center, zone_radius) = if zone.radius > 0 {
        (Vec2::new(zone.x as f32, zone.y as f32), zone.radius as f32)
    } else {
        (Vec2::new(512.0, 512.0), 512.0)
    };

    let mut chosen = center;
    for _ in 0..MAX_SPAWN_SAMPLES {
        let angle = rng.next_mod(360) as f32 / 360.0;
        let dist = rng.next_mod(zone_radius.max(1.0) as u32) as f32;
        let candidate = (center + Vec2::from_turns(angle) * dist).clamp_to_arena(1023.0);
        if map.can_fit(candidate, radius) {
            chosen = candidate;
            break;
        }
    }

    player.position = chosen;
    player.velocity = Vec2::ZERO;
    player.lerp_time = 0.0;
    player.lerp_velocity = Vec2::ZERO;
    player.ship = ship;
    player.status.set(PlayerStatus::FLASH, true);
    player.timestamp = current_tick.to_small();
    player.bounty = settings.initial_bounty;
    player.energy = settings.ships[ship.min(7) as usize].initial_energy;

    events.publish(GameEvent::PlayerSpawn { player_id });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_radius(r: f32) -> Settings {
        let mut s = Settings::default();
        for ship in s.ships.iter_mut() {
            ship.radius = r;
            ship.initial_energy = 1000;
        }
        s
    }

    #[test]
    fn spawn_places_player_inside_the_default_zone_and_sets_flash() {
        let mut players = crate::player::state::PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(1), &mut events);

        let settings = settings_with_radius(0.5);
        let map = TileMap::load(&[]).unwrap();
        let mut rng = VieRng::new(42);

        spawn_player(PlayerId(1), &mut players, 0, &settings, &map, &mut rng, Tick(10), &mut events);

        let player = players.get(PlayerId(1)).unwrap();
        assert!(player.status.contains(PlayerStatus::FLASH));
        assert_eq!(player.velocity, Vec2::ZERO);
        assert_eq!(player.energy, 1000);
        assert!(player.position.x >= 0.0 && player.position.x <= 1024.0);
        assert!(player.position.y >= 0.0 && player.position.y <= 1024.0);
    }

    #[test]
    fn spawn_uses_explicit_per_parity_zone_when_configured() {
        let mut players = crate::player::state::PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(2), &mut events);
        if let Some(p) = players.get_mut(PlayerId(2)) {
            p.frequency = 0;
        }

        let mut settings = settings_with_radius(0.5);
        settings.ships[0].spawn[0] = crate::net::connection::SpawnSettings { x: 200, y: 200, radius: 10 };
        let map = TileMap::load(&[]).unwrap();
        let mut rng = VieRng::new(7);

        spawn_player(PlayerId(2), &mut players, 0, &settings, &map, &mut rng, Tick(1), &mut events);

        let player = players.get(PlayerId(2)).unwrap();
        assert!(player.position.distance(Vec2::new(200.0, 200.0)) <= 11.0);
    }
}
