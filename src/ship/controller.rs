//! Ship controller: thrust/rotation/energy/firing, run before the player
//! manager each tick per §4.6.
//!
//! Grounded on `weapon::manager::WeaponManager` for the "one manager, keyed
//! by player id, ticked once per frame" shape, generalized from weapon
//! lifetimes to ship runtime state (cooldowns, rocket timers, the prize
//! seed).

use std::collections::HashMap;

use crate::core::{Tick, Vec2};
use crate::events::{EventBus, GameEvent};
use crate::map::tile::{TileMap, TILE_SAFE_ID};
use crate::net::connection::Settings;
use crate::player::state::{Player, PlayerId, PlayerManager, PlayerStatus};
use crate::ship::prize;
use crate::ship::state::{ShipInput, ShipRuntime};
use crate::weapon::manager::WeaponManager;
use crate::weapon::types::{WeaponData, WeaponType};

const DT: f32 = 1.0 / 100.0;
const ENGINE_SHUTDOWN_ROTATION: f32 = 40.0 / 400.0;

/// Owns every player's ship runtime state and drives thrust, rotation,
/// energy, and weapon firing for the tick.
#[derive(Default)]
pub struct ShipController {
    runtimes: HashMap<PlayerId, ShipRuntime>,
}

impl ShipController {
    pub fn new() -> Self {
        ShipController::default()
    }

    pub fn runtime(&self, id: PlayerId) -> Option<&ShipRuntime> {
        self.runtimes.get(&id)
    }

    pub fn clear(&mut self, id: PlayerId) {
        self.runtimes.remove(&id);
    }

    /// Advance one tick of ship control for `player_id`. `input` is sampled
    /// by the host application; this never reads the network directly.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        player_id: PlayerId,
        input: ShipInput,
        players: &mut PlayerManager,
        weapons: &mut WeaponManager,
        settings: &Settings,
        map: &TileMap,
        current_tick: Tick,
        events: &mut EventBus,
    ) {
        // Mutate a snapshot rather than the live roster entry: firing needs
        // a read-only view of every other player alongside this one, and
        // `PlayerManager` can't hand out both at once.
        let mut player = match players.get(player_id) {
            Some(p) => p.clone(),
            None => return,
        };
        let runtime = self.runtimes.entry(player_id).or_default();
        let ship = settings.ships[player.ship.min(7) as usize];

        apply_thrust_and_rotation(&mut player, runtime, input, &ship, settings);
        apply_energy(&mut player, runtime, &ship, settings, events);
        apply_safety_toggle(&mut player, runtime, map, events);

        if input.warp_pressed {
            handle_warp(&mut player, runtime, settings, events);
        }

        if input.portal_pressed {
            handle_portal(&player, runtime);
        }

        fire_weapons(&mut player, runtime, input, weapons, players, settings, map, current_tick, events);

        if let Some(slot) = players.get_mut(player_id) {
            *slot = player;
        }
    }
}

fn apply_thrust_and_rotation(player: &mut Player, runtime: &mut ShipRuntime, input: ShipInput, ship: &crate::net::connection::ShipSettings, settings: &Settings) {
    let has_children = player.children.is_some();
    let engine_shutdown = runtime.emp_ticks_remaining > 0;

    let mut thrust_cap = ship.initial_thrust;
    let mut speed_cap = ship.initial_speed;
    let mut rotation_rate = ship.initial_rotation as f32 / 400.0;

    let afterburner_ready = input.afterburner
        && runtime.rocket_ticks_remaining == 0
        && player.energy as f32 > ship.afterburner_energy as f32 / 10.0 * DT;
    if afterburner_ready {
        thrust_cap = ship.maximum_thrust;
        speed_cap = ship.maximum_speed;
        player.energy = player.energy.saturating_sub((ship.afterburner_energy as f32 / 10.0 * DT) as u32);
    }

    if runtime.rocket_ticks_remaining > 0 {
        thrust_cap = ship.rocket_thrust;
        speed_cap = ship.rocket_speed;
        runtime.rocket_ticks_remaining -= 1;
    }

    if has_children {
        thrust_cap = thrust_cap.saturating_sub(settings.turret_thrust_penalty);
        speed_cap = speed_cap.saturating_sub(settings.turret_speed_penalty);
    }

    if engine_shutdown {
        thrust_cap = 0;
        rotation_rate = ENGINE_SHUTDOWN_ROTATION;
    }

    if ship.gravity != 0 && player.velocity.length() as i32 >= 1 {
        speed_cap = ship.gravity_top_speed;
    }

    if input.rotate != 0 && !engine_shutdown {
        player.orientation = (player.orientation + rotation_rate * input.rotate as f32 * DT).rem_euclid(1.0);
    }

    if input.thrust != 0 {
        let heading = Vec2::from_turns(player.orientation);
        let accel = heading * (thrust_cap as f32 / 100.0 * DT) * input.thrust as f32;
        let candidate = player.velocity + accel;
        let cap = speed_cap as f32 / 160.0;
        if candidate.length() <= cap || cap <= 0.0 {
            player.velocity = candidate;
        } else {
            player.velocity = candidate.normalize() * cap;
        }
    }
}

fn apply_energy(player: &mut Player, runtime: &mut ShipRuntime, ship: &crate::net::connection::ShipSettings, settings: &Settings, events: &mut EventBus) {
    let _ = settings;
    if runtime.emp_ticks_remaining > 0 {
        runtime.emp_ticks_remaining -= 1;
        if runtime.emp_ticks_remaining == 0 {
            events.publish(GameEvent::EmpLoss { player_id: player.id });
        }
        return;
    }

    let was_full = player.energy >= ship.maximum_energy;
    let gained = (ship.initial_recharge as f32 / 10.0 * DT).max(0.0) as u32;
    player.energy = (player.energy + gained).min(ship.maximum_energy);

    let mut cost = 0u32;
    if player.status.contains(PlayerStatus::XRADAR) {
        cost += 1;
    }
    if player.status.contains(PlayerStatus::STEALTH) {
        cost += 1;
    }
    if player.status.contains(PlayerStatus::CLOAK) {
        cost += 1;
    }
    if player.status.contains(PlayerStatus::ANTIWARP) {
        cost += 1;
    }
    player.energy = player.energy.saturating_sub(cost);

    if !was_full && player.energy >= ship.maximum_energy {
        events.publish(GameEvent::FullEnergy { player_id: player.id });
    }
}

fn apply_safety_toggle(player: &mut Player, runtime: &mut ShipRuntime, map: &TileMap, events: &mut EventBus) {
    let tile = map.get_tile_id(player.position.x as u16, player.position.y as u16);
    let on_safety = tile == TILE_SAFE_ID;
    if on_safety != runtime.on_safety {
        runtime.on_safety = on_safety;
        events.publish(GameEvent::SafetyToggle { player_id: player.id, on: on_safety });
    }
}

/// `?warp`/respawn: fires the ball if carrying, else warps to a laid
/// portal, else respawns at the cost of full energy (§4.6). The portal/
/// respawn target is communicated to the caller by leaving `player.position`
/// untouched here; `GameState` applies the actual warp destination once it
/// resolves the portal position against the map.
fn handle_warp(player: &mut Player, runtime: &mut ShipRuntime, settings: &Settings, events: &mut EventBus) {
    let _ = settings;
    if player.ball_carrier {
        player.ball_carrier = false;
    } else if runtime.portal_position.take().is_some() {
        // Warp-to-portal: destination resolution happens in `GameState`.
    } else {
        player.energy = 1;
        player.velocity = Vec2::ZERO;
        events.publish(GameEvent::PlayerSpawn { player_id: player.id });
    }
}

fn handle_portal(player: &Player, runtime: &mut ShipRuntime) {
    if runtime.portal_position.is_none() {
        runtime.portal_position = Some(player.position);
    }
}

#[allow(clippy::too_many_arguments)]
fn fire_weapons(
    player: &mut Player,
    runtime: &mut ShipRuntime,
    input: ShipInput,
    weapons: &mut WeaponManager,
    players: &PlayerManager,
    settings: &Settings,
    map: &TileMap,
    current_tick: Tick,
    events: &mut EventBus,
) {
    let ship = settings.ships[player.ship.min(7) as usize];
    let afterburning = player.energy > 0
        && input.afterburner
        && runtime.rocket_ticks_remaining == 0;
    let fast_shooting_blocked = settings.disable_fast_shooting && afterburning;

    if input.fire_repel && current_tick.diff(runtime.next_repel_tick) >= 0 && player.items.repels > 0 {
        if fire_one(player, WeaponType::Repel, &ship, weapons, players, settings, map, current_tick, events) {
            player.items.repels = player.items.repels.saturating_sub(1);
            runtime.next_repel_tick = current_tick + settings.repel_time;
        }
    } else if input.fire_burst && player.items.bursts > 0 {
        if fire_one(player, WeaponType::Burst, &ship, weapons, players, settings, map, current_tick, events) {
            player.items.bursts = player.items.bursts.saturating_sub(1);
        }
    } else if input.fire_thor && player.items.thors > 0 && !fast_shooting_blocked {
        if fire_one(player, WeaponType::Thor, &ship, weapons, players, settings, map, current_tick, events) {
            player.items.thors = player.items.thors.saturating_sub(1);
        }
    } else if input.fire_decoy && player.items.decoys > 0 {
        if fire_one(player, WeaponType::Bullet, &ship, weapons, players, settings, map, current_tick, events) {
            player.items.decoys = player.items.decoys.saturating_sub(1);
        }
    } else if input.fire_brick && player.items.bricks > 0 {
        player.items.bricks = player.items.bricks.saturating_sub(1);
    } else if input.fire_rocket && player.items.rockets > 0 {
        player.items.rockets = player.items.rockets.saturating_sub(1);
        runtime.rocket_ticks_remaining = settings.rocket_time;
    } else if input.fire_bullet && current_tick.diff(runtime.next_bullet_tick) >= 0 && !fast_shooting_blocked {
        if fire_one(player, WeaponType::Bullet, &ship, weapons, players, settings, map, current_tick, events) {
            runtime.next_bullet_tick = current_tick + bullet_fire_delay(settings);
        }
    } else if input.fire_bomb && current_tick.diff(runtime.next_bomb_tick) >= 0 && !fast_shooting_blocked {
        let safe = settings.bomb_safety && any_enemy_within(player, players, settings.proximity_distance as f32);
        if !safe && fire_one(player, WeaponType::Bomb, &ship, weapons, players, settings, map, current_tick, events) {
            runtime.next_bomb_tick = current_tick + settings.bomb_explode_delay;
            let heading = Vec2::from_turns(player.orientation);
            player.velocity -= heading * (ship.bomb_thrust as f32 / 100.0 * 10.0 / 16.0);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fire_one(
    player: &Player,
    weapon_type: WeaponType,
    ship: &crate::net::connection::ShipSettings,
    weapons: &mut WeaponManager,
    players: &PlayerManager,
    settings: &Settings,
    map: &TileMap,
    current_tick: Tick,
    events: &mut EventBus,
) -> bool {
    let data = WeaponData {
        kind_bits: type_bits(weapon_type),
        level: 0,
        shrap: ship.burst_shrapnel,
        alternate: false,
        shrap_level: 0,
        shrap_bouncing: false,
    };
    let pos_x = (player.position.x * 16.0) as i32;
    let pos_y = (player.position.y * 16.0) as i32;
    let vel_x = (player.velocity.x * 160.0) as i32;
    let vel_y = (player.velocity.y * 160.0) as i32;
    weapons.fire_weapons(player, data, pos_x, pos_y, vel_x, vel_y, current_tick, settings, players, map, events)
}

fn bullet_fire_delay(settings: &Settings) -> u32 {
    (settings.send_position_delay).max(1)
}

fn any_enemy_within(player: &Player, players: &PlayerManager, distance: f32) -> bool {
    players
        .iter()
        .any(|other| other.id != player.id && other.frequency != player.frequency && player.position.distance(other.position) <= distance)
}

fn type_bits(weapon_type: WeaponType) -> u16 {
    match weapon_type {
        WeaponType::Bullet => 1,
        WeaponType::BouncingBullet => 2,
        WeaponType::Bomb => 3,
        WeaponType::ProximityBomb => 4,
        WeaponType::Repel => 5,
        WeaponType::Decoy => 6,
        WeaponType::Burst => 7,
        WeaponType::Thor => 8,
    }
}

/// Roll a full `ResetShip` prize batch and reset per-ship runtime state.
pub fn reset_ship(controller: &mut ShipController, player: &mut Player, settings: &Settings) {
    let runtime = controller.runtimes.entry(player.id).or_default();
    prize::reset_ship(player, settings, &mut runtime.prize_seed);
    runtime.rocket_ticks_remaining = 0;
    runtime.next_bomb_tick = Tick(0);
    runtime.next_bullet_tick = Tick(0);
    runtime.next_repel_tick = Tick(0);
    runtime.portal_position = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::state::PlayerManager;

    fn test_settings() -> Settings {
        let mut s = Settings::default();
        for ship in s.ships.iter_mut() {
            ship.radius = 0.5;
            ship.initial_thrust = 100;
            ship.maximum_thrust = 200;
            ship.initial_speed = 100;
            ship.maximum_speed = 200;
            ship.initial_rotation = 100;
            ship.initial_energy = 1000;
            ship.maximum_energy = 1000;
            ship.initial_recharge = 1000;
        }
        s
    }

    #[test]
    fn thrust_accelerates_along_heading() {
        let mut players = PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(1), &mut events);
        let player = players.get_mut(PlayerId(1)).unwrap();
        player.orientation = 0.0;

        let settings = test_settings();
        let mut weapons = WeaponManager::new();
        let map = TileMap::load(&[]).unwrap();
        let mut controller = ShipController::new();

        let input = ShipInput { thrust: 1, ..Default::default() };
        controller.tick(PlayerId(1), input, &mut players, &mut weapons, &settings, &map, Tick(1), &mut events);

        let player = players.get(PlayerId(1)).unwrap();
        assert!(player.velocity.y < 0.0);
    }

    #[test]
    fn energy_recharges_up_to_cap() {
        let mut players = PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(2), &mut events);
        players.get_mut(PlayerId(2)).unwrap().energy = 999;

        let settings = test_settings();
        let mut weapons = WeaponManager::new();
        let map = TileMap::load(&[]).unwrap();
        let mut controller = ShipController::new();

        controller.tick(PlayerId(2), ShipInput::default(), &mut players, &mut weapons, &settings, &map, Tick(1), &mut events);
        assert_eq!(players.get(PlayerId(2)).unwrap().energy, 1000);
    }
}
