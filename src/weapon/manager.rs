//! Weapon lifecycle: firing, per-tick simulation, and explosion/shrapnel
//! spawning.
//!
//! Grounded on `WeaponManager.cpp`. It holds raw pointers to a
//! `PlayerManager`/`ShipController`/`Connection`; here every method takes
//! the collaborators it needs as explicit parameters, and a hit that would
//! have called back into a ship controller instead publishes
//! [`GameEvent::WeaponHit`] for that controller to observe.

use crate::core::{MicroTick, Tick, Vec2, VieRng};
use crate::events::{EventBus, GameEvent};
use crate::map::tile::{TileMap, TILE_SAFE_ID, WORMHOLE_TILE_ID};
use crate::net::Settings;
use crate::player::{Player, PlayerId, PlayerManager};
use crate::weapon::types::{Weapon, WeaponData, WeaponFlags, WeaponType, INVALID_LINK, INVALID_PROX_PLAYER};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SimulateResult {
    Continue,
    TimedOut,
    WallExplosion,
    PlayerExplosion,
}

struct LinkRemoval {
    link_id: u32,
    result: SimulateResult,
}

/// Owns every live weapon instance and the firing/simulation logic that
/// creates, advances, and destroys them.
#[derive(Default)]
pub struct WeaponManager {
    weapons: Vec<Weapon>,
    next_link_id: u32,
    link_removals: Vec<LinkRemoval>,
}

impl WeaponManager {
    /// An empty manager.
    pub fn new() -> Self {
        WeaponManager::default()
    }

    /// Every live weapon, in no particular order (swap-remove backed).
    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    /// Number of live weapons.
    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    /// True if no weapons are in flight.
    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Remove every weapon belonging to `player_id` (on death/ship change).
    pub fn clear_weapons(&mut self, player_id: PlayerId) {
        self.weapons.retain(|w| w.player_id != player_id);
    }

    /// Advance every weapon by however many ticks have elapsed since its
    /// `last_tick`, exploding/expiring as needed. Weapons whose owner is
    /// standing on a safety tile are removed outright.
    pub fn update(
        &mut self,
        tick: Tick,
        settings: &Settings,
        players: &mut PlayerManager,
        map: &TileMap,
        events: &mut EventBus,
    ) {
        self.link_removals.clear();

        let mut i = 0;
        while i < self.weapons.len() {
            let owner = self.weapons[i].player_id;
            if let Some(player) = players.get(owner) {
                if map.get_tile_id(player.position.x as u16, player.position.y as u16) == TILE_SAFE_ID {
                    self.weapons.swap_remove(i);
                    continue;
                }
            }

            let tick_count = tick.diff(self.weapons[i].last_tick).max(0);
            let mut removed = false;

            for _ in 0..tick_count {
                let result = self.simulate(i, settings, players, map, events);
                let link_id = self.weapons[i].link_id;
                if result != SimulateResult::Continue && link_id != INVALID_LINK {
                    self.link_removals.push(LinkRemoval { link_id, result });
                }

                match result {
                    SimulateResult::PlayerExplosion | SimulateResult::WallExplosion => {
                        self.create_explosion(i, settings, map);
                        self.weapons.swap_remove(i);
                        removed = true;
                        break;
                    }
                    SimulateResult::TimedOut => {
                        self.weapons.swap_remove(i);
                        removed = true;
                        break;
                    }
                    SimulateResult::Continue => {}
                }
            }

            if !removed {
                i += 1;
            }
        }

        self.apply_link_explosions(settings, map);
    }

    /// A multi-barrel/multi-fire group explodes together: if any member hit
    /// a player, every surviving sibling explodes on the spot too.
    fn apply_link_explosions(&mut self, settings: &Settings, map: &TileMap) {
        if self.link_removals.is_empty() {
            return;
        }

        let mut i = 0;
        while i < self.weapons.len() {
            let link_id = self.weapons[i].link_id;
            let should_explode = link_id != INVALID_LINK
                && self
                    .link_removals
                    .iter()
                    .any(|r| r.link_id == link_id && r.result == SimulateResult::PlayerExplosion);

            if should_explode {
                self.create_explosion(i, settings, map);
                self.weapons.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn has_link_removed(&self, link_id: u32) -> bool {
        self.link_removals.iter().any(|r| r.link_id == link_id)
    }

    fn simulate_wormhole_gravity(&mut self, index: usize, settings: &Settings, players: &PlayerManager, map: &TileMap) -> bool {
        let weapon = self.weapons[index];
        let player = match players.get(weapon.player_id) {
            Some(p) => p,
            None => return false,
        };

        let gravity = settings.ships[player.ship.min(7) as usize].gravity as f32;
        let mut affected = false;
        let mut accumulated = Vec2::ZERO;

        for wormhole in map.animated_tiles_by_id(WORMHOLE_TILE_ID) {
            let dx = weapon.position.x - wormhole.x as f32;
            let dy = weapon.position.y - wormhole.y as f32;
            let dist_sq = dx * dx + dy * dy + 1.0;

            if dist_sq < gravity.abs() * 1000.0 {
                let gravity_thrust = gravity * 1000.0 / dist_sq;
                let target = Vec2::new(wormhole.x as f32, wormhole.y as f32);
                let direction = (target - weapon.position).normalize();
                accumulated += direction * ((gravity_thrust * 10.0 / 16.0) / 100.0);
                affected = true;
            }
        }

        if affected {
            self.weapons[index].velocity += accumulated;
        }
        affected
    }

    fn simulate(
        &mut self,
        index: usize,
        settings: &Settings,
        players: &mut PlayerManager,
        map: &TileMap,
        events: &mut EventBus,
    ) -> SimulateResult {
        let weapon_type = self.weapons[index].data.weapon_type();
        self.weapons[index].last_tick = self.weapons[index].last_tick + 1u32;
        if self.weapons[index].last_tick.diff(self.weapons[index].end_tick) >= 0 {
            return SimulateResult::TimedOut;
        }

        if weapon_type == Some(WeaponType::Repel) {
            self.simulate_repel(index, settings, players, map);
            return SimulateResult::Continue;
        }

        if settings.gravity_bombs && matches!(weapon_type, Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb)) {
            self.simulate_wormhole_gravity(index, settings, players, map);
        }

        let previous_position = self.weapons[index].position;
        let position_result = self.simulate_position(index, settings, map);
        if position_result != SimulateResult::Continue {
            return position_result;
        }

        if weapon_type == Some(WeaponType::Decoy) {
            return SimulateResult::Continue;
        }
        if weapon_type == Some(WeaponType::Burst) && !self.weapons[index].flags.contains(WeaponFlags::BURST_ACTIVE) {
            return SimulateResult::Continue;
        }

        let is_bomb = matches!(
            weapon_type,
            Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb) | Some(WeaponType::Thor)
        );
        let is_prox = matches!(weapon_type, Some(WeaponType::ProximityBomb) | Some(WeaponType::Thor));

        if is_prox && self.weapons[index].prox_hit_player_id != INVALID_PROX_PLAYER {
            return self.simulate_latched_proximity(index, events, weapon_type, previous_position, players);
        }

        self.simulate_player_collision(index, settings, players, weapon_type, is_bomb, is_prox, previous_position, events)
    }

    fn simulate_latched_proximity(
        &mut self,
        index: usize,
        events: &mut EventBus,
        weapon_type: Option<WeaponType>,
        previous_position: Vec2,
        players: &PlayerManager,
    ) -> SimulateResult {
        let hit_id = PlayerId(self.weapons[index].prox_hit_player_id);
        let hit_player = match players.get(hit_id) {
            Some(p) => p,
            None => return SimulateResult::PlayerExplosion,
        };

        let dx = (self.weapons[index].position.x - hit_player.position.x).abs();
        let dy = (self.weapons[index].position.y - hit_player.position.y).abs();
        let highest = dx.max(dy);
        let sensor_expired = self.weapons[index].last_tick.diff(self.weapons[index].sensor_end_tick) >= 0;

        if highest > self.weapons[index].prox_highest_offset || sensor_expired {
            self.publish_hit(events, index, hit_id, weapon_type);
            self.weapons[index].position = previous_position;
            return SimulateResult::PlayerExplosion;
        }

        self.weapons[index].prox_highest_offset = highest;
        SimulateResult::Continue
    }

    #[allow(clippy::too_many_arguments)]
    fn simulate_player_collision(
        &mut self,
        index: usize,
        settings: &Settings,
        players: &PlayerManager,
        weapon_type: Option<WeaponType>,
        is_bomb: bool,
        is_prox: bool,
        previous_position: Vec2,
        events: &mut EventBus,
    ) -> SimulateResult {
        let mut result = SimulateResult::Continue;

        for player in players.iter() {
            if player.is_spectator() || player.enter_delay > 0.0 {
                continue;
            }
            if player.frequency == self.weapons[index].frequency {
                continue;
            }

            let radius = settings.ships[player.ship.min(7) as usize].get_radius();

            let mut weapon_radius = if is_prox {
                let mut prox = settings.proximity_distance as f32 + self.weapons[index].data.level as f32;
                if weapon_type == Some(WeaponType::Thor) {
                    prox += 3.0;
                }
                prox * 18.0
            } else {
                18.0
            };
            weapon_radius = (weapon_radius - 14.0) / 16.0;

            let w_pos = self.weapons[index].position;
            if !box_overlap(player.position, radius, w_pos, weapon_radius) {
                continue;
            }

            if is_prox {
                self.weapons[index].prox_hit_player_id = player.id.0;
                self.weapons[index].sensor_end_tick = self.weapons[index].last_tick + settings.bomb_explode_delay;
                let dx = (self.weapons[index].position.x - player.position.x).abs();
                let dy = (self.weapons[index].position.y - player.position.y).abs();
                self.weapons[index].prox_highest_offset = dx.max(dy);

                if !box_overlap(player.position, radius, w_pos, 4.0 / 16.0) {
                    continue;
                }
            }

            if (is_bomb || player.id == players.self_id) && !self.has_link_removed(self.weapons[index].link_id) {
                self.publish_hit(events, index, player.id, weapon_type);
            }

            if matches!(weapon_type, Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb)) {
                self.weapons[index].position = previous_position;
            }

            result = SimulateResult::PlayerExplosion;
        }

        result
    }

    fn publish_hit(&self, events: &mut EventBus, index: usize, target_id: PlayerId, weapon_type: Option<WeaponType>) {
        let weapon = &self.weapons[index];
        events.publish(GameEvent::WeaponHit {
            shooter_id: weapon.player_id,
            target_id,
            weapon_type: weapon_type.unwrap_or(WeaponType::Bullet),
            level: weapon.data.level,
            emp: weapon.flags.contains(WeaponFlags::EMP),
        });
    }

    fn simulate_repel(&mut self, index: usize, settings: &Settings, players: &mut PlayerManager, map: &TileMap) {
        let effect_radius = settings.repel_distance as f32 / 16.0;
        let speed = settings.repel_speed as f32 / 16.0 / 10.0;
        let center = self.weapons[index].position;
        let frequency = self.weapons[index].frequency;
        let tick = self.weapons[index].last_tick;

        for other in self.weapons.iter_mut() {
            if other.frequency == frequency || other.data.weapon_type() == Some(WeaponType::Repel) {
                continue;
            }
            if !point_in_box(center, effect_radius, other.position) {
                continue;
            }

            let direction = (other.position - center).normalize();
            other.velocity = direction * speed;
            other.last_event_position = other.position;

            if other.data.alternate
                && matches!(other.data.weapon_type(), Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb))
            {
                other.data.alternate = false;
            }
            other.end_tick = tick + total_alive_time(settings, other.data.weapon_type(), other.data.alternate);
        }

        for player in players.iter_mut() {
            if player.frequency == frequency || player.is_spectator() {
                continue;
            }
            if map.get_tile_id(player.position.x as u16, player.position.y as u16) == TILE_SAFE_ID {
                continue;
            }
            if !point_in_box(center, effect_radius, player.position) {
                continue;
            }

            let direction = (player.position - center).normalize();
            player.velocity = direction * speed;
            player.last_repel_timestamp = tick;
        }
    }

    fn simulate_axis(&mut self, index: usize, axis: usize, map: &TileMap) -> bool {
        let weapon = &mut self.weapons[index];
        if weapon.data.weapon_type() == Some(WeaponType::Thor) {
            if axis == 0 {
                weapon.position.x += weapon.velocity.x;
            } else {
                weapon.position.y += weapon.velocity.y;
            }
            return false;
        }

        let previous = if axis == 0 { weapon.position.x } else { weapon.position.y };
        if axis == 0 {
            weapon.position.x += weapon.velocity.x;
        } else {
            weapon.position.y += weapon.velocity.y;
        }

        if map.is_solid(weapon.position.x as u16, weapon.position.y as u16) {
            if axis == 0 {
                weapon.position.x = previous;
                weapon.velocity.x = -weapon.velocity.x;
            } else {
                weapon.position.y = previous;
                weapon.velocity.y = -weapon.velocity.y;
            }
            return true;
        }

        false
    }

    fn simulate_position(&mut self, index: usize, settings: &Settings, map: &TileMap) -> SimulateResult {
        let weapon_type = self.weapons[index].data.weapon_type();

        let x_collide = self.simulate_axis(index, 0, map);
        let y_collide = self.simulate_axis(index, 1, map);

        if !(x_collide || y_collide) {
            return SimulateResult::Continue;
        }

        self.weapons[index].last_event_position = self.weapons[index].position;

        if matches!(weapon_type, Some(WeaponType::Bullet) | Some(WeaponType::BouncingBullet)) && self.weapons[index].data.shrap > 0 {
            let remaining = self.weapons[index].end_tick.diff(self.weapons[index].last_tick);
            if remaining < 0 || remaining <= crate::weapon::damage::SHRAP_INACTIVE_THRESHOLD_TICKS {
                return SimulateResult::TimedOut;
            }
        }

        if matches!(
            weapon_type,
            Some(WeaponType::Bullet) | Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb)
        ) {
            if self.weapons[index].bounces_remaining == 0 {
                return SimulateResult::WallExplosion;
            }
            self.weapons[index].bounces_remaining -= 1;
        } else if weapon_type == Some(WeaponType::Burst) {
            self.weapons[index].flags.insert(WeaponFlags::BURST_ACTIVE);
        }

        SimulateResult::Continue
    }

    /// Spawn the shrapnel burst for a bomb/proximity-bomb/Thor explosion.
    fn create_explosion(&mut self, index: usize, settings: &Settings, map: &TileMap) {
        let weapon = self.weapons[index];
        let weapon_type = weapon.data.weapon_type();
        if !matches!(weapon_type, Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb) | Some(WeaponType::Thor)) {
            return;
        }

        let count = weapon.data.shrap as i32;
        if count == 0 {
            return;
        }

        let mut rng = VieRng::new(weapon.rng_seed as i32);
        let shrap_kind_bits: u16 = if weapon.data.shrap_bouncing { 2 } else { 1 };

        for i in 0..count {
            let orientation = if !settings.shrapnel_random {
                (i * 40000) / count * 9
            } else {
                (rng.next() as i32 % 40000) * 9
            };

            let radians = (orientation as f32 / 1000.0).to_radians();
            let direction = Vec2::new(radians.sin(), -radians.cos());
            let speed = settings.shrapnel_speed as f32 / 10.0 / 16.0;

            let shrap = Weapon {
                player_id: weapon.player_id,
                frequency: weapon.frequency,
                data: WeaponData {
                    kind_bits: shrap_kind_bits,
                    level: weapon.data.shrap_level,
                    shrap: 0,
                    alternate: false,
                    shrap_level: 0,
                    shrap_bouncing: false,
                },
                position: weapon.position,
                velocity: direction * speed,
                last_tick: weapon.last_tick,
                end_tick: weapon.last_tick + settings.bullet_alive_time,
                bounces_remaining: 0,
                flags: WeaponFlags::empty(),
                link_id: INVALID_LINK,
                last_event_position: weapon.position,
                last_event_time: MicroTick(0),
                rng_seed: 0,
                prox_hit_player_id: INVALID_PROX_PLAYER,
                prox_highest_offset: 0.0,
                sensor_end_tick: Tick(0),
            };

            if map.is_solid(shrap.position.x as u16, shrap.position.y as u16) {
                continue;
            }
            self.weapons.push(shrap);
        }

        self.weapons[index].rng_seed = rng.seed() as u32;
    }

    /// Fire the weapon(s) described by `weapon`, handling mine-quota checks,
    /// double-barrel offsetting, multifire spread, and burst's evenly-spaced
    /// spray.
    #[allow(clippy::too_many_arguments)]
    pub fn fire_weapons(
        &mut self,
        player: &Player,
        weapon: WeaponData,
        pos_x: i32,
        pos_y: i32,
        vel_x: i32,
        vel_y: i32,
        local_timestamp: Tick,
        settings: &Settings,
        players: &PlayerManager,
        map: &TileMap,
        events: &mut EventBus,
    ) -> bool {
        let ship_settings = settings.ships[player.ship.min(7) as usize];
        let weapon_type = match weapon.weapon_type() {
            Some(t) => t,
            None => return false,
        };
        let heading = Vec2::from_turns(player.orientation);

        if matches!(weapon_type, WeaponType::Bomb | WeaponType::ProximityBomb)
            && weapon.alternate
            && player.id == players.self_id
        {
            let (self_count, team_count, has_check_mine) = self.mine_counts(player.id, player.frequency, pos_x, pos_y);
            if has_check_mine || self_count >= ship_settings.max_mines || team_count >= settings.team_max_mines {
                return false;
            }
        }

        events.publish(GameEvent::WeaponFire {
            player_id: player.id,
            weapon_type,
            level: weapon.level,
        });

        match weapon_type {
            WeaponType::Bullet | WeaponType::BouncingBullet => {
                self.fire_bullets(player, weapon, pos_x, pos_y, vel_x, vel_y, heading, local_timestamp, settings, players, map, events);
            }
            WeaponType::Burst => {
                let count = ship_settings.burst_shrapnel.max(1) as i32;
                for i in 0..count {
                    let orientation = (i * 40000) / count * 9;
                    let radians = (orientation as f32 / 1000.0).to_radians();
                    let direction = Vec2::new(radians.sin(), -radians.cos());
                    self.generate_weapon(
                        player.id, weapon, local_timestamp, pos_x, pos_y, 0, 0, direction, INVALID_LINK, settings, players,
                    );
                }
            }
            _ => {
                self.generate_weapon(
                    player.id, weapon, local_timestamp, pos_x, pos_y, vel_x, vel_y, heading, INVALID_LINK, settings, players,
                );
            }
        }

        true
    }

    #[allow(clippy::too_many_arguments)]
    fn fire_bullets(
        &mut self,
        player: &Player,
        weapon: WeaponData,
        pos_x: i32,
        pos_y: i32,
        vel_x: i32,
        vel_y: i32,
        heading: Vec2,
        local_timestamp: Tick,
        settings: &Settings,
        players: &PlayerManager,
        map: &TileMap,
        events: &mut EventBus,
    ) {
        let ship_settings = settings.ships[player.ship.min(7) as usize];
        let link_id = self.next_link_id;
        self.next_link_id += 1;
        let mut destroy_link = false;

        let mut barrels = Vec::with_capacity(4);
        if ship_settings.double_barrel {
            let perp = heading.perpendicular();
            let offset = perp * (ship_settings.get_radius() * 0.75 * 16.0);
            barrels.push((pos_x - offset.x as i32, pos_y - offset.y as i32, heading));
            barrels.push((pos_x + offset.x as i32, pos_y + offset.y as i32, heading));
        } else {
            barrels.push((pos_x, pos_y, heading));
        }

        if weapon.alternate {
            let radians = (ship_settings.multi_fire_angle as f32 / 111.0).to_radians();
            barrels.push((pos_x, pos_y, rotate(heading, radians)));
            barrels.push((pos_x, pos_y, rotate(heading, -radians)));
        }

        for (x, y, dir) in barrels {
            let result = self.generate_weapon(player.id, weapon, local_timestamp, x, y, vel_x, vel_y, dir, link_id, settings, players);
            destroy_link |= result == SimulateResult::PlayerExplosion;
        }

        if destroy_link {
            let mut i = 0;
            while i < self.weapons.len() {
                if self.weapons[i].link_id == link_id {
                    self.create_explosion(i, settings, map);
                    self.weapons.swap_remove(i);
                } else {
                    i += 1;
                }
            }
        }

        let _ = events;
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_weapon(
        &mut self,
        player_id: PlayerId,
        weapon_data: WeaponData,
        local_timestamp: Tick,
        pos_x: i32,
        pos_y: i32,
        vel_x: i32,
        vel_y: i32,
        heading: Vec2,
        link_id: u32,
        settings: &Settings,
        players: &PlayerManager,
    ) -> SimulateResult {
        let player = match players.get(player_id) {
            Some(p) => p,
            None => return SimulateResult::Continue,
        };
        let ship_settings = settings.ships[player.ship.min(7) as usize];
        let weapon_type = weapon_data.weapon_type();

        let mut speed: f32 = 0.0;
        let mut bounces_remaining = 0;
        let is_mine = matches!(weapon_type, Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb)) && weapon_data.alternate;

        match weapon_type {
            Some(WeaponType::Bullet) | Some(WeaponType::BouncingBullet) => speed = ship_settings.bullet_speed as f32,
            Some(WeaponType::Thor) | Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb) => {
                if !is_mine {
                    speed = ship_settings.bomb_speed as f32;
                    bounces_remaining = ship_settings.bomb_bounce_count;
                }
            }
            Some(WeaponType::Burst) => speed = ship_settings.burst_speed as f32,
            _ => {}
        }

        let velocity = if weapon_type != Some(WeaponType::Repel) && !is_mine {
            Vec2::new(vel_x as f32 / 16.0 / 10.0, vel_y as f32 / 16.0 / 10.0) + heading * (speed / 16.0 / 10.0)
        } else {
            Vec2::ZERO
        };

        let position = Vec2::new(pos_x as f32 / 16.0, pos_y as f32 / 16.0);
        let rng_seed = calculate_rng_seed(
            pos_x as u32,
            pos_y as u32,
            velocity.x.to_bits(),
            velocity.y.to_bits(),
            weapon_data.shrap as u16,
            weapon_data.level as u16,
            player.frequency as u32,
        );

        self.weapons.push(Weapon {
            player_id,
            frequency: player.frequency,
            data: weapon_data,
            position,
            velocity,
            last_tick: local_timestamp,
            end_tick: local_timestamp + total_alive_time(settings, weapon_type, weapon_data.alternate),
            bounces_remaining,
            flags: WeaponFlags::empty(),
            link_id,
            last_event_position: position,
            last_event_time: MicroTick(0),
            rng_seed,
            prox_hit_player_id: INVALID_PROX_PLAYER,
            prox_highest_offset: 0.0,
            sensor_end_tick: Tick(0),
        });

        SimulateResult::Continue
    }

    fn mine_counts(&self, player_id: PlayerId, frequency: u16, pos_x: i32, pos_y: i32) -> (u32, u32, bool) {
        let mut self_count = 0;
        let mut team_count = 0;
        let mut has_check_mine = false;
        let position = Vec2::new(pos_x as f32 / 16.0, pos_y as f32 / 16.0);

        for weapon in &self.weapons {
            if !weapon.data.alternate || !matches!(weapon.data.weapon_type(), Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb)) {
                continue;
            }
            if weapon.player_id == player_id {
                self_count += 1;
            }
            if weapon.frequency == frequency {
                team_count += 1;
            }
            if weapon.position == position {
                has_check_mine = true;
            }
        }

        (self_count, team_count, has_check_mine)
    }
}

/// How long (in ticks) a freshly-fired weapon of `weapon_type` lives before
/// timing out on its own.
fn total_alive_time(settings: &Settings, weapon_type: Option<WeaponType>, alternate: bool) -> u32 {
    match weapon_type {
        Some(WeaponType::Bullet) | Some(WeaponType::BouncingBullet) | Some(WeaponType::Burst) => settings.bullet_alive_time,
        Some(WeaponType::Thor) | Some(WeaponType::Bomb) | Some(WeaponType::ProximityBomb) => {
            if alternate {
                settings.mine_alive_time
            } else {
                settings.bomb_alive_time
            }
        }
        Some(WeaponType::Repel) => settings.repel_time,
        Some(WeaponType::Decoy) => settings.decoy_alive_time,
        None => 0,
    }
}

fn calculate_rng_seed(x: u32, y: u32, vel_x: u32, vel_y: u32, shrap: u16, level: u16, frequency: u32) -> u32 {
    (shrap as u32)
        .wrapping_add(level as u32)
        .wrapping_add(x.wrapping_mul(1000))
        .wrapping_add(y.wrapping_mul(1000))
        .wrapping_add(vel_x)
        .wrapping_add(vel_y)
        .wrapping_add(frequency)
}

fn rotate(v: Vec2, radians: f32) -> Vec2 {
    let (s, c) = radians.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

fn box_overlap(center_a: Vec2, half_a: f32, center_b: Vec2, half_b: f32) -> bool {
    (center_a.x - center_b.x).abs() <= half_a + half_b && (center_a.y - center_b.y).abs() <= half_a + half_b
}

fn point_in_box(center: Vec2, half: f32, point: Vec2) -> bool {
    (point.x - center.x).abs() <= half && (point.y - center.y).abs() <= half
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerManager;

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.bullet_alive_time = 550;
        s.ships[0].bullet_speed = 2000;
        s
    }

    fn map() -> TileMap {
        TileMap::load(&[]).unwrap()
    }

    #[test]
    fn fire_weapons_rejects_unknown_weapon_type() {
        let mut manager = WeaponManager::new();
        let mut players = PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(1), &mut events);
        players.self_id = PlayerId(1);
        let player = players.get(PlayerId(1)).unwrap().clone();

        let fired = manager.fire_weapons(
            &player,
            WeaponData::default(),
            0,
            0,
            0,
            0,
            Tick(0),
            &settings(),
            &players,
            &map(),
            &mut events,
        );
        assert!(!fired);
        assert!(manager.is_empty());
    }

    #[test]
    fn fire_weapons_spawns_a_bullet() {
        let mut manager = WeaponManager::new();
        let mut players = PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(1), &mut events);
        players.self_id = PlayerId(1);
        let player = players.get(PlayerId(1)).unwrap().clone();

        let fired = manager.fire_weapons(
            &player,
            WeaponData::from_bits(1),
            100,
            100,
            0,
            0,
            Tick(0),
            &settings(),
            &players,
            &map(),
            &mut events,
        );
        assert!(fired);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.weapons()[0].data.weapon_type(), Some(WeaponType::Bullet));
    }

    #[test]
    fn clear_weapons_removes_only_the_owners() {
        let mut manager = WeaponManager::new();
        let mut players = PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(1), &mut events);
        players.on_player_enter(PlayerId(2), &mut events);
        players.self_id = PlayerId(1);

        for id in [PlayerId(1), PlayerId(2)] {
            let player = players.get(id).unwrap().clone();
            manager.fire_weapons(
                &player,
                WeaponData::from_bits(1),
                0,
                0,
                0,
                0,
                Tick(0),
                &settings(),
                &players,
                &map(),
                &mut events,
            );
        }

        manager.clear_weapons(PlayerId(1));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.weapons()[0].player_id, PlayerId(2));
    }

    #[test]
    fn update_times_out_expired_weapon() {
        let mut manager = WeaponManager::new();
        let mut players = PlayerManager::new();
        let mut events = EventBus::new();
        players.on_player_enter(PlayerId(1), &mut events);
        players.self_id = PlayerId(1);
        let player = players.get(PlayerId(1)).unwrap().clone();
        let settings = settings();
        let map = map();

        manager.fire_weapons(&player, WeaponData::from_bits(1), 0, 0, 0, 0, Tick(0), &settings, &players, &map, &mut events);
        manager.update(Tick(settings.bullet_alive_time + 1), &settings, &mut players, &map, &mut events);

        assert!(manager.is_empty());
    }
}
