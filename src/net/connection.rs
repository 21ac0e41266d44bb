//! The transport collaborator.
//!
//! Low-level UDP framing, reliability, and encryption are out of scope for
//! this crate (they're provided by a host application). Everything here
//! touches that collaborator only through the [`Connection`] trait and the
//! plain [`ArenaSettings`] data it exposes.

use crate::core::Tick;

/// Everything the simulation core needs from the transport layer.
///
/// A concrete implementation owns the UDP socket, packet sequencing, and
/// encryption; this crate only ever calls these four methods.
pub trait Connection {
    /// Send an unreliable datagram as-is.
    fn send(&mut self, buffer: &[u8]);

    /// Send a payload wrapped in the reliable-message protocol (used for
    /// chat and other messages that must not be silently dropped).
    fn send_reliable_message(&mut self, payload: &[u8]);

    /// The connection's view of the current server-synced tick.
    fn current_tick(&self) -> Tick;

    /// The arena settings blob last received from the server.
    fn arena_settings(&self) -> &ArenaSettings;
}

/// Server-provided arena configuration.
///
/// This is treated as an opaque, externally-populated blob: the server sends
/// it once per arena join and this crate only reads named fields relevant to
/// its own formulas (ship stats, weapon speeds, prize weights, and so on).
#[derive(Clone, Debug, Default)]
pub struct ArenaSettings {
    /// Raw settings payload as received from the server.
    pub raw: Vec<u8>,
}

impl ArenaSettings {
    /// Wrap a raw settings payload.
    pub fn new(raw: Vec<u8>) -> Self {
        ArenaSettings { raw }
    }

    /// Read a little-endian `u32` at `offset`, or `None` if out of bounds.
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        self.raw
            .get(offset..offset + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian `u16` at `offset`, or `None` if out of bounds.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        self.raw
            .get(offset..offset + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a single byte at `offset`, or `None` if out of bounds.
    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        self.raw.get(offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_at_offsets() {
        let settings = ArenaSettings::new(vec![0x01, 0x00, 0x02, 0x00, 0x00, 0x00]);
        assert_eq!(settings.read_u8(0), Some(1));
        assert_eq!(settings.read_u16(0), Some(1));
        assert_eq!(settings.read_u32(2), Some(2));
        assert_eq!(settings.read_u32(100), None);
    }
}

/// Per-ship formula constants, one of `Settings::ships`'s 8 entries.
///
/// The wire `ArenaSettings` blob carries these as packed fixed-width
/// fields at ship-specific offsets; a host application is expected to
/// parse the blob once per arena join and hand the typed result to every
/// formula in `player`/`weapon`/`ship` rather than have each of them
/// re-read `ArenaSettings` offsets directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShipSettings {
    pub radius: f32,
    pub initial_speed: u32,
    pub maximum_speed: u32,
    pub initial_thrust: u32,
    pub maximum_thrust: u32,
    pub initial_recharge: u32,
    pub maximum_recharge: u32,
    pub initial_energy: u32,
    pub maximum_energy: u32,
    pub initial_rotation: u32,
    pub maximum_rotation: u32,
    pub gravity: i16,
    pub gravity_top_speed: u32,
    pub bullet_speed: u32,
    pub bomb_speed: u32,
    pub burst_speed: u32,
    pub bomb_bounce_count: u32,
    pub double_barrel: bool,
    pub multi_fire_angle: u32,
    pub burst_shrapnel: u8,
    pub max_mines: u32,
    pub attach_bounty: u32,
    pub turret_limit: u32,
    pub afterburner_thrust: u32,
    pub afterburner_energy: u32,
    pub bomb_thrust: u32,
    pub rocket_speed: u32,
    pub rocket_thrust: u32,
    pub spawn: [SpawnSettings; 4],
}

impl ShipSettings {
    /// Collision/overlap radius, in tiles.
    pub fn get_radius(&self) -> f32 {
        self.radius
    }
}

/// One frequency-parity entry of a ship's explicit spawn zone (`x_center`,
/// `y_center`, `radius` in tiles; a zero radius means "use the zone
/// default" rather than this entry).
#[derive(Clone, Copy, Debug, Default)]
pub struct SpawnSettings {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

/// Arena-wide formula constants not specific to a single ship.
///
/// Grouped by the subsystem that consumes them; see `SPEC_FULL.md` §4 for
/// the formulas each field feeds.
#[derive(Clone, Debug)]
pub struct Settings {
    pub ships: [ShipSettings; 8],

    // Movement / bounce.
    pub bounce_factor: u32,
    pub radar_mode: u32,
    pub warp_radius_limit: i32,
    pub send_position_delay: u32,
    pub extra_position_data: bool,
    pub player_timeout: i32,

    // Weapon lifetime / firing.
    pub bullet_alive_time: u32,
    pub bomb_alive_time: u32,
    pub mine_alive_time: u32,
    pub repel_time: u32,
    pub decoy_alive_time: u32,
    pub repel_distance: u32,
    pub repel_speed: u32,
    pub team_max_mines: u32,
    pub gravity_bombs: bool,
    pub shrapnel_random: bool,
    pub shrapnel_speed: u32,
    pub proximity_distance: u32,
    pub bomb_explode_delay: u32,

    // Damage.
    pub bullet_damage_level: u32,
    pub bullet_damage_upgrade: u32,
    pub shrapnel_damage_percent: u32,
    pub inactive_shrap_damage: u32,
    pub bomb_damage_level: u32,
    pub ebomb_damage_percent: u32,
    pub bbomb_damage_percent: u32,
    pub bomb_explode_pixels: u32,
    pub burst_damage_level: u32,
    pub exact_damage: bool,
    pub ebomb_shutdown_time: u32,

    // Antiwarp.
    pub antiwarp_pixels: u32,
    pub antiwarp_settle_delay: u32,

    // Prize economy.
    pub prize_weights: [u32; 28],
    pub prize_negative_factor: u32,
    pub bounty_increase_for_kill: u32,
    pub flag_drop_delay: u32,
    pub enter_delay: u32,
    pub multiprize_count: u32,

    // Chat.
    pub chat_flood_limit: u32,

    // Soccer.
    pub soccer_mode: u32,
    pub soccer_ball_proximity: u32,
    pub soccer_ball_speed: u32,
    pub soccer_ball_throw_timer: u32,
    pub pass_delay: u32,

    // Ship controller.
    pub initial_bounty: u32,
    pub rocket_time: u32,
    pub turret_thrust_penalty: u32,
    pub turret_speed_penalty: u32,
    pub disable_fast_shooting: bool,
    pub bomb_safety: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ships: [ShipSettings::default(); 8],
            bounce_factor: 16,
            radar_mode: 0,
            warp_radius_limit: 0,
            send_position_delay: 5,
            extra_position_data: false,
            player_timeout: 500,
            bullet_alive_time: 550,
            bomb_alive_time: 550,
            mine_alive_time: 2000,
            repel_time: 10,
            decoy_alive_time: 550,
            repel_distance: 0,
            repel_speed: 0,
            team_max_mines: 0,
            gravity_bombs: false,
            shrapnel_random: false,
            shrapnel_speed: 0,
            proximity_distance: 0,
            bomb_explode_delay: 25,
            bullet_damage_level: 0,
            bullet_damage_upgrade: 0,
            shrapnel_damage_percent: 1000,
            inactive_shrap_damage: 0,
            bomb_damage_level: 0,
            ebomb_damage_percent: 1000,
            bbomb_damage_percent: 1000,
            bomb_explode_pixels: 0,
            burst_damage_level: 0,
            exact_damage: false,
            ebomb_shutdown_time: 0,
            antiwarp_pixels: 0,
            antiwarp_settle_delay: 0,
            prize_weights: [0; 28],
            prize_negative_factor: 0,
            bounty_increase_for_kill: 0,
            flag_drop_delay: 0,
            enter_delay: 0,
            multiprize_count: 1,
            chat_flood_limit: 10,
            soccer_mode: 0,
            soccer_ball_proximity: 0,
            soccer_ball_speed: 0,
            soccer_ball_throw_timer: 0,
            pass_delay: 0,
            initial_bounty: 0,
            rocket_time: 0,
            turret_thrust_penalty: 0,
            turret_speed_penalty: 0,
            disable_fast_shooting: false,
            bomb_safety: false,
        }
    }
}
