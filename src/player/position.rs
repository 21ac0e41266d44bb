//! Position packets in and out, and the per-tick motion/collision
//! simulation shared by every player in the roster.
//!
//! Grounded on `PlayerManager::SimulatePosition`/`OnLargePositionPacket`/
//! `OnSmallPositionPacket`/`SendPositionPacket` (§4.4). Position is stored in
//! tiles (`f32`), velocity in tiles-per-tick — the same convention
//! `weapon::manager` uses for its own `Weapon::velocity` (see that module's
//! `simulate_axis`), so a single tick's integration is a direct `position +=
//! velocity` with no extra `dt` multiply. Wire fields are ×16 (position) and
//! ×160 (velocity) fixed-point integers; `/16.0` and `/160.0` convert to and
//! from this crate's tile units.

use crate::core::{SmallTick, Tick, Vec2};
use crate::map::tile::TileMap;
use crate::net::connection::Settings;
use crate::net::packet::{LargePositionExtra, LargePositionPacket, PacketWriter, SmallPositionPacket};
use crate::player::state::{Player, PlayerId, PlayerStatus};

/// Duration of one tick, in seconds.
const DT: f32 = 1.0 / 100.0;

/// Axis error, in tiles, at or beyond which an incoming snapshot snaps
/// instead of lerping.
const SNAP_THRESHOLD_TILES: f32 = 4.0;

/// Lerp blend duration for a non-snapped position correction.
const LERP_DURATION_SECONDS: f32 = 0.2;

/// How far in the past (in ticks) a reconstructed position timestamp may be
/// before the whole packet is dropped as stale.
const POSITION_STALE_THRESHOLD: i32 = 300;

/// A safety cap on incoming catch-up simulation, independent of ping: no
/// single packet re-simulates more than one second of motion.
const MAX_CATCHUP_TICKS: i32 = 100;

/// Integrate one tick of motion for `player`, colliding axis-by-axis against
/// the tile map and bouncing off solid tiles per §4.4.
pub fn simulate_tick(player: &mut Player, settings: &Settings, map: &TileMap) {
    let radius = settings.ships[player.ship.min(7) as usize].get_radius();
    let lerp_step = player.lerp_time.min(DT);
    player.lerp_time = (player.lerp_time - DT).max(0.0);

    let delta = player.velocity + player.lerp_velocity * lerp_step;

    let mut bounced_x = false;
    let mut bounced_y = false;

    let old_x = player.position.x;
    player.position.x += delta.x;
    if axis_blocked(player.position, radius, Axis::X, map) {
        player.position.x = old_x;
        player.velocity.x = -player.velocity.x;
        bounced_x = true;
    }

    let old_y = player.position.y;
    player.position.y += delta.y;
    if axis_blocked(player.position, radius, Axis::Y, map) {
        player.position.y = old_y;
        player.velocity.y = -player.velocity.y;
        bounced_y = true;
    }

    if bounced_x || bounced_y {
        // A tick that bounces on both axes only scales once — otherwise a
        // corner hit would zero the velocity instead of reflecting it.
        let bounce_factor = if bounced_x && bounced_y {
            1.0
        } else {
            16.0 / settings.bounce_factor.max(1) as f32
        };
        player.velocity = player.velocity * bounce_factor;
        player.last_bounce_tick = player.last_bounce_tick + 1u32;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Scan the perpendicular range `[other - r - 1, other + r + 1]` around the
/// player's position on the opposite axis from `axis`, returning true if any
/// tile in that band is solid at the candidate position on `axis`.
fn axis_blocked(position: Vec2, radius: f32, axis: Axis, map: &TileMap) -> bool {
    let (fixed, scan_center) = match axis {
        Axis::X => (position.x, position.y),
        Axis::Y => (position.y, position.x),
    };

    let fixed_tile = fixed as i32;
    let scan_min = (scan_center - radius - 1.0).floor() as i32;
    let scan_max = (scan_center + radius + 1.0).ceil() as i32;

    for scan in scan_min..=scan_max {
        let (x, y) = match axis {
            Axis::X => (fixed_tile, scan),
            Axis::Y => (scan, fixed_tile),
        };
        if x < 0 || y < 0 {
            continue;
        }
        if map.is_solid(x as u16, y as u16) {
            return true;
        }
    }
    false
}

/// Apply a freshly-received large or small position snapshot to `player`,
/// per §4.4's four-step reconciliation. `packet_small_tick` and
/// `packet_position`/`packet_velocity` are taken from whichever packet
/// variant the caller parsed; `flash` comes from the packet's togglables.
#[allow(clippy::too_many_arguments)]
pub fn apply_incoming(
    player: &mut Player,
    packet_small_tick: SmallTick,
    packet_position: Vec2,
    packet_velocity: Vec2,
    flash: bool,
    current_tick: Tick,
    settings: &Settings,
    map: &TileMap,
) -> bool {
    if !packet_small_tick.is_newer_than(player.timestamp) {
        return false;
    }

    let reconstructed = reconstruct_local_tick(current_tick, packet_small_tick);
    if current_tick.diff(reconstructed) > POSITION_STALE_THRESHOLD {
        return false;
    }

    let previous_pos = player.position;
    player.position = packet_position;
    player.velocity = packet_velocity;
    player.lerp_time = 0.0;
    player.timestamp = packet_small_tick;

    let sim_ticks = current_tick.diff(reconstructed).clamp(0, MAX_CATCHUP_TICKS);
    for _ in 0..sim_ticks {
        simulate_tick(player, settings, map);
    }
    let projected = player.position;

    let axis_error = (projected.x - previous_pos.x).abs().max((projected.y - previous_pos.y).abs());
    if axis_error >= SNAP_THRESHOLD_TILES || flash {
        player.position = projected;
    } else {
        player.position = previous_pos;
        player.lerp_velocity = (projected - previous_pos) / LERP_DURATION_SECONDS;
        player.lerp_time = LERP_DURATION_SECONDS;
    }

    true
}

/// Reconstruct the full 32-bit tick nearest `current_tick` whose low 15 bits
/// equal `small_tick`, by choosing whichever wrap candidate lands closest.
fn reconstruct_local_tick(current_tick: Tick, small_tick: SmallTick) -> Tick {
    let base = current_tick.0 & !0x7FFFu32;
    let mut best = Tick(base | small_tick.0 as u32);
    let mut best_diff = current_tick.diff(best).abs();

    for candidate_base in [base.wrapping_sub(0x8000), base.wrapping_add(0x8000)] {
        let candidate = Tick(candidate_base | small_tick.0 as u32);
        let diff = current_tick.diff(candidate).abs();
        if diff < best_diff {
            best = candidate;
            best_diff = diff;
        }
    }
    best
}

/// Assemble the outgoing core position packet (§4.4), appending the 10-byte
/// extra-data trailer when `settings.extra_position_data` is set.
/// `checksum_fn` computes the server-defined weapon-checksum byte over the
/// already-written header bytes; its exact algorithm is a security-solver
/// collaborator concern (§9 open questions), not reproduced here.
#[allow(clippy::too_many_arguments)]
pub fn build_outgoing(
    player: &Player,
    server_timestamp: u32,
    settings: &Settings,
    checksum_fn: impl Fn(&[u8]) -> u8,
) -> Vec<u8> {
    let mut w = PacketWriter::new();
    w.write_u8(0x03);
    w.write_u8((player.orientation * 40.0) as u8);
    w.write_u32(server_timestamp);
    w.write_u16((player.velocity.x * 160.0) as i16 as u16);
    w.write_u16((player.position.y * 16.0) as u16);

    let header_for_checksum = w.as_slice().to_vec();
    w.write_u8(checksum_fn(&header_for_checksum));
    w.write_u8(player.status.bits());
    w.write_u16((player.position.x * 16.0) as u16);
    w.write_u16((player.velocity.y * 160.0) as i16 as u16);
    w.write_u16(player.bounty.min(u16::MAX as u32) as u16);
    w.write_u16(player.energy.min(u16::MAX as u32) as u16);
    w.write_u16(player.weapon);

    if settings.extra_position_data {
        w.write_u16(player.energy.min(u16::MAX as u32) as u16);
        w.write_u16((player.ping / 10).max(0));
        w.write_u16((player.flag_timer / 100).min(u16::MAX as u32) as u16);
        let items = (player.items.bursts as u32)
            | ((player.items.repels as u32) << 8)
            | ((player.items.thors as u32) << 16)
            | ((player.items.bricks as u32) << 24);
        w.write_u32(items);
    }

    w.into_vec()
}

/// Decode a [`LargePositionPacket`] into tile-space position/velocity and
/// the `Flash` flag, ready for [`apply_incoming`].
pub fn decode_large(packet: &LargePositionPacket) -> (Vec2, Vec2, bool) {
    let position = Vec2::new(packet.x as f32 / 16.0, packet.y as f32 / 16.0);
    let velocity = Vec2::new(packet.vel_x as f32 / 160.0, packet.vel_y as f32 / 160.0);
    let status = PlayerStatus::from_bits(packet.togglables);
    (position, velocity, status.contains(PlayerStatus::FLASH))
}

/// Decode a [`SmallPositionPacket`] the same way as [`decode_large`].
pub fn decode_small(packet: &SmallPositionPacket) -> (Vec2, Vec2, bool) {
    let position = Vec2::new(packet.x as f32 / 16.0, packet.y as f32 / 16.0);
    let velocity = Vec2::new(packet.vel_x as f32 / 160.0, packet.vel_y as f32 / 160.0);
    let status = PlayerStatus::from_bits(packet.togglables);
    (position, velocity, status.contains(PlayerStatus::FLASH))
}

/// Extra trailer fields, applied to a player when present.
pub fn apply_extra(player: &mut Player, extra: &LargePositionExtra) {
    player.energy = extra.energy as u32;
    player.flag_timer = extra.flag_timer as u32 * 100;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Tick;

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.ships[0].radius = 0.5;
        s.bounce_factor = 16;
        s
    }

    #[test]
    fn simulate_tick_integrates_velocity_with_no_collision() {
        let mut player = Player::new(PlayerId(0));
        player.position = Vec2::new(100.0, 100.0);
        player.velocity = Vec2::new(0.08, 0.0);
        simulate_tick(&mut player, &settings(), &TileMap::load(&[]).unwrap());
        assert!((player.position.x - 100.08).abs() < 1e-3);
        assert_eq!(player.position.y, 100.0);
    }

    #[test]
    fn large_axis_error_snaps_instead_of_lerping() {
        let mut player = Player::new(PlayerId(0));
        player.position = Vec2::new(100.0, 100.0);
        player.velocity = Vec2::ZERO;
        let map = TileMap::load(&[]).unwrap();

        let changed = apply_incoming(
            &mut player,
            SmallTick(100),
            Vec2::new(200.0, 200.0),
            Vec2::new(1.0, 0.0),
            false,
            Tick(108),
            &settings(),
            &map,
        );

        assert!(changed);
        assert!((player.position.x - 200.0).abs() < 50.0);
        assert_eq!(player.lerp_time, 0.0);
    }

    #[test]
    fn small_axis_error_schedules_a_lerp() {
        let mut player = Player::new(PlayerId(0));
        player.position = Vec2::new(100.0, 100.0);
        player.velocity = Vec2::ZERO;
        let map = TileMap::load(&[]).unwrap();

        apply_incoming(
            &mut player,
            SmallTick(8),
            Vec2::new(100.01, 100.0),
            Vec2::ZERO,
            false,
            Tick(8),
            &settings(),
            &map,
        );

        assert_eq!(player.position, Vec2::new(100.0, 100.0));
        assert_eq!(player.lerp_time, LERP_DURATION_SECONDS);
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let mut player = Player::new(PlayerId(0));
        player.timestamp = SmallTick(500);
        let map = TileMap::load(&[]).unwrap();

        let changed = apply_incoming(
            &mut player,
            SmallTick(10),
            Vec2::ZERO,
            Vec2::ZERO,
            false,
            Tick(500),
            &settings(),
            &map,
        );
        assert!(!changed);
    }
}
