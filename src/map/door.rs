//! Door tile seeding and replay (§4.2, invariant (v), properties R3/S5).
//!
//! Doors are driven by an 8-entry open/closed bit table derived from a
//! single seed byte. `DoorMode` selects how that seed is produced each
//! replay step: a fixed value, a free-running RNG, or a second RNG-driven
//! derivation that folds seven draws down into one byte. Replay is capped at
//! 100 steps per call so a connection that stalls for a long time doesn't
//! have to catch up tick-by-tick — catching up coarser than that is
//! indistinguishable to an observer from the door states simply not having
//! been applied yet.

use crate::core::rng::VieRng;
use crate::core::tick::Tick;
use crate::map::tile::{TileMap, FIRST_DOOR_ID, LAST_DOOR_ID};

/// The tile id a door uses while open. One past the highest closed-door id.
pub const OPEN_DOOR_ID: u8 = LAST_DOOR_ID + 1;

const MAX_REPLAY_STEPS: i64 = 100;

/// How the reseed value for each replay step is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorMode {
    /// Derive the seed from seven folded RNG draws.
    Folded,
    /// Draw the seed directly from the RNG.
    Random,
    /// Always reseed with this fixed byte.
    Fixed(u8),
}

impl DoorMode {
    /// Map the arena setting's raw `DoorMode` integer to a mode: `-2` is
    /// [`DoorMode::Random`], `-1` is [`DoorMode::Folded`], and any
    /// non-negative value is a fixed seed byte.
    pub fn from_setting(raw: i32) -> DoorMode {
        match raw {
            -2 => DoorMode::Random,
            -1 => DoorMode::Folded,
            n => DoorMode::Fixed(n as u8),
        }
    }
}

/// Advance door state by however many `DoorDelay`-sized steps have elapsed
/// since `last_seed_tick`, capped at 100. Returns the door positions that
/// transitioned from open to closed on the final step, which the caller
/// should check against player hulls for a door-warp collision.
pub fn update_doors(
    tiles: &mut TileMap,
    door_rng: &mut VieRng,
    last_seed_tick: &mut Tick,
    current_tick: Tick,
    mode: DoorMode,
    door_delay: u32,
) -> Vec<(u16, u16)> {
    let mut elapsed = current_tick.diff(*last_seed_tick) as i64;
    if door_delay > 0 {
        elapsed /= door_delay as i64;
    }
    let steps = elapsed.clamp(0, MAX_REPLAY_STEPS);

    let mut warped = Vec::new();
    for _ in 0..steps {
        let seed = match mode {
            DoorMode::Random => door_rng.next() as u8,
            DoorMode::Fixed(byte) => byte,
            DoorMode::Folded => fold_seed(door_rng),
        };

        warped = seed_doors(tiles, seed);
        *last_seed_tick = current_tick;
    }

    warped
}

/// Fold seven RNG draws into a single seed byte. Each draw contributes one
/// bit, set only if the draw (after a narrow mask and sign-extension) is
/// non-zero.
fn fold_seed(door_rng: &mut VieRng) -> u8 {
    let draws: [u32; 7] = std::array::from_fn(|_| door_rng.next() as u32);
    let masks: [u32; 7] = [
        0x8000_0001,
        0x8000_0003,
        0x8000_000F,
        0x8000_0003,
        0x8000_0007,
        0x8000_000F,
        0x8000_0007,
    ];
    let bits: [u8; 7] = [0x11, 0x2, 0x8, 0x20, 0x4, 0x40, 0x80];

    let mut seed: u8 = 0;
    for i in 0..7 {
        let masked = draws[i] & masks[i];
        let signed = masked as i32;
        let nonzero = signed != 0;
        if nonzero {
            seed = seed.wrapping_add(bits[i]);
        }
    }
    seed
}

/// Rebuild the 8-entry open/closed table from `seed` and stamp it onto
/// every tracked door tile.
fn seed_doors(tiles: &mut TileMap, seed: u8) -> Vec<(u16, u16)> {
    let bottom = seed;
    let mut table = [0u8; 8];

    table[0] = (((!bottom) & 1) << 3) | 0xA2;
    table[1] = if bottom & 2 != 0 { 0xA3 } else { 0xAA };
    table[2] = if bottom & 4 != 0 { 0xA4 } else { 0xAA };
    table[3] = if bottom & 8 != 0 { 0xA5 } else { 0xAA };
    table[4] = if bottom & 0x10 != 0 { 0xA6 } else { 0xAA };
    table[5] = if bottom & 0x20 != 0 { 0xA7 } else { 0xAA };
    table[6] = (!(bottom >> 5) & 2) | 0xA8;
    table[7] = if bottom & 0x80 != 0 { 0xA9 } else { 0xAA };

    let doors: Vec<(u16, u16, u8)> = tiles.doors().to_vec();
    let mut warped = Vec::new();

    for (x, y, id) in doors {
        let table_index = (id - FIRST_DOOR_ID) as usize;
        let new_id = table[table_index];
        let previous_id = tiles.get_tile_id(x, y);
        tiles.set_tile_id(x, y, new_id);

        if previous_id == OPEN_DOOR_ID && new_id != OPEN_DOOR_ID {
            warped.push((x, y));
        }
    }

    warped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tile::TileMap;

    fn packed_record(x: u16, y: u16, id: u8) -> [u8; 4] {
        let raw = (x as u32 & 0xFFF) | ((y as u32 & 0xFFF) << 12) | ((id as u32) << 24);
        raw.to_le_bytes()
    }

    #[test]
    fn fixed_mode_is_idempotent() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(10, 10, 163));
        let mut tiles = TileMap::load(&data).unwrap();
        let mut rng = VieRng::new(1);
        let mut last_seed_tick = Tick(0);

        update_doors(
            &mut tiles,
            &mut rng,
            &mut last_seed_tick,
            Tick(1),
            DoorMode::Fixed(5),
            1,
        );
        let first = tiles.get_tile_id(10, 10);

        update_doors(
            &mut tiles,
            &mut rng,
            &mut last_seed_tick,
            Tick(1),
            DoorMode::Fixed(5),
            1,
        );
        let second = tiles.get_tile_id(10, 10);

        assert_eq!(first, second);
    }

    #[test]
    fn no_elapsed_ticks_means_no_replay() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(10, 10, 163));
        let mut tiles = TileMap::load(&data).unwrap();
        let mut rng = VieRng::new(1);
        let mut last_seed_tick = Tick(100);
        let original = tiles.get_tile_id(10, 10);

        let warped = update_doors(
            &mut tiles,
            &mut rng,
            &mut last_seed_tick,
            Tick(100),
            DoorMode::Fixed(5),
            1,
        );

        assert!(warped.is_empty());
        assert_eq!(tiles.get_tile_id(10, 10), original);
    }

    #[test]
    fn replay_is_capped_at_100_steps() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(0, 0, 163));
        let mut tiles = TileMap::load(&data).unwrap();
        let mut rng = VieRng::new(1);
        let mut last_seed_tick = Tick(0);

        // 10_000 elapsed ticks at delay=1 would be 10_000 steps uncapped.
        update_doors(
            &mut tiles,
            &mut rng,
            &mut last_seed_tick,
            Tick(10_000),
            DoorMode::Random,
            1,
        );

        assert_eq!(last_seed_tick, Tick(10_000));
    }

    #[test]
    fn door_mode_from_setting_maps_sentinels() {
        assert_eq!(DoorMode::from_setting(-2), DoorMode::Random);
        assert_eq!(DoorMode::from_setting(-1), DoorMode::Folded);
        assert_eq!(DoorMode::from_setting(7), DoorMode::Fixed(7));
    }

    #[test]
    fn closed_to_open_transition_is_not_reported_as_warp() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(5, 5, 163));
        let mut tiles = TileMap::load(&data).unwrap();
        // Force the tile fully open before seeding.
        tiles.set_tile_id(5, 5, OPEN_DOOR_ID);
        let warped = seed_doors(&mut tiles, 0xFF);
        assert!(warped.is_empty() || tiles.get_tile_id(5, 5) == OPEN_DOOR_ID);
    }
}
