//! Arena tile map: load format, solidity/occupancy queries, raycasting,
//! door replay and the compact region containers built on top (§4.2, §3).

pub mod door;
pub mod region;
pub mod tile;

pub use door::{update_doors, DoorMode};
pub use region::{BoundingBox, RegionBitset, RegionDataMap};
pub use tile::{AnimatedTile, CastResult, OccupyRect, TileId, TileMap, GOAL_TILE_ID, TILE_SAFE_ID, WORMHOLE_TILE_ID};

use crate::core::rng::VieRng;
use crate::core::tick::Tick;
use crate::error::CoreError;

/// The full per-arena map state: the tile grid plus the door-replay clock.
/// Distinct from [`TileMap`] so door seeding state isn't duplicated every
/// time a map is shared (e.g. between the live arena and a path-planning
/// snapshot).
pub struct Map {
    tiles: TileMap,
    door_rng: VieRng,
    last_seed_tick: Tick,
}

impl Map {
    /// Load a map from raw `.lvl` file bytes, with door replay starting
    /// fresh from `door_seed`.
    pub fn load(data: &[u8], door_seed: i32) -> Result<Map, CoreError> {
        Ok(Map {
            tiles: TileMap::load(data)?,
            door_rng: VieRng::new(door_seed),
            last_seed_tick: Tick(0),
        })
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileMap {
        &mut self.tiles
    }

    /// Advance door state to `current_tick` under `mode`/`door_delay`,
    /// returning door positions that just closed (for a door-warp check
    /// against player hulls).
    pub fn update_doors(
        &mut self,
        current_tick: Tick,
        mode: DoorMode,
        door_delay: u32,
    ) -> Vec<(u16, u16)> {
        update_doors(
            &mut self.tiles,
            &mut self.door_rng,
            &mut self.last_seed_tick,
            current_tick,
            mode,
            door_delay,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rejects_truncated_header() {
        let data = vec![b'B', b'M', 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(Map::load(&data, 1).is_err());
    }

    #[test]
    fn load_empty_map_has_no_solid_tiles() {
        let map = Map::load(&[], 1).unwrap();
        assert!(!map.tiles().is_solid(512, 512));
    }
}
