//! Base and flagroom detection (§4.8's base-topology extension).
//!
//! Bases aren't flagged in map data; they're found algorithmically. Starting
//! from the map's spawn point, a Dijkstra flood gives every reachable tile
//! its path distance from spawn. The tiles whose path distance most exceeds
//! their straight-line distance from spawn are the ones the path had to wind
//! through corridors to reach — in practice, flagrooms. A second flood from
//! each flagroom position, stopping at the first tile no longer hugging a
//! wall, finds that base's entrance; a depth-limited flood around the
//! flagroom position gives its bitset.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::core::Vec2;
use crate::map::region::{RegionBitset, RegionDataMap};
use crate::map::tile::{TileMap, MAP_SIZE};
use crate::path::node::{NodeGrid, WeightConfig, WeightType, DIRECTIONS};

/// Ship radius bases are detected with, independent of whatever radius a
/// live game's pathfinder is currently configured for.
const BASE_SHIP_RADIUS: f32 = 14.0 / 16.0;
const FREQUENCY_NONE: u32 = 0xFFFF;

/// Cardinal-direction indices into [`DIRECTIONS`] (N, E, S, W).
const CARDINAL_INDICES: [usize; 4] = [0, 2, 4, 6];

/// Parameters controlling base detection.
#[derive(Clone, Copy, Debug)]
pub struct MapBuildConfig {
    /// Spawn tile every base's path distance is measured from.
    pub spawn: (u16, u16),
    /// How many distinct bases to look for.
    pub base_count: usize,
    /// Flood-fill radius (in path steps) used to build each flagroom bitset.
    pub flagroom_size: i32,
    /// How far to search in each of 8 directions when deciding whether a
    /// tile counts as "near a wall" for entrance detection.
    pub empty_exit_range: i32,
    /// Whether to also record per-tile flood depth from the flagroom.
    pub populate_flood_map: bool,
}

impl Default for MapBuildConfig {
    fn default() -> Self {
        MapBuildConfig {
            spawn: (512, 512),
            base_count: 4,
            flagroom_size: 40,
            empty_exit_range: 25,
            populate_flood_map: false,
        }
    }
}

/// One detected base: its full reachable interior, its flagroom's
/// immediate surroundings, and the path connecting the two.
#[derive(Clone, Debug, Default)]
pub struct MapBase {
    pub bitset: RegionBitset,
    pub flagroom_bitset: RegionBitset,
    pub entrance_position: Vec2,
    pub flagroom_position: Vec2,
    pub path_flood_map: RegionDataMap<u16>,
    pub max_depth: u16,
}

/// Find up to `config.base_count` bases in `map`.
pub fn find_bases(map: &TileMap, config: &MapBuildConfig) -> Vec<MapBase> {
    let grid = build_base_grid(map);
    let flagrooms = detect_flagroom_positions(map, &grid, config);
    build_bases(map, &grid, &flagrooms, config)
}

fn build_base_grid(map: &TileMap) -> NodeGrid {
    let mut grid = NodeGrid::new(MAP_SIZE);
    grid.precompute(
        map,
        WeightConfig {
            ship_radius: BASE_SHIP_RADIUS,
            frequency: FREQUENCY_NONE,
            weight_type: WeightType::Flat,
            wall_distance: 5,
        },
    );
    grid
}

#[derive(Clone, Copy, PartialEq)]
struct DistEntry {
    dist: f32,
    index: u32,
}

impl Eq for DistEntry {}

impl Ord for DistEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.total_cmp(&self.dist)
    }
}

impl PartialOrd for DistEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn detect_flagroom_positions(
    _map: &TileMap,
    grid: &NodeGrid,
    config: &MapBuildConfig,
) -> Vec<(u16, u16)> {
    let tile_total = MAP_SIZE as usize * MAP_SIZE as usize;
    let mut dist = vec![f32::MAX; tile_total];
    let mut visited = vec![false; tile_total];

    let spawn_index = grid.index_of(config.spawn.0, config.spawn.1) as usize;
    dist[spawn_index] = 0.0;

    let mut queue = BinaryHeap::new();
    queue.push(DistEntry {
        dist: 0.0,
        index: spawn_index as u32,
    });

    while let Some(DistEntry { index, .. }) = queue.pop() {
        let index = index as usize;
        if visited[index] {
            continue;
        }
        visited[index] = true;

        let (x, y) = grid.point_of_index(index as u32);
        let edges = grid.edges(x, y);

        for &dir_index in &CARDINAL_INDICES {
            if !edges.is_set(dir_index) {
                continue;
            }
            let (dx, dy) = DIRECTIONS[dir_index];
            let (nx, ny) = (x as i32 + dx, y as i32 + dy);
            if !grid.in_bounds(nx, ny) {
                continue;
            }
            let (nx, ny) = (nx as u16, ny as u16);
            let neighbor_index = grid.index_of(nx, ny) as usize;
            if visited[neighbor_index] {
                continue;
            }

            let candidate = dist[index] + 1.0;
            if candidate < dist[neighbor_index] {
                dist[neighbor_index] = candidate;
                queue.push(DistEntry {
                    dist: candidate,
                    index: neighbor_index as u32,
                });
            }
        }
    }

    let spawn_pos = Vec2::new(config.spawn.0 as f32, config.spawn.1 as f32);
    let ignore_distance_sq = 125.0f32 * 125.0;

    let mut bases: Vec<(f32, Vec2)> = Vec::new();

    for _ in 0..config.base_count {
        let mut best_delta = f32::MIN;
        let mut best_pos = Vec2::ZERO;

        for y in 0..MAP_SIZE {
            for x in 0..MAP_SIZE {
                let index = grid.index_of(x, y) as usize;
                if !visited[index] {
                    continue;
                }

                let node_pos = Vec2::new(x as f32, y as f32);
                if bases
                    .iter()
                    .any(|(_, pos)| pos.distance_squared(node_pos) <= ignore_distance_sq)
                {
                    continue;
                }

                let direct_distance = node_pos.distance(spawn_pos);
                let delta = dist[index] - direct_distance;

                if delta > best_delta {
                    best_delta = delta;
                    best_pos = node_pos;
                }
            }
        }

        bases.push((best_delta, best_pos));
    }

    bases
        .into_iter()
        .map(|(_, pos)| (pos.x as u16, pos.y as u16))
        .collect()
}

fn build_walled_bitset(map: &TileMap, empty_exit_range: i32) -> Vec<bool> {
    const EIGHT_DIRECTIONS: [(i32, i32); 8] = [
        (1, 0),
        (0, 1),
        (-1, 0),
        (0, -1),
        (-1, -1),
        (1, -1),
        (-1, 1),
        (1, 1),
    ];

    let mut walled = vec![false; MAP_SIZE as usize * MAP_SIZE as usize];

    for y in 0..MAP_SIZE {
        for x in 0..MAP_SIZE {
            let mut near_wall = false;

            'directions: for (dx, dy) in EIGHT_DIRECTIONS {
                for i in 0..empty_exit_range {
                    let check_x = x as i32 + dx * i;
                    let check_y = y as i32 + dy * i;
                    if check_x < 0 || check_y < 0 || check_x >= MAP_SIZE as i32 || check_y >= MAP_SIZE as i32 {
                        continue;
                    }
                    if map.is_solid(check_x as u16, check_y as u16) {
                        near_wall = true;
                        break 'directions;
                    }
                }
            }

            walled[y as usize * MAP_SIZE as usize + x as usize] = near_wall;
        }
    }

    walled
}

fn build_bases(
    map: &TileMap,
    grid: &NodeGrid,
    flagrooms: &[(u16, u16)],
    config: &MapBuildConfig,
) -> Vec<MapBase> {
    let walled = build_walled_bitset(map, config.empty_exit_range);

    flagrooms
        .iter()
        .map(|&fr| {
            let mut base = MapBase::default();

            let (entrance, depth_map, max_depth) =
                flood_fill_region(grid, &walled, fr, None, config.populate_flood_map, &mut base.bitset);
            base.entrance_position = entrance;
            if let Some(map) = depth_map {
                base.path_flood_map = map;
            }
            base.max_depth = max_depth;

            let (_, _, _) = flood_fill_region(
                grid,
                &walled,
                fr,
                Some(config.flagroom_size),
                false,
                &mut base.flagroom_bitset,
            );

            base.flagroom_position = Vec2::new(fr.0 as f32, fr.1 as f32);

            base
        })
        .collect()
}

/// BFS from `start`, stopping each branch at `range` steps if given, or at
/// the first tile that's no longer "walled" (the entrance) otherwise.
/// Returns the entrance position found (or `start` if a range was given),
/// an optional per-tile depth map, and the maximum depth reached.
fn flood_fill_region(
    grid: &NodeGrid,
    walled: &[bool],
    start: (u16, u16),
    range: Option<i32>,
    populate_depth_map: bool,
    region: &mut RegionBitset,
) -> (Vec2, Option<RegionDataMap<u16>>, u16) {
    let mut depth_map = if populate_depth_map {
        Some(RegionDataMap::new())
    } else {
        None
    };

    let mut queue = VecDeque::new();
    queue.push_back((start, 0i32));
    region.set(start.0 as i32, start.1 as i32, true);

    let mut entrance_position = Vec2::new(start.0 as f32, start.1 as f32);
    let mut max_depth = 0u16;

    while let Some((coord, depth)) = queue.pop_front() {
        if let Some(map) = depth_map.as_mut() {
            map.insert(coord.0 as i32, coord.1 as i32, depth as u16);
        }
        max_depth = max_depth.max(depth as u16);

        let global_index = coord.1 as usize * MAP_SIZE as usize + coord.0 as usize;

        if let Some(limit) = range {
            if depth >= limit {
                continue;
            }
        } else if !walled[global_index] {
            entrance_position = Vec2::new(coord.0 as f32, coord.1 as f32);
            break;
        }

        let edges = grid.edges(coord.0, coord.1);

        for &dir_index in &CARDINAL_INDICES {
            if !edges.is_set(dir_index) {
                continue;
            }
            let (dx, dy) = DIRECTIONS[dir_index];
            let (nx, ny) = (coord.0 as i32 + dx, coord.1 as i32 + dy);
            if !grid.in_bounds(nx, ny) {
                continue;
            }
            if region.test(nx, ny) {
                continue;
            }

            region.set(nx, ny, true);
            queue.push_back(((nx as u16, ny as u16), depth + 1));
        }
    }

    region.shrink_to_fit();
    if let Some(map) = depth_map.as_mut() {
        map.insert(start.0 as i32, start.1 as i32, 0);
    }

    (entrance_position, depth_map, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_map_finds_requested_base_count() {
        let map = TileMap::load(&[]).unwrap();
        let config = MapBuildConfig {
            base_count: 2,
            ..Default::default()
        };
        let bases = find_bases(&map, &config);
        assert_eq!(bases.len(), 2);
    }

    #[test]
    fn flagroom_bitset_is_bounded_by_flood_range() {
        let map = TileMap::load(&[]).unwrap();
        let config = MapBuildConfig {
            base_count: 1,
            flagroom_size: 3,
            ..Default::default()
        };
        let bases = find_bases(&map, &config);
        let base = &bases[0];
        let bbox = base.flagroom_bitset.bounding_box();
        // A flood of radius 3 in open space can span at most 7 tiles per axis.
        assert!(bbox.width() <= 7 && bbox.height() <= 7);
    }

    #[test]
    fn entrance_position_defaults_to_flagroom_in_fully_open_map() {
        let map = TileMap::load(&[]).unwrap();
        let config = MapBuildConfig {
            base_count: 1,
            ..Default::default()
        };
        let bases = find_bases(&map, &config);
        // With no walls anywhere, every tile is a non-walled "entrance", so
        // the flood stops immediately at the flagroom position itself.
        assert_eq!(bases[0].entrance_position, bases[0].flagroom_position);
    }
}
