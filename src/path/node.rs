//! Pathfinding node grid (§4.8).
//!
//! One [`Node`] per tile, holding A* working state (`g`/`f`/`parent`) plus
//! precomputed per-ship-radius traversability and edge weight. The whole
//! 1024x1024 grid is precomputed once per ship radius change rather than
//! on demand, since the search itself runs every tick for active pathers
//! and can't afford to repeat wall-distance scans.

use crate::core::Vec2;
use crate::map::tile::TileMap;

/// Sentinel meaning "no parent" in the backtrace chain.
pub const NO_PARENT: u32 = u32::MAX;

const NODE_TRAVERSABLE: u8 = 1 << 0;
const NODE_SAFETY: u8 = 1 << 1;
const NODE_BRICK: u8 = 1 << 2;
const NODE_OPENSET: u8 = 1 << 3;
const NODE_TOUCHED: u8 = 1 << 4;

/// One grid cell's A* working state and static properties.
#[derive(Clone, Copy, Debug)]
pub struct Node {
    flags: u8,
    pub parent_id: u32,
    pub g: f32,
    pub f: f32,
    weight: f32,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            flags: 0,
            parent_id: NO_PARENT,
            g: f32::MAX,
            f: f32::MAX,
            weight: 1.0,
        }
    }
}

impl Node {
    pub fn is_traversable(&self) -> bool {
        self.flags & NODE_TRAVERSABLE != 0
    }

    pub fn is_safety(&self) -> bool {
        self.flags & NODE_SAFETY != 0
    }

    pub fn is_brick(&self) -> bool {
        self.flags & NODE_BRICK != 0
    }

    pub fn is_touched(&self) -> bool {
        self.flags & NODE_TOUCHED != 0
    }

    pub fn is_in_openset(&self) -> bool {
        self.flags & NODE_OPENSET != 0
    }

    /// Mark this node as having been visited by the current search, so a
    /// later re-relaxation knows to compare against its existing `g` rather
    /// than treating it as unvisited.
    pub fn touch(&mut self) {
        self.flags |= NODE_TOUCHED;
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Reset per-search working state while keeping the precomputed
    /// traversability/weight/safety flags.
    fn reset_search_state(&mut self) {
        self.flags &= NODE_TRAVERSABLE | NODE_SAFETY | NODE_BRICK;
        self.parent_id = NO_PARENT;
        self.g = f32::MAX;
        self.f = f32::MAX;
    }
}

/// The 8 grid-adjacent directions, in a fixed bit order shared with
/// [`EdgeSet`].
pub const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Which of a node's 8 neighbors are traversable, plus whether any of them
/// depend on dynamic (brick/door) state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeSet {
    bits: u8,
    pub dynamic: bool,
}

impl EdgeSet {
    pub fn is_set(&self, index: usize) -> bool {
        self.bits & (1 << index) != 0
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if value {
            self.bits |= 1 << index;
        } else {
            self.bits &= !(1 << index);
        }
    }
}

/// How precomputed edge weight penalizes proximity to walls, narrowing
/// paths away from corridors without blocking them outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightType {
    /// Every traversable tile costs the same.
    Flat,
    /// Cost scales inversely with distance to the nearest wall.
    Linear,
    /// Cost scales with the squared shortfall from `wall_distance`.
    Quadratic,
}

/// Precompute parameters: which ship radius/frequency this grid was built
/// for, and how heavily to penalize tiles close to walls.
#[derive(Clone, Copy, Debug)]
pub struct WeightConfig {
    pub ship_radius: f32,
    pub frequency: u32,
    pub weight_type: WeightType,
    pub wall_distance: u16,
}

/// The full precomputed node grid for one ship radius.
pub struct NodeGrid {
    size: u16,
    nodes: Vec<Node>,
    edges: Vec<EdgeSet>,
}

impl NodeGrid {
    pub fn new(size: u16) -> NodeGrid {
        let count = size as usize * size as usize;
        NodeGrid {
            size,
            nodes: vec![Node::default(); count],
            edges: vec![EdgeSet::default(); count],
        }
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.size as usize + x as usize
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u16) < self.size && (y as u16) < self.size
    }

    pub fn node(&self, x: u16, y: u16) -> &Node {
        &self.nodes[self.index(x, y)]
    }

    pub fn node_mut(&mut self, x: u16, y: u16) -> &mut Node {
        let i = self.index(x, y);
        &mut self.nodes[i]
    }

    pub fn node_at_index(&self, index: u32) -> Option<&Node> {
        self.nodes.get(index as usize)
    }

    pub fn point_of_index(&self, index: u32) -> (u16, u16) {
        let index = index as usize;
        ((index % self.size as usize) as u16, (index / self.size as usize) as u16)
    }

    pub fn index_of(&self, x: u16, y: u16) -> u32 {
        self.index(x, y) as u32
    }

    pub fn edges(&self, x: u16, y: u16) -> EdgeSet {
        self.edges[self.index(x, y)]
    }

    pub fn set_edges(&mut self, x: u16, y: u16, edges: EdgeSet) {
        let i = self.index(x, y);
        self.edges[i] = edges;
    }

    /// Clear A* working state left over from the previous search on every
    /// node touched during it.
    pub fn clear_touched(&mut self, touched: &[u32]) {
        for &index in touched {
            self.nodes[index as usize].reset_search_state();
        }
    }

    /// Precompute traversability, edge sets, safety flags and wall-distance
    /// weights for every tile, given a ship radius/frequency.
    ///
    /// The original computes this over a thread pool; since it only runs on
    /// a ship-radius change (not every tick), a single sequential pass is
    /// used here instead — the resulting grid is identical either way.
    pub fn precompute(&mut self, map: &TileMap, config: WeightConfig) {
        let size = self.size;

        for y in 0..size {
            for x in 0..size {
                let node = self.node_mut(x, y);
                *node = Node::default();

                let position = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if map.can_overlap_tile(position, config.ship_radius) {
                    node.flags |= NODE_TRAVERSABLE;
                }
            }
        }

        for y in 0..size {
            for x in 0..size {
                if !self.node(x, y).is_traversable() {
                    continue;
                }

                let mut edges = EdgeSet::default();
                for (i, (dx, dy)) in DIRECTIONS.iter().enumerate() {
                    let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                    if !self.in_bounds(nx, ny) {
                        continue;
                    }
                    let (nx, ny) = (nx as u16, ny as u16);
                    if self.node(nx, ny).is_traversable() {
                        edges.set(i, true);
                    }
                }
                self.set_edges(x, y, edges);

                let weight = if config.weight_type == WeightType::Flat {
                    1.0
                } else {
                    let distance = wall_distance(map, x, y, config.wall_distance).max(1.0);
                    let close = config.wall_distance as f32;
                    if distance < close {
                        match config.weight_type {
                            WeightType::Linear => close / distance,
                            WeightType::Quadratic => {
                                let shortfall = close - distance;
                                shortfall * shortfall
                            }
                            WeightType::Flat => unreachable!(),
                        }
                    } else {
                        1.0
                    }
                };

                let node = self.node_mut(x, y);
                node.weight = weight;
                if map.get_tile_id(x, y) == crate::map::tile::TILE_SAFE_ID {
                    node.flags |= NODE_SAFETY;
                }
            }
        }
    }
}

/// Nearest solid-tile distance within `radius` tiles, used to bias edge
/// weight away from corridors.
fn wall_distance(map: &TileMap, x: u16, y: u16, radius: u16) -> f32 {
    let mut closest_sq = f32::MAX;
    let radius = radius as i32;

    for offset_y in -radius..=radius {
        for offset_x in -radius..=radius {
            let check_x = x as i32 + offset_x;
            let check_y = y as i32 + offset_y;
            if check_x < 0 || check_y < 0 {
                continue;
            }
            if map.is_solid(check_x as u16, check_y as u16) {
                let dist_sq = (offset_x * offset_x + offset_y * offset_y) as f32;
                if dist_sq < closest_sq {
                    closest_sq = dist_sq;
                }
            }
        }
    }

    closest_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precompute_marks_open_tiles_traversable() {
        let map = TileMap::load(&[]).unwrap();
        let mut grid = NodeGrid::new(64);
        grid.precompute(
            &map,
            WeightConfig {
                ship_radius: 1.0,
                frequency: 0xFFFF,
                weight_type: WeightType::Flat,
                wall_distance: 5,
            },
        );
        assert!(grid.node(30, 30).is_traversable());
    }

    #[test]
    fn edge_set_tracks_individual_directions() {
        let mut edges = EdgeSet::default();
        edges.set(2, true);
        assert!(edges.is_set(2));
        assert!(!edges.is_set(3));
        edges.set(2, false);
        assert!(!edges.is_set(2));
    }

    #[test]
    fn index_round_trips_through_point() {
        let grid = NodeGrid::new(1024);
        let index = grid.index_of(100, 200);
        assert_eq!(grid.point_of_index(index), (100, 200));
    }
}
