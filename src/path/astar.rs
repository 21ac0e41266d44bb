//! A* search over the precomputed node grid (§4.8).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::Vec2;
use crate::map::tile::TileMap;
use crate::path::node::{NodeGrid, WeightConfig, DIRECTIONS, NO_PARENT};

/// Extra cost charged once for the first step onto a safety tile, so
/// crossing through several safety tiles in a row isn't repeatedly
/// penalized.
const SAFETY_WEIGHT: f32 = 300.0;

/// A route from start to goal, in world-space tile-center coordinates.
/// `dynamic` marks a path that crossed a brick/door-dependent edge and
/// should be re-evaluated whenever that tile's state changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub points: Vec<Vec2>,
    pub dynamic: bool,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Something that can report whether two tile coordinates are in the same
/// connected region, letting the search bail out before scanning a grid
/// with no possible route. `basemap`'s flood-fill implements this.
pub trait RegionRegistry {
    fn is_connected(&self, from: (u16, u16), to: (u16, u16)) -> bool;
}

/// A registry that always reports connectivity, for callers (tests, tools)
/// that don't need the optimization.
pub struct AlwaysConnected;

impl RegionRegistry for AlwaysConnected {
    fn is_connected(&self, _from: (u16, u16), _to: (u16, u16)) -> bool {
        true
    }
}

#[derive(Clone, Copy, PartialEq)]
struct QueueEntry {
    f: f32,
    index: u32,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the lowest f-cost pops first.
        other.f.total_cmp(&self.f)
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Runs A* over a [`NodeGrid`] precomputed for a specific ship radius.
pub struct Pathfinder {
    grid: NodeGrid,
    config: WeightConfig,
}

impl Pathfinder {
    pub fn new(grid_size: u16, config: WeightConfig) -> Pathfinder {
        Pathfinder {
            grid: NodeGrid::new(grid_size),
            config,
        }
    }

    pub fn config(&self) -> WeightConfig {
        self.config
    }

    pub fn grid(&self) -> &NodeGrid {
        &self.grid
    }

    /// Recompute the node grid for a new ship radius or weighting scheme.
    pub fn recreate_map_weights(&mut self, map: &TileMap, config: WeightConfig) {
        self.config = config;
        self.grid.precompute(map, config);
    }

    /// Search from `from` to `to`. Returns an empty path if either endpoint
    /// is non-traversable or the two aren't in the same connected region.
    pub fn find_path(
        &mut self,
        map: &TileMap,
        regions: &dyn RegionRegistry,
        from: Vec2,
        to: Vec2,
        frequency: u32,
    ) -> Path {
        let start_point = (from.x as u16, from.y as u16);
        let goal_point = (to.x as u16, to.y as u16);

        if !self.grid.in_bounds(start_point.0 as i32, start_point.1 as i32)
            || !self.grid.in_bounds(goal_point.0 as i32, goal_point.1 as i32)
        {
            return Path::default();
        }

        if !self.grid.node(start_point.0, start_point.1).is_traversable()
            || !self.grid.node(goal_point.0, goal_point.1).is_traversable()
        {
            return Path::default();
        }

        if !regions.is_connected(start_point, goal_point) {
            return Path::default();
        }

        let start_index = self.grid.index_of(start_point.0, start_point.1);
        let goal_index = self.grid.index_of(goal_point.0, goal_point.1);

        let mut open: BinaryHeap<QueueEntry> = BinaryHeap::new();
        let mut touched = Vec::new();

        {
            let start_node = self.grid.node_mut(start_point.0, start_point.1);
            start_node.g = 0.0;
            start_node.f = 0.0;
        }
        touched.push(start_index);
        open.push(QueueEntry {
            f: 0.0,
            index: start_index,
        });

        let mut path_dynamic = false;
        let mut found_goal = false;

        while let Some(QueueEntry { index, .. }) = open.pop() {
            if index == goal_index {
                found_goal = true;
                break;
            }

            let (nx, ny) = self.grid.point_of_index(index);
            let node_g = self.grid.node(nx, ny).g;
            let node_is_safety = self.grid.node(nx, ny).is_safety();
            let edges = self.grid.edges(nx, ny);

            if edges.dynamic {
                path_dynamic = true;
            }

            for (i, (dx, dy)) in DIRECTIONS.iter().enumerate() {
                if !edges.is_set(i) {
                    continue;
                }

                let (ex, ey) = (nx as i32 + dx, ny as i32 + dy);
                if !self.grid.in_bounds(ex, ey) {
                    continue;
                }
                let (ex, ey) = (ex as u16, ey as u16);

                if self.grid.node(ex, ey).is_brick() {
                    path_dynamic = true;
                    if map.is_solid(ex, ey) {
                        continue;
                    }
                }

                let edge_index = self.grid.index_of(ex, ey);
                let edge_weight = self.grid.node(ex, ey).weight();
                let edge_is_safety = self.grid.node(ex, ey).is_safety();

                let mut cost = node_g + edge_weight;
                if edge_is_safety && !node_is_safety {
                    cost = node_g + SAFETY_WEIGHT;
                }

                let h = euclidean((ex, ey), goal_point);

                let edge_node = self.grid.node(ex, ey);
                let better = cost < edge_node.g || !edge_node.is_touched();

                if better {
                    let edge_node = self.grid.node_mut(ex, ey);
                    edge_node.g = cost;
                    edge_node.f = cost + h;
                    edge_node.parent_id = index;

                    if !edge_node.is_touched() {
                        touched.push(edge_index);
                        edge_node.touch();
                    }

                    open.push(QueueEntry {
                        f: cost + h,
                        index: edge_index,
                    });
                }
            }
        }

        let mut path = Path::default();
        path.dynamic = path_dynamic;

        if found_goal {
            let mut points = Vec::new();
            let mut current = goal_index;

            while current != start_index {
                let (px, py) = self.grid.point_of_index(current);
                points.push(Vec2::new(px as f32 + 0.5, py as f32 + 0.5));
                let parent = self.grid.node(px, py).parent_id;
                if parent == NO_PARENT {
                    break;
                }
                current = parent;
            }

            points.push(Vec2::new(
                start_point.0 as f32 + 0.5,
                start_point.1 as f32 + 0.5,
            ));
            points.reverse();
            path.points = points;
        }

        self.grid.clear_touched(&touched);

        path
    }
}

fn euclidean(from: (u16, u16), to: (u16, u16)) -> f32 {
    let dx = from.0 as f32 - to.0 as f32;
    let dy = from.1 as f32 - to.1 as f32;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::node::WeightType;

    fn open_pathfinder(size: u16) -> (Pathfinder, TileMap) {
        let map = TileMap::load(&[]).unwrap();
        let mut finder = Pathfinder::new(
            size,
            WeightConfig {
                ship_radius: 1.0,
                frequency: 0xFFFF,
                weight_type: WeightType::Flat,
                wall_distance: 5,
            },
        );
        finder.recreate_map_weights(&map, finder.config());
        (finder, map)
    }

    #[test]
    fn finds_straight_line_path_in_open_space() {
        let (mut finder, map) = open_pathfinder(64);
        let path = finder.find_path(
            &map,
            &AlwaysConnected,
            Vec2::new(5.5, 5.5),
            Vec2::new(10.5, 5.5),
            0xFFFF,
        );
        assert!(!path.is_empty());
        assert_eq!(path.points.first().unwrap().y.round(), 6.0);
        assert_eq!(path.points.last().unwrap().x.round(), 11.0);
    }

    #[test]
    fn disconnected_regions_report_no_path() {
        let (mut finder, map) = open_pathfinder(64);
        struct NeverConnected;
        impl RegionRegistry for NeverConnected {
            fn is_connected(&self, _from: (u16, u16), _to: (u16, u16)) -> bool {
                false
            }
        }
        let path = finder.find_path(
            &map,
            &NeverConnected,
            Vec2::new(5.5, 5.5),
            Vec2::new(10.5, 5.5),
            0xFFFF,
        );
        assert!(path.is_empty());
    }

    #[test]
    fn out_of_bounds_endpoint_yields_empty_path() {
        let (mut finder, map) = open_pathfinder(64);
        let path = finder.find_path(
            &map,
            &AlwaysConnected,
            Vec2::new(5.5, 5.5),
            Vec2::new(9999.0, 9999.0),
            0xFFFF,
        );
        assert!(path.is_empty());
    }
}
