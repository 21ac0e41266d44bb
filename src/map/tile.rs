//! Tile grid: load format, solidity queries, occupancy search and raycasting
//! (§4.2).
//!
//! Loaded maps are stored as a flat `1024*1024` grid rather than the packed
//! on-disk record list, trading memory for O(1) point lookups — every other
//! query in this module bottoms out in repeated point lookups.

use crate::core::Vec2;
use crate::error::CoreError;

/// Width and height of every arena's tile grid.
pub const MAP_SIZE: u16 = 1024;

/// A door tile occupies one of these ids; which of the 8 depends on the
/// current seed (see `door.rs`).
pub const FIRST_DOOR_ID: TileId = 162;
pub const LAST_DOOR_ID: TileId = 169;

/// Tile walkable by ships standing still, but not by weapons (safety zone).
pub const TILE_SAFE_ID: TileId = 171;
/// Soccer goal tile.
pub const GOAL_TILE_ID: TileId = 172;
/// Wormhole animated tile: applies gravity-well thrust to nearby weapons.
pub const WORMHOLE_TILE_ID: TileId = 220;

const ANIMATED_TILE_COUNT: usize = 7;
const ANIMATED_TILE_IDS: [TileId; ANIMATED_TILE_COUNT] = [172, 216, 218, 217, 219, 220, 170];
const ANIMATED_TILE_SIZES: [u8; ANIMATED_TILE_COUNT] = [1, 1, 1, 2, 6, 5, 1];

/// A tile id, 0 meaning empty space.
pub type TileId = u8;

/// The anchor position and size class of one animated multi-tile sprite
/// (an asteroid, a wormhole, a space station...). `size` tiles are stamped
/// into the grid starting at `(x, y)`, all sharing the same `id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimatedTile {
    pub x: u16,
    pub y: u16,
    pub id: TileId,
    pub size: u8,
}

/// Result of a ray cast against the tile grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastResult {
    pub hit: bool,
    pub distance: f32,
    pub position: Vec2,
    pub normal: Vec2,
}

/// A rectangular region of tiles a ship's collision hull could occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OccupyRect {
    pub occupy: bool,
    pub start_x: u16,
    pub start_y: u16,
    pub end_x: u16,
    pub end_y: u16,
}

/// Whether a tile id blocks ship and weapon movement, independent of any
/// door or brick state layered on top.
fn is_solid_id(id: TileId) -> bool {
    if id == 0 {
        return false;
    }
    if (FIRST_DOOR_ID..=LAST_DOOR_ID).contains(&id) {
        return true;
    }
    if id < 170 {
        return true;
    }
    if (192..=240).contains(&id) {
        return true;
    }
    if (242..=252).contains(&id) {
        return true;
    }
    false
}

/// The loaded tile grid for one arena.
#[derive(Clone)]
pub struct TileMap {
    tiles: Vec<TileId>,
    doors: Vec<(u16, u16, TileId)>,
    animated_tiles: [Vec<AnimatedTile>; ANIMATED_TILE_COUNT],
}

impl TileMap {
    /// Parse a `.lvl`-style tile file: an optional `"BM"` + `u32` header
    /// giving the byte offset of the tile record list, followed by tight
    /// 4-byte little-endian records packed as `x:12 | y:12 | id:8`.
    pub fn load(data: &[u8]) -> Result<TileMap, CoreError> {
        let record_start = if data.len() >= 6 && data[0] == b'B' && data[1] == b'M' {
            u32::from_le_bytes([data[2], data[3], data[4], data[5]]) as usize
        } else {
            0
        };

        if record_start > data.len() {
            return Err(CoreError::MapLoad(format!(
                "header offset {record_start} past end of file ({} bytes)",
                data.len()
            )));
        }

        let records = &data[record_start..];
        let tile_count = records.len() / 4;

        let mut tiles = vec![0u8; MAP_SIZE as usize * MAP_SIZE as usize];
        let mut doors = Vec::new();
        let mut animated_tiles: [Vec<AnimatedTile>; ANIMATED_TILE_COUNT] = Default::default();

        for i in 0..tile_count {
            let raw = u32::from_le_bytes([
                records[i * 4],
                records[i * 4 + 1],
                records[i * 4 + 2],
                records[i * 4 + 3],
            ]);
            let x = (raw & 0xFFF) as u16;
            let y = ((raw >> 12) & 0xFFF) as u16;
            let id = ((raw >> 24) & 0xFF) as TileId;

            if x >= MAP_SIZE || y >= MAP_SIZE {
                continue;
            }

            tiles[y as usize * MAP_SIZE as usize + x as usize] = id;

            if (FIRST_DOOR_ID..=LAST_DOOR_ID).contains(&id) {
                doors.push((x, y, id));
            }

            for (slot, (&anchor_id, &size)) in ANIMATED_TILE_IDS
                .iter()
                .zip(ANIMATED_TILE_SIZES.iter())
                .enumerate()
            {
                if id != anchor_id {
                    continue;
                }

                animated_tiles[slot].push(AnimatedTile { x, y, id, size });

                for dy in 0..size as u16 {
                    for dx in 0..size as u16 {
                        let (tx, ty) = (x + dx, y + dy);
                        if tx < MAP_SIZE && ty < MAP_SIZE {
                            tiles[ty as usize * MAP_SIZE as usize + tx as usize] = id;
                        }
                    }
                }
            }
        }

        Ok(TileMap {
            tiles,
            doors,
            animated_tiles,
        })
    }

    /// Animated-sprite anchors of one of the seven tracked animation
    /// classes, in load order.
    pub fn animated_tiles(&self, index: usize) -> &[AnimatedTile] {
        self.animated_tiles
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Animated-sprite anchors matching a specific tile id (e.g. wormholes),
    /// regardless of which animation class slot it was loaded into.
    pub fn animated_tiles_by_id(&self, id: TileId) -> &[AnimatedTile] {
        match ANIMATED_TILE_IDS.iter().position(|&tile_id| tile_id == id) {
            Some(index) => self.animated_tiles(index),
            None => &[],
        }
    }

    /// Door tile positions, in load order. Used by `door.rs` to replay the
    /// bit table onto the grid.
    pub fn doors(&self) -> &[(u16, u16, TileId)] {
        &self.doors
    }

    /// Out-of-bounds coordinates return `20` (a solid wall id), matching the
    /// original client's fallback for queries that run off the 1024x1024
    /// grid rather than panicking.
    pub fn get_tile_id(&self, x: u16, y: u16) -> TileId {
        if x >= MAP_SIZE || y >= MAP_SIZE {
            return 20;
        }
        self.tiles[y as usize * MAP_SIZE as usize + x as usize]
    }

    pub fn set_tile_id(&mut self, x: u16, y: u16, id: TileId) {
        if x >= MAP_SIZE || y >= MAP_SIZE {
            return;
        }
        self.tiles[y as usize * MAP_SIZE as usize + x as usize] = id;
    }

    pub fn is_solid(&self, x: u16, y: u16) -> bool {
        is_solid_id(self.get_tile_id(x, y))
    }

    fn is_solid_at(&self, position: Vec2) -> bool {
        self.is_solid(position.x as u16, position.y as u16)
    }

    /// Whether a ship of `radius` centered at `position` can overlap this
    /// tile without being solidly embedded in a wall. Diagonal corner
    /// regions are searched explicitly since the cardinal directions are
    /// skipped once `radius` exceeds a single tile.
    pub fn can_overlap_tile(&self, position: Vec2, radius: f32) -> bool {
        let d = (radius * 2.0) as i32;
        let start_x = position.x as i32;
        let start_y = position.y as i32;

        let solid = self.is_solid_at(position);
        if d < 1 || solid {
            return !solid;
        }

        let far_left = (start_x - d).clamp(0, MAP_SIZE as i32 - 1);
        let far_right = (start_x + d).clamp(0, MAP_SIZE as i32 - 1);
        let far_top = (start_y - d).clamp(0, MAP_SIZE as i32 - 1);
        let far_bottom = (start_y + d).clamp(0, MAP_SIZE as i32 - 1);

        for check_y in far_top..=far_bottom {
            let dir_y = match start_y.cmp(&check_y) {
                std::cmp::Ordering::Greater => 1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Less => -1,
            };
            if dir_y == 0 {
                continue;
            }

            for check_x in far_left..=far_right {
                let dir_x = match start_x.cmp(&check_x) {
                    std::cmp::Ordering::Greater => 1,
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Less => -1,
                };
                if dir_x == 0 {
                    continue;
                }

                let mut can_fit = true;
                let mut y = check_y;
                while (y - check_y).abs() <= d && can_fit {
                    let mut x = check_x;
                    while (x - check_x).abs() <= d {
                        if self.is_solid_xy(x, y) {
                            can_fit = false;
                            break;
                        }
                        x += dir_x;
                    }
                    y += dir_y;
                }

                if can_fit {
                    return true;
                }
            }
        }

        false
    }

    fn is_solid_xy(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= MAP_SIZE as i32 || y >= MAP_SIZE as i32 {
            return true;
        }
        self.is_solid(x as u16, y as u16)
    }

    /// Whether a ship can move in a straight line between two positions
    /// without clipping a wall corner, side-stepping along the perpendicular
    /// of travel when the direct path grazes a solid tile.
    pub fn can_traverse(&self, start: Vec2, end: Vec2, radius: f32) -> bool {
        if !self.can_overlap_tile(start, radius) {
            return false;
        }
        if !self.can_overlap_tile(end, radius) {
            return false;
        }

        let cross = (start - end).normalize().perpendicular();

        let left_solid = self.is_solid_at(start + cross);
        let right_solid = self.is_solid_at(start - cross);

        if left_solid {
            let mut i = 0.0f32;
            while i < radius * 2.0 {
                if !self.can_overlap_tile(start - cross * i, radius) {
                    return false;
                }
                if !self.can_overlap_tile(end - cross * i, radius) {
                    return false;
                }
                i += 1.0;
            }
            return true;
        }

        if right_solid {
            let mut i = 0.0f32;
            while i < radius * 2.0 {
                if !self.can_overlap_tile(start + cross * i, radius) {
                    return false;
                }
                if !self.can_overlap_tile(end + cross * i, radius) {
                    return false;
                }
                i += 1.0;
            }
            return true;
        }

        true
    }

    /// Whether any rotation of a `radius`-tiled ship hull can be placed so
    /// it overlaps `position` without embedding in a wall.
    pub fn can_occupy(&self, position: Vec2, radius: f32) -> bool {
        if self.is_solid_at(position) {
            return false;
        }

        let tile_diameter = ((radius + 0.5) * 2.0) as i32;
        if tile_diameter == 0 {
            return true;
        }

        let base_x = position.x as i32;
        let base_y = position.y as i32;

        for y in -(tile_diameter - 1)..=0 {
            for x in -(tile_diameter - 1)..=0 {
                if self.corner_point_check(base_x + x, base_y + y, tile_diameter) {
                    return true;
                }
            }
        }
        false
    }

    fn corner_point_check(&self, start_x: i32, start_y: i32, diameter: i32) -> bool {
        for y in 0..diameter {
            for x in 0..diameter {
                if self.is_solid_xy(start_x + x, start_y + y) {
                    return false;
                }
            }
        }
        true
    }

    /// Cheaper approximate occupancy check used for spawn/prize placement:
    /// a square search radius rather than a rotated hull search.
    pub fn can_occupy_radius(&self, position: Vec2, radius: f32) -> bool {
        if self.is_solid_at(position) {
            return false;
        }

        let radius = (radius + 0.5).floor() as i32;
        for y in -radius..=radius {
            for x in -radius..=radius {
                let wx = (position.x as i32 + x) as i64;
                let wy = (position.y as i32 + y) as i64;
                if wx < 0 || wy < 0 || wx >= MAP_SIZE as i64 || wy >= MAP_SIZE as i64 {
                    continue;
                }
                if self.is_solid(wx as u16, wy as u16) {
                    return false;
                }
            }
        }
        true
    }

    /// The rectangular region a hull of `radius` could occupy near
    /// `position`, or a non-occupying rect if none was found.
    pub fn get_possible_occupy_rect(&self, position: Vec2, radius: f32) -> OccupyRect {
        let d = (radius * 2.0) as i32;
        let start_x = position.x as i32;
        let start_y = position.y as i32;

        let solid = self.is_solid_at(position);
        if d < 1 || solid {
            let x = position.x as u16;
            let y = position.y as u16;
            return OccupyRect {
                occupy: !solid,
                start_x: x,
                start_y: y,
                end_x: x,
                end_y: y,
            };
        }

        let far_left = (start_x - d).clamp(0, MAP_SIZE as i32 - 1);
        let far_right = (start_x + d).clamp(0, MAP_SIZE as i32 - 1);
        let far_top = (start_y - d).clamp(0, MAP_SIZE as i32 - 1);
        let far_bottom = (start_y + d).clamp(0, MAP_SIZE as i32 - 1);

        for check_y in far_top..=far_bottom {
            let dir_y = match start_y.cmp(&check_y) {
                std::cmp::Ordering::Greater => 1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Less => -1,
            };
            if dir_y == 0 {
                continue;
            }

            for check_x in far_left..=far_right {
                let dir_x = match start_x.cmp(&check_x) {
                    std::cmp::Ordering::Greater => 1,
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Less => -1,
                };
                if dir_x == 0 {
                    continue;
                }

                let mut can_fit = true;
                let mut y = check_y;
                while (y - check_y).abs() <= d && can_fit {
                    let mut x = check_x;
                    while (x - check_x).abs() <= d {
                        if self.is_solid_xy(x, y) {
                            can_fit = false;
                            break;
                        }
                        x += dir_x;
                    }
                    y += dir_y;
                }

                if can_fit {
                    let (found_start_x, found_end_x) = if check_x > start_x {
                        (check_x - d, check_x)
                    } else {
                        (check_x, check_x + d)
                    };
                    let (found_start_y, found_end_y) = if check_y > start_y {
                        (check_y - d, check_y)
                    } else {
                        (check_y, check_y + d)
                    };

                    return OccupyRect {
                        occupy: true,
                        start_x: found_start_x as u16,
                        start_y: found_start_y as u16,
                        end_x: found_end_x as u16,
                        end_y: found_end_y as u16,
                    };
                }
            }
        }

        OccupyRect {
            occupy: false,
            start_x: 0,
            start_y: 0,
            end_x: 0,
            end_y: 0,
        }
    }

    /// Whether a `radius`x`radius` square centered on `position` is entirely
    /// clear, used for the coarse placement checks (bricks, turrets).
    pub fn can_fit(&self, position: Vec2, radius: f32) -> bool {
        let mut y_off = -radius;
        while y_off < radius {
            let mut x_off = -radius;
            while x_off < radius {
                let x = (position.x + x_off) as u16;
                let y = (position.y + y_off) as u16;
                if self.is_solid(x, y) {
                    return false;
                }
                x_off += 1.0;
            }
            y_off += 1.0;
        }
        true
    }

    /// Walks a 32x31-stride sample of tile ids, folding each into `key`.
    /// Used to verify a client's map matches the server's without shipping
    /// the whole grid.
    pub fn get_checksum(&self, key: u32) -> u32 {
        const TILE_START: u8 = 1;
        const TILE_END: u8 = 160;

        let basekey = key;
        let mut key = key;

        let mut y = basekey % 32;
        while y < MAP_SIZE as u32 {
            let mut x = basekey % 31;
            while x < MAP_SIZE as u32 {
                let mut tile = self.get_tile_id(x as u16, y as u16);
                if tile == 250 {
                    tile = 0;
                }
                if (tile >= TILE_START && tile <= TILE_END) || tile == TILE_SAFE_ID {
                    key = key.wrapping_add(basekey ^ tile as u32);
                }
                x += 31;
            }
            y += 32;
        }

        key
    }

    /// Digital-differential-analyzer raycast through the tile grid, stopping
    /// at the first solid tile within `max_distance`.
    pub fn cast(&self, from: Vec2, direction: Vec2, max_distance: f32) -> CastResult {
        let unit_step_x = (1.0 + (direction.y / direction.x).powi(2)).sqrt();
        let unit_step_y = (1.0 + (direction.x / direction.y).powi(2)).sqrt();

        let mut check = Vec2::new(from.x.floor(), from.y.floor());

        let (step_x, mut travel_x) = if direction.x < 0.0 {
            (-1.0, (from.x - check.x) * unit_step_x)
        } else {
            (1.0, (check.x + 1.0 - from.x) * unit_step_x)
        };

        let (step_y, mut travel_y) = if direction.y < 0.0 {
            (-1.0, (from.y - check.y) * unit_step_y)
        } else {
            (1.0, (check.y + 1.0 - from.y) * unit_step_y)
        };

        let mut distance = 0.0f32;
        let mut hit = false;
        let mut clear_distance = 0.0f32;

        while distance < max_distance {
            clear_distance = distance;

            if travel_x < travel_y {
                check.x += step_x;
                distance = travel_x;
                travel_x += unit_step_x;
            } else {
                check.y += step_y;
                distance = travel_y;
                travel_y += unit_step_y;
            }

            if self.is_solid_xy(check.x.floor() as i32, check.y.floor() as i32) {
                hit = true;
                break;
            }
        }

        if !hit {
            return CastResult {
                hit: false,
                distance: max_distance,
                position: from + direction * max_distance,
                normal: Vec2::ZERO,
            };
        }

        match ray_box_intersect(from, direction, check, Vec2::new(1.0, 1.0)) {
            Some((dist, normal)) if dist <= max_distance => CastResult {
                hit: true,
                distance: dist,
                position: from + direction * dist,
                normal,
            },
            _ => CastResult {
                hit: false,
                distance: max_distance,
                position: from + direction * max_distance,
                normal: Vec2::ZERO,
            },
        }
    }

    /// Cast from `from` toward `to`, stopping exactly at `to`'s distance.
    pub fn cast_to(&self, from: Vec2, to: Vec2) -> CastResult {
        let delta = to - from;
        let max_distance = delta.length();
        if max_distance <= f32::EPSILON {
            return CastResult {
                hit: false,
                distance: 0.0,
                position: from,
                normal: Vec2::ZERO,
            };
        }
        self.cast(from, delta / max_distance, max_distance)
    }
}

/// Slab-method ray/AABB intersection. Returns the entry distance and the
/// surface normal at the hit point.
fn ray_box_intersect(origin: Vec2, direction: Vec2, box_min: Vec2, box_size: Vec2) -> Option<(f32, Vec2)> {
    let box_max = box_min + box_size;

    let (mut t_min, mut t_max) = (f32::NEG_INFINITY, f32::INFINITY);
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let (o, d, lo, hi) = if axis == 0 {
            (origin.x, direction.x, box_min.x, box_max.x)
        } else {
            (origin.y, direction.y, box_min.y, box_max.y)
        };

        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv_d = 1.0 / d;
        let mut t1 = (lo - o) * inv_d;
        let mut t2 = (hi - o) * inv_d;
        let mut axis_normal_sign = -1.0f32;

        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
            axis_normal_sign = 1.0;
        }

        if t1 > t_min {
            t_min = t1;
            normal = if axis == 0 {
                Vec2::new(axis_normal_sign, 0.0)
            } else {
                Vec2::new(0.0, axis_normal_sign)
            };
        }
        t_max = t_max.min(t2);

        if t_min > t_max {
            return None;
        }
    }

    if t_min < 0.0 {
        return None;
    }

    Some((t_min, normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed_record(x: u16, y: u16, id: TileId) -> [u8; 4] {
        let raw = (x as u32 & 0xFFF) | ((y as u32 & 0xFFF) << 12) | ((id as u32) << 24);
        raw.to_le_bytes()
    }

    #[test]
    fn loads_bare_record_list_without_header() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(5, 5, 1));
        let map = TileMap::load(&data).unwrap();
        assert_eq!(map.get_tile_id(5, 5), 1);
        assert_eq!(map.get_tile_id(0, 0), 0);
    }

    #[test]
    fn loads_with_bm_header_offset() {
        let mut data = vec![b'B', b'M'];
        data.extend_from_slice(&6u32.to_le_bytes());
        data.extend_from_slice(&packed_record(10, 20, 3));
        let map = TileMap::load(&data).unwrap();
        assert_eq!(map.get_tile_id(10, 20), 3);
    }

    #[test]
    fn animated_tile_expands_to_full_footprint() {
        let mut data = Vec::new();
        // AsteroidLarge (id 217) is 2x2.
        data.extend_from_slice(&packed_record(100, 100, 217));
        let map = TileMap::load(&data).unwrap();
        assert_eq!(map.get_tile_id(100, 100), 217);
        assert_eq!(map.get_tile_id(101, 100), 217);
        assert_eq!(map.get_tile_id(100, 101), 217);
        assert_eq!(map.get_tile_id(101, 101), 217);
        assert_eq!(map.get_tile_id(102, 100), 0);
    }

    #[test]
    fn door_tiles_are_tracked_separately() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(3, 4, 163));
        let map = TileMap::load(&data).unwrap();
        assert_eq!(map.doors(), &[(3, 4, 163)]);
        assert!(map.is_solid(3, 4));
    }

    #[test]
    fn out_of_bounds_tile_id_is_wall() {
        let map = TileMap::load(&[]).unwrap();
        assert_eq!(map.get_tile_id(MAP_SIZE, 0), 20);
    }

    #[test]
    fn open_space_is_not_solid() {
        let map = TileMap::load(&[]).unwrap();
        assert!(!map.is_solid(500, 500));
    }

    #[test]
    fn wall_tile_is_solid() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(50, 50, 1));
        let map = TileMap::load(&data).unwrap();
        assert!(map.is_solid(50, 50));
    }

    #[test]
    fn cast_in_open_space_travels_full_distance() {
        let map = TileMap::load(&[]).unwrap();
        let result = map.cast(Vec2::new(10.0, 10.0), Vec2::new(1.0, 0.0), 50.0);
        assert!(!result.hit);
        assert!((result.distance - 50.0).abs() < 1e-3);
    }

    #[test]
    fn cast_stops_at_wall() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(20, 10, 1));
        let map = TileMap::load(&data).unwrap();
        let result = map.cast(Vec2::new(10.0, 10.5), Vec2::new(1.0, 0.0), 50.0);
        assert!(result.hit);
        assert!(result.distance < 15.0);
    }

    #[test]
    fn checksum_changes_with_key() {
        let map = TileMap::load(&[]).unwrap();
        let a = map.get_checksum(1);
        let b = map.get_checksum(2);
        assert_ne!(a, b);
    }

    #[test]
    fn checksum_is_deterministic() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(31, 32, 5));
        let map = TileMap::load(&data).unwrap();
        assert_eq!(map.get_checksum(99), map.get_checksum(99));
    }

    #[test]
    fn can_occupy_open_space() {
        let map = TileMap::load(&[]).unwrap();
        assert!(map.can_occupy(Vec2::new(500.0, 500.0), 1.0));
    }

    #[test]
    fn cannot_occupy_solid_tile() {
        let mut data = Vec::new();
        data.extend_from_slice(&packed_record(500, 500, 1));
        let map = TileMap::load(&data).unwrap();
        assert!(!map.can_occupy(Vec2::new(500.0, 500.0), 1.0));
    }

    #[test]
    fn header_offset_past_end_of_file_is_rejected() {
        let mut data = vec![b'B', b'M'];
        data.extend_from_slice(&1_000_000u32.to_le_bytes());
        assert!(TileMap::load(&data).is_err());
    }
}
