//! Compact per-tile region containers (§3).
//!
//! A naive `[bool; 1024*1024]` costs 1 MB per region; most regions (a
//! flagroom, a base interior) cover a few hundred tiles clustered together.
//! `RegionBitset`/`RegionDataMap<T>` instead track a shrink-fit bounding box
//! and only allocate storage for the tiles inside it.

const MAP_SIZE: i32 = 1024;

/// A bounding box over tile coordinates, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    fn empty() -> Self {
        BoundingBox {
            min_x: i32::MAX,
            min_y: i32::MAX,
            max_x: i32::MIN,
            max_y: i32::MIN,
        }
    }

    fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    fn width(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.max_x - self.min_x + 1
        }
    }

    fn height(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.max_y - self.min_y + 1
        }
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        !self.is_empty() && x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    fn grow_to_include(&mut self, x: i32, y: i32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// A 1-bit-per-tile set with a shrink-fit bounding box.
#[derive(Clone, Debug)]
pub struct RegionBitset {
    bbox: BoundingBox,
    bits: Vec<bool>,
}

impl Default for RegionBitset {
    fn default() -> Self {
        RegionBitset::new()
    }
}

impl RegionBitset {
    pub fn new() -> Self {
        RegionBitset {
            bbox: BoundingBox::empty(),
            bits: Vec::new(),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    pub fn is_empty(&self) -> bool {
        self.bbox.is_empty()
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bbox.contains(x, y) {
            return None;
        }
        let local_x = (x - self.bbox.min_x) as usize;
        let local_y = (y - self.bbox.min_y) as usize;
        Some(local_y * self.bbox.width() as usize + local_x)
    }

    pub fn test(&self, x: i32, y: i32) -> bool {
        self.index_of(x, y)
            .and_then(|i| self.bits.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Set or clear `(x, y)`. Setting `true` may grow the bounding box (and
    /// reallocate); setting `false` never shrinks it — callers that need a
    /// tight box should rebuild from the set of still-true tiles.
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        debug_assert!((0..MAP_SIZE).contains(&x) && (0..MAP_SIZE).contains(&y));

        if value && !self.bbox.contains(x, y) {
            self.grow_and_rebuild(x, y);
        }

        if let Some(i) = self.index_of(x, y) {
            if i < self.bits.len() {
                self.bits[i] = value;
            }
        }
    }

    fn grow_and_rebuild(&mut self, new_x: i32, new_y: i32) {
        let old_bbox = self.bbox;
        let mut new_bbox = self.bbox;
        new_bbox.grow_to_include(new_x, new_y);

        let mut new_bits = vec![false; (new_bbox.width() * new_bbox.height()) as usize];

        if !old_bbox.is_empty() {
            for y in old_bbox.min_y..=old_bbox.max_y {
                for x in old_bbox.min_x..=old_bbox.max_x {
                    let old_local = ((y - old_bbox.min_y) * old_bbox.width() + (x - old_bbox.min_x))
                        as usize;
                    if self.bits.get(old_local).copied().unwrap_or(false) {
                        let new_local = ((y - new_bbox.min_y) * new_bbox.width()
                            + (x - new_bbox.min_x)) as usize;
                        new_bits[new_local] = true;
                    }
                }
            }
        }

        self.bbox = new_bbox;
        self.bits = new_bits;
    }

    /// Recompute the bounding box to tightly fit the currently-set tiles.
    /// Called after a burst of `set(.., false)` calls to actually shrink
    /// storage.
    pub fn shrink_to_fit(&mut self) {
        let mut fresh = RegionBitset::new();
        for y in self.bbox.min_y..=self.bbox.max_y.max(self.bbox.min_y - 1) {
            for x in self.bbox.min_x..=self.bbox.max_x.max(self.bbox.min_x - 1) {
                if self.test(x, y) {
                    fresh.set(x, y, true);
                }
            }
        }
        *self = fresh;
    }

    /// Iterate every set tile.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let bbox = self.bbox;
        (0..self.bits.len()).filter_map(move |i| {
            if !self.bits[i] {
                return None;
            }
            let w = bbox.width();
            let local_x = (i as i32) % w;
            let local_y = (i as i32) / w;
            Some((bbox.min_x + local_x, bbox.min_y + local_y))
        })
    }
}

/// The typed analog of `RegionBitset`: one `T` per tile in a bounding box,
/// used for flood-fill depth maps.
#[derive(Clone, Debug)]
pub struct RegionDataMap<T: Clone> {
    bbox: BoundingBox,
    data: Vec<Option<T>>,
}

impl<T: Clone> Default for RegionDataMap<T> {
    fn default() -> Self {
        RegionDataMap::new()
    }
}

impl<T: Clone> RegionDataMap<T> {
    pub fn new() -> Self {
        RegionDataMap {
            bbox: BoundingBox::empty(),
            data: Vec::new(),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bbox.contains(x, y) {
            return None;
        }
        let local_x = (x - self.bbox.min_x) as usize;
        let local_y = (y - self.bbox.min_y) as usize;
        Some(local_y * self.bbox.width() as usize + local_x)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&T> {
        self.index_of(x, y).and_then(|i| self.data.get(i)?.as_ref())
    }

    pub fn insert(&mut self, x: i32, y: i32, value: T) {
        debug_assert!((0..MAP_SIZE).contains(&x) && (0..MAP_SIZE).contains(&y));

        if !self.bbox.contains(x, y) {
            self.grow_and_rebuild(x, y);
        }

        if let Some(i) = self.index_of(x, y) {
            self.data[i] = Some(value);
        }
    }

    fn grow_and_rebuild(&mut self, new_x: i32, new_y: i32) {
        let old_bbox = self.bbox;
        let mut new_bbox = self.bbox;
        new_bbox.grow_to_include(new_x, new_y);

        let mut new_data: Vec<Option<T>> =
            vec![None; (new_bbox.width() * new_bbox.height()) as usize];

        if !old_bbox.is_empty() {
            for y in old_bbox.min_y..=old_bbox.max_y {
                for x in old_bbox.min_x..=old_bbox.max_x {
                    let old_local = ((y - old_bbox.min_y) * old_bbox.width() + (x - old_bbox.min_x))
                        as usize;
                    if let Some(value) = self.data.get(old_local).cloned().flatten() {
                        let new_local = ((y - new_bbox.min_y) * new_bbox.width()
                            + (x - new_bbox.min_x)) as usize;
                        new_data[new_local] = Some(value);
                    }
                }
            }
        }

        self.bbox = new_bbox;
        self.data = new_data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_clear_round_trips_false() {
        let mut bitset = RegionBitset::new();
        bitset.set(10, 10, true);
        assert!(bitset.test(10, 10));
        bitset.set(10, 10, false);
        assert!(!bitset.test(10, 10));
    }

    #[test]
    fn bounding_box_grows_to_include_new_tiles() {
        let mut bitset = RegionBitset::new();
        bitset.set(5, 5, true);
        bitset.set(20, 30, true);
        let bbox = bitset.bounding_box();
        assert_eq!(bbox.min_x, 5);
        assert_eq!(bbox.min_y, 5);
        assert_eq!(bbox.max_x, 20);
        assert_eq!(bbox.max_y, 30);
    }

    #[test]
    fn shrink_to_fit_reduces_bbox_after_clears() {
        let mut bitset = RegionBitset::new();
        bitset.set(0, 0, true);
        bitset.set(100, 100, true);
        bitset.set(100, 100, false);
        bitset.shrink_to_fit();
        let bbox = bitset.bounding_box();
        assert_eq!(bbox.max_x, 0);
        assert_eq!(bbox.max_y, 0);
    }

    #[test]
    fn untouched_tile_reads_false() {
        let bitset = RegionBitset::new();
        assert!(!bitset.test(512, 512));
    }

    #[test]
    fn data_map_stores_and_retrieves_typed_values() {
        let mut map: RegionDataMap<u32> = RegionDataMap::new();
        map.insert(3, 4, 42);
        map.insert(3, 4, 99);
        assert_eq!(map.get(3, 4), Some(&99));
        assert_eq!(map.get(0, 0), None);
    }

    #[test]
    fn iter_yields_all_set_tiles() {
        let mut bitset = RegionBitset::new();
        bitset.set(1, 1, true);
        bitset.set(2, 2, true);
        let mut tiles: Vec<_> = bitset.iter().collect();
        tiles.sort();
        assert_eq!(tiles, vec![(1, 1), (2, 2)]);
    }
}
