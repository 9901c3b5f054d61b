//! Uniform spatial hash used as the broad-phase: buckets bodies by the
//! integer cell range their AABB spans, then answers overlap queries with a
//! deduplicated candidate list.

use std::collections::HashMap;

use crate::{body::BodyId, math::AABB, utils::BitArray};

/// A uniform grid over world space, keyed by `(cell_x, cell_y)`.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f64,
    inverse_cell_size: f64,
    entries: HashMap<(i32, i32), Vec<BodyId>>,
    query_result: Vec<BodyId>,
    seen: BitArray,
    id_to_bit: HashMap<BodyId, usize>,
    next_bit: usize,
}

impl SpatialHash {
    /// Create a spatial hash with the given cell size.
    ///
    /// Falls back to `1.0` for a non-positive size rather than producing a
    /// hash that divides by zero on every insert.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };

        Self {
            cell_size,
            inverse_cell_size: 1.0 / cell_size,
            entries: HashMap::new(),
            query_result: Vec::new(),
            seen: BitArray::with_capacity(64),
            id_to_bit: HashMap::new(),
            next_bit: 0,
        }
    }

    /// Cell size of this hash.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Remove every entry, keeping the bucket map's allocated capacity.
    pub fn clear(&mut self) {
        for bucket in self.entries.values_mut() {
            bucket.clear();
        }
        self.query_result.clear();
        self.seen.clear();
        self.id_to_bit.clear();
        self.next_bit = 0;
    }

    /// Insert `id` into every cell its `aabb` overlaps.
    pub fn insert(&mut self, aabb: AABB, id: BodyId) {
        let (min_x, min_y, max_x, max_y) = self.cell_range(aabb);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                self.entries.entry((x, y)).or_default().push(id);
            }
        }
    }

    /// Query for ids whose cells overlap `aabb`, deduplicated.
    ///
    /// The returned slice is only valid until the next call to
    /// [`SpatialHash::query`] or [`SpatialHash::clear`]; each query reuses
    /// the hash's scratch buffers.
    pub fn query(&mut self, aabb: AABB) -> &[BodyId] {
        self.query_result.clear();
        self.seen.clear();
        self.id_to_bit.clear();
        self.next_bit = 0;

        let (min_x, min_y, max_x, max_y) = self.cell_range(aabb);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let Some(bucket) = self.entries.get(&(x, y)) else {
                    continue;
                };

                for &id in bucket {
                    let bit = *self.id_to_bit.entry(id).or_insert_with(|| {
                        let bit = self.next_bit;
                        self.next_bit += 1;
                        bit
                    });

                    if !self.seen.test_and_set(bit) {
                        self.query_result.push(id);
                    }
                }
            }
        }

        &self.query_result
    }

    fn cell_range(&self, aabb: AABB) -> (i32, i32, i32, i32) {
        let max = aabb.max();

        let min_x = (aabb.min.x * self.inverse_cell_size).floor() as i32;
        let min_y = (aabb.min.y * self.inverse_cell_size).floor() as i32;
        let max_x = (max.x * self.inverse_cell_size).floor() as i32;
        let max_y = (max.y * self.inverse_cell_size).floor() as i32;

        (min_x, min_y, max_x, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector2;
    use slotmap::SlotMap;
    use vek::Extent2;

    fn aabb(x: f64, y: f64, w: f64, h: f64) -> AABB {
        AABB::new(Vector2::new(x, y), Extent2::new(w, h))
    }

    #[test]
    fn query_finds_overlapping_single_cell_insert() {
        let mut ids: SlotMap<BodyId, ()> = SlotMap::with_key();
        let a = ids.insert(());

        let mut hash = SpatialHash::new(1.0);
        hash.insert(aabb(0.0, 0.0, 0.5, 0.5), a);

        let result = hash.query(aabb(0.0, 0.0, 0.5, 0.5));
        assert_eq!(result, &[a]);
    }

    #[test]
    fn query_misses_far_away_insert() {
        let mut ids: SlotMap<BodyId, ()> = SlotMap::with_key();
        let a = ids.insert(());

        let mut hash = SpatialHash::new(1.0);
        hash.insert(aabb(0.0, 0.0, 0.5, 0.5), a);

        let result = hash.query(aabb(100.0, 100.0, 0.5, 0.5));
        assert!(result.is_empty());
    }

    #[test]
    fn query_deduplicates_across_shared_cells() {
        let mut ids: SlotMap<BodyId, ()> = SlotMap::with_key();
        let a = ids.insert(());

        let mut hash = SpatialHash::new(1.0);
        // Spans several cells, so a query across the same span must see `a` once.
        hash.insert(aabb(0.0, 0.0, 3.0, 3.0), a);

        let result = hash.query(aabb(0.0, 0.0, 3.0, 3.0));
        assert_eq!(result, &[a]);
    }

    #[test]
    fn clear_removes_all_entries() {
        let mut ids: SlotMap<BodyId, ()> = SlotMap::with_key();
        let a = ids.insert(());

        let mut hash = SpatialHash::new(1.0);
        hash.insert(aabb(0.0, 0.0, 0.5, 0.5), a);
        hash.clear();

        let result = hash.query(aabb(0.0, 0.0, 0.5, 0.5));
        assert!(result.is_empty());
    }
}
