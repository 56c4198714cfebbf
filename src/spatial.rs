//! Uniform grid spatial index.
//!
//! Each entry is registered in every grid cell its bounds touch. A query
//! visits the cells under the query box, collects candidates and filters them
//! against their stored bounds, so callers only need to run their exact test
//! (strict overlap, distance to a curve, ...) on what comes back.

use crate::geometry::Bounds;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

type Cell = (i32, i32);

/// Entries spanning more cells than this are kept in a side list that every
/// query scans.
const MAX_CELLS_PER_ENTRY: i64 = 4096;

/// Grid spatial index keyed by `K`.
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    cell_size: f32,
    cells: HashMap<Cell, HashSet<K>>,
    entries: HashMap<K, Bounds>,
    oversized: HashSet<K>,
}

impl<K> SpatialIndex<K>
where
    K: Copy + Eq + Hash + Ord,
{
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            entries: HashMap::new(),
            oversized: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn bounds_of(&self, key: &K) -> Option<Bounds> {
        self.entries.get(key).copied()
    }

    /// Insert or replace the bounds of `key`
    pub fn insert(&mut self, key: K, bounds: Bounds) {
        if self.entries.contains_key(&key) {
            self.unlink(&key);
        }
        self.link(key, bounds);
    }

    /// Alias of [`insert`](Self::insert); skips work when the bounds are unchanged
    pub fn update(&mut self, key: K, bounds: Bounds) {
        if self.entries.get(&key) == Some(&bounds) {
            return;
        }
        self.insert(key, bounds);
    }

    pub fn batch_update<I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (K, Bounds)>,
    {
        for (key, bounds) in updates {
            self.update(key, bounds);
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<Bounds> {
        let bounds = self.unlink(key);
        self.entries.remove(key);
        bounds
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
        self.oversized.clear();
    }

    /// Keys whose bounds touch `area` (edges inclusive), sorted ascending
    pub fn query(&self, area: &Bounds) -> Vec<K> {
        let mut found: Vec<K> = match self.cell_range(area) {
            Some(range) if range.count() <= self.cells.len() as i64 => {
                let mut candidates: HashSet<K> = self.oversized.iter().copied().collect();
                for cell in range.cells() {
                    if let Some(keys) = self.cells.get(&cell) {
                        candidates.extend(keys.iter().copied());
                    }
                }
                candidates
                    .into_iter()
                    .filter(|key| self.entry_touches(key, area))
                    .collect()
            }
            // Query box covers more cells than are occupied; a full scan is cheaper
            _ => self
                .entries
                .iter()
                .filter(|(_, bounds)| bounds.touches(area))
                .map(|(key, _)| *key)
                .collect(),
        };
        found.sort_unstable();
        found
    }

    fn entry_touches(&self, key: &K, area: &Bounds) -> bool {
        self.entries
            .get(key)
            .map(|bounds| bounds.touches(area))
            .unwrap_or(false)
    }

    fn link(&mut self, key: K, bounds: Bounds) {
        self.entries.insert(key, bounds);
        match self.cell_range(&bounds) {
            Some(range) if range.count() <= MAX_CELLS_PER_ENTRY => {
                for cell in range.cells() {
                    self.cells.entry(cell).or_default().insert(key);
                }
            }
            _ => {
                self.oversized.insert(key);
            }
        }
    }

    fn unlink(&mut self, key: &K) -> Option<Bounds> {
        let bounds = *self.entries.get(key)?;
        if self.oversized.remove(key) {
            return Some(bounds);
        }
        if let Some(range) = self.cell_range(&bounds) {
            for cell in range.cells() {
                if let Some(keys) = self.cells.get_mut(&cell) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.cells.remove(&cell);
                    }
                }
            }
        }
        Some(bounds)
    }

    fn cell_range(&self, bounds: &Bounds) -> Option<CellRange> {
        if !bounds.is_finite() {
            return None;
        }
        let to_cell = |v: f32| -> Option<i32> {
            let c = (v / self.cell_size).floor();
            if c >= i32::MIN as f32 && c <= i32::MAX as f32 {
                Some(c as i32)
            } else {
                None
            }
        };
        Some(CellRange {
            min_x: to_cell(bounds.x.min(bounds.right()))?,
            min_y: to_cell(bounds.y.min(bounds.bottom()))?,
            max_x: to_cell(bounds.x.max(bounds.right()))?,
            max_y: to_cell(bounds.y.max(bounds.bottom()))?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct CellRange {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl CellRange {
    fn count(&self) -> i64 {
        let w = self.max_x as i64 - self.min_x as i64 + 1;
        let h = self.max_y as i64 - self.min_y as i64 + 1;
        w.saturating_mul(h)
    }

    fn cells(self) -> impl Iterator<Item = Cell> {
        (self.min_x..=self.max_x).flat_map(move |x| (self.min_y..=self.max_y).map(move |y| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SpatialIndex<i32> {
        SpatialIndex::new(100.0)
    }

    // ========================================================================
    // Insert / query
    // ========================================================================

    #[test]
    fn test_query_finds_overlapping_entries() {
        let mut idx = index();
        idx.insert(1, Bounds::new(10.0, 10.0, 100.0, 50.0));
        idx.insert(2, Bounds::new(500.0, 500.0, 10.0, 10.0));

        assert_eq!(idx.query(&Bounds::new(50.0, 30.0, 0.0, 0.0)), vec![1]);
        assert_eq!(idx.query(&Bounds::new(495.0, 495.0, 10.0, 10.0)), vec![2]);
        assert!(idx.query(&Bounds::new(200.0, 30.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_query_same_cell_but_outside_bounds_is_filtered() {
        let mut idx = index();
        idx.insert(1, Bounds::new(0.0, 0.0, 10.0, 10.0));
        // Same grid cell, no overlap
        assert!(idx.query(&Bounds::new(50.0, 50.0, 5.0, 5.0)).is_empty());
    }

    #[test]
    fn test_query_results_are_sorted_and_unique() {
        let mut idx = index();
        // Spans four cells
        idx.insert(3, Bounds::new(50.0, 50.0, 100.0, 100.0));
        idx.insert(1, Bounds::new(90.0, 90.0, 20.0, 20.0));
        idx.insert(2, Bounds::new(120.0, 120.0, 5.0, 5.0));

        assert_eq!(idx.query(&Bounds::new(0.0, 0.0, 300.0, 300.0)), vec![1, 2, 3]);
        assert_eq!(idx.query(&Bounds::new(95.0, 95.0, 10.0, 10.0)), vec![1, 3]);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut idx = index();
        idx.insert(1, Bounds::new(-250.0, -250.0, 20.0, 20.0));
        assert_eq!(idx.query(&Bounds::new(-240.0, -240.0, 1.0, 1.0)), vec![1]);
    }

    // ========================================================================
    // Update / remove
    // ========================================================================

    #[test]
    fn test_update_moves_entry_between_cells() {
        let mut idx = index();
        idx.insert(1, Bounds::new(0.0, 0.0, 10.0, 10.0));
        idx.update(1, Bounds::new(1000.0, 1000.0, 10.0, 10.0));

        assert!(idx.query(&Bounds::new(0.0, 0.0, 10.0, 10.0)).is_empty());
        assert_eq!(idx.query(&Bounds::new(1005.0, 1005.0, 1.0, 1.0)), vec![1]);
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut idx = index();
        idx.insert(1, Bounds::new(0.0, 0.0, 10.0, 10.0));
        idx.insert(2, Bounds::new(0.0, 0.0, 10.0, 10.0));

        assert_eq!(idx.remove(&1), Some(Bounds::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(idx.remove(&1), None);
        assert_eq!(idx.query(&Bounds::new(0.0, 0.0, 10.0, 10.0)), vec![2]);

        idx.clear();
        assert!(idx.is_empty());
        assert!(idx.query(&Bounds::new(0.0, 0.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn test_batch_update() {
        let mut idx = index();
        idx.batch_update(vec![
            (1, Bounds::new(0.0, 0.0, 10.0, 10.0)),
            (2, Bounds::new(300.0, 0.0, 10.0, 10.0)),
        ]);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.query(&Bounds::new(0.0, 0.0, 400.0, 20.0)), vec![1, 2]);
    }

    // ========================================================================
    // Huge entries
    // ========================================================================

    #[test]
    fn test_oversized_entry_still_found() {
        let mut idx = SpatialIndex::new(1.0);
        idx.insert(9, Bounds::new(0.0, 0.0, 100_000.0, 100_000.0));
        idx.insert(1, Bounds::new(5.0, 5.0, 1.0, 1.0));
        assert_eq!(idx.query(&Bounds::new(5.0, 5.0, 0.5, 0.5)), vec![1, 9]);

        idx.remove(&9);
        assert_eq!(idx.query(&Bounds::new(5.0, 5.0, 0.5, 0.5)), vec![1]);
    }
}
