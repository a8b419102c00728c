//! Tolerance-based vertex welding
//!
//! Two attributes are "nearly equal" when they differ by at most
//! [`WELD_TOLERANCE`]. Lookups bucket vertices by a rounded position cell and
//! probe the neighbouring cells a tolerance-equal position can fall into, so a
//! hash is never stricter than the equality it stands in for.

use std::hash::Hash;

use hashbrown::HashMap;
use smallvec::SmallVec;

/// Component-wise weld tolerance
pub const WELD_TOLERANCE: f64 = 1e-4;

/// Cells per unit along each axis
const CELL_SCALE: f64 = 1000.0;

/// Slack added to the probe range for rounding at cell edges
const CELL_MARGIN: f64 = 1e-6;

/// Rounded position bucket
pub type PositionCell = [i64; 3];

/// `|a - b| <= WELD_TOLERANCE`, evaluated in f64
#[inline]
pub fn nearly_equal(a: f32, b: f32) -> bool {
    let (a, b) = (f64::from(a), f64::from(b));
    a + WELD_TOLERANCE >= b && a - WELD_TOLERANCE <= b
}

/// Component-wise [`nearly_equal`] over any fixed-size vector
#[inline]
pub fn nearly_equal_n<const N: usize>(a: [f32; N], b: [f32; N]) -> bool {
    a.iter().zip(&b).all(|(&x, &y)| nearly_equal(x, y))
}

#[inline]
fn cell_coord(value: f64) -> i64 {
    (value * CELL_SCALE).round() as i64
}

pub fn position_cell(p: [f32; 3]) -> PositionCell {
    p.map(|c| cell_coord(f64::from(c)))
}

/// Every cell holding a position within tolerance of `p`.
///
/// The tolerance window is narrower than a cell, so this is at most two
/// cells per axis.
pub fn candidate_cells(p: [f32; 3]) -> SmallVec<[PositionCell; 8]> {
    let range = |c: f32| {
        let c = f64::from(c);
        let lo = cell_coord(c - WELD_TOLERANCE - CELL_MARGIN);
        let hi = cell_coord(c + WELD_TOLERANCE + CELL_MARGIN);
        lo..=hi
    };

    let mut cells = SmallVec::new();
    for x in range(p[0]) {
        for y in range(p[1]) {
            for z in range(p[2]) {
                cells.push([x, y, z]);
            }
        }
    }
    cells
}

/// Index of previously inserted vertices, bucketed by position cell plus an
/// exact-match key `K` (use `()` when only position matters).
#[derive(Debug, Clone)]
pub struct WeldMap<K> {
    buckets: HashMap<(PositionCell, K), SmallVec<[u32; 4]>>,
}

impl<K: Hash + Eq + Copy> WeldMap<K> {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }

    /// Smallest stored index near `position` with the same key for which
    /// `matches` holds
    pub fn find(&self, position: [f32; 3], key: K, mut matches: impl FnMut(u32) -> bool) -> Option<u32> {
        let mut best: Option<u32> = None;
        for cell in candidate_cells(position) {
            let Some(bucket) = self.buckets.get(&(cell, key)) else {
                continue;
            };
            for &index in bucket {
                if best.is_some_and(|b| b <= index) {
                    continue;
                }
                if matches(index) {
                    best = Some(index);
                }
            }
        }
        best
    }

    pub fn insert(&mut self, position: [f32; 3], key: K, index: u32) {
        self.buckets
            .entry((position_cell(position), key))
            .or_default()
            .push(index);
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

impl<K: Hash + Eq + Copy> Default for WeldMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Welds bare positions, returning a dense index per distinct position
#[derive(Debug, Clone, Default)]
pub struct PositionWelder {
    map: WeldMap<()>,
    positions: Vec<[f32; 3]>,
}

impl PositionWelder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weld(&mut self, position: [f32; 3]) -> u32 {
        let positions = &self.positions;
        if let Some(index) = self
            .map
            .find(position, (), |i| nearly_equal_n(positions[i as usize], position))
        {
            return index;
        }
        let index = self.positions.len() as u32;
        self.map.insert(position, (), index);
        self.positions.push(position);
        index
    }

    pub fn into_positions(self) -> Vec<[f32; 3]> {
        self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearly_equal_boundary() {
        assert!(nearly_equal(1.0, 1.0));
        assert!(nearly_equal(0.0, 0.00009));
        assert!(!nearly_equal(0.0, 0.0002));
        assert!(nearly_equal_n([0.0, 1.0], [0.00005, 0.99995]));
    }

    #[test]
    fn test_candidate_cells_cover_tolerance() {
        // 0.00049 and 0.00051 straddle a cell edge but are within tolerance
        let a = [0.000_49, 0.0, 0.0];
        let b = [0.000_51, 0.0, 0.0];
        assert_ne!(position_cell(a), position_cell(b));
        assert!(candidate_cells(a).contains(&position_cell(b)));
        assert!(candidate_cells(b).contains(&position_cell(a)));
    }

    #[test]
    fn test_candidate_cells_bounded() {
        assert!(candidate_cells([0.0005, 12.3455, -7.0]).len() <= 8);
    }

    #[test]
    fn test_weld_map_keeps_smallest_index() {
        let mut map = WeldMap::new();
        map.insert([0.0, 0.0, 0.0], 1u8, 5);
        map.insert([0.00001, 0.0, 0.0], 1u8, 2);
        map.insert([0.0, 0.0, 0.0], 2u8, 0);

        assert_eq!(map.find([0.0, 0.0, 0.0], 1, |_| true), Some(2));
        assert_eq!(map.find([0.0, 0.0, 0.0], 1, |i| i != 2), Some(5));
        assert_eq!(map.find([0.0, 0.0, 0.0], 3, |_| true), None);
    }

    #[test]
    fn test_position_welder() {
        let mut welder = PositionWelder::new();
        assert_eq!(welder.weld([1.0, 2.0, 3.0]), 0);
        assert_eq!(welder.weld([0.0, 0.0, 0.0]), 1);
        assert_eq!(welder.weld([1.00005, 2.0, 3.0]), 0);
        assert_eq!(welder.weld([1.001, 2.0, 3.0]), 2);
        assert_eq!(welder.into_positions().len(), 3);
    }
}
