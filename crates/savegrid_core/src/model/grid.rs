//! Unit grid domain model.
//!
//! # Responsibility
//! - Store one snapshot of unit active-states.
//! - Provide the capacity resize rule and range helpers used by the engine.
//!
//! # Invariants
//! - Unit identity is its index; there is no other key.
//! - Resizing preserves every overlapping index verbatim, truncates the tail
//!   on shrink and appends inactive units on growth.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One snapshot of unit states. Serialized as a bare JSON array of booleans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitGrid {
    units: Vec<bool>,
}

impl UnitGrid {
    /// Creates an all-inactive grid.
    pub fn inactive(capacity: usize) -> Self {
        Self {
            units: vec![false; capacity],
        }
    }

    /// Creates a grid whose first `active` indices are on.
    ///
    /// `active` is clamped to `capacity`.
    pub fn with_leading_active(active: usize, capacity: usize) -> Self {
        let active = active.min(capacity);
        let mut units = vec![false; capacity];
        units[..active].fill(true);
        Self { units }
    }

    pub fn from_units(units: Vec<bool>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[bool] {
        &self.units
    }

    pub fn into_units(self) -> Vec<bool> {
        self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the state at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        self.units.get(index).copied()
    }

    pub fn active_count(&self) -> usize {
        self.units.iter().filter(|active| **active).count()
    }

    /// Returns active units within `range`, clamped to the grid bounds.
    pub fn active_in(&self, range: Range<usize>) -> usize {
        let range = self.clamp(range);
        self.units[range].iter().filter(|active| **active).count()
    }

    /// Returns whether every unit in `range` is active.
    ///
    /// An empty range is never considered full.
    pub fn all_active_in(&self, range: Range<usize>) -> bool {
        let range = self.clamp(range);
        !range.is_empty() && self.units[range].iter().all(|active| *active)
    }

    /// Applies the capacity resize rule in place.
    ///
    /// Returns the number of active units that were dropped from the tail.
    pub fn resize(&mut self, capacity: usize) -> usize {
        let dropped = if capacity < self.units.len() {
            self.active_in(capacity..self.units.len())
        } else {
            0
        };
        self.units.resize(capacity, false);
        dropped
    }

    /// Flips one unit. Returns `false` when `index` is out of range.
    pub fn flip(&mut self, index: usize) -> bool {
        match self.units.get_mut(index) {
            Some(unit) => {
                *unit = !*unit;
                true
            }
            None => false,
        }
    }

    /// Sets one unit. Returns whether the stored value changed.
    pub fn set(&mut self, index: usize, active: bool) -> bool {
        match self.units.get_mut(index) {
            Some(unit) if *unit != active => {
                *unit = active;
                true
            }
            _ => false,
        }
    }

    /// Sets every unit in `range` (clamped). Returns whether anything changed.
    pub fn set_range(&mut self, range: Range<usize>, active: bool) -> bool {
        let range = self.clamp(range);
        let mut changed = false;
        for unit in &mut self.units[range] {
            if *unit != active {
                *unit = active;
                changed = true;
            }
        }
        changed
    }

    pub fn first_inactive(&self) -> Option<usize> {
        self.units.iter().position(|active| !*active)
    }

    pub fn last_active(&self) -> Option<usize> {
        self.units.iter().rposition(|active| *active)
    }

    /// Returns the index range of partition `index` of width `size`, with the
    /// trailing partition possibly short. `None` when the partition does not
    /// exist.
    pub fn partition(&self, index: usize, size: usize) -> Option<Range<usize>> {
        if size == 0 {
            return None;
        }
        let start = index.checked_mul(size)?;
        if start >= self.units.len() {
            return None;
        }
        let end = start.saturating_add(size).min(self.units.len());
        Some(start..end)
    }

    /// Returns how many partitions of width `size` cover the grid.
    pub fn partition_count(&self, size: usize) -> usize {
        if size == 0 {
            return 0;
        }
        self.units.len().div_ceil(size)
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let end = range.end.min(self.units.len());
        let start = range.start.min(end);
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::UnitGrid;

    #[test]
    fn leading_active_clamps_to_capacity() {
        let grid = UnitGrid::with_leading_active(7, 5);
        assert_eq!(grid.units(), &[true; 5]);
        let grid = UnitGrid::with_leading_active(2, 5);
        assert_eq!(grid.units(), &[true, true, false, false, false]);
    }

    #[test]
    fn resize_preserves_overlap_and_reports_dropped_actives() {
        let mut grid = UnitGrid::from_units(vec![false, true, false, true, true]);
        assert_eq!(grid.resize(3), 2);
        assert_eq!(grid.units(), &[false, true, false]);

        assert_eq!(grid.resize(6), 0);
        assert_eq!(grid.units(), &[false, true, false, false, false, false]);
    }

    #[test]
    fn partitions_include_short_trailing_range() {
        let grid = UnitGrid::inactive(23);
        assert_eq!(grid.partition_count(10), 3);
        assert_eq!(grid.partition(0, 10), Some(0..10));
        assert_eq!(grid.partition(2, 10), Some(20..23));
        assert_eq!(grid.partition(3, 10), None);
        assert_eq!(grid.partition(usize::MAX, 10), None);
    }

    #[test]
    fn range_helpers_clamp_to_bounds() {
        let mut grid = UnitGrid::inactive(4);
        assert!(grid.set_range(2..10, true));
        assert_eq!(grid.units(), &[false, false, true, true]);
        assert!(!grid.set_range(2..4, true));
        assert_eq!(grid.active_in(0..100), 2);
        assert!(grid.all_active_in(2..9));
        assert!(!grid.all_active_in(4..9));
    }

    #[test]
    fn flip_and_set_ignore_out_of_range() {
        let mut grid = UnitGrid::inactive(2);
        assert!(!grid.flip(2));
        assert!(!grid.set(5, true));
        assert!(grid.flip(1));
        assert_eq!(grid.first_inactive(), Some(0));
        assert_eq!(grid.last_active(), Some(1));
        assert_eq!(grid.get(1), Some(true));
        assert_eq!(grid.get(2), None);
    }

    #[test]
    fn serializes_as_plain_bool_array() {
        let grid = UnitGrid::from_units(vec![true, false]);
        assert_eq!(serde_json::to_string(&grid).unwrap(), "[true,false]");
        let decoded: UnitGrid = serde_json::from_str("[false,true,true]").unwrap();
        assert_eq!(decoded.active_count(), 2);
        assert_eq!(decoded.into_units(), vec![false, true, true]);
    }
}
