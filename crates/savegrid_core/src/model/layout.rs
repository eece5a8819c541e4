//! Group collapse projection over a grid snapshot.
//!
//! A group renders as one filled cell only when it is full length and every
//! unit in it is active. Short trailing groups always render per unit.

use crate::model::grid::UnitGrid;
use std::ops::Range;

/// Render decision for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupCell {
    /// Whole group shown as a single filled cell.
    Filled { group: usize, units: Range<usize> },
    /// Each unit shown on its own.
    Units {
        group: usize,
        units: Range<usize>,
        states: Vec<bool>,
    },
}

impl GroupCell {
    pub fn group(&self) -> usize {
        match self {
            Self::Filled { group, .. } | Self::Units { group, .. } => *group,
        }
    }

    pub fn units(&self) -> Range<usize> {
        match self {
            Self::Filled { units, .. } | Self::Units { units, .. } => units.clone(),
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled { .. })
    }
}

/// Projects `grid` into per-group render decisions.
pub fn group_layout(grid: &UnitGrid, group_size: usize) -> Vec<GroupCell> {
    (0..grid.partition_count(group_size))
        .filter_map(|group| {
            let units = grid.partition(group, group_size)?;
            let full_length = units.len() == group_size;
            if full_length && grid.all_active_in(units.clone()) {
                Some(GroupCell::Filled { group, units })
            } else {
                let states = grid.units()[units.clone()].to_vec();
                Some(GroupCell::Units {
                    group,
                    units,
                    states,
                })
            }
        })
        .collect()
}
