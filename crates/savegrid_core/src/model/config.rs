//! Fixed grid configuration.
//!
//! # Responsibility
//! - Hold the unit value and partition sizes shared by every grid operation.
//! - Reject invalid configurations before any engine is built.
//!
//! # Invariants
//! - `unit_value > 0`.
//! - `group_size > 0` and `row_size % group_size == 0`.
//! - `max_units > 0`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Currency value of one savings unit.
pub const UNIT_VALUE: i64 = 10_000;
/// Units per row used by majority-flip toggling.
pub const ROW_SIZE: usize = 50;
/// Units per group used by group toggling and collapse rendering.
pub const GROUP_SIZE: usize = 10;
/// Upper bound on grid capacity.
pub const MAX_UNITS: usize = 1_000;
/// Goal assigned to a new owner: exactly `MAX_UNITS` units.
pub const DEFAULT_TARGET_AMOUNT: i64 = 10_000_000;

/// Configuration-time violations. These are fatal for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridConfigError {
    NonPositiveUnitValue(i64),
    ZeroRowSize,
    ZeroGroupSize,
    GroupSizeNotDivisor { row_size: usize, group_size: usize },
    ZeroMaxUnits,
}

impl Display for GridConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveUnitValue(value) => {
                write!(f, "unit value must be positive, got {value}")
            }
            Self::ZeroRowSize => write!(f, "row size must be positive"),
            Self::ZeroGroupSize => write!(f, "group size must be positive"),
            Self::GroupSizeNotDivisor {
                row_size,
                group_size,
            } => write!(
                f,
                "group size {group_size} does not divide row size {row_size}"
            ),
            Self::ZeroMaxUnits => write!(f, "max units must be positive"),
        }
    }
}

impl Error for GridConfigError {}

/// Validated grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    unit_value: i64,
    row_size: usize,
    group_size: usize,
    max_units: usize,
}

impl GridConfig {
    pub fn new(
        unit_value: i64,
        row_size: usize,
        group_size: usize,
        max_units: usize,
    ) -> Result<Self, GridConfigError> {
        if unit_value <= 0 {
            return Err(GridConfigError::NonPositiveUnitValue(unit_value));
        }
        if row_size == 0 {
            return Err(GridConfigError::ZeroRowSize);
        }
        if group_size == 0 {
            return Err(GridConfigError::ZeroGroupSize);
        }
        if row_size % group_size != 0 {
            return Err(GridConfigError::GroupSizeNotDivisor {
                row_size,
                group_size,
            });
        }
        if max_units == 0 {
            return Err(GridConfigError::ZeroMaxUnits);
        }

        Ok(Self {
            unit_value,
            row_size,
            group_size,
            max_units,
        })
    }

    /// The production configuration: 10,000 per unit, rows of 50, groups of 10.
    pub const fn standard() -> Self {
        Self {
            unit_value: UNIT_VALUE,
            row_size: ROW_SIZE,
            group_size: GROUP_SIZE,
            max_units: MAX_UNITS,
        }
    }

    pub fn unit_value(&self) -> i64 {
        self.unit_value
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn max_units(&self) -> usize {
        self.max_units
    }

    /// Returns `ceil(target_amount / unit_value)`, or 0 for non-positive targets.
    pub fn capacity_for(&self, target_amount: i64) -> usize {
        if target_amount <= 0 {
            return 0;
        }
        let units = (target_amount - 1) / self.unit_value + 1;
        usize::try_from(units).unwrap_or(usize::MAX)
    }

    /// Returns how many whole units `amount` pays for, never negative.
    pub fn units_for_amount(&self, amount: i64) -> usize {
        if amount <= 0 {
            return 0;
        }
        usize::try_from(amount / self.unit_value).unwrap_or(usize::MAX)
    }

    /// Converts a signed unit count into a currency amount.
    pub fn amount_for_units(&self, units: i64) -> i64 {
        units.saturating_mul(self.unit_value)
    }

    /// Largest target whose capacity still fits in `max_units`.
    pub fn max_target(&self) -> i64 {
        i64::try_from(self.max_units)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.unit_value)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::{GridConfig, GridConfigError, DEFAULT_TARGET_AMOUNT, MAX_UNITS};

    #[test]
    fn standard_config_passes_validation() {
        let standard = GridConfig::standard();
        let validated = GridConfig::new(
            standard.unit_value(),
            standard.row_size(),
            standard.group_size(),
            standard.max_units(),
        )
        .unwrap();
        assert_eq!(standard, validated);
        assert_eq!(standard.capacity_for(DEFAULT_TARGET_AMOUNT), MAX_UNITS);
    }

    #[test]
    fn rejects_invalid_configurations() {
        assert_eq!(
            GridConfig::new(0, 50, 10, 1000),
            Err(GridConfigError::NonPositiveUnitValue(0))
        );
        assert_eq!(
            GridConfig::new(-5, 50, 10, 1000),
            Err(GridConfigError::NonPositiveUnitValue(-5))
        );
        assert_eq!(
            GridConfig::new(100, 50, 7, 1000),
            Err(GridConfigError::GroupSizeNotDivisor {
                row_size: 50,
                group_size: 7
            })
        );
        assert_eq!(
            GridConfig::new(100, 0, 10, 1000),
            Err(GridConfigError::ZeroRowSize)
        );
        assert_eq!(
            GridConfig::new(100, 50, 0, 1000),
            Err(GridConfigError::ZeroGroupSize)
        );
        assert_eq!(
            GridConfig::new(100, 50, 10, 0),
            Err(GridConfigError::ZeroMaxUnits)
        );
    }

    #[test]
    fn capacity_rounds_up() {
        let config = GridConfig::standard();
        for (target, expected) in [
            (1, 1),
            (10_000, 1),
            (10_001, 2),
            (50_000, 5),
            (55_000, 6),
            (0, 0),
        ] {
            assert_eq!(config.capacity_for(target), expected, "target {target}");
        }
    }

    #[test]
    fn capacity_for_extreme_targets_does_not_overflow() {
        let config = GridConfig::standard();
        let expected = (i64::MAX - 1) / 10_000 + 1;
        assert_eq!(config.capacity_for(i64::MAX) as i64, expected);
        let unit_of_one = GridConfig::new(1, 50, 10, 10).unwrap();
        assert_eq!(unit_of_one.capacity_for(i64::MAX) as i64, i64::MAX);
        assert_eq!(config.max_target(), 10_000_000);
    }

    #[test]
    fn units_for_amount_floors_and_ignores_negative() {
        let config = GridConfig::standard();
        assert_eq!(config.units_for_amount(29_999), 2);
        assert_eq!(config.units_for_amount(-10_000), 0);
        assert_eq!(config.amount_for_units(-3), -30_000);
    }
}
