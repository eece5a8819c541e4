//! Goal progress summary and target editing.
//!
//! # Responsibility
//! - Derive display-level progress (percentage, remaining) from amounts.
//! - Validate proposed target amounts through a small edit buffer.
//!
//! # Invariants
//! - The held target is always positive; percentage math never divides by
//!   zero.
//! - A rejected proposal leaves the held target unchanged.

use crate::model::config::GridConfig;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::IntErrorKind;

/// Display-level progress facts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// `round(100 * current / target)`, clamped to `0..=100`.
    pub percentage: u8,
    /// `max(0, target - current)`.
    pub remaining: i64,
    /// Unclamped `current / target`.
    pub ratio: f64,
}

impl Progress {
    pub fn is_goal_reached(&self) -> bool {
        self.ratio >= 1.0
    }

    pub fn is_goal_exceeded(&self) -> bool {
        self.ratio > 1.0
    }
}

/// Configuration-time summary failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalSummaryError {
    NonPositiveTarget(i64),
    TargetAboveMax { target: i64, max_target: i64 },
}

impl Display for GoalSummaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveTarget(value) => {
                write!(f, "target amount must be positive, got {value}")
            }
            Self::TargetAboveMax { target, max_target } => {
                write!(f, "target amount {target} exceeds maximum {max_target}")
            }
        }
    }
}

impl Error for GoalSummaryError {}

/// Rejected target proposal. Recovered locally by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidTargetInput {
    Empty,
    NotANumber,
    NotPositive(i64),
    TooLarge { max_target: i64 },
}

impl Display for InvalidTargetInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "target amount is required"),
            Self::NotANumber => write!(f, "target amount must be a whole number"),
            Self::NotPositive(value) => write!(f, "target amount must be positive, got {value}"),
            Self::TooLarge { max_target } => {
                write!(f, "target amount must not exceed {max_target}")
            }
        }
    }
}

impl Error for InvalidTargetInput {}

impl InvalidTargetInput {
    fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::NotANumber => "not_a_number",
            Self::NotPositive(_) => "not_positive",
            Self::TooLarge { .. } => "too_large",
        }
    }
}

/// Computes progress for `current` toward `target`.
///
/// # Errors
/// Returns `NonPositiveTarget` when `target <= 0`.
pub fn compute_progress(current: i64, target: i64) -> Result<Progress, GoalSummaryError> {
    if target <= 0 {
        return Err(GoalSummaryError::NonPositiveTarget(target));
    }
    Ok(progress_for(current, target))
}

fn progress_for(current: i64, target: i64) -> Progress {
    let ratio = current as f64 / target as f64;
    let percentage = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;
    let remaining = target.saturating_sub(current).max(0);

    Progress {
        percentage,
        remaining,
        ratio,
    }
}

/// Holds the target amount plus an optional in-progress edit.
#[derive(Debug, Clone)]
pub struct GoalSummary {
    target_amount: i64,
    max_target: i64,
    draft: Option<String>,
}

impl GoalSummary {
    /// Creates a summary for a positive target no larger than
    /// `config.max_target()`, the target filling `config.max_units()`.
    pub fn new(target_amount: i64, config: &GridConfig) -> Result<Self, GoalSummaryError> {
        if target_amount <= 0 {
            return Err(GoalSummaryError::NonPositiveTarget(target_amount));
        }
        let max_target = config.max_target();
        if target_amount > max_target {
            return Err(GoalSummaryError::TargetAboveMax {
                target: target_amount,
                max_target,
            });
        }
        Ok(Self {
            target_amount,
            max_target,
            draft: None,
        })
    }

    pub fn target_amount(&self) -> i64 {
        self.target_amount
    }

    pub fn max_target(&self) -> i64 {
        self.max_target
    }

    pub fn progress(&self, current: i64) -> Progress {
        progress_for(current, self.target_amount)
    }

    /// Starts editing, seeding the buffer with the current target.
    pub fn begin_edit(&mut self) {
        self.draft = Some(self.target_amount.to_string());
    }

    pub fn set_draft(&mut self, raw: impl Into<String>) {
        self.draft = Some(raw.into());
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn discard_edit(&mut self) {
        self.draft = None;
    }

    /// Submits the edit buffer. The buffer is kept on rejection so the input
    /// can be corrected.
    pub fn submit_edit(&mut self) -> Result<i64, InvalidTargetInput> {
        let raw = self.draft.clone().unwrap_or_default();
        let accepted = self.propose_target_change(&raw)?;
        self.draft = None;
        Ok(accepted)
    }

    /// Validates `raw` and, when accepted, makes it the held target.
    ///
    /// The caller owns propagating an accepted target to grid capacity.
    pub fn propose_target_change(&mut self, raw: &str) -> Result<i64, InvalidTargetInput> {
        match parse_target(raw, self.max_target) {
            Ok(target) => {
                info!(
                    "event=target_change module=summary status=ok previous={} target={}",
                    self.target_amount, target
                );
                self.target_amount = target;
                Ok(target)
            }
            Err(err) => {
                warn!(
                    "event=target_change module=summary status=rejected reason={}",
                    err.reason()
                );
                Err(err)
            }
        }
    }
}

fn parse_target(raw: &str, max_target: i64) -> Result<i64, InvalidTargetInput> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('円').unwrap_or(trimmed);
    let cleaned: String = trimmed
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(InvalidTargetInput::Empty);
    }

    let value = cleaned.parse::<i64>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow => InvalidTargetInput::TooLarge { max_target },
        IntErrorKind::NegOverflow => InvalidTargetInput::NotPositive(i64::MIN),
        _ => InvalidTargetInput::NotANumber,
    })?;

    if value <= 0 {
        return Err(InvalidTargetInput::NotPositive(value));
    }
    if value > max_target {
        return Err(InvalidTargetInput::TooLarge { max_target });
    }
    Ok(value)
}
