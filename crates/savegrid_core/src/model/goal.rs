//! Savings goal record.
//!
//! # Responsibility
//! - Define the per-owner persisted goal: target and saved amount.
//! - Validate amounts before they reach storage.
//!
//! # Invariants
//! - `target_amount > 0`.
//! - `saved_amount >= 0`.
//! - `owner_id` is non-blank and stable for the owner's lifetime.

use crate::model::config::DEFAULT_TARGET_AMOUNT;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures for goal records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalValidationError {
    BlankOwnerId,
    NonPositiveTarget(i64),
    NegativeSavedAmount(i64),
}

impl Display for GoalValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankOwnerId => write!(f, "owner id must not be blank"),
            Self::NonPositiveTarget(value) => {
                write!(f, "target amount must be positive, got {value}")
            }
            Self::NegativeSavedAmount(value) => {
                write!(f, "saved amount must not be negative, got {value}")
            }
        }
    }
}

impl Error for GoalValidationError {}

/// Persisted savings goal for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub owner_id: String,
    pub target_amount: i64,
    pub saved_amount: i64,
}

impl SavingsGoal {
    /// Creates the initial record for a new owner: default target, nothing saved.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            target_amount: DEFAULT_TARGET_AMOUNT,
            saved_amount: 0,
        }
    }

    pub fn validate(&self) -> Result<(), GoalValidationError> {
        if self.owner_id.trim().is_empty() {
            return Err(GoalValidationError::BlankOwnerId);
        }
        if self.target_amount <= 0 {
            return Err(GoalValidationError::NonPositiveTarget(self.target_amount));
        }
        if self.saved_amount < 0 {
            return Err(GoalValidationError::NegativeSavedAmount(self.saved_amount));
        }
        Ok(())
    }
}
