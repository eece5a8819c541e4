//! Savings tracker: the owner of the current amount.
//!
//! # Responsibility
//! - Load or create the owner's goal record and initialize the grid engine.
//! - Apply commit and forced deltas to the current amount and persist it.
//! - Propagate accepted target changes into grid capacity.
//! - Perform the full reset of grid and amount.
//!
//! # Invariants
//! - After `open`, `commit`, `change_target` and `reset`, the in-memory
//!   `current_amount` equals the engine's saved amount, even when persisting
//!   the amount fails (the failure is still returned).
//! - A rejected or failed target change leaves the summary target unchanged.
//! - After `open`, the target never exceeds `GridConfig::max_target`.

use crate::model::config::GridConfig;
use crate::model::goal::SavingsGoal;
use crate::repo::goal_repo::{GoalRepository, RepoError};
use crate::repo::grid_store::GridStore;
use crate::service::goal_summary::{GoalSummary, GoalSummaryError, InvalidTargetInput, Progress};
use crate::service::grid_engine::{EngineError, InitReport, ResizeOutcome, UnitGridEngine};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tracker-level failure.
#[derive(Debug)]
pub enum TrackerError {
    Repo(RepoError),
    Engine(EngineError),
    Summary(GoalSummaryError),
    InvalidTarget(InvalidTargetInput),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Engine(err) => write!(f, "{err}"),
            Self::Summary(err) => write!(f, "{err}"),
            Self::InvalidTarget(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Summary(err) => Some(err),
            Self::InvalidTarget(err) => Some(err),
        }
    }
}

impl From<RepoError> for TrackerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<EngineError> for TrackerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<GoalSummaryError> for TrackerError {
    fn from(value: GoalSummaryError) -> Self {
        Self::Summary(value)
    }
}

impl From<InvalidTargetInput> for TrackerError {
    fn from(value: InvalidTargetInput) -> Self {
        Self::InvalidTarget(value)
    }
}

/// Facts about opening a tracker.
#[derive(Debug)]
pub struct OpenReport {
    /// The goal record did not exist and was created with defaults.
    pub created_goal: bool,
    /// Stored target that exceeded the configured maximum and was lowered to it.
    pub clamped_target: Option<i64>,
    pub init: InitReport,
}

/// Accepted target change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetChange {
    pub target_amount: i64,
    pub resize: ResizeOutcome,
}

/// Goal summary, grid engine and amount bookkeeping for one owner.
pub struct SavingsTracker<G: GoalRepository, S: GridStore> {
    goals: G,
    owner_id: String,
    summary: GoalSummary,
    engine: UnitGridEngine<S>,
    current_amount: i64,
}

impl<G: GoalRepository, S: GridStore> SavingsTracker<G, S> {
    /// Loads (or creates) the goal for `owner_id` and initializes the grid.
    ///
    /// # Errors
    /// Goal repository failures are returned. Grid load failures are not:
    /// they appear in `OpenReport::init` and the grid is derived instead.
    pub fn open(
        goals: G,
        grids: S,
        owner_id: impl Into<String>,
        config: GridConfig,
    ) -> Result<(Self, OpenReport), TrackerError> {
        let owner_id = owner_id.into();
        let (mut goal, created_goal) = match goals.get_goal(&owner_id)? {
            Some(goal) => (goal, false),
            None => {
                let goal = SavingsGoal::new(owner_id.clone());
                goals.create_goal(&goal)?;
                info!(
                    "event=goal_create module=tracker status=ok target={}",
                    goal.target_amount
                );
                (goal, true)
            }
        };

        let mut clamped_target = None;
        let max_target = config.max_target();
        if goal.target_amount > max_target {
            warn!(
                "event=tracker_open module=tracker status=target_clamped stored={} max={}",
                goal.target_amount, max_target
            );
            goals.update_target_amount(&owner_id, max_target)?;
            clamped_target = Some(goal.target_amount);
            goal.target_amount = max_target;
        }

        let summary = GoalSummary::new(goal.target_amount, &config)?;
        let capacity = config.capacity_for(goal.target_amount);
        let (engine, init) =
            UnitGridEngine::initialize(grids, config, goal.saved_amount, capacity);

        let mut tracker = Self {
            goals,
            owner_id,
            summary,
            engine,
            current_amount: goal.saved_amount,
        };

        if init.forced_delta != 0 {
            warn!(
                "event=tracker_open module=tracker status=forced_delta delta={}",
                init.forced_delta
            );
            tracker.apply_delta(init.forced_delta)?;
        }

        Ok((
            tracker,
            OpenReport {
                created_goal,
                clamped_target,
                init,
            },
        ))
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn current_amount(&self) -> i64 {
        self.current_amount
    }

    pub fn target_amount(&self) -> i64 {
        self.summary.target_amount()
    }

    pub fn progress(&self) -> Progress {
        self.summary.progress(self.current_amount)
    }

    pub fn summary(&self) -> &GoalSummary {
        &self.summary
    }

    pub fn engine(&self) -> &UnitGridEngine<S> {
        &self.engine
    }

    /// Grid edits go through the engine; money only moves on `commit`.
    pub fn engine_mut(&mut self) -> &mut UnitGridEngine<S> {
        &mut self.engine
    }

    /// Commits pending grid edits and applies the delta to the amount.
    ///
    /// Returns `Ok(None)` when there was nothing to commit.
    pub fn commit(&mut self) -> Result<Option<i64>, TrackerError> {
        let Some(delta) = self.engine.commit()? else {
            return Ok(None);
        };
        self.apply_delta(delta)?;
        Ok(Some(delta))
    }

    pub fn cancel(&mut self) -> bool {
        self.engine.cancel()
    }

    /// Validates `raw`, persists the new target and resizes the grid.
    ///
    /// A forced delta from the resize is applied to the amount immediately.
    pub fn change_target(&mut self, raw: &str) -> Result<TargetChange, TrackerError> {
        let previous_target = self.summary.target_amount();
        let mut summary = self.summary.clone();
        let target_amount = summary.propose_target_change(raw)?;

        self.goals
            .update_target_amount(&self.owner_id, target_amount)?;

        let capacity = self.engine.config().capacity_for(target_amount);
        let resize = match self.engine.resize(capacity) {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(rollback) = self
                    .goals
                    .update_target_amount(&self.owner_id, previous_target)
                {
                    error!(
                        "event=target_change module=tracker status=rollback_failed error={rollback}"
                    );
                }
                return Err(err.into());
            }
        };

        self.summary = summary;
        if let Some(delta) = resize.forced_delta {
            self.apply_delta(delta)?;
        }

        info!(
            "event=target_change module=tracker status=ok target={} capacity={}",
            target_amount, resize.capacity
        );
        Ok(TargetChange {
            target_amount,
            resize,
        })
    }

    /// Clears the grid (memory and store) and zeroes the saved amount.
    pub fn reset(&mut self) -> Result<(), TrackerError> {
        self.engine.reset()?;
        self.current_amount = 0;
        self.goals.reset_saved_amount(&self.owner_id)?;
        info!("event=tracker_reset module=tracker status=ok");
        Ok(())
    }

    fn apply_delta(&mut self, delta: i64) -> Result<(), TrackerError> {
        self.current_amount = self.current_amount.saturating_add(delta).max(0);
        if let Err(err) = self
            .goals
            .update_saved_amount(&self.owner_id, self.current_amount)
        {
            error!(
                "event=amount_update module=tracker status=error delta={} error={}",
                delta, err
            );
            return Err(err.into());
        }
        Ok(())
    }
}
