//! Core domain logic for savegrid.
//! This crate is the single source of truth for the savings grid invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::config::{GridConfig, GridConfigError, DEFAULT_TARGET_AMOUNT};
pub use model::goal::{GoalValidationError, SavingsGoal};
pub use model::grid::UnitGrid;
pub use model::layout::{group_layout, GroupCell};
pub use repo::goal_repo::{GoalRepository, RepoError, RepoResult, SqliteGoalRepository};
pub use repo::grid_store::{GridStore, MemoryGridStore, SqliteGridStore, StoreError, StoreResult};
pub use service::goal_summary::{
    compute_progress, GoalSummary, GoalSummaryError, InvalidTargetInput, Progress,
};
pub use service::grid_engine::{
    EngineError, GridSource, InitReport, ResizeOutcome, UnitGridEngine,
};
pub use service::tracker::{OpenReport, SavingsTracker, TargetChange, TrackerError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
