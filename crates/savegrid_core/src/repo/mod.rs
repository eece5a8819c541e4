//! Storage contracts and their implementations.
//!
//! # Responsibility
//! - Define the narrow persistence seams used by services.
//! - Keep SQL and encoding details out of the engine and tracker.
//!
//! # Invariants
//! - Goal writes call `SavingsGoal::validate()` before touching storage.
//! - Reads reject undecodable persisted state instead of masking it.

pub mod goal_repo;
pub mod grid_store;
