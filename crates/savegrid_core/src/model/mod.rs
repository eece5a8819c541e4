//! Savings domain model.
//!
//! # Responsibility
//! - Define the grid snapshot, its fixed configuration and the goal record.
//! - Provide pure projections (group layout) over grid snapshots.
//!
//! # Invariants
//! - Units are identified by index only.
//! - Layout is derived from a grid on every read and never stored.

pub mod config;
pub mod goal;
pub mod grid;
pub mod layout;
