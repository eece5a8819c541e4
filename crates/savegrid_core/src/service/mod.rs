//! Core use-case services.
//!
//! # Responsibility
//! - `goal_summary`: progress math and target validation.
//! - `grid_engine`: saved/pending grid reconciliation.
//! - `tracker`: the amount owner composing both over repositories.

pub mod goal_summary;
pub mod grid_engine;
pub mod tracker;
