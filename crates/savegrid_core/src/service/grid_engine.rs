//! Unit grid state-reconciliation engine.
//!
//! # Responsibility
//! - Own the saved and pending grid snapshots plus the dirty flag.
//! - Apply single, group, row and step edits to the pending snapshot.
//! - Commit or discard a batch atomically against an injected `GridStore`.
//!
//! # Invariants
//! - `saved` and `pending` always have the same length.
//! - `saved` only advances after the store accepted the new snapshot.
//! - A commit delta equals `unit_value * (active(pending) - active(saved))`.
//! - Every mutating operation takes `&mut self`; no edit can interleave with
//!   a commit's diff of the two snapshots.

use crate::model::config::GridConfig;
use crate::model::grid::UnitGrid;
use crate::model::layout::{group_layout, GroupCell};
use crate::repo::grid_store::{GridStore, StoreError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Engine operation failure. Never fatal for the session.
#[derive(Debug)]
pub enum EngineError {
    /// The store rejected a write; in-memory state was left untouched.
    Persistence(StoreError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistence(err) => write!(f, "grid persistence failed: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

/// Where the initial grid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSource {
    /// Stored grid, resized to the current capacity.
    Persisted,
    /// Built from the current amount because nothing usable was stored.
    Derived,
    /// A stored grid existed but disagreed with the current amount, so the
    /// grid was rebuilt from the amount.
    Rederived { stored_amount: i64 },
}

/// Non-fatal facts about engine initialization.
#[derive(Debug)]
pub struct InitReport {
    pub source: GridSource,
    /// Load failure that forced derivation.
    pub load_error: Option<StoreError>,
    /// Failure persisting a derived grid; the grid is still usable.
    pub persist_error: Option<StoreError>,
    /// `saved_amount - current_amount` after initialization. Non-zero only
    /// when the amount cannot be represented by whole units within capacity.
    pub forced_delta: i64,
}

/// Result of a capacity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub previous_capacity: usize,
    pub capacity: usize,
    /// Saved active units cut off by a shrink.
    pub dropped_saved: usize,
    /// Pending active units cut off by a shrink.
    pub dropped_pending: usize,
    /// Immediate negative delta when saved money was dropped.
    pub forced_delta: Option<i64>,
}

/// Dual-snapshot grid engine over a `GridStore`.
pub struct UnitGridEngine<S: GridStore> {
    store: S,
    config: GridConfig,
    saved: UnitGrid,
    pending: UnitGrid,
    dirty: bool,
}

impl<S: GridStore> UnitGridEngine<S> {
    /// Loads the stored grid and initializes both snapshots from it.
    ///
    /// A load failure is reported in the returned `InitReport` and the grid
    /// is derived from `current_amount` instead.
    pub fn initialize(
        store: S,
        config: GridConfig,
        current_amount: i64,
        capacity: usize,
    ) -> (Self, InitReport) {
        match store.load() {
            Ok(persisted) => {
                Self::initialize_with(store, config, persisted, current_amount, capacity)
            }
            Err(err) => {
                warn!("event=grid_init module=engine status=load_failed error={err}");
                let (engine, mut report) =
                    Self::initialize_with(store, config, None, current_amount, capacity);
                report.load_error = Some(err);
                (engine, report)
            }
        }
    }

    /// Initializes from an already loaded grid (or `None`).
    ///
    /// A persisted grid is resized to `capacity` and used verbatim when its
    /// value matches `current_amount`. Otherwise the first
    /// `min(floor(current_amount / unit_value), capacity)` units are
    /// activated and the result is persisted immediately.
    pub fn initialize_with(
        store: S,
        config: GridConfig,
        persisted: Option<UnitGrid>,
        current_amount: i64,
        capacity: usize,
    ) -> (Self, InitReport) {
        let capacity = capacity.min(config.max_units());
        let stored = persisted.map(|mut grid| {
            grid.resize(capacity);
            grid
        });

        let (grid, source) = match stored {
            Some(grid) if amount_of(&config, &grid) == current_amount => {
                (grid, GridSource::Persisted)
            }
            Some(grid) => {
                let stored_amount = amount_of(&config, &grid);
                warn!(
                    "event=grid_init module=engine status=amount_mismatch stored_amount={} current_amount={}",
                    stored_amount, current_amount
                );
                (
                    derive_grid(&config, current_amount, capacity),
                    GridSource::Rederived { stored_amount },
                )
            }
            None => (
                derive_grid(&config, current_amount, capacity),
                GridSource::Derived,
            ),
        };

        let persist_error = match source {
            GridSource::Persisted => None,
            GridSource::Derived | GridSource::Rederived { .. } => store.save(&grid).err(),
        };
        if let Some(err) = &persist_error {
            error!("event=grid_init module=engine status=persist_failed error={err}");
        }

        let forced_delta = amount_of(&config, &grid) - current_amount;
        info!(
            "event=grid_init module=engine status=ok source={:?} capacity={} active={} forced_delta={}",
            source,
            capacity,
            grid.active_count(),
            forced_delta
        );

        let engine = Self {
            store,
            config,
            saved: grid.clone(),
            pending: grid,
            dirty: false,
        };
        let report = InitReport {
            source,
            load_error: None,
            persist_error,
            forced_delta,
        };
        (engine, report)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn saved(&self) -> &UnitGrid {
        &self.saved
    }

    pub fn pending(&self) -> &UnitGrid {
        &self.pending
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn capacity(&self) -> usize {
        self.saved.len()
    }

    pub fn saved_amount(&self) -> i64 {
        amount_of(&self.config, &self.saved)
    }

    pub fn pending_amount(&self) -> i64 {
        amount_of(&self.config, &self.pending)
    }

    /// Delta a commit would report right now.
    pub fn pending_delta(&self) -> i64 {
        self.pending_amount() - self.saved_amount()
    }

    pub fn row_count(&self) -> usize {
        self.pending.partition_count(self.config.row_size())
    }

    pub fn group_count(&self) -> usize {
        self.pending.partition_count(self.config.group_size())
    }

    /// Render decisions for the pending snapshot, computed on every call.
    pub fn group_layout(&self) -> Vec<GroupCell> {
        group_layout(&self.pending, self.config.group_size())
    }

    /// Flips one pending unit. Out-of-range indices are ignored.
    pub fn toggle_unit(&mut self, index: usize) -> bool {
        let changed = self.pending.flip(index);
        if !changed {
            debug!("event=toggle_unit module=engine status=ignored index={index}");
        }
        self.mark(changed)
    }

    /// Activates the whole group unless it is already fully active, in which
    /// case it is cleared.
    pub fn toggle_group(&mut self, group_index: usize) -> bool {
        let Some(range) = self.pending.partition(group_index, self.config.group_size()) else {
            debug!("event=toggle_group module=engine status=ignored group={group_index}");
            return false;
        };
        let activate = !self.pending.all_active_in(range.clone());
        let changed = self.pending.set_range(range, activate);
        self.mark(changed)
    }

    /// Majority flip: a row at most half active becomes fully active,
    /// otherwise it is cleared. A short trailing row uses its own length.
    pub fn toggle_row(&mut self, row_index: usize) -> bool {
        let Some(range) = self.pending.partition(row_index, self.config.row_size()) else {
            debug!("event=toggle_row module=engine status=ignored row={row_index}");
            return false;
        };
        let active = self.pending.active_in(range.clone());
        let activate = active * 2 <= range.len();
        let changed = self.pending.set_range(range, activate);
        self.mark(changed)
    }

    /// Activates the lowest inactive unit. Returns its index.
    pub fn increment_one(&mut self) -> Option<usize> {
        let index = self.pending.first_inactive()?;
        let changed = self.pending.set(index, true);
        self.mark(changed);
        Some(index)
    }

    /// Deactivates the highest active unit. Returns its index.
    pub fn decrement_one(&mut self) -> Option<usize> {
        let index = self.pending.last_active()?;
        let changed = self.pending.set(index, false);
        self.mark(changed);
        Some(index)
    }

    /// Persists the pending snapshot and reports its signed delta.
    ///
    /// Returns `Ok(None)` when there is nothing to commit.
    ///
    /// # Errors
    /// On persistence failure the saved snapshot, pending snapshot and dirty
    /// flag are all left as they were so the batch can be retried or
    /// cancelled.
    pub fn commit(&mut self) -> Result<Option<i64>, EngineError> {
        if !self.dirty {
            return Ok(None);
        }

        let delta = self.pending_delta();
        if let Err(err) = self.store.save(&self.pending) {
            error!(
                "event=grid_commit module=engine status=error delta={} error={}",
                delta, err
            );
            return Err(err.into());
        }

        self.saved = self.pending.clone();
        self.dirty = false;
        info!(
            "event=grid_commit module=engine status=ok delta={} active={}",
            delta,
            self.saved.active_count()
        );
        Ok(Some(delta))
    }

    /// Discards pending edits. Returns whether anything was discarded.
    pub fn cancel(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.pending = self.saved.clone();
        self.dirty = false;
        info!("event=grid_cancel module=engine status=ok");
        true
    }

    /// Applies the resize rule to both snapshots and persists the new saved
    /// snapshot.
    ///
    /// The dirty flag is left alone. When the shrink drops saved active
    /// units, `forced_delta` carries the (negative) money change that the
    /// owner must apply immediately.
    ///
    /// # Errors
    /// On persistence failure neither snapshot changes.
    pub fn resize(&mut self, new_capacity: usize) -> Result<ResizeOutcome, EngineError> {
        let previous_capacity = self.capacity();
        let capacity = new_capacity.min(self.config.max_units());
        if capacity == previous_capacity {
            return Ok(ResizeOutcome {
                previous_capacity,
                capacity,
                dropped_saved: 0,
                dropped_pending: 0,
                forced_delta: None,
            });
        }

        let mut saved = self.saved.clone();
        let mut pending = self.pending.clone();
        let dropped_saved = saved.resize(capacity);
        let dropped_pending = pending.resize(capacity);

        if let Err(err) = self.store.save(&saved) {
            error!(
                "event=grid_resize module=engine status=error from={} to={} error={}",
                previous_capacity, capacity, err
            );
            return Err(err.into());
        }

        self.saved = saved;
        self.pending = pending;

        let forced_delta = (dropped_saved > 0)
            .then(|| -self.config.amount_for_units(units_i64(dropped_saved)));
        if let Some(delta) = forced_delta {
            warn!(
                "event=grid_resize module=engine status=forced_delta from={} to={} dropped={} delta={}",
                previous_capacity, capacity, dropped_saved, delta
            );
        } else {
            info!(
                "event=grid_resize module=engine status=ok from={} to={}",
                previous_capacity, capacity
            );
        }

        Ok(ResizeOutcome {
            previous_capacity,
            capacity,
            dropped_saved,
            dropped_pending,
            forced_delta,
        })
    }

    /// Clears both snapshots and the stored grid. Reports no delta; the owner
    /// zeroes its amount separately.
    ///
    /// # Errors
    /// On persistence failure nothing changes.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        if let Err(err) = self.store.clear() {
            error!("event=grid_reset module=engine status=error error={err}");
            return Err(err.into());
        }
        let capacity = self.capacity();
        self.saved = UnitGrid::inactive(capacity);
        self.pending = UnitGrid::inactive(capacity);
        self.dirty = false;
        info!("event=grid_reset module=engine status=ok capacity={capacity}");
        Ok(())
    }

    fn mark(&mut self, changed: bool) -> bool {
        if changed {
            self.dirty = true;
        }
        changed
    }
}

fn derive_grid(config: &GridConfig, current_amount: i64, capacity: usize) -> UnitGrid {
    UnitGrid::with_leading_active(config.units_for_amount(current_amount), capacity)
}

fn amount_of(config: &GridConfig, grid: &UnitGrid) -> i64 {
    config.amount_for_units(units_i64(grid.active_count()))
}

fn units_i64(units: usize) -> i64 {
    i64::try_from(units).unwrap_or(i64::MAX)
}
