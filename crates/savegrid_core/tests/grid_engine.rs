use savegrid_core::db::open_db_in_memory;
use savegrid_core::{
    GridConfig, GridSource, GridStore, MemoryGridStore, SqliteGridStore, StoreError, StoreResult,
    UnitGrid, UnitGridEngine,
};
use std::cell::Cell;

const UNIT: i64 = 10_000;

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryGridStore,
    fail_writes: Cell<bool>,
    fail_loads: Cell<bool>,
}

impl GridStore for FlakyStore {
    fn load(&self) -> StoreResult<Option<UnitGrid>> {
        if self.fail_loads.get() {
            return Err(StoreError::Unavailable("load timed out".to_string()));
        }
        self.inner.load()
    }

    fn save(&self, grid: &UnitGrid) -> StoreResult<()> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("save timed out".to_string()));
        }
        self.inner.save(grid)
    }

    fn clear(&self) -> StoreResult<()> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("clear timed out".to_string()));
        }
        self.inner.clear()
    }
}

fn units(grid: &UnitGrid) -> Vec<bool> {
    grid.units().to_vec()
}

fn engine_with<S: GridStore>(store: S, current: i64, capacity: usize) -> UnitGridEngine<S> {
    UnitGridEngine::initialize(store, GridConfig::standard(), current, capacity).0
}

#[test]
fn scenario_a_toggle_and_commit() {
    let mut engine = engine_with(MemoryGridStore::new(), 20_000, 5);
    assert_eq!(units(engine.saved()), [true, true, false, false, false]);

    assert!(engine.toggle_unit(2));
    assert_eq!(units(engine.pending()), [true, true, true, false, false]);
    assert!(engine.is_dirty());

    let delta = engine.commit().unwrap().unwrap();
    assert_eq!(delta, 10_000);
    let current_amount = 20_000 + delta;
    assert_eq!(current_amount, 30_000);
    assert_eq!(engine.saved_amount(), current_amount);
    assert_eq!(engine.saved(), engine.pending());
    assert!(!engine.is_dirty());
    assert_eq!(engine.store().snapshot().as_ref(), Some(engine.saved()));
}

#[test]
fn scenario_b_row_majority_activates_short_row() {
    let mut engine = engine_with(MemoryGridStore::new(), 20_000, 5);

    assert!(engine.toggle_row(0));
    assert_eq!(units(engine.pending()), [true; 5]);
    assert_eq!(engine.commit().unwrap(), Some(30_000));
}

#[test]
fn scenario_c_shrink_dropping_only_inactive_units() {
    let store = MemoryGridStore::with_grid(UnitGrid::from_units(vec![
        true, true, true, false, false,
    ]));
    let mut engine = engine_with(&store, 30_000, 5);

    let outcome = engine.resize(GridConfig::standard().capacity_for(30_000)).unwrap();
    assert_eq!(outcome.previous_capacity, 5);
    assert_eq!(outcome.capacity, 3);
    assert_eq!(outcome.forced_delta, None);
    assert_eq!(units(engine.saved()), [true, true, true]);
    assert_eq!(engine.saved_amount(), 30_000);
    assert_eq!(store.snapshot(), Some(engine.saved().clone()));
}

#[test]
fn scenario_d_shrink_dropping_active_unit_forces_delta() {
    let store = MemoryGridStore::with_grid(UnitGrid::from_units(vec![true, true, true]));
    let mut engine = engine_with(&store, 30_000, 3);

    let outcome = engine.resize(2).unwrap();
    assert_eq!(outcome.dropped_saved, 1);
    assert_eq!(outcome.forced_delta, Some(-10_000));
    assert_eq!(units(engine.saved()), [true, true]);
    assert_eq!(units(engine.pending()), [true, true]);
}

#[test]
fn resize_grows_with_inactive_units_and_keeps_dirty_state() {
    let mut engine = engine_with(MemoryGridStore::new(), 10_000, 2);
    engine.toggle_unit(1);

    let outcome = engine.resize(4).unwrap();
    assert_eq!(outcome.forced_delta, None);
    assert!(engine.is_dirty());
    assert_eq!(units(engine.saved()), [true, false, false, false]);
    assert_eq!(units(engine.pending()), [true, true, false, false]);
    assert_eq!(engine.commit().unwrap(), Some(10_000));
}

#[test]
fn resize_reports_pending_only_drops_without_forced_delta() {
    let mut engine = engine_with(MemoryGridStore::new(), 0, 4);
    engine.toggle_unit(3);

    let outcome = engine.resize(3).unwrap();
    assert_eq!(outcome.dropped_pending, 1);
    assert_eq!(outcome.dropped_saved, 0);
    assert_eq!(outcome.forced_delta, None);
    assert_eq!(engine.saved().len(), engine.pending().len());
}

#[test]
fn commit_delta_matches_snapshot_difference_for_edit_sequences() {
    let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    let mut engine = engine_with(MemoryGridStore::new(), 370_000, 123);
    let mut current_amount = 370_000;

    for _ in 0..40 {
        let saved_before = engine.saved().active_count() as i64;
        for _ in 0..(next() % 12) {
            let pick = next();
            match pick % 5 {
                0 => {
                    engine.toggle_unit((pick >> 8) as usize % 130);
                }
                1 => {
                    engine.toggle_group((pick >> 8) as usize % 14);
                }
                2 => {
                    engine.toggle_row((pick >> 8) as usize % 4);
                }
                3 => {
                    engine.increment_one();
                }
                _ => {
                    engine.decrement_one();
                }
            }
        }
        let pending_at_commit = engine.pending().active_count() as i64;

        if let Some(delta) = engine.commit().unwrap() {
            assert_eq!(delta, UNIT * (pending_at_commit - saved_before));
            current_amount += delta;
        }
        assert_eq!(engine.saved().active_count() as i64 * UNIT, current_amount);
        assert_eq!(engine.saved().len(), engine.pending().len());
    }
}

#[test]
fn cancel_restores_saved_snapshot_bit_for_bit() {
    let mut engine = engine_with(MemoryGridStore::new(), 120_000, 60);
    let saved = engine.saved().clone();
    let saves = engine.store().save_count();

    engine.toggle_unit(0);
    engine.toggle_group(3);
    engine.toggle_row(1);
    engine.increment_one();
    assert_ne!(engine.pending(), &saved);

    assert!(engine.cancel());
    assert_eq!(engine.pending(), &saved);
    assert_eq!(engine.saved(), &saved);
    assert!(!engine.is_dirty());
    assert_eq!(engine.pending_delta(), 0);
    assert_eq!(engine.store().save_count(), saves);
}

#[test]
fn toggle_row_flips_on_every_call() {
    let mut engine = engine_with(MemoryGridStore::new(), 0, 100);
    for index in [0, 1, 2, 60, 61] {
        engine.toggle_unit(index);
    }

    assert!(engine.toggle_row(0));
    assert_eq!(engine.pending().active_in(0..50), 50);
    assert!(engine.toggle_row(0));
    assert_eq!(engine.pending().active_in(0..50), 0);
    assert!(engine.toggle_row(0));
    assert_eq!(engine.pending().active_in(0..50), 50);

    // 28 of 50 active is a majority, so the row clears.
    for index in 62..88 {
        engine.toggle_unit(index);
    }
    assert_eq!(engine.pending().active_in(50..100), 28);
    assert!(engine.toggle_row(1));
    assert_eq!(engine.pending().active_in(50..100), 0);
}

#[test]
fn toggle_row_at_exactly_half_activates() {
    let mut engine = engine_with(MemoryGridStore::new(), 250_000, 50);
    assert_eq!(engine.pending().active_count(), 25);
    engine.toggle_row(0);
    assert_eq!(engine.pending().active_count(), 50);
}

#[test]
fn toggle_group_fills_partial_and_clears_full() {
    let mut engine = engine_with(MemoryGridStore::new(), 30_000, 25);

    assert!(engine.toggle_group(0));
    assert_eq!(engine.pending().active_in(0..10), 10);
    assert!(engine.group_layout()[0].is_filled());

    assert!(engine.toggle_group(0));
    assert_eq!(engine.pending().active_in(0..10), 0);
    assert!(!engine.group_layout()[0].is_filled());

    assert!(engine.toggle_group(2));
    assert_eq!(engine.pending().active_in(20..25), 5);
    assert!(!engine.group_layout()[2].is_filled());
    assert!(engine.toggle_group(2));
    assert_eq!(engine.pending().active_in(20..25), 0);
}

#[test]
fn group_layout_tracks_pending_edits_on_every_read() {
    let mut engine = engine_with(MemoryGridStore::new(), 100_000, 20);
    assert!(engine.group_layout()[0].is_filled());

    engine.toggle_unit(4);
    assert!(!engine.group_layout()[0].is_filled());
    engine.cancel();
    assert!(engine.group_layout()[0].is_filled());
    assert_eq!(engine.group_count(), 2);
    assert_eq!(engine.row_count(), 1);
}

#[test]
fn failed_commit_keeps_edits_and_dirty_flag() {
    let store = FlakyStore::default();
    let mut engine = engine_with(&store, 10_000, 5);
    let saved = engine.saved().clone();

    engine.toggle_unit(3);
    let pending = engine.pending().clone();
    store.fail_writes.set(true);

    assert!(engine.commit().is_err());
    assert!(engine.is_dirty());
    assert_eq!(engine.saved(), &saved);
    assert_eq!(engine.pending(), &pending);
    assert_eq!(store.inner.snapshot(), Some(saved.clone()));

    store.fail_writes.set(false);
    assert_eq!(engine.commit().unwrap(), Some(10_000));
    assert_eq!(store.inner.snapshot(), Some(pending));
}

#[test]
fn failed_commit_can_be_cancelled() {
    let store = FlakyStore::default();
    let mut engine = engine_with(&store, 0, 5);
    engine.increment_one();
    store.fail_writes.set(true);

    assert!(engine.commit().is_err());
    assert!(engine.cancel());
    assert_eq!(engine.pending().active_count(), 0);
}

#[test]
fn failed_resize_and_reset_leave_state_untouched() {
    let store = FlakyStore::default();
    let mut engine = engine_with(&store, 30_000, 5);
    store.fail_writes.set(true);

    assert!(engine.resize(2).is_err());
    assert_eq!(engine.capacity(), 5);
    assert_eq!(engine.saved_amount(), 30_000);

    assert!(engine.reset().is_err());
    assert_eq!(engine.saved_amount(), 30_000);
}

#[test]
fn load_failure_falls_back_to_derivation() {
    let store = FlakyStore::default();
    store
        .inner
        .save(&UnitGrid::from_units(vec![false, true, true]))
        .unwrap();
    store.fail_loads.set(true);

    let (engine, report) =
        UnitGridEngine::initialize(&store, GridConfig::standard(), 20_000, 3);
    assert!(report.load_error.is_some());
    assert_eq!(report.source, GridSource::Derived);
    assert_eq!(units(engine.saved()), [true, true, false]);
    assert_eq!(report.forced_delta, 0);
}

#[test]
fn derived_persist_failure_is_reported_not_fatal() {
    let store = FlakyStore::default();
    store.fail_writes.set(true);

    let (engine, report) =
        UnitGridEngine::initialize(&store, GridConfig::standard(), 20_000, 4);
    assert!(report.persist_error.is_some());
    assert_eq!(engine.saved_amount(), 20_000);
}

#[test]
fn persisted_grid_is_resized_and_kept_verbatim() {
    let store =
        MemoryGridStore::with_grid(UnitGrid::from_units(vec![false, true, false, true]));
    let (engine, report) = UnitGridEngine::initialize(&store, GridConfig::standard(), 20_000, 6);

    assert_eq!(report.source, GridSource::Persisted);
    assert_eq!(
        units(engine.saved()),
        [false, true, false, true, false, false]
    );
    assert_eq!(store.save_count(), 0);
}

#[test]
fn persisted_grid_disagreeing_with_amount_is_rederived() {
    let store = MemoryGridStore::with_grid(UnitGrid::from_units(vec![true, true, true]));
    let (engine, report) = UnitGridEngine::initialize(&store, GridConfig::standard(), 10_000, 3);

    assert_eq!(
        report.source,
        GridSource::Rederived {
            stored_amount: 30_000
        }
    );
    assert_eq!(units(engine.saved()), [true, false, false]);
    assert_eq!(store.snapshot(), Some(engine.saved().clone()));
}

#[test]
fn amount_beyond_capacity_reports_forced_delta() {
    let (engine, report) =
        UnitGridEngine::initialize(MemoryGridStore::new(), GridConfig::standard(), 55_000, 3);
    assert_eq!(engine.saved_amount(), 30_000);
    assert_eq!(report.forced_delta, -25_000);
}

#[test]
fn reset_clears_grids_and_store() {
    let store = MemoryGridStore::new();
    let mut engine = engine_with(&store, 40_000, 6);
    engine.toggle_unit(5);

    engine.reset().unwrap();
    assert_eq!(units(engine.saved()), [false; 6]);
    assert_eq!(engine.saved(), engine.pending());
    assert!(!engine.is_dirty());
    assert_eq!(store.snapshot(), None);
}

#[test]
fn sqlite_reload_without_edits_is_idempotent() {
    let conn = open_db_in_memory().unwrap();

    let first = engine_with(SqliteGridStore::new(&conn, "owner-a"), 40_000, 8);
    let derived = first.saved().clone();
    drop(first);

    let (second, report) = UnitGridEngine::initialize(
        SqliteGridStore::new(&conn, "owner-a"),
        GridConfig::standard(),
        40_000,
        8,
    );
    assert_eq!(report.source, GridSource::Persisted);
    assert_eq!(second.saved(), &derived);
}
