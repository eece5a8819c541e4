//! Grid persistence contract plus SQLite and in-memory stores.
//!
//! # Responsibility
//! - Load, save and clear one owner's grid snapshot.
//! - Hide whether the snapshot lives locally or in a synced database.
//!
//! # Invariants
//! - `save` followed by `load` returns an equal grid.
//! - A stored payload that is not a JSON bool array is `InvalidData`.

use crate::db::DbError;
use crate::model::grid::UnitGrid;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Grid persistence failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidData(String),
    /// Backend could not be reached or timed out.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted grid data: {message}"),
            Self::Unavailable(message) => write!(f, "grid store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence seam for one grid snapshot.
pub trait GridStore {
    /// Returns the stored grid, or `None` when nothing was saved yet.
    fn load(&self) -> StoreResult<Option<UnitGrid>>;
    fn save(&self, grid: &UnitGrid) -> StoreResult<()>;
    /// Erases the stored grid. Clearing an absent grid succeeds.
    fn clear(&self) -> StoreResult<()>;
}

impl<S: GridStore + ?Sized> GridStore for &S {
    fn load(&self) -> StoreResult<Option<UnitGrid>> {
        (**self).load()
    }

    fn save(&self, grid: &UnitGrid) -> StoreResult<()> {
        (**self).save(grid)
    }

    fn clear(&self) -> StoreResult<()> {
        (**self).clear()
    }
}

/// SQLite-backed grid store, one row per owner in `unit_grids`.
pub struct SqliteGridStore<'conn> {
    conn: &'conn Connection,
    owner_id: String,
}

impl<'conn> SqliteGridStore<'conn> {
    pub fn new(conn: &'conn Connection, owner_id: impl Into<String>) -> Self {
        Self {
            conn,
            owner_id: owner_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl GridStore for SqliteGridStore<'_> {
    fn load(&self) -> StoreResult<Option<UnitGrid>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT units FROM unit_grids WHERE owner_id = ?1;",
                [self.owner_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        payload.map(|text| decode_grid(&text)).transpose()
    }

    fn save(&self, grid: &UnitGrid) -> StoreResult<()> {
        let payload = serde_json::to_string(grid)
            .map_err(|err| StoreError::InvalidData(format!("failed to encode grid: {err}")))?;

        self.conn.execute(
            "INSERT INTO unit_grids (owner_id, units) VALUES (?1, ?2)
             ON CONFLICT(owner_id) DO UPDATE SET
                units = excluded.units,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![self.owner_id.as_str(), payload],
        )?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM unit_grids WHERE owner_id = ?1;",
            [self.owner_id.as_str()],
        )?;
        Ok(())
    }
}

fn decode_grid(text: &str) -> StoreResult<UnitGrid> {
    serde_json::from_str(text)
        .map_err(|err| StoreError::InvalidData(format!("unit_grids.units is not a bool array: {err}")))
}

/// Local-only store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryGridStore {
    grid: RefCell<Option<UnitGrid>>,
    saves: Cell<usize>,
}

impl MemoryGridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `grid`.
    pub fn with_grid(grid: UnitGrid) -> Self {
        Self {
            grid: RefCell::new(Some(grid)),
            saves: Cell::new(0),
        }
    }

    /// Returns a copy of the stored grid.
    pub fn snapshot(&self) -> Option<UnitGrid> {
        self.grid.borrow().clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl GridStore for MemoryGridStore {
    fn load(&self) -> StoreResult<Option<UnitGrid>> {
        Ok(self.snapshot())
    }

    fn save(&self, grid: &UnitGrid) -> StoreResult<()> {
        *self.grid.borrow_mut() = Some(grid.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.grid.borrow_mut().take();
        Ok(())
    }
}
