//! Savings goal repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist per-owner target and saved amounts in `savings_goals`.
//!
//! # Invariants
//! - Writes validate the record (or the single field) before SQL runs.
//! - Updates against a missing owner return `NotFound`, never insert.

use crate::db::DbError;
use crate::model::goal::{GoalValidationError, SavingsGoal};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Goal persistence and query failure.
#[derive(Debug)]
pub enum RepoError {
    Validation(GoalValidationError),
    Db(DbError),
    NotFound(String),
    AlreadyExists(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(owner_id) => write!(f, "savings goal not found for owner: {owner_id}"),
            Self::AlreadyExists(owner_id) => {
                write!(f, "savings goal already exists for owner: {owner_id}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted goal data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::AlreadyExists(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<GoalValidationError> for RepoError {
    fn from(value: GoalValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for savings goals keyed by owner id.
pub trait GoalRepository {
    fn get_goal(&self, owner_id: &str) -> RepoResult<Option<SavingsGoal>>;
    fn create_goal(&self, goal: &SavingsGoal) -> RepoResult<()>;
    fn update_target_amount(&self, owner_id: &str, target_amount: i64) -> RepoResult<()>;
    fn update_saved_amount(&self, owner_id: &str, saved_amount: i64) -> RepoResult<()>;
    fn reset_saved_amount(&self, owner_id: &str) -> RepoResult<()> {
        self.update_saved_amount(owner_id, 0)
    }
}

impl<R: GoalRepository + ?Sized> GoalRepository for &R {
    fn get_goal(&self, owner_id: &str) -> RepoResult<Option<SavingsGoal>> {
        (**self).get_goal(owner_id)
    }

    fn create_goal(&self, goal: &SavingsGoal) -> RepoResult<()> {
        (**self).create_goal(goal)
    }

    fn update_target_amount(&self, owner_id: &str, target_amount: i64) -> RepoResult<()> {
        (**self).update_target_amount(owner_id, target_amount)
    }

    fn update_saved_amount(&self, owner_id: &str, saved_amount: i64) -> RepoResult<()> {
        (**self).update_saved_amount(owner_id, saved_amount)
    }

    fn reset_saved_amount(&self, owner_id: &str) -> RepoResult<()> {
        (**self).reset_saved_amount(owner_id)
    }
}

/// SQLite-backed goal repository.
pub struct SqliteGoalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGoalRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl GoalRepository for SqliteGoalRepository<'_> {
    fn get_goal(&self, owner_id: &str) -> RepoResult<Option<SavingsGoal>> {
        let goal = self
            .conn
            .query_row(
                "SELECT owner_id, target_amount, saved_amount
                 FROM savings_goals
                 WHERE owner_id = ?1;",
                [owner_id],
                parse_goal_row,
            )
            .optional()?;

        match goal {
            Some(goal) => {
                goal.validate()
                    .map_err(|err| RepoError::InvalidData(err.to_string()))?;
                Ok(Some(goal))
            }
            None => Ok(None),
        }
    }

    fn create_goal(&self, goal: &SavingsGoal) -> RepoResult<()> {
        goal.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO savings_goals (owner_id, target_amount, saved_amount)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_id) DO NOTHING;",
            params![goal.owner_id.as_str(), goal.target_amount, goal.saved_amount],
        )?;

        if inserted == 0 {
            return Err(RepoError::AlreadyExists(goal.owner_id.clone()));
        }
        Ok(())
    }

    fn update_target_amount(&self, owner_id: &str, target_amount: i64) -> RepoResult<()> {
        if target_amount <= 0 {
            return Err(GoalValidationError::NonPositiveTarget(target_amount).into());
        }
        self.update_column(owner_id, "target_amount", target_amount)
    }

    fn update_saved_amount(&self, owner_id: &str, saved_amount: i64) -> RepoResult<()> {
        if saved_amount < 0 {
            return Err(GoalValidationError::NegativeSavedAmount(saved_amount).into());
        }
        self.update_column(owner_id, "saved_amount", saved_amount)
    }
}

impl SqliteGoalRepository<'_> {
    fn update_column(&self, owner_id: &str, column: &'static str, value: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE savings_goals
                 SET
                    {column} = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE owner_id = ?2;"
            ),
            params![value, owner_id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(owner_id.to_string()));
        }
        Ok(())
    }
}

fn parse_goal_row(row: &Row<'_>) -> rusqlite::Result<SavingsGoal> {
    Ok(SavingsGoal {
        owner_id: row.get("owner_id")?,
        target_amount: row.get("target_amount")?,
        saved_amount: row.get("saved_amount")?,
    })
}
