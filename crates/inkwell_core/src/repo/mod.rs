//! Store contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the article, user and tag store capabilities the article
//!   service composes.
//! - Define the unit-of-work runner that scopes store calls to a read batch
//!   or an atomic transaction.
//! - Isolate SQL details from service/business orchestration.
//!
//! # Invariants
//! - Every store call receives its connection context explicitly; stores
//!   hold no connection or mutable state of their own.
//! - Absence is reported as `Ok(None)` / empty collections, never as an
//!   error.

use crate::db::DbError;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod article_store;
pub mod tag_store;
pub mod unit_of_work;
pub mod user_store;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error shared by all store implementations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Another article already owns this slug.
    SlugTaken(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SlugTaken(slug) => write!(f, "article slug already taken: {slug}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "article stores require schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "article stores require table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::SlugTaken(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
        }
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

/// Bound parameters per statement for bulk inserts and name lookups.
///
/// Kept at SQLite's historical `SQLITE_MAX_VARIABLE_NUMBER` so statements
/// stay valid on builds with the lower limit.
const MAX_BIND_PARAMS: usize = 999;

/// Builds `?, ?, ?` for an `IN (...)` list of `count` values.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Converts integer ids into bind values for `params_from_iter`.
fn id_values(ids: &[i64]) -> Vec<Value> {
    ids.iter().copied().map(Value::Integer).collect()
}

/// Converts a `COUNT(*)` result into a non-negative count.
fn to_count(value: i64, column: &str) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative count `{value}` in {column}")))
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
