//! Unit-of-work runner over one SQLite connection.
//!
//! # Responsibility
//! - Hand a connection context to a composed sequence of store calls.
//! - Scope write sequences to one atomic transaction.
//!
//! # Invariants
//! - `run` is a plain read batch: no snapshot spans the individual reads.
//! - `run_in_transaction` commits only when the work returns `Ok`; any error
//!   rolls every store call of the unit back.
//! - Runners refuse connections that are not fully migrated.

use crate::db::migrations::{current_version, latest_version};
use crate::repo::{table_exists, RepoError, RepoResult};
use log::{debug, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};

const REQUIRED_TABLES: [&str; 6] = [
    "users",
    "follows",
    "articles",
    "tags",
    "article_tags",
    "favorites",
];

/// Executes store call sequences as a read batch or an atomic transaction.
pub trait UnitOfWork {
    /// Runs `work` as a non-transactional read batch.
    fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepoError>;

    /// Runs `work` inside one transaction: all of its writes commit together
    /// or none do.
    fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepoError>;
}

/// Unit-of-work runner borrowing one migrated SQLite connection.
pub struct SqliteUnitOfWork<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUnitOfWork<'conn> {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepoError>,
    {
        work(self.conn)
    }

    fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        match work(&tx) {
            Ok(value) => {
                tx.commit().map_err(RepoError::from)?;
                debug!("event=uow_commit module=repo status=ok");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=uow_rollback module=repo status=error error={}",
                        rollback_err
                    );
                } else {
                    debug!("event=uow_rollback module=repo status=ok");
                }
                Err(err)
            }
        }
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
