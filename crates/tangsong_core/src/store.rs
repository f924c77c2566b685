//! Process-owned handle over the poetry database.
//!
//! # Responsibility
//! - Own the migrated SQLite connection.
//! - Run write units of work inside one transaction committed exactly once.
//!
//! # Invariants
//! - Writes use `BEGIN IMMEDIATE`, so concurrent writers on the same file
//!   serialize at the SQLite level as well.
//! - A failed unit of work is rolled back; previously committed state is
//!   untouched.
//! - Mutating access requires `&mut PoetryStore`.

use crate::db::{open_db, open_db_in_memory, DbResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;

/// Single owner of the poetry database connection.
///
/// Construct one per process and pass it explicitly to the seed loader and
/// the query/mutation services.
pub struct PoetryStore {
    conn: Connection,
}

impl PoetryStore {
    /// Opens (creating when missing) and migrates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a fresh in-memory database. Used by tests and previews.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Read-only view of the connection for snapshot queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `op` inside an immediate transaction and commits once.
    ///
    /// The transaction is rolled back when `op` or the commit fails.
    pub fn write<T, E>(&mut self, op: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
