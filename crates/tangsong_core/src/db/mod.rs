//! SQLite bootstrap for the poetry store.
//!
//! # Responsibility
//! - Open connections with foreign keys, busy timeout and the fold function.
//! - Bring the schema to the latest poetry version before handing it out.
//!
//! # Invariants
//! - Nothing reads or writes catalog rows on a connection that failed
//!   bootstrap.
//! - Every returned connection has the `tangsong_fold` SQL function registered.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{latest_version, poetry_tables, schema_version};
pub use open::{open_db, open_db_in_memory, FOLD_FUNCTION};

pub type DbResult<T> = Result<T, DbError>;

/// Bootstrap failure of a poetry database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Registering the case-fold SQL function failed; search cannot run.
    FoldFunction(rusqlite::Error),
    /// The file was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// `user_version` claims `version` but its `table` is absent.
    MissingTable { version: u32, table: &'static str },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::FoldFunction(err) => {
                write!(f, "cannot register `{FOLD_FUNCTION}` SQL function: {err}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "poetry database schema {db_version} is newer than supported {latest_supported}"
            ),
            Self::MissingTable { version, table } => write!(
                f,
                "poetry database at schema {version} is missing table `{table}`"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::FoldFunction(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::MissingTable { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
