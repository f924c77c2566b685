//! Poetry schema migrations.
//!
//! # Responsibility
//! - List the catalog and user-state schema steps in version order.
//! - Apply pending steps in one transaction and verify the resulting tables.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied step.
//! - After a successful run every table declared by a step up to that
//!   version exists; otherwise nothing is committed.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
    /// Tables this step creates.
    tables: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "catalog",
        sql: include_str!("0001_catalog.sql"),
        tables: &["authors", "poems", "poem_tags"],
    },
    Migration {
        version: 2,
        name: "user_state",
        sql: include_str!("0002_user_state.sql"),
        tables: &["favorites", "learning_records"],
    },
];

/// Returns the latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Every table the latest schema provides, catalog first.
pub fn poetry_tables() -> impl Iterator<Item = &'static str> {
    MIGRATIONS
        .iter()
        .flat_map(|migration| migration.tables.iter().copied())
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Brings `conn` to [`latest_version`] and checks the poetry tables.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    verify_tables(&tx)?;
    tx.commit()?;
    Ok(())
}

fn verify_tables(conn: &Connection) -> DbResult<()> {
    for migration in MIGRATIONS {
        for &table in migration.tables {
            let exists: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
                [table],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(DbError::MissingTable {
                    version: migration.version,
                    table,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, poetry_tables, MIGRATIONS};

    #[test]
    fn versions_are_strictly_increasing_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
            assert!(!migration.tables.is_empty());
        }
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn poetry_tables_cover_catalog_and_user_state() {
        let tables = poetry_tables().collect::<Vec<_>>();
        assert_eq!(
            tables,
            vec!["authors", "poems", "poem_tags", "favorites", "learning_records"]
        );
    }
}
