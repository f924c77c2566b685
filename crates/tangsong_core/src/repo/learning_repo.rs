//! Learning record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist per-poem view history and memorization flags.
//! - Provide the bulk-clear primitive used by the learning screen.
//!
//! # Invariants
//! - At most one learning record per poem (`UNIQUE(poem_uuid)`).
//! - `date_viewed` values come from `next_date_viewed`, so they strictly
//!   increase across writes.
//! - Lists are sorted by `date_viewed DESC`.

use crate::model::catalog::PoemId;
use crate::model::user_state::{LearningRecord, LearningRecordId};
use crate::repo::poem_repo::{attach_tags, read_poem_row, POEM_COLUMNS_SQL, POEM_FROM_SQL};
use crate::repo::{
    bool_to_int, count_to_u32, ensure_connection_ready, next_timestamp, parse_bool, parse_uuid,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension};

/// Flat persistence shape of one `learning_records` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningRecordRow {
    pub id: LearningRecordId,
    pub poem_id: PoemId,
    pub date_viewed: i64,
    pub is_memorized: bool,
    pub notes: Option<String>,
}

/// Repository interface for learning record operations.
pub trait LearningRecordRepository {
    fn create_learning_record(&self, record: &LearningRecordRow) -> RepoResult<LearningRecordId>;
    /// Overwrites `date_viewed`, `is_memorized` and `notes` of an existing row.
    fn update_learning_record(&self, record: &LearningRecordRow) -> RepoResult<()>;
    fn get_learning_record_for_poem(&self, poem_id: PoemId)
        -> RepoResult<Option<LearningRecordRow>>;
    /// Lists records with their poems, most recently viewed first.
    fn list_learning_records(&self) -> RepoResult<Vec<LearningRecord>>;
    fn count_learning_records(&self) -> RepoResult<u32>;
    /// Returns a view timestamp later than every stored `date_viewed`.
    fn next_date_viewed(&self) -> RepoResult<i64>;
    fn delete_learning_record(&self, id: LearningRecordId) -> RepoResult<()>;
    /// Deletes every record and returns the number removed.
    fn delete_all_learning_records(&self) -> RepoResult<usize>;
}

/// SQLite-backed learning record repository.
pub struct SqliteLearningRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLearningRecordRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["learning_records", "poems", "authors"])?;
        Ok(Self { conn })
    }
}

impl LearningRecordRepository for SqliteLearningRecordRepository<'_> {
    fn create_learning_record(&self, record: &LearningRecordRow) -> RepoResult<LearningRecordId> {
        self.conn.execute(
            "INSERT INTO learning_records (
                uuid,
                poem_uuid,
                date_viewed,
                is_memorized,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                record.id.to_string(),
                record.poem_id.to_string(),
                record.date_viewed,
                bool_to_int(record.is_memorized),
                record.notes.as_deref(),
            ],
        )?;
        Ok(record.id)
    }

    fn update_learning_record(&self, record: &LearningRecordRow) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE learning_records
             SET
                date_viewed = ?2,
                is_memorized = ?3,
                notes = ?4
             WHERE uuid = ?1;",
            params![
                record.id.to_string(),
                record.date_viewed,
                bool_to_int(record.is_memorized),
                record.notes.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(record.id));
        }
        Ok(())
    }

    fn get_learning_record_for_poem(
        &self,
        poem_id: PoemId,
    ) -> RepoResult<Option<LearningRecordRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT uuid, poem_uuid, date_viewed, is_memorized, notes
                 FROM learning_records
                 WHERE poem_uuid = ?1;",
                [poem_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((uuid, poem_uuid, date_viewed, is_memorized, notes)) = row else {
            return Ok(None);
        };
        Ok(Some(LearningRecordRow {
            id: parse_uuid(&uuid, "learning_records.uuid")?,
            poem_id: parse_uuid(&poem_uuid, "learning_records.poem_uuid")?,
            date_viewed,
            is_memorized: parse_bool(is_memorized, "learning_records.is_memorized")?,
            notes,
        }))
    }

    fn list_learning_records(&self) -> RepoResult<Vec<LearningRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                {POEM_COLUMNS_SQL},
                r.uuid AS record_uuid,
                r.date_viewed AS date_viewed,
                r.is_memorized AS is_memorized,
                r.notes AS notes
             {POEM_FROM_SQL}
             INNER JOIN learning_records r ON r.poem_uuid = p.uuid
             ORDER BY r.date_viewed DESC, r.rowid DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let record_uuid: String = row.get("record_uuid")?;
            records.push(LearningRecord {
                id: parse_uuid(&record_uuid, "learning_records.uuid")?,
                poem: read_poem_row(row)?,
                date_viewed: row.get("date_viewed")?,
                is_memorized: parse_bool(
                    row.get("is_memorized")?,
                    "learning_records.is_memorized",
                )?,
                notes: row.get("notes")?,
            });
        }
        attach_tags(self.conn, records.iter_mut().map(|record| &mut record.poem))?;
        Ok(records)
    }

    fn count_learning_records(&self) -> RepoResult<u32> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM learning_records;", [], |row| row.get(0))?;
        Ok(count_to_u32(count))
    }

    fn next_date_viewed(&self) -> RepoResult<i64> {
        next_timestamp(self.conn, "learning_records", "date_viewed")
    }

    fn delete_learning_record(&self, id: LearningRecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM learning_records WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_all_learning_records(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM learning_records;", [])?;
        Ok(removed)
    }
}
