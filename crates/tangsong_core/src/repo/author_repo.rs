//! Author repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist and query authors.
//! - Provide the find-or-create lookup used by seeding.
//!
//! # Invariants
//! - `(name, dynasty)` is unique; `find_or_create_author` never inserts a
//!   second row for an existing pair.
//! - Authors listing is deterministic: `name ASC, uuid ASC`.
//! - An author with poems cannot be deleted.

use crate::db::FOLD_FUNCTION;
use crate::model::catalog::{Author, AuthorId};
use crate::repo::{count_to_u32, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const AUTHOR_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    dynasty,
    introduction
FROM authors";

/// Repository interface for author operations.
pub trait AuthorRepository {
    /// Inserts one author and returns its stable id.
    fn create_author(&self, author: &Author) -> RepoResult<AuthorId>;
    /// Loads one author by id.
    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>>;
    /// Exact `(name, dynasty)` lookup.
    fn find_author(&self, name: &str, dynasty: &str) -> RepoResult<Option<Author>>;
    /// Returns the existing `(name, dynasty)` author or inserts a new one.
    ///
    /// Atomic only when the connection is inside a write transaction.
    fn find_or_create_author(&self, name: &str, dynasty: &str) -> RepoResult<Author>;
    /// Lists authors whose name contains `name_filter` (case-insensitive).
    fn list_authors(&self, name_filter: Option<&str>) -> RepoResult<Vec<Author>>;
    fn count_authors(&self) -> RepoResult<u32>;
    /// Deletes one author that owns no poems.
    fn delete_author(&self, id: AuthorId) -> RepoResult<()>;
}

/// SQLite-backed author repository.
pub struct SqliteAuthorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuthorRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["authors", "poems"])?;
        Ok(Self { conn })
    }
}

impl AuthorRepository for SqliteAuthorRepository<'_> {
    fn create_author(&self, author: &Author) -> RepoResult<AuthorId> {
        self.conn.execute(
            "INSERT INTO authors (uuid, name, dynasty, introduction)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                author.id.to_string(),
                author.name.as_str(),
                author.dynasty.as_str(),
                author.introduction.as_deref(),
            ],
        )?;
        Ok(author.id)
    }

    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>> {
        let row = self
            .conn
            .query_row(
                &format!("{AUTHOR_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                read_author_columns,
            )
            .optional()?;
        row.map(into_author).transpose()
    }

    fn find_author(&self, name: &str, dynasty: &str) -> RepoResult<Option<Author>> {
        let row = self
            .conn
            .query_row(
                &format!("{AUTHOR_SELECT_SQL} WHERE name = ?1 AND dynasty = ?2;"),
                params![name, dynasty],
                read_author_columns,
            )
            .optional()?;
        row.map(into_author).transpose()
    }

    fn find_or_create_author(&self, name: &str, dynasty: &str) -> RepoResult<Author> {
        if let Some(existing) = self.find_author(name, dynasty)? {
            return Ok(existing);
        }

        let author = Author::new(name, dynasty);
        self.create_author(&author)?;
        Ok(author)
    }

    fn list_authors(&self, name_filter: Option<&str>) -> RepoResult<Vec<Author>> {
        let mut sql = format!("{AUTHOR_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(needle) = name_filter.filter(|value| !value.is_empty()) {
            sql.push_str(&format!(" AND instr({FOLD_FUNCTION}(name), ?) > 0"));
            bind_values.push(Value::Text(needle.to_lowercase()));
        }

        sql.push_str(" ORDER BY name ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut authors = Vec::new();
        while let Some(row) = rows.next()? {
            authors.push(into_author(read_author_columns(row)?)?);
        }
        Ok(authors)
    }

    fn count_authors(&self) -> RepoResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM authors;", [], |row| row.get(0))?;
        Ok(count_to_u32(count))
    }

    fn delete_author(&self, id: AuthorId) -> RepoResult<()> {
        let owns_poems: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM poems WHERE author_uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if owns_poems == 1 {
            return Err(RepoError::AuthorReferenced(id));
        }

        let changed = self
            .conn
            .execute("DELETE FROM authors WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

type AuthorColumns = (String, String, String, Option<String>);

fn read_author_columns(row: &Row<'_>) -> rusqlite::Result<AuthorColumns> {
    Ok((
        row.get("uuid")?,
        row.get("name")?,
        row.get("dynasty")?,
        row.get("introduction")?,
    ))
}

fn into_author((uuid, name, dynasty, introduction): AuthorColumns) -> RepoResult<Author> {
    Ok(Author {
        id: parse_uuid(&uuid, "authors.uuid")?,
        name,
        dynasty,
        introduction,
    })
}
