//! Poem repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist poems together with their ordered tags.
//! - Answer title/content/author substring search and dynasty/author filters.
//!
//! # Invariants
//! - Poem lists are sorted by `title ASC, uuid ASC`.
//! - Stored `poems.dynasty` equals the owning author's dynasty.
//! - A poem referenced by a favorite or learning record cannot be deleted.

use crate::db::FOLD_FUNCTION;
use crate::model::catalog::{Author, AuthorId, Poem, PoemId};
use crate::repo::{count_to_u32, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;

/// Poem columns joined with the owning author, shared by every poem read.
/// Pair with [`POEM_FROM_SQL`].
pub(crate) const POEM_COLUMNS_SQL: &str = "
    p.uuid AS poem_uuid,
    p.title AS title,
    p.content AS content,
    p.dynasty AS dynasty,
    p.translation AS translation,
    p.analysis AS analysis,
    a.uuid AS author_uuid,
    a.name AS author_name,
    a.dynasty AS author_dynasty,
    a.introduction AS author_introduction";

pub(crate) const POEM_FROM_SQL: &str = "FROM poems p
INNER JOIN authors a ON a.uuid = p.author_uuid";

/// Query options for listing poems. All filters combine with `AND`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoemListQuery {
    /// Case-insensitive substring over title, content and author name.
    pub text: Option<String>,
    /// Exact dynasty match.
    pub dynasty: Option<String>,
    /// Exact owning author match.
    pub author_id: Option<AuthorId>,
    /// Maximum rows to return; `None` means unbounded.
    pub limit: Option<u32>,
}

/// Repository interface for poem operations.
pub trait PoemRepository {
    /// Inserts one poem with its tags and returns its stable id.
    fn create_poem(&self, poem: &Poem) -> RepoResult<PoemId>;
    fn get_poem(&self, id: PoemId) -> RepoResult<Option<Poem>>;
    fn list_poems(&self, query: &PoemListQuery) -> RepoResult<Vec<Poem>>;
    fn count_poems(&self) -> RepoResult<u32>;
    fn count_poems_for_author(&self, author_id: AuthorId) -> RepoResult<u32>;
    /// Distinct poem dynasties sorted ascending.
    fn list_dynasties(&self) -> RepoResult<Vec<String>>;
    /// Deletes one unreferenced poem and its tags.
    fn delete_poem(&self, id: PoemId) -> RepoResult<()>;
}

/// SQLite-backed poem repository.
pub struct SqlitePoemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePoemRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["authors", "poems", "poem_tags", "favorites", "learning_records"],
        )?;
        Ok(Self { conn })
    }
}

impl PoemRepository for SqlitePoemRepository<'_> {
    fn create_poem(&self, poem: &Poem) -> RepoResult<PoemId> {
        poem.validate()?;

        let poem_uuid = poem.id.to_string();
        self.conn.execute(
            "INSERT INTO poems (
                uuid,
                author_uuid,
                title,
                content,
                dynasty,
                translation,
                analysis
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                poem_uuid.as_str(),
                poem.author.id.to_string(),
                poem.title.as_str(),
                poem.content.as_str(),
                poem.dynasty.as_str(),
                poem.translation.as_deref(),
                poem.analysis.as_deref(),
            ],
        )?;

        for (position, tag) in poem.tags.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO poem_tags (poem_uuid, position, tag) VALUES (?1, ?2, ?3);",
                params![poem_uuid.as_str(), position as i64, tag.as_str()],
            )?;
        }

        Ok(poem.id)
    }

    fn get_poem(&self, id: PoemId) -> RepoResult<Option<Poem>> {
        load_poem(self.conn, id)
    }

    fn list_poems(&self, query: &PoemListQuery) -> RepoResult<Vec<Poem>> {
        let mut sql = format!("SELECT {POEM_COLUMNS_SQL} {POEM_FROM_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(needle) = query.text.as_deref().filter(|value| !value.is_empty()) {
            sql.push_str(&format!(
                " AND (
                    instr({FOLD_FUNCTION}(p.title), ?1) > 0
                    OR instr({FOLD_FUNCTION}(p.content), ?1) > 0
                    OR instr({FOLD_FUNCTION}(a.name), ?1) > 0
                )"
            ));
            bind_values.push(Value::Text(needle.to_lowercase()));
        }

        if let Some(dynasty) = query.dynasty.as_ref() {
            sql.push_str(&format!(" AND p.dynasty = ?{}", bind_values.len() + 1));
            bind_values.push(Value::Text(dynasty.clone()));
        }

        if let Some(author_id) = query.author_id {
            sql.push_str(&format!(" AND p.author_uuid = ?{}", bind_values.len() + 1));
            bind_values.push(Value::Text(author_id.to_string()));
        }

        sql.push_str(" ORDER BY p.title ASC, p.uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT ?{}", bind_values.len() + 1));
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut poems = Vec::new();
        while let Some(row) = rows.next()? {
            poems.push(read_poem_row(row)?);
        }
        attach_tags(self.conn, poems.iter_mut())?;
        Ok(poems)
    }

    fn count_poems(&self) -> RepoResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM poems;", [], |row| row.get(0))?;
        Ok(count_to_u32(count))
    }

    fn count_poems_for_author(&self, author_id: AuthorId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM poems WHERE author_uuid = ?1;",
            [author_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count_to_u32(count))
    }

    fn list_dynasties(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT dynasty FROM poems ORDER BY dynasty ASC;")?;
        let mut rows = stmt.query([])?;
        let mut dynasties = Vec::new();
        while let Some(row) = rows.next()? {
            dynasties.push(row.get(0)?);
        }
        Ok(dynasties)
    }

    fn delete_poem(&self, id: PoemId) -> RepoResult<()> {
        let uuid = id.to_string();
        let referenced: i64 = self.conn.query_row(
            "SELECT
                EXISTS(SELECT 1 FROM favorites WHERE poem_uuid = ?1)
                OR EXISTS(SELECT 1 FROM learning_records WHERE poem_uuid = ?1);",
            [uuid.as_str()],
            |row| row.get(0),
        )?;
        if referenced == 1 {
            return Err(RepoError::PoemReferenced(id));
        }

        let changed = self
            .conn
            .execute("DELETE FROM poems WHERE uuid = ?1;", [uuid.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

/// Upper bound of ids bound into one `poem_tags` lookup.
const TAG_BATCH_SIZE: usize = 500;

/// Loads one poem with author and tags.
pub(crate) fn load_poem(conn: &Connection, id: PoemId) -> RepoResult<Option<Poem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POEM_COLUMNS_SQL} {POEM_FROM_SQL} WHERE p.uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut poem = read_poem_row(row)?;
    attach_tags(conn, std::iter::once(&mut poem))?;
    Ok(Some(poem))
}

/// Decodes the `POEM_COLUMNS_SQL` part of a row. Tags are left empty; fill
/// them with [`attach_tags`] once the whole list is read.
pub(crate) fn read_poem_row(row: &Row<'_>) -> RepoResult<Poem> {
    let poem_uuid_text: String = row.get("poem_uuid")?;
    let author_uuid_text: String = row.get("author_uuid")?;

    let author = Author {
        id: parse_uuid(&author_uuid_text, "authors.uuid")?,
        name: row.get("author_name")?,
        dynasty: row.get("author_dynasty")?,
        introduction: row.get("author_introduction")?,
    };

    Ok(Poem {
        id: parse_uuid(&poem_uuid_text, "poems.uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        dynasty: row.get("dynasty")?,
        translation: row.get("translation")?,
        analysis: row.get("analysis")?,
        tags: Vec::new(),
        author,
    })
}

/// Loads the ordered tags of every poem in `poems` with one query per
/// `TAG_BATCH_SIZE` poems.
pub(crate) fn attach_tags<'a>(
    conn: &Connection,
    poems: impl IntoIterator<Item = &'a mut Poem>,
) -> RepoResult<()> {
    let mut poems = poems.into_iter().collect::<Vec<_>>();
    let ids = poems
        .iter()
        .map(|poem| poem.id.to_string())
        .collect::<Vec<_>>();

    let mut tags_by_poem: HashMap<String, Vec<String>> = HashMap::new();
    for batch in ids.chunks(TAG_BATCH_SIZE) {
        let placeholders = vec!["?"; batch.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT poem_uuid, tag
             FROM poem_tags
             WHERE poem_uuid IN ({placeholders})
             ORDER BY poem_uuid ASC, position ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(batch.iter()))?;
        while let Some(row) = rows.next()? {
            tags_by_poem
                .entry(row.get(0)?)
                .or_default()
                .push(row.get(1)?);
        }
    }

    for (poem, id) in poems.iter_mut().zip(&ids) {
        poem.tags = tags_by_poem.remove(id).unwrap_or_default();
    }
    Ok(())
}
