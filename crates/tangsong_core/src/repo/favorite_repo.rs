//! Favorite repository contracts and SQLite implementation.
//!
//! # Invariants
//! - At most one favorite row per poem (`UNIQUE(poem_uuid)`).
//! - Favorite lists are sorted by `date_added DESC`, newest insert first on
//!   ties.

use crate::model::catalog::{Poem, PoemId};
use crate::model::user_state::{Favorite, FavoriteId};
use crate::repo::poem_repo::{attach_tags, read_poem_row, POEM_COLUMNS_SQL, POEM_FROM_SQL};
use crate::repo::{
    count_to_u32, ensure_connection_ready, next_timestamp, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Repository interface for favorite operations.
pub trait FavoriteRepository {
    /// Inserts a favorite for `poem_id` stamped with the next `date_added`.
    fn create_favorite(&self, poem_id: PoemId) -> RepoResult<Favorite>;
    fn get_favorite_for_poem(&self, poem_id: PoemId) -> RepoResult<Option<Favorite>>;
    fn count_favorites_for_poem(&self, poem_id: PoemId) -> RepoResult<u32>;
    /// Lists favorite rows, newest first.
    fn list_favorites(&self) -> RepoResult<Vec<Favorite>>;
    /// Lists favorited poems, most recently favorited first.
    fn list_favorite_poems(&self) -> RepoResult<Vec<Poem>>;
    fn delete_favorite(&self, id: FavoriteId) -> RepoResult<()>;
}

/// SQLite-backed favorite repository.
pub struct SqliteFavoriteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFavoriteRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["favorites", "poems", "authors"])?;
        Ok(Self { conn })
    }
}

impl FavoriteRepository for SqliteFavoriteRepository<'_> {
    fn create_favorite(&self, poem_id: PoemId) -> RepoResult<Favorite> {
        let favorite = Favorite {
            id: Uuid::new_v4(),
            poem_id,
            date_added: next_timestamp(self.conn, "favorites", "date_added")?,
        };
        self.conn.execute(
            "INSERT INTO favorites (uuid, poem_uuid, date_added) VALUES (?1, ?2, ?3);",
            params![
                favorite.id.to_string(),
                poem_id.to_string(),
                favorite.date_added,
            ],
        )?;
        Ok(favorite)
    }

    fn get_favorite_for_poem(&self, poem_id: PoemId) -> RepoResult<Option<Favorite>> {
        let row = self
            .conn
            .query_row(
                "SELECT uuid, poem_uuid, date_added FROM favorites WHERE poem_uuid = ?1;",
                [poem_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(into_favorite).transpose()
    }

    fn count_favorites_for_poem(&self, poem_id: PoemId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE poem_uuid = ?1;",
            [poem_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count_to_u32(count))
    }

    fn list_favorites(&self) -> RepoResult<Vec<Favorite>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, poem_uuid, date_added
             FROM favorites
             ORDER BY date_added DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut favorites = Vec::new();
        while let Some(row) = rows.next()? {
            favorites.push(into_favorite((row.get(0)?, row.get(1)?, row.get(2)?))?);
        }
        Ok(favorites)
    }

    fn list_favorite_poems(&self) -> RepoResult<Vec<Poem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POEM_COLUMNS_SQL}
             {POEM_FROM_SQL}
             INNER JOIN favorites f ON f.poem_uuid = p.uuid
             ORDER BY f.date_added DESC, f.rowid DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut poems = Vec::new();
        while let Some(row) = rows.next()? {
            poems.push(read_poem_row(row)?);
        }
        attach_tags(self.conn, poems.iter_mut())?;
        Ok(poems)
    }

    fn delete_favorite(&self, id: FavoriteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM favorites WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn into_favorite((uuid, poem_uuid, date_added): (String, String, i64)) -> RepoResult<Favorite> {
    Ok(Favorite {
        id: parse_uuid(&uuid, "favorites.uuid")?,
        poem_id: parse_uuid(&poem_uuid, "favorites.poem_uuid")?,
        date_added,
    })
}
