//! Read-side use-case service.
//!
//! # Responsibility
//! - Answer every read the presentation layer needs: search, dynasty and
//!   author filters, favorites, learning history.
//!
//! # Invariants
//! - Poem lists are sorted by title ascending; favorites by `date_added`
//!   descending; learning records by `date_viewed` descending.
//! - Storage failures never escape: they are logged and degrade to an empty
//!   list, `None`, `false` or `0`.
//! - Search text is never logged, only its length.

use crate::model::catalog::{Author, AuthorId, Poem, PoemId};
use crate::model::user_state::LearningRecord;
use crate::repo::author_repo::{AuthorRepository, SqliteAuthorRepository};
use crate::repo::favorite_repo::{FavoriteRepository, SqliteFavoriteRepository};
use crate::repo::learning_repo::{LearningRecordRepository, SqliteLearningRecordRepository};
use crate::repo::poem_repo::{PoemListQuery, PoemRepository, SqlitePoemRepository};
use crate::repo::RepoResult;
use crate::store::PoetryStore;
use log::error;

/// Default maximum number of poems returned by [`QueryService::search_poems`].
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Read-only facade over a [`PoetryStore`].
pub struct QueryService<'store> {
    store: &'store PoetryStore,
}

impl<'store> QueryService<'store> {
    pub fn new(store: &'store PoetryStore) -> Self {
        Self { store }
    }

    /// Searches poems by case-insensitive substring of title, content or
    /// author name.
    ///
    /// A missing or empty query lists the first `limit` poems by title.
    pub fn search_poems(&self, query: Option<&str>, limit: u32) -> Vec<Poem> {
        let text = normalize_query(query);
        let query_len = text.as_deref().map_or(0, |value| value.chars().count());
        let list_query = PoemListQuery {
            text,
            limit: Some(limit),
            ..PoemListQuery::default()
        };
        self.poem_list(&list_query).unwrap_or_else(|err| {
            error!(
                "event=search_poems module=query status=error query_len={} limit={} error={}",
                query_len, limit, err
            );
            Vec::new()
        })
    }

    /// Searches authors by case-insensitive name substring, sorted by name.
    pub fn search_authors(&self, query: Option<&str>) -> Vec<Author> {
        let text = normalize_query(query);
        SqliteAuthorRepository::try_new(self.store.connection())
            .and_then(|repo| repo.list_authors(text.as_deref()))
            .unwrap_or_else(|err| {
                error!("event=search_authors module=query status=error error={err}");
                Vec::new()
            })
    }

    /// Lists poems of one dynasty (exact match), sorted by title.
    pub fn poems_by_dynasty(&self, dynasty: &str) -> Vec<Poem> {
        let list_query = PoemListQuery {
            dynasty: Some(dynasty.to_string()),
            ..PoemListQuery::default()
        };
        self.poem_list(&list_query).unwrap_or_else(|err| {
            error!("event=poems_by_dynasty module=query status=error error={err}");
            Vec::new()
        })
    }

    /// Lists poems owned by `author`, sorted by title.
    pub fn poems_by_author(&self, author: &Author) -> Vec<Poem> {
        let list_query = PoemListQuery {
            author_id: Some(author.id),
            ..PoemListQuery::default()
        };
        self.poem_list(&list_query).unwrap_or_else(|err| {
            error!(
                "event=poems_by_author module=query status=error author_id={} error={}",
                author.id, err
            );
            Vec::new()
        })
    }

    /// Lists favorited poems, most recently favorited first.
    pub fn favorites(&self) -> Vec<Poem> {
        SqliteFavoriteRepository::try_new(self.store.connection())
            .and_then(|repo| repo.list_favorite_poems())
            .unwrap_or_else(|err| {
                error!("event=favorites module=query status=error error={err}");
                Vec::new()
            })
    }

    /// Lists learning records, most recently viewed first.
    pub fn learning_records(&self) -> Vec<LearningRecord> {
        SqliteLearningRecordRepository::try_new(self.store.connection())
            .and_then(|repo| repo.list_learning_records())
            .unwrap_or_else(|err| {
                error!("event=learning_records module=query status=error error={err}");
                Vec::new()
            })
    }

    /// Returns whether a favorite references `poem`.
    pub fn is_favorite(&self, poem: &Poem) -> bool {
        SqliteFavoriteRepository::try_new(self.store.connection())
            .and_then(|repo| repo.count_favorites_for_poem(poem.id))
            .map(|count| count > 0)
            .unwrap_or_else(|err| {
                error!(
                    "event=is_favorite module=query status=error poem_id={} error={}",
                    poem.id, err
                );
                false
            })
    }

    /// Loads one poem by id.
    pub fn poem(&self, id: PoemId) -> Option<Poem> {
        SqlitePoemRepository::try_new(self.store.connection())
            .and_then(|repo| repo.get_poem(id))
            .unwrap_or_else(|err| {
                error!("event=poem module=query status=error poem_id={id} error={err}");
                None
            })
    }

    /// Loads one author by id.
    pub fn author(&self, id: AuthorId) -> Option<Author> {
        SqliteAuthorRepository::try_new(self.store.connection())
            .and_then(|repo| repo.get_author(id))
            .unwrap_or_else(|err| {
                error!("event=author module=query status=error author_id={id} error={err}");
                None
            })
    }

    /// Distinct dynasties present in the catalog, sorted.
    pub fn dynasties(&self) -> Vec<String> {
        SqlitePoemRepository::try_new(self.store.connection())
            .and_then(|repo| repo.list_dynasties())
            .unwrap_or_else(|err| {
                error!("event=dynasties module=query status=error error={err}");
                Vec::new()
            })
    }

    /// Number of poems owned by `author`.
    pub fn author_poem_count(&self, author: &Author) -> u32 {
        SqlitePoemRepository::try_new(self.store.connection())
            .and_then(|repo| repo.count_poems_for_author(author.id))
            .unwrap_or_else(|err| {
                error!(
                    "event=author_poem_count module=query status=error author_id={} error={}",
                    author.id, err
                );
                0
            })
    }

    /// Learning record of `poem`, if it was ever viewed.
    pub fn learning_record_for(&self, poem: &Poem) -> Option<LearningRecord> {
        let found = SqliteLearningRecordRepository::try_new(self.store.connection())
            .and_then(|repo| repo.get_learning_record_for_poem(poem.id));
        match found {
            Ok(row) => row.map(|row| LearningRecord {
                id: row.id,
                poem: poem.clone(),
                date_viewed: row.date_viewed,
                is_memorized: row.is_memorized,
                notes: row.notes,
            }),
            Err(err) => {
                error!(
                    "event=learning_record_for module=query status=error poem_id={} error={}",
                    poem.id, err
                );
                None
            }
        }
    }

    fn poem_list(&self, query: &PoemListQuery) -> RepoResult<Vec<Poem>> {
        SqlitePoemRepository::try_new(self.store.connection())?.list_poems(query)
    }
}

/// Empty input means "no filter"; anything else is matched literally,
/// whitespace included.
pub fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::normalize_query;

    #[test]
    fn empty_queries_mean_no_filter() {
        assert_eq!(normalize_query(None), None);
        assert_eq!(normalize_query(Some("")), None);
    }

    #[test]
    fn whitespace_is_kept_verbatim() {
        assert_eq!(normalize_query(Some(" ")).as_deref(), Some(" "));
        assert_eq!(normalize_query(Some(" 明月 ")).as_deref(), Some(" 明月 "));
    }
}
