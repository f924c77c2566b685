//! First-run catalog bootstrap.
//!
//! # Responsibility
//! - Import the bundled poem dataset into an empty store exactly once.
//! - Deduplicate authors by `(name, dynasty)`; missing, `null` or blank
//!   author names import as `佚名`.
//!
//! # Invariants
//! - The whole import is one transaction: the store is either fully seeded
//!   or left empty.
//! - Calling `ensure_seeded` on a non-empty store is a no-op.
//! - Failures are logged and reported through `SeedReport::Failed`; this
//!   module never panics and never returns an error to the caller.

use crate::model::catalog::Poem;
use crate::model::seed::{parse_seed_json, SeedPoem};
use crate::repo::author_repo::{AuthorRepository, SqliteAuthorRepository};
use crate::repo::poem_repo::{PoemRepository, SqlitePoemRepository};
use crate::repo::RepoError;
use crate::store::PoetryStore;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

/// Dataset compiled into the crate.
pub const BUNDLED_POEMS_JSON: &str = include_str!("../../data/poems.json");

/// Where seed records are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    /// The dataset shipped inside the crate.
    Bundled,
    /// A JSON file on disk.
    File(PathBuf),
    /// Inline JSON text.
    Json(String),
}

/// Outcome of one `ensure_seeded` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedReport {
    /// Poems already exist; nothing was imported.
    AlreadySeeded,
    /// Import committed.
    Seeded { poems: u32, authors: u32 },
    /// Import aborted; the store was left empty.
    Failed { reason: String },
}

/// Seeding error, surfaced only through `SeedReport::Failed`.
#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// Record at `index` (0-based) violates a poem invariant.
    InvalidRecord { index: usize, reason: String },
    Repo(RepoError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read seed data: {err}"),
            Self::Parse(err) => write!(f, "malformed seed data: {err}"),
            Self::InvalidRecord { index, reason } => {
                write!(f, "invalid seed record #{index}: {reason}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::InvalidRecord { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SeedError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for SeedError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Seeds the store from `source` when it holds no poems.
pub fn ensure_seeded(store: &mut PoetryStore, source: &SeedSource) -> SeedReport {
    let started_at = Instant::now();
    info!("event=seed module=seed status=start");

    match try_seed(store, source) {
        Ok(Some((poems, authors))) => {
            info!(
                "event=seed module=seed status=ok poems={} authors={} duration_ms={}",
                poems,
                authors,
                started_at.elapsed().as_millis()
            );
            SeedReport::Seeded { poems, authors }
        }
        Ok(None) => {
            info!("event=seed module=seed status=skipped reason=already_seeded");
            SeedReport::AlreadySeeded
        }
        Err(err) => {
            error!(
                "event=seed module=seed status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            SeedReport::Failed {
                reason: err.to_string(),
            }
        }
    }
}

fn try_seed(
    store: &mut PoetryStore,
    source: &SeedSource,
) -> Result<Option<(u32, u32)>, SeedError> {
    if has_poems(store.connection())? {
        return Ok(None);
    }

    let records = load_records(source)?;
    validate_records(&records)?;

    store.write(|tx| -> Result<Option<(u32, u32)>, SeedError> {
        // Re-checked under the write lock so two racing loaders cannot both
        // import.
        if has_poems(tx)? {
            return Ok(None);
        }

        let authors = SqliteAuthorRepository::try_new(tx)?;
        let poems = SqlitePoemRepository::try_new(tx)?;
        for record in &records {
            let author =
                authors.find_or_create_author(record.author_name(), record.dynasty_name())?;
            let mut poem = Poem::new(&author, record.title.trim(), record.content.as_str());
            poem.translation = non_blank(record.translation.as_deref());
            poem.analysis = non_blank(record.analysis.as_deref());
            poem.tags = record
                .tags
                .iter()
                .flatten()
                .filter_map(|tag| non_blank(Some(tag.as_str())))
                .collect();
            poems.create_poem(&poem)?;
        }

        Ok(Some((poems.count_poems()?, authors.count_authors()?)))
    })
}

fn has_poems(conn: &rusqlite::Connection) -> Result<bool, SeedError> {
    let poems = SqlitePoemRepository::try_new(conn)?;
    Ok(poems.count_poems()? > 0)
}

fn load_records(source: &SeedSource) -> Result<Vec<SeedPoem>, SeedError> {
    let parsed = match source {
        SeedSource::Bundled => parse_seed_json(BUNDLED_POEMS_JSON),
        SeedSource::Json(json) => parse_seed_json(json),
        SeedSource::File(path) => {
            let json = std::fs::read_to_string(path).map_err(SeedError::Io)?;
            parse_seed_json(&json)
        }
    };
    parsed.map_err(SeedError::Parse)
}

fn validate_records(records: &[SeedPoem]) -> Result<(), SeedError> {
    for (index, record) in records.iter().enumerate() {
        if record.title.trim().is_empty() {
            return Err(SeedError::InvalidRecord {
                index,
                reason: "title is blank".to_string(),
            });
        }
        if record.content.trim().is_empty() {
            return Err(SeedError::InvalidRecord {
                index,
                reason: "content is blank".to_string(),
            });
        }
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{parse_seed_json, validate_records, SeedError, BUNDLED_POEMS_JSON};

    #[test]
    fn bundled_dataset_parses_and_validates() {
        let records = parse_seed_json(BUNDLED_POEMS_JSON).unwrap();
        assert!(!records.is_empty());
        validate_records(&records).unwrap();
    }

    #[test]
    fn blank_content_is_reported_with_index() {
        let records = parse_seed_json(
            r#"[{"title":"a","content":"x"},{"title":"b","content":"   "}]"#,
        )
        .unwrap();
        let err = validate_records(&records).unwrap_err();
        assert!(matches!(err, SeedError::InvalidRecord { index: 1, .. }));
    }
}
