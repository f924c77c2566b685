//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the poetry query/mutation use cases to Dart via FRB.
//! - Own the process-wide store handle the UI binding requires.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call takes the store lock, so commits are single-writer.
//! - Ids cross the boundary as strings; unknown or malformed ids degrade to
//!   empty lists / `false` / `None`, never to an error.

use log::warn;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tangsong_core::{
    core_version as core_version_inner, ensure_seeded, init_logging as init_logging_inner,
    ping as ping_inner, Author, LearningRecord, MutationService, Poem, PoetryStore, QueryService,
    SeedReport, SeedSource, DEFAULT_SEARCH_LIMIT,
};
use uuid::Uuid;

const STORE_DB_FILE_NAME: &str = "tangsong.sqlite3";
const STORE_DB_PATH_ENV: &str = "TANGSONG_DB_PATH";

static STORE: OnceCell<StoreHandle> = OnceCell::new();

struct StoreHandle {
    path: PathBuf,
    store: Mutex<PoetryStore>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Opens the process-wide store and seeds it from the bundled dataset.
///
/// Input semantics:
/// - `db_path`: SQLite file path. Blank falls back to `TANGSONG_DB_PATH`,
///   then to `<temp_dir>/tangsong.sqlite3`.
///
/// # FFI contract
/// - Sync call; runs migrations and, on first launch, the seed import.
/// - Repeated calls with the same path are no-ops apart from retrying a
///   previously failed seed.
/// - Opening a different path once a store is open returns error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn open_store(db_path: String) -> String {
    let path = resolve_db_path(&db_path, std::env::var(STORE_DB_PATH_ENV).ok());
    let handle = match STORE.get_or_try_init(|| -> Result<StoreHandle, String> {
        let store = PoetryStore::open(&path).map_err(|err| format!("store open failed: {err}"))?;
        Ok(StoreHandle {
            path: path.clone(),
            store: Mutex::new(store),
        })
    }) {
        Ok(handle) => handle,
        Err(err) => return err,
    };

    if handle.path != path {
        return format!(
            "store already open at `{}`; refusing to switch to `{}`",
            handle.path.display(),
            path.display()
        );
    }

    let mut store = handle.store.lock().unwrap_or_else(PoisonError::into_inner);
    match ensure_seeded(&mut store, &SeedSource::Bundled) {
        SeedReport::AlreadySeeded | SeedReport::Seeded { .. } => String::new(),
        SeedReport::Failed { reason } => format!("seeding failed: {reason}"),
    }
}

/// Author projection returned to Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorItem {
    /// Stable author ID in string form.
    pub author_id: String,
    pub name: String,
    pub dynasty: String,
    pub introduction: Option<String>,
}

/// Poem projection returned to Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoemItem {
    /// Stable poem ID in string form.
    pub poem_id: String,
    pub title: String,
    /// Verse lines separated by `\n`.
    pub content: String,
    pub dynasty: String,
    pub translation: Option<String>,
    pub analysis: Option<String>,
    pub tags: Vec<String>,
    pub author: AuthorItem,
}

/// Learning-history row returned to Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningRecordItem {
    pub record_id: String,
    pub poem: PoemItem,
    /// Last view time in epoch milliseconds.
    pub date_viewed_ms: i64,
    pub is_memorized: bool,
    pub notes: Option<String>,
}

/// Searches poems by title, content or author name.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Empty `query` lists poems by title; other input is matched verbatim.
/// - `limit` of `None` or `0` applies the default limit.
/// - Never panics; returns an empty list when the store is not open.
#[flutter_rust_bridge::frb(sync)]
pub fn search_poems(query: String, limit: Option<u32>) -> Vec<PoemItem> {
    let limit = normalize_search_limit(limit);
    with_store("search_poems", Vec::new(), |store| {
        QueryService::new(store)
            .search_poems(Some(query.as_str()), limit)
            .into_iter()
            .map(to_poem_item)
            .collect()
    })
}

/// Searches authors by name; empty `query` lists every author.
#[flutter_rust_bridge::frb(sync)]
pub fn search_authors(query: String) -> Vec<AuthorItem> {
    with_store("search_authors", Vec::new(), |store| {
        QueryService::new(store)
            .search_authors(Some(query.as_str()))
            .into_iter()
            .map(to_author_item)
            .collect()
    })
}

/// Lists poems of one dynasty (exact match), sorted by title.
#[flutter_rust_bridge::frb(sync)]
pub fn poems_by_dynasty(dynasty: String) -> Vec<PoemItem> {
    with_store("poems_by_dynasty", Vec::new(), |store| {
        QueryService::new(store)
            .poems_by_dynasty(&dynasty)
            .into_iter()
            .map(to_poem_item)
            .collect()
    })
}

/// Lists poems of one author, sorted by title.
#[flutter_rust_bridge::frb(sync)]
pub fn poems_by_author(author_id: String) -> Vec<PoemItem> {
    with_store("poems_by_author", Vec::new(), |store| {
        let query = QueryService::new(store);
        match resolve_author(&query, &author_id) {
            Some(author) => query
                .poems_by_author(&author)
                .into_iter()
                .map(to_poem_item)
                .collect(),
            None => Vec::new(),
        }
    })
}

/// Number of poems written by one author; `0` for unknown ids.
#[flutter_rust_bridge::frb(sync)]
pub fn author_poem_count(author_id: String) -> u32 {
    with_store("author_poem_count", 0, |store| {
        let query = QueryService::new(store);
        resolve_author(&query, &author_id).map_or(0, |author| query.author_poem_count(&author))
    })
}

/// Loads one poem for the detail screen.
#[flutter_rust_bridge::frb(sync)]
pub fn poem_detail(poem_id: String) -> Option<PoemItem> {
    with_store("poem_detail", None, |store| {
        resolve_poem(&QueryService::new(store), &poem_id).map(to_poem_item)
    })
}

/// Distinct dynasties present in the catalog, sorted.
#[flutter_rust_bridge::frb(sync)]
pub fn dynasties() -> Vec<String> {
    with_store("dynasties", Vec::new(), |store| {
        QueryService::new(store).dynasties()
    })
}

/// Favorited poems, most recently favorited first.
#[flutter_rust_bridge::frb(sync)]
pub fn favorites() -> Vec<PoemItem> {
    with_store("favorites", Vec::new(), |store| {
        QueryService::new(store)
            .favorites()
            .into_iter()
            .map(to_poem_item)
            .collect()
    })
}

/// Learning history, most recently viewed first.
#[flutter_rust_bridge::frb(sync)]
pub fn learning_records() -> Vec<LearningRecordItem> {
    with_store("learning_records", Vec::new(), |store| {
        QueryService::new(store)
            .learning_records()
            .into_iter()
            .map(to_learning_record_item)
            .collect()
    })
}

/// Returns whether the poem is favorited.
#[flutter_rust_bridge::frb(sync)]
pub fn is_favorite(poem_id: String) -> bool {
    with_store("is_favorite", false, |store| {
        let query = QueryService::new(store);
        resolve_poem(&query, &poem_id).is_some_and(|poem| query.is_favorite(&poem))
    })
}

/// Flips the favorite state of one poem and returns the new state.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; returns `false` for unknown ids or failed writes.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_favorite(poem_id: String) -> bool {
    with_store("toggle_favorite", false, |store| {
        let poem = resolve_poem(&QueryService::new(store), &poem_id);
        poem.is_some_and(|poem| MutationService::new(store).toggle_favorite(&poem))
    })
}

/// Records one view of a poem.
///
/// Empty `notes` keep previously saved notes; anything else is stored
/// verbatim. Unknown ids are ignored.
#[flutter_rust_bridge::frb(sync)]
pub fn record_view(poem_id: String, is_memorized: bool, notes: String) {
    with_store("record_view", (), |store| {
        let poem = resolve_poem(&QueryService::new(store), &poem_id);
        if let Some(poem) = poem {
            MutationService::new(store).record_view(&poem, is_memorized, &notes);
        }
    })
}

/// Deletes one poem's learning record. Returns whether one existed.
#[flutter_rust_bridge::frb(sync)]
pub fn remove_learning_record(poem_id: String) -> bool {
    with_store("remove_learning_record", false, |store| {
        let poem = resolve_poem(&QueryService::new(store), &poem_id);
        poem.is_some_and(|poem| MutationService::new(store).remove_learning_record(&poem))
    })
}

/// Deletes all learning history and returns the number of removed records.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_learning_records() -> u32 {
    with_store("clear_learning_records", 0, |store| {
        let removed = MutationService::new(store).clear_learning_records();
        u32::try_from(removed).unwrap_or(u32::MAX)
    })
}

fn with_store<T>(
    operation: &'static str,
    fallback: T,
    f: impl FnOnce(&mut PoetryStore) -> T,
) -> T {
    let Some(handle) = STORE.get() else {
        warn!("event={operation} module=ffi status=error error_code=store_not_open");
        return fallback;
    };
    let mut store = handle.store.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut store)
}

fn resolve_db_path(raw: &str, env_value: Option<String>) -> PathBuf {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        return PathBuf::from(trimmed);
    }
    if let Some(value) = env_value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(STORE_DB_FILE_NAME)
}

fn normalize_search_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DEFAULT_SEARCH_LIMIT,
        Some(value) => value,
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn resolve_poem(query: &QueryService<'_>, poem_id: &str) -> Option<Poem> {
    parse_id(poem_id).and_then(|id| query.poem(id))
}

fn resolve_author(query: &QueryService<'_>, author_id: &str) -> Option<Author> {
    parse_id(author_id).and_then(|id| query.author(id))
}

fn to_author_item(author: Author) -> AuthorItem {
    AuthorItem {
        author_id: author.id.to_string(),
        name: author.name,
        dynasty: author.dynasty,
        introduction: author.introduction,
    }
}

fn to_poem_item(poem: Poem) -> PoemItem {
    PoemItem {
        poem_id: poem.id.to_string(),
        title: poem.title,
        content: poem.content,
        dynasty: poem.dynasty,
        translation: poem.translation,
        analysis: poem.analysis,
        tags: poem.tags,
        author: to_author_item(poem.author),
    }
}

fn to_learning_record_item(record: LearningRecord) -> LearningRecordItem {
    LearningRecordItem {
        record_id: record.id.to_string(),
        poem: to_poem_item(record.poem),
        date_viewed_ms: record.date_viewed,
        is_memorized: record.is_memorized,
        notes: record.notes,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        author_poem_count, clear_learning_records, core_version, dynasties, init_logging,
        is_favorite, learning_records, normalize_search_limit, open_store, ping, poem_detail,
        poems_by_author, poems_by_dynasty, record_view, remove_learning_record, resolve_db_path,
        search_authors, search_poems, toggle_favorite, PoemItem,
    };
    use std::path::PathBuf;
    use std::sync::OnceLock;

    static TEST_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

    fn open_test_store() {
        let dir = TEST_DIR.get_or_init(|| tempfile::tempdir().expect("create temp dir"));
        let path = dir.path().join("ffi.sqlite3");
        let message = open_store(path.to_string_lossy().into_owned());
        assert!(message.is_empty(), "{message}");
    }

    fn find_poem(title: &str) -> PoemItem {
        search_poems(title.to_string(), None)
            .into_iter()
            .find(|poem| poem.title == title)
            .unwrap_or_else(|| panic!("seeded poem `{title}` should exist"))
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn db_path_prefers_argument_then_env_then_temp_dir() {
        assert_eq!(
            resolve_db_path(" /data/poems.db ", Some("/env/poems.db".to_string())),
            PathBuf::from("/data/poems.db")
        );
        assert_eq!(
            resolve_db_path("  ", Some("/env/poems.db".to_string())),
            PathBuf::from("/env/poems.db")
        );
        assert_eq!(
            resolve_db_path("", Some("   ".to_string())),
            std::env::temp_dir().join("tangsong.sqlite3")
        );
    }

    #[test]
    fn search_limit_defaults_on_zero_or_missing() {
        assert_eq!(normalize_search_limit(None), 50);
        assert_eq!(normalize_search_limit(Some(0)), 50);
        assert_eq!(normalize_search_limit(Some(3)), 3);
    }

    #[test]
    fn open_store_is_idempotent_and_rejects_other_path() {
        open_test_store();
        open_test_store();

        let other = tempfile::tempdir().unwrap();
        let error = open_store(other.path().join("other.sqlite3").to_string_lossy().into_owned());
        assert!(error.contains("refusing to switch"));
    }

    #[test]
    fn search_poems_finds_bundled_poem_with_author() {
        open_test_store();

        let poem = find_poem("静夜思");
        assert_eq!(poem.author.name, "李白");
        assert_eq!(poem.dynasty, "唐");
        assert!(poem.content.starts_with("床前明月光"));

        assert_eq!(search_poems(String::new(), Some(3)).len(), 3);
        assert_eq!(
            poem_detail(poem.poem_id.clone()).map(|detail| detail.title),
            Some("静夜思".to_string())
        );
    }

    #[test]
    fn dynasty_and_author_browsing() {
        open_test_store();

        let all_dynasties = dynasties();
        assert!(all_dynasties.contains(&"唐".to_string()));
        assert!(all_dynasties.contains(&"宋".to_string()));
        assert!(poems_by_dynasty("宋".to_string())
            .iter()
            .all(|poem| poem.dynasty == "宋"));
        assert!(poems_by_dynasty(" 宋".to_string()).is_empty());

        let su_shi = search_authors("苏轼".to_string())
            .into_iter()
            .next()
            .expect("seeded author");
        let poems = poems_by_author(su_shi.author_id.clone());
        assert_eq!(poems.len(), 3);
        assert!(poems.iter().all(|poem| poem.author.name == "苏轼"));
        assert_eq!(author_poem_count(su_shi.author_id), 3);
    }

    #[test]
    fn toggle_favorite_flips_state() {
        open_test_store();
        let poem = find_poem("春晓");

        let first = toggle_favorite(poem.poem_id.clone());
        assert_eq!(is_favorite(poem.poem_id.clone()), first);
        let second = toggle_favorite(poem.poem_id.clone());
        assert_eq!(second, !first);
        assert_eq!(is_favorite(poem.poem_id), second);
    }

    #[test]
    fn invalid_ids_degrade_to_empty_results() {
        open_test_store();

        assert!(!toggle_favorite("not-a-uuid".to_string()));
        assert!(!is_favorite(uuid::Uuid::new_v4().to_string()));
        assert!(poems_by_author("???".to_string()).is_empty());
        assert_eq!(author_poem_count(String::new()), 0);
        assert_eq!(poem_detail("bad".to_string()), None);
        assert!(!remove_learning_record(uuid::Uuid::new_v4().to_string()));
        record_view("bad".to_string(), true, "ignored".to_string());
    }

    #[test]
    fn learning_history_upserts_and_clears() {
        open_test_store();
        let poem = find_poem("江雪");

        record_view(poem.poem_id.clone(), false, "寒江独钓".to_string());
        record_view(poem.poem_id.clone(), true, String::new());

        let history = learning_records();
        let entries = history
            .iter()
            .filter(|record| record.poem.poem_id == poem.poem_id)
            .collect::<Vec<_>>();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_memorized);
        assert_eq!(entries[0].notes.as_deref(), Some("寒江独钓"));

        record_view(poem.poem_id.clone(), true, " 孤舟蓑笠翁 ".to_string());
        let notes = learning_records()
            .into_iter()
            .find(|record| record.poem.poem_id == poem.poem_id)
            .and_then(|record| record.notes);
        assert_eq!(notes.as_deref(), Some(" 孤舟蓑笠翁 "));

        assert!(remove_learning_record(poem.poem_id.clone()));
        assert!(!remove_learning_record(poem.poem_id.clone()));

        record_view(poem.poem_id, false, String::new());
        assert!(clear_learning_records() >= 1);
        assert!(learning_records().is_empty());
    }
}
