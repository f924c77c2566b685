//! Core data layer for the TangSong poetry app.
//! This crate is the single source of truth for catalog and user-state
//! invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::catalog::{Author, AuthorId, Poem, PoemId, PoemValidationError};
pub use model::seed::{SeedPoem, ANONYMOUS_AUTHOR};
pub use model::user_state::{Favorite, FavoriteId, LearningRecord, LearningRecordId};
pub use repo::author_repo::{AuthorRepository, SqliteAuthorRepository};
pub use repo::favorite_repo::{FavoriteRepository, SqliteFavoriteRepository};
pub use repo::learning_repo::{
    LearningRecordRepository, LearningRecordRow, SqliteLearningRecordRepository,
};
pub use repo::poem_repo::{PoemListQuery, PoemRepository, SqlitePoemRepository};
pub use repo::{RepoError, RepoResult};
pub use service::mutation_service::MutationService;
pub use service::query_service::{QueryService, DEFAULT_SEARCH_LIMIT};
pub use service::seed_service::{ensure_seeded, SeedError, SeedReport, SeedSource};
pub use store::PoetryStore;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
