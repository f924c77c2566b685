//! User-owned state attached to poems.
//!
//! # Invariants
//! - At most one `Favorite` and one `LearningRecord` per poem.
//! - `LearningRecord::date_viewed` moves forward on every view.

use crate::model::catalog::{Poem, PoemId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable favorite identifier.
pub type FavoriteId = Uuid;

/// Stable learning record identifier.
pub type LearningRecordId = Uuid;

/// Bookmark on one poem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub poem_id: PoemId,
    /// Epoch milliseconds.
    pub date_added: i64,
}

/// Per-poem view history and memorization flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub id: LearningRecordId,
    pub poem: Poem,
    /// Epoch milliseconds of the latest view.
    pub date_viewed: i64,
    pub is_memorized: bool,
    pub notes: Option<String>,
}
