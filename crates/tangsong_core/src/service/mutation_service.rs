//! Write-side use-case service.
//!
//! # Responsibility
//! - Toggle favorites and upsert learning records.
//! - Remove learning history on explicit user request.
//!
//! # Invariants
//! - Each operation runs check-then-act inside one immediate transaction and
//!   commits once, so at most one favorite and one learning record exist per
//!   poem.
//! - Failures are logged and degrade to `false` / `0` / no-op; nothing is
//!   propagated to the caller.
//! - Note text is never logged, only its length.

use crate::model::catalog::Poem;
use crate::repo::favorite_repo::{FavoriteRepository, SqliteFavoriteRepository};
use crate::repo::learning_repo::{
    LearningRecordRepository, LearningRecordRow, SqliteLearningRecordRepository,
};
use crate::repo::RepoError;
use crate::store::PoetryStore;
use log::{debug, error};
use uuid::Uuid;

/// Mutating facade over a [`PoetryStore`].
///
/// Holding `&mut PoetryStore` keeps writers serialized.
pub struct MutationService<'store> {
    store: &'store mut PoetryStore,
}

impl<'store> MutationService<'store> {
    pub fn new(store: &'store mut PoetryStore) -> Self {
        Self { store }
    }

    /// Flips the favorite state of `poem` and returns the new state.
    ///
    /// Returns `false` when the write fails.
    pub fn toggle_favorite(&mut self, poem: &Poem) -> bool {
        let result = self.store.write(|tx| -> Result<bool, RepoError> {
            let favorites = SqliteFavoriteRepository::try_new(tx)?;
            match favorites.get_favorite_for_poem(poem.id)? {
                Some(existing) => {
                    favorites.delete_favorite(existing.id)?;
                    Ok(false)
                }
                None => {
                    favorites.create_favorite(poem.id)?;
                    Ok(true)
                }
            }
        });

        match result {
            Ok(favorited) => {
                debug!(
                    "event=toggle_favorite module=mutation status=ok poem_id={} favorited={}",
                    poem.id, favorited
                );
                favorited
            }
            Err(err) => {
                error!(
                    "event=toggle_favorite module=mutation status=error poem_id={} error={}",
                    poem.id, err
                );
                false
            }
        }
    }

    /// Records one view of `poem`.
    ///
    /// Creates the learning record on first view. Later views move
    /// `date_viewed` forward and overwrite `is_memorized`; `notes` is only
    /// overwritten when non-empty.
    pub fn record_view(&mut self, poem: &Poem, is_memorized: bool, notes: &str) {
        let result = self.store.write(|tx| -> Result<(), RepoError> {
            let records = SqliteLearningRecordRepository::try_new(tx)?;
            let date_viewed = records.next_date_viewed()?;
            let new_notes = if notes.is_empty() {
                None
            } else {
                Some(notes.to_string())
            };

            match records.get_learning_record_for_poem(poem.id)? {
                Some(mut existing) => {
                    existing.date_viewed = date_viewed;
                    existing.is_memorized = is_memorized;
                    if new_notes.is_some() {
                        existing.notes = new_notes;
                    }
                    records.update_learning_record(&existing)
                }
                None => records
                    .create_learning_record(&LearningRecordRow {
                        id: Uuid::new_v4(),
                        poem_id: poem.id,
                        date_viewed,
                        is_memorized,
                        notes: new_notes,
                    })
                    .map(|_| ()),
            }
        });

        match result {
            Ok(()) => debug!(
                "event=record_view module=mutation status=ok poem_id={} memorized={} notes_len={}",
                poem.id,
                is_memorized,
                notes.chars().count()
            ),
            Err(err) => error!(
                "event=record_view module=mutation status=error poem_id={} error={}",
                poem.id, err
            ),
        }
    }

    /// Deletes the learning record of `poem`. Returns whether one existed.
    pub fn remove_learning_record(&mut self, poem: &Poem) -> bool {
        let result = self.store.write(|tx| -> Result<bool, RepoError> {
            let records = SqliteLearningRecordRepository::try_new(tx)?;
            match records.get_learning_record_for_poem(poem.id)? {
                Some(existing) => {
                    records.delete_learning_record(existing.id)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        });

        result.unwrap_or_else(|err| {
            error!(
                "event=remove_learning_record module=mutation status=error poem_id={} error={}",
                poem.id, err
            );
            false
        })
    }

    /// Deletes every learning record and returns how many were removed.
    pub fn clear_learning_records(&mut self) -> usize {
        let result = self.store.write(|tx| -> Result<usize, RepoError> {
            SqliteLearningRecordRepository::try_new(tx)?.delete_all_learning_records()
        });

        match result {
            Ok(removed) => {
                debug!("event=clear_learning_records module=mutation status=ok removed={removed}");
                removed
            }
            Err(err) => {
                error!("event=clear_learning_records module=mutation status=error error={err}");
                0
            }
        }
    }
}
