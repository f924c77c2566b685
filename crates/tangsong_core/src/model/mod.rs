//! Domain model for the poetry store.
//!
//! # Responsibility
//! - Define the persisted entities: authors, poems, favorites and learning
//!   records.
//! - Define the bundled seed record shape.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that survives restarts.
//! - A poem's `dynasty` always equals its author's `dynasty`.
//! - Timestamps are Unix epoch milliseconds.

pub mod catalog;
pub mod seed;
pub mod user_state;
