//! Bundled seed dataset record shape.
//!
//! # Responsibility
//! - Describe one JSON object of the seed array.
//! - Apply the import defaults for missing, `null` or blank author/dynasty.

use serde::{Deserialize, Serialize};

/// Author name used when a seed record omits `author`.
pub const ANONYMOUS_AUTHOR: &str = "佚名";

/// One poem entry from the seed JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPoem {
    pub title: String,
    /// Missing, `null` or blank imports as [`ANONYMOUS_AUTHOR`].
    #[serde(default)]
    pub author: Option<String>,
    /// Missing or `null` imports as an empty dynasty.
    #[serde(default)]
    pub dynasty: Option<String>,
    pub content: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl SeedPoem {
    /// Trimmed author name with the anonymous fallback applied.
    pub fn author_name(&self) -> &str {
        match self.author.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS_AUTHOR,
        }
    }

    /// Trimmed dynasty, empty when absent.
    pub fn dynasty_name(&self) -> &str {
        self.dynasty.as_deref().map_or("", str::trim)
    }
}

/// Parses a seed JSON array.
pub fn parse_seed_json(json: &str) -> serde_json::Result<Vec<SeedPoem>> {
    serde_json::from_str(json)
}
