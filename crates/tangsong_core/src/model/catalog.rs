//! Author and poem entities.
//!
//! # Responsibility
//! - Define the read-only catalog imported at seed time.
//! - Keep the denormalized poem dynasty aligned with the owning author.
//!
//! # Invariants
//! - `(name, dynasty)` identifies at most one author.
//! - `Poem::dynasty == Poem::author.dynasty`.
//! - `title` and `content` are never blank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable author identifier.
pub type AuthorId = Uuid;

/// Stable poem identifier.
pub type PoemId = Uuid;

/// Poet record shared by all of their poems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    /// Historical era, e.g. `唐` or `宋`.
    pub dynasty: String,
    pub introduction: Option<String>,
}

impl Author {
    /// Creates an author with a generated stable ID.
    pub fn new(name: impl Into<String>, dynasty: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dynasty: dynasty.into(),
            introduction: None,
        }
    }
}

/// Poem read model with its author snapshot embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poem {
    pub id: PoemId,
    pub title: String,
    /// Verse text, one line per `\n`.
    pub content: String,
    /// Duplicated from `author.dynasty` so dynasty filters stay a single
    /// column match.
    pub dynasty: String,
    pub translation: Option<String>,
    pub analysis: Option<String>,
    /// Ordered tags, possibly empty.
    pub tags: Vec<String>,
    pub author: Author,
}

impl Poem {
    /// Creates a poem owned by `author`, copying the author's dynasty.
    ///
    /// Line breaks are normalized to `\n`.
    pub fn new(author: &Author, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: normalize_line_breaks(&content.into()),
            dynasty: author.dynasty.clone(),
            translation: None,
            analysis: None,
            tags: Vec::new(),
            author: author.clone(),
        }
    }

    /// Splits verse content into trimmed, non-empty lines.
    pub fn lines(&self) -> Vec<&str> {
        self.content
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Validates write-path invariants.
    pub fn validate(&self) -> Result<(), PoemValidationError> {
        if self.title.trim().is_empty() {
            return Err(PoemValidationError::BlankTitle);
        }
        if self.content.trim().is_empty() {
            return Err(PoemValidationError::BlankContent);
        }
        if self.dynasty != self.author.dynasty {
            return Err(PoemValidationError::DynastyMismatch {
                poem: self.dynasty.clone(),
                author: self.author.dynasty.clone(),
            });
        }
        Ok(())
    }
}

/// Poem invariant violations detected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoemValidationError {
    BlankTitle,
    BlankContent,
    DynastyMismatch { poem: String, author: String },
}

impl Display for PoemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "poem title must not be blank"),
            Self::BlankContent => write!(f, "poem content must not be blank"),
            Self::DynastyMismatch { poem, author } => write!(
                f,
                "poem dynasty `{poem}` does not match author dynasty `{author}`"
            ),
        }
    }
}

impl Error for PoemValidationError {}

pub(crate) fn normalize_line_breaks(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::{Author, Poem, PoemValidationError};

    #[test]
    fn new_poem_copies_author_dynasty_and_normalizes_breaks() {
        let author = Author::new("李白", "唐");
        let poem = Poem::new(&author, "静夜思", "床前明月光，\r\n疑是地上霜。");
        assert_eq!(poem.dynasty, "唐");
        assert_eq!(poem.content, "床前明月光，\n疑是地上霜。");
        assert_eq!(poem.lines(), vec!["床前明月光，", "疑是地上霜。"]);
    }

    #[test]
    fn validate_rejects_dynasty_drift() {
        let author = Author::new("苏轼", "宋");
        let mut poem = Poem::new(&author, "念奴娇·赤壁怀古", "大江东去");
        poem.dynasty = "唐".to_string();
        assert!(matches!(
            poem.validate(),
            Err(PoemValidationError::DynastyMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_blank_title() {
        let author = Author::new("佚名", "");
        let poem = Poem::new(&author, "  ", "content");
        assert_eq!(poem.validate(), Err(PoemValidationError::BlankTitle));
    }
}
