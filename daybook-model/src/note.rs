//! Free-text notes.
//!
//! Notes follow the same record-store contract as tasks but carry no
//! derived state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Store-generated note identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    /// Wraps a raw row identifier.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-generated identifier.
    pub id: NoteId,
    /// Note body, trimmed and non-empty.
    pub text: String,
}

/// Trims note text and rejects empty notes.
///
/// # Errors
///
/// Returns [`ValidationError::NoteEmpty`] if nothing but whitespace is left.
pub fn validate_note_text(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::NoteEmpty);
    }
    Ok(trimmed.to_string())
}
