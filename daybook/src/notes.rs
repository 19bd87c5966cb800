//! Free-text notes store.
//!
//! Notes live in their own database file and follow the same record-store
//! contract as tasks: store-generated ids, full-record update, and no error
//! for updating or deleting an id that does not exist. There is no mirror
//! or derived state; callers re-list after writing.

use std::sync::atomic::{AtomicBool, Ordering};

use daybook_model::{Note, NoteId, ValidationError, validate_note_text};
use rusqlite::types::Value;

use crate::store::{Database, StoreError};

const CREATE_NOTES: &str = "
    CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL
    );
";

/// Errors surfaced by note operations.
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// Input rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Notes table over a [`Database`] handle.
#[derive(Debug)]
pub struct NoteStore {
    db: Database,
    initialized: AtomicBool,
}

impl NoteStore {
    /// Wraps a database handle. Call [`initialize`](Self::initialize)
    /// before anything else.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            initialized: AtomicBool::new(false),
        }
    }

    fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Uninitialized)
        }
    }

    /// Create the notes table if needed. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the schema statement fails.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.db.execute(CREATE_NOTES).await?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Add a note. The text is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError::Validation`] for blank text (the store is not
    /// called) or [`NoteError::Storage`] if the insert fails.
    pub async fn add(&self, text: &str) -> Result<Note, NoteError> {
        let text = validate_note_text(text)?;
        self.ensure_initialized()?;
        let res = self
            .db
            .run(
                "INSERT INTO notes (text) VALUES (?1)",
                vec![Value::Text(text.clone())],
            )
            .await?;
        let id = res
            .inserted_id
            .ok_or_else(|| StoreError::Unavailable("insert returned no rowid".to_string()))?;
        tracing::debug!(note_id = id, "note added");
        Ok(Note {
            id: NoteId::from_raw(id),
            text,
        })
    }

    /// Replace a note's text. Returns whether the note existed.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError::Validation`] for blank text or
    /// [`NoteError::Storage`] if the write fails.
    pub async fn update(&self, id: NoteId, text: &str) -> Result<bool, NoteError> {
        let text = validate_note_text(text)?;
        self.ensure_initialized()?;
        let res = self
            .db
            .run(
                "UPDATE notes SET text = ?1 WHERE id = ?2",
                vec![Value::Text(text), Value::Integer(id.get())],
            )
            .await?;
        Ok(res.affected_rows > 0)
    }

    /// Delete a note. Returns whether the note existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn delete(&self, id: NoteId) -> Result<bool, StoreError> {
        self.ensure_initialized()?;
        let res = self
            .db
            .run("DELETE FROM notes WHERE id = ?1", vec![Value::Integer(id.get())])
            .await?;
        Ok(res.affected_rows > 0)
    }

    /// Every note, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    pub async fn list(&self) -> Result<Vec<Note>, StoreError> {
        self.ensure_initialized()?;
        let rows = self
            .db
            .query("SELECT id, text FROM notes ORDER BY id", Vec::new(), |row| {
                Ok(Note {
                    id: NoteId::from_raw(row.get(0)?),
                    text: row.get(1)?,
                })
            })
            .await?;
        Ok(rows.rows)
    }
}
