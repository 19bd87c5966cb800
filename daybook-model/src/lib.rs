//! Data model shared by the Daybook store and its consumers.

pub mod note;
pub mod task;

pub use note::{Note, NoteId, validate_note_text};
pub use task::{
    MAX_TASK_TITLE_LENGTH, Priority, Task, TaskDate, TaskDraft, TaskId, TaskStatus, validate_title,
};

use thiserror::Error;

/// Field-level validation failures, raised before anything reaches storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Task title is empty after trimming.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the configured maximum.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// The limit that was exceeded.
        max: usize,
    },
    /// Date is not an RFC 3339 timestamp.
    #[error("invalid task date {input:?}: {reason}")]
    InvalidDate {
        /// The rejected text.
        input: String,
        /// Parser message.
        reason: String,
    },
    /// Priority outside `low` / `mid` / `high`.
    #[error("invalid priority: {0:?}")]
    InvalidPriority(String),
    /// Status outside `in progress` / `completed`.
    #[error("invalid status: {0:?}")]
    InvalidStatus(String),
    /// Note text is empty after trimming.
    #[error("note text cannot be empty")]
    NoteEmpty,
}
