//! Task record types for Daybook.
//!
//! A [`Task`] is the persisted record; a [`TaskDraft`] is the same set of
//! fields before the record store has assigned an identifier. Identifiers
//! are always store-generated, so a draft has no id at all.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Default maximum task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Store-generated task identifier.
///
/// Identifiers are allocated in increasing order and never reissued after
/// the task is deleted, so ordering by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
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

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default for new tasks.
    Mid,
    /// Do first.
    High,
}

impl Priority {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "mid" => Ok(Self::Mid),
            "high" => Ok(Self::High),
            other => Err(ValidationError::InvalidPriority(other.to_string())),
        }
    }
}

/// Task status.
///
/// Only [`TaskStatus::InProgress`] tasks count towards the in-progress
/// aggregate kept by the task mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task is open and being worked on.
    #[serde(rename = "in progress")]
    InProgress,
    /// Task is done.
    #[serde(rename = "completed")]
    Completed,
}

impl TaskStatus {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }

    /// Whether this status counts towards the in-progress aggregate.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

/// The date-time a task is scheduled for.
///
/// Accepts any RFC 3339 timestamp and normalizes it to UTC. The canonical
/// text form has millisecond precision and a `Z` suffix, e.g.
/// `2025-05-01T09:30:00.000Z`. Sub-millisecond precision is truncated on
/// construction so a date reads back from storage exactly as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskDate(DateTime<Utc>);

impl TaskDate {
    /// The calendar day of this timestamp in UTC.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

impl From<DateTime<Utc>> for TaskDate {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.trunc_subsecs(3))
    }
}

impl FromStr for TaskDate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Self::from(dt.with_timezone(&Utc)))
            .map_err(|e| ValidationError::InvalidDate {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl TryFrom<String> for TaskDate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskDate> for String {
    fn from(value: TaskDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TaskDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Task fields as entered by the user, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Task title. Must be non-empty after trimming.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// When the task is scheduled.
    pub date: TaskDate,
    /// Task priority.
    pub priority: Priority,
    /// Task status.
    pub status: TaskStatus,
}

impl TaskDraft {
    /// Creates a draft with mid priority and in-progress status.
    #[must_use]
    pub fn new(title: impl Into<String>, date: TaskDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            date,
            priority: Priority::Mid,
            status: TaskStatus::InProgress,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Checks the title and returns the draft with its title trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] or
    /// [`ValidationError::TitleTooLong`].
    pub fn validated(mut self, max_title_len: usize) -> Result<Self, ValidationError> {
        self.title = validate_title(&self.title, max_title_len)?;
        Ok(self)
    }

    /// Attaches a store-generated identifier.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            date: self.date,
            priority: self.priority,
            status: self.status,
        }
    }
}

/// A persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-generated identifier, immutable once assigned.
    pub id: TaskId,
    /// Task title, trimmed and non-empty.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// When the task is scheduled.
    pub date: TaskDate,
    /// Task priority.
    pub priority: Priority,
    /// Task status.
    pub status: TaskStatus,
}

impl Task {
    /// Whether this task counts towards the in-progress aggregate.
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        self.status.is_in_progress()
    }

    /// Returns a copy of this task with a different status.
    #[must_use]
    pub fn with_status(&self, status: TaskStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Checks the title and returns the task with its title trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] or
    /// [`ValidationError::TitleTooLong`].
    pub fn validated(mut self, max_title_len: usize) -> Result<Self, ValidationError> {
        self.title = validate_title(&self.title, max_title_len)?;
        Ok(self)
    }
}

/// Trims a task title and checks it against the length limits.
///
/// Length is counted in characters, not bytes.
///
/// # Errors
///
/// Returns [`ValidationError::TitleEmpty`] if nothing but whitespace is
/// left, or [`ValidationError::TitleTooLong`] if the trimmed title has more
/// than `max_len` characters.
pub fn validate_title(title: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TitleTooLong { max: max_len });
    }
    Ok(trimmed.to_string())
}
