//! Durable task record storage.
//!
//! Defines the [`TaskStore`] trait that the synchronization layer writes
//! through, plus two implementations:
//! - [`SqliteTaskStore`] — the on-disk store, built on [`Database`]
//! - [`InMemoryTaskStore`] — volatile store for tests and embedding
//!
//! Every write is stamped with a [`Commit`], a per-instance sequence number
//! assigned while the store's write lock is held. Reads carry the commit of
//! the latest write they observed. The task mirror uses these stamps to
//! apply changes in the order the store actually completed them.

pub mod database;
pub mod memory;
pub mod sqlite;

pub use database::{Database, RunResult, Rows};
pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use std::fmt;
use std::future::Future;

use daybook_model::{Task, TaskDraft, TaskId};

/// Errors surfaced by a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An operation ran before [`TaskStore::initialize`].
    #[error("store used before initialize()")]
    Uninitialized,

    /// The SQLite engine rejected the statement (I/O, constraint, lock).
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be decoded into a record.
    #[error("corrupt row {id}: {reason}")]
    Corrupt {
        /// Raw id of the offending row.
        id: i64,
        /// What failed to decode.
        reason: String,
    },

    /// Filesystem failure while preparing the database location.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The backend could not run the operation at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Position of a write in a store instance's completion order.
///
/// Commits start at 1; [`Commit::ZERO`] precedes every write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Commit(u64);

impl Commit {
    /// Precedes every write.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw sequence number.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The commit following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    /// Identifier generated by the store.
    pub id: TaskId,
    /// When the insert landed.
    pub commit: Commit,
}

/// Result of an update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    /// Number of records touched; zero when the id did not exist.
    pub affected: usize,
    /// When the write landed.
    pub commit: Commit,
}

impl Written {
    /// Whether the target record existed.
    #[must_use]
    pub const fn found(&self) -> bool {
        self.affected > 0
    }
}

/// Every stored task, as of a given commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Tasks ordered by id.
    pub tasks: Vec<Task>,
    /// The latest write reflected in `tasks`.
    pub as_of: Commit,
}

/// Durable, ordered collection of task records.
///
/// Each call is atomic with respect to other calls on the same instance.
/// Identifiers are generated by the store at insert time and never reused.
///
/// Implementations include:
/// - [`SqliteTaskStore`] — persistent storage
/// - [`InMemoryTaskStore`] — volatile storage for tests
pub trait TaskStore: Send + Sync {
    /// Ensure the schema exists. Idempotent; must run before anything else.
    fn initialize(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist a new record and return its generated id.
    fn insert(&self, draft: &TaskDraft) -> impl Future<Output = Result<Inserted, StoreError>> + Send;

    /// Replace every mutable field of the record matching `task.id`.
    ///
    /// A missing id is not an error: the result reports zero affected rows.
    fn update(&self, task: &Task) -> impl Future<Output = Result<Written, StoreError>> + Send;

    /// Remove the record matching `id`. A missing id is not an error.
    fn delete(&self, id: TaskId) -> impl Future<Output = Result<Written, StoreError>> + Send;

    /// Return every record, ordered by id.
    fn list_all(&self) -> impl Future<Output = Result<Listing, StoreError>> + Send;
}
