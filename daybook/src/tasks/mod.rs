//! Task synchronization between the record store and the in-memory mirror.
//!
//! [`TaskManager`] is the only writer of the mirror. Each operation writes
//! to the store first and touches the mirror only after the write has
//! succeeded, so a failed write never shows up in the UI.

pub mod manager;
pub mod mirror;

pub use manager::TaskManager;
pub use mirror::TaskSnapshot;

use daybook_model::ValidationError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by task operations.
///
/// In both cases the mirror is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Input rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The store failed to carry out the write or read.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// What a successful task operation did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The store write landed and the mirror now reflects it.
    Applied,
    /// No record with that id exists; nothing was changed.
    NotFound,
    /// The store write landed, but the mirror already reflects a later
    /// write to the same task (or a later full load), so it was left as is.
    Superseded,
    /// The task was already in the requested state; the store was not
    /// called.
    Unchanged,
}
