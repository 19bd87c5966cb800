//! Task identity allocation.
//!
//! Daybook uses exactly one identity policy: the record store generates the
//! id when it inserts a record. SQLite does this with an `AUTOINCREMENT`
//! rowid; stores without such a column use an [`IdAllocator`]. Callers
//! never supply ids, so two sources can never hand out the same one.

use daybook_model::TaskId;

/// Monotonic id source that never reissues an id.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    last: i64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Starts allocating at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Hands out the next id.
    pub const fn allocate(&mut self) -> TaskId {
        self.last += 1;
        TaskId::from_raw(self.last)
    }
}
