//! In-memory mirror of the task table.
//!
//! A [`TaskSnapshot`] holds every known task ordered by id together with the
//! number of in-progress tasks. Consumers only ever see it through a
//! `tokio::sync::watch` receiver, so it is read-only outside this crate.
//!
//! Mutations are keyed by the store [`Commit`] of the write they mirror.
//! The snapshot remembers the commit of the last full load (the watermark)
//! and, per id, the commit of the last write applied since. A mutation that
//! is not newer than both is stale and is dropped, which makes the write
//! that landed last in the store the one the mirror ends up showing.
//!
//! The per-id history is only needed while writes are in flight. Once the
//! manager is idle it calls [`TaskSnapshot::settle`], which folds the
//! history into the watermark.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use daybook_model::{Task, TaskId};

use crate::store::{Commit, Listing};

#[derive(Debug, Clone, Default)]
struct Ledger {
    /// Every commit at or below this is already reflected: the last full
    /// load, or the high mark at the last settle.
    watermark: Commit,
    /// Highest commit reflected in the snapshot.
    high: Commit,
    /// Last applied write per id since the watermark. Deletes stay here so
    /// a late update for a removed id cannot resurrect it. Bounded by the
    /// ids written while at least one write was in flight.
    last_write: HashMap<TaskId, Commit>,
}

impl Ledger {
    fn is_fresh(&self, id: TaskId, commit: Commit) -> bool {
        commit > self.watermark && self.last_write.get(&id).is_none_or(|last| commit > *last)
    }

    fn record(&mut self, id: TaskId, commit: Commit) {
        self.last_write.insert(id, commit);
        self.high = self.high.max(commit);
    }
}

/// The task collection as the UI sees it.
#[derive(Debug, Clone, Default)]
pub struct TaskSnapshot {
    tasks: BTreeMap<TaskId, Task>,
    in_progress: usize,
    ledger: Ledger,
}

impl PartialEq for TaskSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.in_progress == other.in_progress && self.tasks == other.tasks
    }
}

impl Eq for TaskSnapshot {}

impl TaskSnapshot {
    /// All tasks, ordered by id.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Owned copy of all tasks, ordered by id.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether there are no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks whose status is in progress.
    #[must_use]
    pub const fn in_progress_count(&self) -> usize {
        self.in_progress
    }

    /// Tasks scheduled on the given UTC day, ordered by id.
    #[must_use]
    pub fn scheduled_on(&self, day: NaiveDate) -> Vec<&Task> {
        self.tasks.values().filter(|t| t.date.day() == day).collect()
    }

    /// Replace everything with a fresh listing and recount.
    ///
    /// Returns `false` without changing anything if a write newer than the
    /// listing has already been applied; that write's own mutation keeps
    /// the snapshot current.
    pub(crate) fn replace_all(&mut self, listing: Listing) -> bool {
        if listing.as_of < self.ledger.high {
            return false;
        }
        self.tasks = listing.tasks.into_iter().map(|t| (t.id, t)).collect();
        self.in_progress = self.tasks.values().filter(|t| t.is_in_progress()).count();
        self.ledger = Ledger {
            watermark: listing.as_of,
            high: listing.as_of,
            last_write: HashMap::new(),
        };
        true
    }

    /// Drop the per-id history. Only valid when no write is in flight:
    /// every later write is then stamped above the current high mark, so
    /// the high mark alone is enough to reject stale ones.
    ///
    /// Never changes what consumers see, so always returns `false`.
    pub(crate) fn settle(&mut self) -> bool {
        self.ledger.watermark = self.ledger.high;
        self.ledger.last_write.clear();
        false
    }

    #[cfg(test)]
    pub(crate) fn tracked_writes(&self) -> usize {
        self.ledger.last_write.len()
    }

    /// Insert or replace a task written at `commit`.
    ///
    /// The aggregate moves by the status delta between the old and new
    /// record. Returns `false` if the write is stale.
    pub(crate) fn upsert(&mut self, task: Task, commit: Commit) -> bool {
        if !self.ledger.is_fresh(task.id, commit) {
            return false;
        }
        let id = task.id;
        let now = task.is_in_progress();
        let was = self
            .tasks
            .insert(id, task)
            .is_some_and(|old| old.is_in_progress());
        match (was, now) {
            (true, false) => self.in_progress -= 1,
            (false, true) => self.in_progress += 1,
            _ => {}
        }
        self.ledger.record(id, commit);
        true
    }

    /// Remove a task deleted at `commit`.
    ///
    /// Returns `false` if the delete is stale.
    pub(crate) fn remove(&mut self, id: TaskId, commit: Commit) -> bool {
        if !self.ledger.is_fresh(id, commit) {
            return false;
        }
        if self.tasks.remove(&id).is_some_and(|old| old.is_in_progress()) {
            self.in_progress -= 1;
        }
        self.ledger.record(id, commit);
        true
    }
}
