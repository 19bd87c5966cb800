//! Task manager: the synchronization protocol between store and mirror.
//!
//! `TaskManager` owns the record store handle and the mirror. It exposes
//! the five operations a UI dispatches (load, create, update, delete, mark
//! completed) and a `watch` subscription to the resulting snapshots.

use std::sync::atomic::{AtomicUsize, Ordering};

use daybook_model::{MAX_TASK_TITLE_LENGTH, Task, TaskDraft, TaskId, TaskStatus};
use tokio::sync::watch;

use super::mirror::TaskSnapshot;
use super::{Outcome, TaskError};
use crate::store::{TaskStore, Written};

/// Keeps a [`TaskStore`] and the in-memory [`TaskSnapshot`] consistent.
///
/// All methods take `&self`, so several operations may be in flight at
/// once. The in-progress count is adjusted by delta on every mutation and
/// only recounted by [`load_all`](Self::load_all).
pub struct TaskManager<S> {
    store: S,
    mirror: watch::Sender<TaskSnapshot>,
    in_flight: AtomicUsize,
    max_title_len: usize,
}

/// Marks a write as in flight from before its store call until after its
/// mirror mutation. The last one out settles the mirror's write history.
struct InFlight<'a> {
    count: &'a AtomicUsize,
    mirror: &'a watch::Sender<TaskSnapshot>,
}

impl<'a> InFlight<'a> {
    fn enter(count: &'a AtomicUsize, mirror: &'a watch::Sender<TaskSnapshot>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self { count, mirror }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Re-checked under the mirror lock so a settle never overlaps a
            // write that entered since.
            self.mirror.send_if_modified(|snap| {
                self.count.load(Ordering::SeqCst) == 0 && snap.settle()
            });
        }
    }
}

impl<S: TaskStore> TaskManager<S> {
    /// Wraps an already-initialized store with an empty mirror.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            mirror: watch::channel(TaskSnapshot::default()).0,
            in_flight: AtomicUsize::new(0),
            max_title_len: MAX_TASK_TITLE_LENGTH,
        }
    }

    /// Initializes the store and loads every task into the mirror.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Storage`] if the schema cannot be created or
    /// the initial load fails.
    pub async fn start(store: S) -> Result<Self, TaskError> {
        store.initialize().await?;
        let manager = Self::new(store);
        manager.load_all().await?;
        Ok(manager)
    }

    /// Sets the maximum title length in characters.
    #[must_use]
    pub const fn with_max_title_len(mut self, max: usize) -> Self {
        self.max_title_len = max;
        self
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Subscribe to mirror changes.
    ///
    /// The receiver sees the current snapshot immediately and is notified
    /// after every operation that changed it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.mirror.subscribe()
    }

    /// A copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        self.mirror.borrow().clone()
    }

    /// Current number of in-progress tasks.
    #[must_use]
    pub fn in_progress_count(&self) -> usize {
        self.mirror.borrow().in_progress_count()
    }

    /// Reload every task from the store and recount.
    ///
    /// This is the recovery path after start-up or suspected divergence.
    /// Returns [`Outcome::Superseded`] if a write newer than the listing
    /// was applied while the listing was being read.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Storage`] if the store read fails.
    pub async fn load_all(&self) -> Result<Outcome, TaskError> {
        let listing = self.store.list_all().await.inspect_err(|e| {
            tracing::warn!(error = %e, "task load failed");
        })?;
        let count = listing.tasks.len();
        let as_of = listing.as_of;
        let applied = self.mirror.send_if_modified(|snap| snap.replace_all(listing));
        if applied {
            tracing::info!(tasks = count, commit = %as_of, "task mirror loaded");
            Ok(Outcome::Applied)
        } else {
            tracing::debug!(commit = %as_of, "task load superseded by newer write");
            Ok(Outcome::Superseded)
        }
    }

    /// Validate and persist a new task, then add it to the mirror.
    ///
    /// The title is trimmed. The store assigns the id. Calling this twice
    /// with the same draft creates two tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] without calling the store if the
    /// title is empty or too long, and [`TaskError::Storage`] if the insert
    /// fails.
    pub async fn create(&self, draft: TaskDraft) -> Result<Task, TaskError> {
        let draft = draft.validated(self.max_title_len)?;
        let _in_flight = self.enter();
        let inserted = self.store.insert(&draft).await.inspect_err(|e| {
            tracing::warn!(error = %e, "task insert failed");
        })?;
        let task = draft.into_task(inserted.id);
        let applied = self
            .mirror
            .send_if_modified(|snap| snap.upsert(task.clone(), inserted.commit));
        tracing::debug!(task_id = %task.id, commit = %inserted.commit, applied, "task created");
        Ok(task)
    }

    /// Replace every field of an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] without calling the store if the
    /// title is invalid, and [`TaskError::Storage`] if the write fails.
    pub async fn update(&self, task: Task) -> Result<Outcome, TaskError> {
        let task = task.validated(self.max_title_len)?;
        self.persist(task).await
    }

    /// Delete a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Storage`] if the delete fails.
    pub async fn delete(&self, id: TaskId) -> Result<Outcome, TaskError> {
        let _in_flight = self.enter();
        let written = self.store.delete(id).await.inspect_err(|e| {
            tracing::warn!(task_id = %id, error = %e, "task delete failed");
        })?;
        if !written.found() {
            tracing::debug!(task_id = %id, "delete of unknown task");
            return Ok(Outcome::NotFound);
        }
        let applied = self
            .mirror
            .send_if_modified(|snap| snap.remove(id, written.commit));
        Ok(Self::settle(id, written, applied))
    }

    /// Mark a task completed.
    ///
    /// Already-completed tasks are left alone without a store call, so the
    /// in-progress count can only go down. The full record as currently
    /// mirrored is written back with the new status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Storage`] if the write fails.
    pub async fn mark_completed(&self, id: TaskId) -> Result<Outcome, TaskError> {
        let current = self.mirror.borrow().get(id).cloned();
        let Some(current) = current else {
            tracing::debug!(task_id = %id, "mark completed on unknown task");
            return Ok(Outcome::NotFound);
        };
        if current.status == TaskStatus::Completed {
            return Ok(Outcome::Unchanged);
        }
        self.persist(current.with_status(TaskStatus::Completed))
            .await
    }

    async fn persist(&self, task: Task) -> Result<Outcome, TaskError> {
        let id = task.id;
        let _in_flight = self.enter();
        let written = self.store.update(&task).await.inspect_err(|e| {
            tracing::warn!(task_id = %id, error = %e, "task update failed");
        })?;
        if !written.found() {
            tracing::debug!(task_id = %id, "update of unknown task");
            return Ok(Outcome::NotFound);
        }
        let applied = self
            .mirror
            .send_if_modified(|snap| snap.upsert(task, written.commit));
        Ok(Self::settle(id, written, applied))
    }

    fn enter(&self) -> InFlight<'_> {
        InFlight::enter(&self.in_flight, &self.mirror)
    }

    fn settle(id: TaskId, written: Written, applied: bool) -> Outcome {
        if applied {
            tracing::debug!(task_id = %id, commit = %written.commit, "task write mirrored");
            Outcome::Applied
        } else {
            tracing::warn!(
                task_id = %id,
                commit = %written.commit,
                "task write superseded by a later write"
            );
            Outcome::Superseded
        }
    }
}

impl<S> std::fmt::Debug for TaskManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snap = self.mirror.borrow();
        f.debug_struct("TaskManager")
            .field("tasks", &snap.len())
            .field("in_progress", &snap.in_progress_count())
            .field("max_title_len", &self.max_title_len)
            .finish_non_exhaustive()
    }
}
