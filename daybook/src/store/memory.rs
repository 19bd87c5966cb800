//! In-memory [`TaskStore`] for tests and embedding.
//!
//! Behaves like [`SqliteTaskStore`](super::SqliteTaskStore): ids come from
//! an [`IdAllocator`] and are never reused, writes are stamped with commit
//! sequence numbers, and missing ids on update/delete are not errors. All
//! data is lost when the store is dropped.

use std::collections::BTreeMap;

use daybook_model::{Task, TaskDraft, TaskId};
use tokio::sync::Mutex;

use super::{Commit, Inserted, Listing, StoreError, TaskStore, Written};
use crate::identity::IdAllocator;

#[derive(Debug, Default)]
struct State {
    initialized: bool,
    rows: BTreeMap<TaskId, Task>,
    ids: IdAllocator,
    last_commit: Commit,
}

impl State {
    fn ready(&self) -> Result<(), StoreError> {
        if self.initialized {
            Ok(())
        } else {
            Err(StoreError::Uninitialized)
        }
    }

    fn commit(&mut self) -> Commit {
        self.last_commit = self.last_commit.next();
        self.last_commit
    }
}

/// Volatile task store keyed by [`TaskId`].
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    state: Mutex<State>,
}

impl InMemoryTaskStore {
    /// Create a new, empty store. Call [`TaskStore::initialize`] before use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl TaskStore for InMemoryTaskStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.state.lock().await.initialized = true;
        Ok(())
    }

    async fn insert(&self, draft: &TaskDraft) -> Result<Inserted, StoreError> {
        let mut state = self.state.lock().await;
        state.ready()?;
        let id = state.ids.allocate();
        state.rows.insert(id, draft.clone().into_task(id));
        let commit = state.commit();
        Ok(Inserted { id, commit })
    }

    async fn update(&self, task: &Task) -> Result<Written, StoreError> {
        let mut state = self.state.lock().await;
        state.ready()?;
        let affected = match state.rows.get_mut(&task.id) {
            Some(row) => {
                row.clone_from(task);
                1
            }
            None => 0,
        };
        let commit = state.commit();
        Ok(Written { affected, commit })
    }

    async fn delete(&self, id: TaskId) -> Result<Written, StoreError> {
        let mut state = self.state.lock().await;
        state.ready()?;
        let affected = usize::from(state.rows.remove(&id).is_some());
        let commit = state.commit();
        Ok(Written { affected, commit })
    }

    async fn list_all(&self) -> Result<Listing, StoreError> {
        let state = self.state.lock().await;
        state.ready()?;
        Ok(Listing {
            tasks: state.rows.values().cloned().collect(),
            as_of: state.last_commit,
        })
    }
}
