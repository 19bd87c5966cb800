//! Property tests for the in-progress aggregate.
//!
//! Uses proptest to drive random operation sequences through `TaskManager`
//! and verify:
//! 1. The in-progress count equals a fresh count after every operation.
//! 2. The mirror matches the store after every operation.
//! 3. No two creates ever receive the same id.
//! 4. A second `load_all` changes nothing.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;

use daybook::store::{InMemoryTaskStore, TaskStore};
use daybook::tasks::TaskManager;
use daybook_model::{Priority, TaskDraft, TaskId, TaskStatus};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Create { title: String, status: TaskStatus, priority: Priority },
    SetStatus { pick: usize, status: TaskStatus },
    Delete { pick: usize },
    MarkCompleted { pick: usize },
    Load,
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![Just(TaskStatus::InProgress), Just(TaskStatus::Completed)]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Mid), Just(Priority::High)]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => ("[a-z ]{0,12}", arb_status(), arb_priority())
            .prop_map(|(title, status, priority)| Op::Create { title, status, priority }),
        2 => (any::<usize>(), arb_status()).prop_map(|(pick, status)| Op::SetStatus { pick, status }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
        2 => any::<usize>().prop_map(|pick| Op::MarkCompleted { pick }),
        1 => Just(Op::Load),
    ]
}

/// Picks from every id ever created, deleted ones included, so operations
/// on stale ids are exercised too.
fn pick(ids: &[TaskId], pick: usize) -> Option<TaskId> {
    (!ids.is_empty()).then(|| ids[pick % ids.len()])
}

async fn apply(mgr: &TaskManager<InMemoryTaskStore>, ids: &mut Vec<TaskId>, op: Op) {
    match op {
        Op::Create { title, status, priority } => {
            let draft = TaskDraft::new(title, "2025-05-01T10:00:00.000Z".parse().unwrap())
                .with_status(status)
                .with_priority(priority);
            // Blank titles are rejected; that is part of the sequence too.
            if let Ok(task) = mgr.create(draft).await {
                ids.push(task.id);
            }
        }
        Op::SetStatus { pick: p, status } => {
            if let Some(id) = pick(ids, p) {
                let current = mgr.snapshot().get(id).cloned();
                if let Some(task) = current {
                    mgr.update(task.with_status(status)).await.unwrap();
                }
            }
        }
        Op::Delete { pick: p } => {
            if let Some(id) = pick(ids, p) {
                mgr.delete(id).await.unwrap();
            }
        }
        Op::MarkCompleted { pick: p } => {
            if let Some(id) = pick(ids, p) {
                mgr.mark_completed(id).await.unwrap();
            }
        }
        Op::Load => {
            mgr.load_all().await.unwrap();
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    /// The aggregate always equals a recount and the mirror always equals
    /// the store.
    #[test]
    fn aggregate_matches_recount(ops in prop::collection::vec(arb_op(), 1..60)) {
        let rt = runtime();
        rt.block_on(async {
            let mgr = TaskManager::start(InMemoryTaskStore::new()).await.unwrap();
            let mut ids = Vec::new();
            for op in ops {
                apply(&mgr, &mut ids, op).await;

                let snap = mgr.snapshot();
                let recount = snap.tasks().filter(|t| t.is_in_progress()).count();
                prop_assert_eq!(snap.in_progress_count(), recount);

                let stored = mgr.store().list_all().await.unwrap().tasks;
                prop_assert_eq!(snap.to_vec(), stored);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Every successful create gets a fresh id, even after deletes.
    #[test]
    fn created_ids_are_unique(ops in prop::collection::vec(arb_op(), 1..60)) {
        let rt = runtime();
        rt.block_on(async {
            let mgr = TaskManager::start(InMemoryTaskStore::new()).await.unwrap();
            let mut ids = Vec::new();
            for op in ops {
                apply(&mgr, &mut ids, op).await;
            }
            let unique: HashSet<_> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Loading twice in a row leaves the same snapshot as loading once.
    #[test]
    fn load_all_is_idempotent(ops in prop::collection::vec(arb_op(), 0..40)) {
        let rt = runtime();
        rt.block_on(async {
            let mgr = TaskManager::start(InMemoryTaskStore::new()).await.unwrap();
            let mut ids = Vec::new();
            for op in ops {
                apply(&mgr, &mut ids, op).await;
            }
            mgr.load_all().await.unwrap();
            let once = mgr.snapshot();
            mgr.load_all().await.unwrap();
            prop_assert_eq!(mgr.snapshot(), once);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// mark_completed never raises the count.
    #[test]
    fn mark_completed_is_monotonic(ops in prop::collection::vec(arb_op(), 1..40), target in any::<usize>()) {
        let rt = runtime();
        rt.block_on(async {
            let mgr = TaskManager::start(InMemoryTaskStore::new()).await.unwrap();
            let mut ids = Vec::new();
            for op in ops {
                apply(&mgr, &mut ids, op).await;
            }
            if let Some(id) = pick(&ids, target) {
                let before = mgr.in_progress_count();
                mgr.mark_completed(id).await.unwrap();
                prop_assert!(mgr.in_progress_count() <= before);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
