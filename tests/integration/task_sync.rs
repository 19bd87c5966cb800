//! Integration tests for task synchronization over SQLite.
//!
//! Drives `TaskManager` against an in-memory SQLite database and checks the
//! mirror against what the store actually holds.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use daybook::store::{Database, SqliteTaskStore, TaskStore};
use daybook::tasks::{Outcome, TaskError, TaskManager};
use daybook_model::{Priority, TaskDraft, TaskId, TaskStatus, ValidationError};
use tokio::task::JoinSet;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

async fn make_manager() -> TaskManager<SqliteTaskStore> {
    let db = Database::open_in_memory().expect("in-memory db");
    TaskManager::start(SqliteTaskStore::new(db))
        .await
        .expect("start manager")
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft::new(title, "2025-05-01T10:00:00.000Z".parse().unwrap())
}

/// Asserts the mirror matches the store row-for-row and the aggregate
/// matches a fresh count.
async fn assert_converged(mgr: &TaskManager<SqliteTaskStore>) {
    let snap = mgr.snapshot();
    let stored = mgr.store().list_all().await.unwrap().tasks;
    assert_eq!(snap.to_vec(), stored);
    let recount = stored.iter().filter(|t| t.is_in_progress()).count();
    assert_eq!(snap.in_progress_count(), recount);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_a_create_one_in_progress() {
    let mgr = make_manager().await;
    let task = mgr
        .create(draft("Buy milk").with_priority(Priority::Mid))
        .await
        .unwrap();

    let snap = mgr.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap.get(task.id).unwrap().title, "Buy milk");
    assert_eq!(snap.in_progress_count(), 1);
    assert_converged(&mgr).await;
}

#[tokio::test]
async fn scenario_b_complete_via_update() {
    let mgr = make_manager().await;
    let task = mgr.create(draft("Buy milk")).await.unwrap();

    let outcome = mgr
        .update(task.with_status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(mgr.in_progress_count(), 0);
    assert_converged(&mgr).await;
}

#[tokio::test]
async fn scenario_c_delete() {
    let mgr = make_manager().await;
    let task = mgr.create(draft("Buy milk")).await.unwrap();

    assert_eq!(mgr.delete(task.id).await.unwrap(), Outcome::Applied);
    assert!(mgr.snapshot().is_empty());
    assert_eq!(mgr.in_progress_count(), 0);
    assert_converged(&mgr).await;
}

#[tokio::test]
async fn scenario_d_empty_title_rejected_before_store() {
    let mgr = make_manager().await;
    let before = mgr.store().database().last_commit();

    let err = mgr.create(draft("")).await.unwrap_err();
    assert!(matches!(err, TaskError::Validation(ValidationError::TitleEmpty)));
    assert!(mgr.snapshot().is_empty());
    assert_eq!(mgr.store().database().last_commit(), before);
    assert!(mgr.store().list_all().await.unwrap().tasks.is_empty());
}

#[tokio::test]
async fn scenario_e_mark_first_of_two() {
    let mgr = make_manager().await;
    let first = mgr.create(draft("first")).await.unwrap();
    let second = mgr.create(draft("second")).await.unwrap();
    assert_eq!(mgr.in_progress_count(), 2);

    mgr.mark_completed(first.id).await.unwrap();
    let snap = mgr.snapshot();
    assert_eq!(snap.in_progress_count(), 1);
    assert_eq!(snap.get(first.id).unwrap().status, TaskStatus::Completed);
    assert_eq!(snap.get(second.id), Some(&second));
    assert_converged(&mgr).await;
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ids_are_unique_and_never_reused() {
    let mgr = make_manager().await;
    let mut seen = HashSet::new();
    for round in 0..5 {
        let a = mgr.create(draft(&format!("a{round}"))).await.unwrap();
        let b = mgr.create(draft(&format!("b{round}"))).await.unwrap();
        assert!(seen.insert(a.id));
        assert!(seen.insert(b.id));
        // Deleting the newest row must not free its id.
        mgr.delete(b.id).await.unwrap();
    }
    assert_eq!(seen.len(), 10);
    assert_eq!(mgr.snapshot().len(), 5);
}

#[tokio::test]
async fn load_all_is_idempotent() {
    let mgr = make_manager().await;
    mgr.create(draft("a")).await.unwrap();
    let b = mgr.create(draft("b")).await.unwrap();
    mgr.mark_completed(b.id).await.unwrap();

    assert_eq!(mgr.load_all().await.unwrap(), Outcome::Applied);
    let first = mgr.snapshot();
    assert_eq!(mgr.load_all().await.unwrap(), Outcome::Applied);
    assert_eq!(mgr.snapshot(), first);
    assert_eq!(first.in_progress_count(), 1);
}

#[tokio::test]
async fn mark_completed_never_raises_count() {
    let mgr = make_manager().await;
    let task = mgr
        .create(draft("done").with_status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(mgr.in_progress_count(), 0);
    assert_eq!(mgr.mark_completed(task.id).await.unwrap(), Outcome::Unchanged);
    assert_eq!(mgr.in_progress_count(), 0);
}

#[tokio::test]
async fn update_of_row_missing_from_store_is_noop() {
    let mgr = make_manager().await;
    let task = mgr.create(draft("gone")).await.unwrap();
    // Removed behind the manager's back.
    mgr.store().delete(task.id).await.unwrap();

    let outcome = mgr
        .update(task.with_status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(mgr.snapshot().get(task.id), Some(&task));

    mgr.load_all().await.unwrap();
    assert_converged(&mgr).await;
}

#[tokio::test]
async fn load_picks_up_rows_written_elsewhere() {
    let db = Database::open_in_memory().unwrap();
    let other = SqliteTaskStore::new(db.clone());
    let mgr = TaskManager::start(SqliteTaskStore::new(db)).await.unwrap();
    other.initialize().await.unwrap();
    other.insert(&draft("external")).await.unwrap();

    assert!(mgr.snapshot().is_empty());
    mgr.load_all().await.unwrap();
    assert_eq!(mgr.snapshot().len(), 1);
    assert_eq!(mgr.in_progress_count(), 1);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_operations_converge_with_store() {
    let mgr = Arc::new(make_manager().await);

    let mut creates = JoinSet::new();
    for i in 0..20 {
        let mgr = Arc::clone(&mgr);
        creates.spawn(async move { mgr.create(draft(&format!("task {i}"))).await });
    }
    let mut ids = Vec::new();
    while let Some(res) = creates.join_next().await {
        ids.push(res.unwrap().unwrap().id);
    }
    ids.sort();
    assert_eq!(ids.len(), 20);
    assert_eq!(mgr.in_progress_count(), 20);

    let mut writes = JoinSet::new();
    for (i, id) in ids.iter().copied().enumerate() {
        let mgr = Arc::clone(&mgr);
        writes.spawn(async move {
            match i % 4 {
                0 => mgr.delete(id).await,
                1 => mgr.mark_completed(id).await,
                2 => {
                    let task = mgr.snapshot().get(id).cloned().unwrap();
                    mgr.update(task.with_status(TaskStatus::Completed)).await
                }
                _ => Ok(Outcome::Unchanged),
            }
        });
    }
    while let Some(res) = writes.join_next().await {
        res.unwrap().unwrap();
    }

    assert_eq!(mgr.snapshot().len(), 15);
    assert_eq!(mgr.in_progress_count(), 5);
    assert_converged(&mgr).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_writes_to_one_task_keep_the_last_landed() {
    let mgr = Arc::new(make_manager().await);
    let task = mgr.create(draft("contested")).await.unwrap();

    let mut writes = JoinSet::new();
    for i in 0..16 {
        let mgr = Arc::clone(&mgr);
        let mut next = task.clone();
        next.title = format!("version {i}");
        next.status = if i % 2 == 0 {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        };
        writes.spawn(async move { mgr.update(next).await });
    }
    while let Some(res) = writes.join_next().await {
        let outcome = res.unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Applied | Outcome::Superseded));
    }

    assert_converged(&mgr).await;
    assert_eq!(mgr.snapshot().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn load_racing_writes_never_regresses() {
    let mgr = Arc::new(make_manager().await);
    let mut set = JoinSet::new();
    for i in 0..10 {
        let creator = Arc::clone(&mgr);
        set.spawn(async move {
            creator
                .create(draft(&format!("t{i}")))
                .await
                .map(|_| Outcome::Applied)
        });
        let loader = Arc::clone(&mgr);
        set.spawn(async move { loader.load_all().await });
    }
    while let Some(res) = set.join_next().await {
        res.unwrap().unwrap();
    }
    assert_eq!(mgr.snapshot().len(), 10);
    assert_converged(&mgr).await;
}

#[tokio::test]
async fn unknown_id_operations_are_noops() {
    let mgr = make_manager().await;
    let ghost = TaskId::from_raw(12345);
    assert_eq!(mgr.delete(ghost).await.unwrap(), Outcome::NotFound);
    assert_eq!(mgr.mark_completed(ghost).await.unwrap(), Outcome::NotFound);
    assert!(mgr.snapshot().is_empty());
}
