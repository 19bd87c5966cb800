//! SQLite-backed [`TaskStore`].

use std::sync::atomic::{AtomicBool, Ordering};

use daybook_model::{Task, TaskDraft, TaskId, validate_title};
use rusqlite::types::Value;

use super::{Database, Inserted, Listing, StoreError, TaskStore, Written};

/// Schema for the task table.
///
/// `AUTOINCREMENT` keeps SQLite from handing out the rowid of a deleted
/// maximum row again, including across reopen.
const CREATE_TASKS: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        date TEXT NOT NULL,
        priority TEXT NOT NULL CHECK(priority IN ('low', 'mid', 'high')),
        status TEXT NOT NULL CHECK(status IN ('in progress', 'completed'))
    );
";

const INSERT_TASK: &str =
    "INSERT INTO tasks (title, description, date, priority, status) VALUES (?1, ?2, ?3, ?4, ?5)";

const UPDATE_TASK: &str = "UPDATE tasks SET title = ?1, description = ?2, date = ?3, priority = ?4, \
     status = ?5 WHERE id = ?6";

const DELETE_TASK: &str = "DELETE FROM tasks WHERE id = ?1";

const SELECT_TASKS: &str =
    "SELECT id, title, description, date, priority, status FROM tasks ORDER BY id";

/// A `tasks` row as stored, before field decoding.
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    date: String,
    priority: String,
    status: String,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            date: row.get(3)?,
            priority: row.get(4)?,
            status: row.get(5)?,
        })
    }

    /// A blank title makes the row corrupt. The title length limit is a
    /// write-time setting and is not re-checked here.
    fn decode(self) -> Result<Task, StoreError> {
        let id = self.id;
        let corrupt = move |e: daybook_model::ValidationError| StoreError::Corrupt {
            id,
            reason: e.to_string(),
        };
        Ok(Task {
            id: TaskId::from_raw(id),
            date: self.date.parse().map_err(corrupt)?,
            priority: self.priority.parse().map_err(corrupt)?,
            status: self.status.parse().map_err(corrupt)?,
            title: validate_title(&self.title, usize::MAX).map_err(corrupt)?,
            description: self.description,
        })
    }
}

fn field_params(
    title: &str,
    description: Option<&str>,
    date: impl ToString,
    priority: &str,
    status: &str,
) -> Vec<Value> {
    vec![
        Value::Text(title.to_string()),
        description.map_or(Value::Null, |d| Value::Text(d.to_string())),
        Value::Text(date.to_string()),
        Value::Text(priority.to_string()),
        Value::Text(status.to_string()),
    ]
}

/// Persistent task store over a [`Database`] handle.
#[derive(Debug)]
pub struct SqliteTaskStore {
    db: Database,
    initialized: AtomicBool,
}

impl SqliteTaskStore {
    /// Wraps a database handle. Call [`TaskStore::initialize`] before use.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            initialized: AtomicBool::new(false),
        }
    }

    /// The underlying database handle.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Uninitialized)
        }
    }
}

impl TaskStore for SqliteTaskStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.db.execute(CREATE_TASKS).await?;
        self.initialized.store(true, Ordering::Release);
        tracing::debug!("tasks table ready");
        Ok(())
    }

    async fn insert(&self, draft: &TaskDraft) -> Result<Inserted, StoreError> {
        self.ensure_initialized()?;
        let params = field_params(
            &draft.title,
            draft.description.as_deref(),
            draft.date,
            draft.priority.as_str(),
            draft.status.as_str(),
        );
        let res = self.db.run(INSERT_TASK, params).await?;
        let id = res
            .inserted_id
            .ok_or_else(|| StoreError::Unavailable("insert returned no rowid".to_string()))?;
        Ok(Inserted {
            id: TaskId::from_raw(id),
            commit: res.commit,
        })
    }

    async fn update(&self, task: &Task) -> Result<Written, StoreError> {
        self.ensure_initialized()?;
        let mut params = field_params(
            &task.title,
            task.description.as_deref(),
            task.date,
            task.priority.as_str(),
            task.status.as_str(),
        );
        params.push(Value::Integer(task.id.get()));
        let res = self.db.run(UPDATE_TASK, params).await?;
        Ok(Written {
            affected: res.affected_rows,
            commit: res.commit,
        })
    }

    async fn delete(&self, id: TaskId) -> Result<Written, StoreError> {
        self.ensure_initialized()?;
        let res = self
            .db
            .run(DELETE_TASK, vec![Value::Integer(id.get())])
            .await?;
        Ok(Written {
            affected: res.affected_rows,
            commit: res.commit,
        })
    }

    async fn list_all(&self) -> Result<Listing, StoreError> {
        self.ensure_initialized()?;
        let rows = self
            .db
            .query(SELECT_TASKS, Vec::new(), TaskRow::from_row)
            .await?;
        let tasks = rows
            .rows
            .into_iter()
            .map(TaskRow::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Listing {
            tasks,
            as_of: rows.as_of,
        })
    }
}
