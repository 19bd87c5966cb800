//! SQLite connection handle shared by the task and note stores.
//!
//! [`Database`] is the minimal SQL surface the stores are written against:
//! [`execute`](Database::execute) for schema statements,
//! [`query`](Database::query) for reads and [`run`](Database::run) for
//! writes. The connection lives behind a mutex and every call runs on the
//! blocking thread pool, so callers never block the async runtime.
//!
//! The handle is created once at startup and cloned into the stores that
//! use it; clones share the same connection.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};

use super::{Commit, StoreError};

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Rows changed by the statement.
    pub affected_rows: usize,
    /// Rowid generated by an `INSERT`, if the statement was one.
    pub inserted_id: Option<i64>,
    /// Sequence number of this write.
    pub commit: Commit,
}

/// Rows returned by a read, stamped with the latest write they observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rows<T> {
    /// Decoded rows in statement order.
    pub rows: Vec<T>,
    /// The most recent commit visible to the read.
    pub as_of: Commit,
}

struct Inner {
    conn: Connection,
    last_commit: Commit,
}

/// Cloneable handle to one SQLite database.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("last_commit", &self.last_commit())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) a database file.
    ///
    /// Missing parent directories are created. The journal is switched to
    /// WAL and `busy_timeout` bounds how long a statement waits on a lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created, or
    /// [`StoreError::Sqlite`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        tracing::info!(path = %path.display(), "opened database");
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if SQLite cannot allocate it.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                conn,
                last_commit: Commit::ZERO,
            })),
        }
    }

    /// The most recent write on this handle.
    #[must_use]
    pub fn last_commit(&self) -> Commit {
        self.inner.lock().last_commit
    }

    /// Run one or more statements that return no rows (DDL, pragmas).
    ///
    /// Statements here are not record writes and do not advance the commit
    /// sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if any statement fails.
    pub async fn execute(&self, sql: &str) -> Result<(), StoreError> {
        let sql = sql.to_owned();
        self.with_inner(move |inner| {
            inner.conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
    }

    /// Run a read statement and decode each row with `map_row`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the statement or a row decode fails.
    pub async fn query<T, F>(
        &self,
        sql: &str,
        params: Vec<Value>,
        mut map_row: F,
    ) -> Result<Rows<T>, StoreError>
    where
        T: Send + 'static,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T> + Send + 'static,
    {
        let sql = sql.to_owned();
        self.with_inner(move |inner| {
            let mut stmt = inner.conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| map_row(row))?
                .collect::<rusqlite::Result<Vec<T>>>()?;
            Ok(Rows {
                rows,
                as_of: inner.last_commit,
            })
        })
        .await
    }

    /// Run a write statement.
    ///
    /// On success the write is assigned the next commit sequence number
    /// before the connection lock is released, so commit order is the
    /// order in which writes actually landed. Failed writes consume no
    /// sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the statement fails (read-only
    /// medium, constraint violation, busy timeout).
    pub async fn run(&self, sql: &str, params: Vec<Value>) -> Result<RunResult, StoreError> {
        let sql = sql.to_owned();
        self.with_inner(move |inner| {
            let affected_rows = {
                let mut stmt = inner.conn.prepare_cached(&sql)?;
                stmt.execute(params_from_iter(params))?
            };
            let inserted_id = is_insert(&sql).then(|| inner.conn.last_insert_rowid());
            inner.last_commit = inner.last_commit.next();
            Ok(RunResult {
                affected_rows,
                inserted_id,
                commit: inner.last_commit,
            })
        })
        .await
    }

    async fn with_inner<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Inner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("storage task failed: {e}")))?
    }
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
}
