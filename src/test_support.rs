use std::cell::{Cell, RefCell};

use crate::connection::{Connection, Row, SqlValue, SqliteConnection};
use crate::error::{StoreError, StoreResult};

fn injected_failure(message: &str) -> StoreError {
    StoreError::Storage(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
        Some(message.to_string()),
    ))
}

/// In-memory SQLite connection that records transaction calls and executed
/// statements, and can be told to fail.
pub(crate) struct RecordingConnection {
    inner: SqliteConnection,
    begins: Cell<usize>,
    commits: Cell<usize>,
    rollbacks: Cell<usize>,
    queries: Cell<usize>,
    fail_commit: Cell<bool>,
    fail_execute_prefix: RefCell<Option<String>>,
    executed: RefCell<Vec<String>>,
}

impl Default for RecordingConnection {
    fn default() -> Self {
        Self {
            inner: SqliteConnection::open_in_memory().expect("in-memory sqlite should open"),
            begins: Cell::new(0),
            commits: Cell::new(0),
            rollbacks: Cell::new(0),
            queries: Cell::new(0),
            fail_commit: Cell::new(false),
            fail_execute_prefix: RefCell::new(None),
            executed: RefCell::new(Vec::new()),
        }
    }
}

impl RecordingConnection {
    pub fn begins(&self) -> usize {
        self.begins.get()
    }

    pub fn commits(&self) -> usize {
        self.commits.get()
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.get()
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }

    pub fn fail_commit(&self) {
        self.fail_commit.set(true);
    }

    /// Fails every `execute` whose statement starts with `prefix`.
    pub fn fail_execute_starting_with(&self, prefix: &str) {
        *self.fail_execute_prefix.borrow_mut() = Some(prefix.to_string());
    }

    pub fn executed_matching(&self, prefix: &str) -> usize {
        self.executed
            .borrow()
            .iter()
            .filter(|sql| sql.starts_with(prefix))
            .count()
    }
}

impl Connection for RecordingConnection {
    fn query(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Row>> {
        self.queries.set(self.queries.get() + 1);
        self.inner.query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> StoreResult<usize> {
        let should_fail = self
            .fail_execute_prefix
            .borrow()
            .as_deref()
            .is_some_and(|prefix| sql.starts_with(prefix));
        if should_fail {
            return Err(injected_failure("injected execute failure"));
        }
        self.executed.borrow_mut().push(sql.to_string());
        self.inner.execute(sql, params)
    }

    fn last_insert_id(&self) -> i64 {
        self.inner.last_insert_id()
    }

    fn begin_transaction(&self) -> StoreResult<()> {
        self.begins.set(self.begins.get() + 1);
        self.inner.begin_transaction()
    }

    fn commit(&self) -> StoreResult<()> {
        self.commits.set(self.commits.get() + 1);
        if self.fail_commit.get() {
            return Err(injected_failure("injected commit failure"));
        }
        self.inner.commit()
    }

    fn rollback(&self) -> StoreResult<()> {
        self.rollbacks.set(self.rollbacks.get() + 1);
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}
