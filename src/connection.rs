use std::collections::BTreeMap;

use rusqlite::params_from_iter;
use tracing::{debug, trace};

use crate::db;
use crate::error::{StoreError, StoreResult};

pub use rusqlite::types::Value as SqlValue;

/// One result row keyed by column name.
pub type Row = BTreeMap<String, SqlValue>;

/// The storage handle repositories and the unit of work share.
///
/// Implementations are used from one thread at a time; a unit of work owns
/// the connection for the duration of its transaction.
pub trait Connection {
    fn query(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Row>>;
    fn execute(&self, sql: &str, params: &[SqlValue]) -> StoreResult<usize>;
    fn last_insert_id(&self) -> i64;
    fn begin_transaction(&self) -> StoreResult<()>;
    fn commit(&self) -> StoreResult<()>;
    fn rollback(&self) -> StoreResult<()>;
    fn in_transaction(&self) -> bool;
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn open(path: &str) -> StoreResult<Self> {
        Ok(Self {
            conn: db::open_connection(path)?,
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }
}

impl Connection for SqliteConnection {
    fn query(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Row>> {
        trace!(sql, params = params.len(), "query");
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                record.insert(column.clone(), row.get::<_, SqlValue>(index)?);
            }
            result.push(record);
        }
        Ok(result)
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> StoreResult<usize> {
        trace!(sql, params = params.len(), "execute");
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn begin_transaction(&self) -> StoreResult<()> {
        if self.in_transaction() {
            return Err(StoreError::Transaction("connection is already in a transaction"));
        }
        debug!("BEGIN");
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        debug!("COMMIT");
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        debug!("ROLLBACK");
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}
