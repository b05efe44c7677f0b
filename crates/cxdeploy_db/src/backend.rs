//! DuckDB connection shared by the DDL engine and the seed loader.
//!
//! Every statement runs inside a debug span tagged with a stable hash of its
//! SQL, so `--verbose` runs can correlate statements without logging values.

use crate::lock::{DbLockGuard, LockError};
use duckdb::types::{FromSql, Value};
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug_span, info, Span};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database is locked by another process: {0}")]
    Locked(String),

    #[error("Cannot prepare database location: {0}")]
    Setup(String),

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    #[error("Transaction failed: {cause}; rollback failed: {rollback}")]
    Rollback { cause: String, rollback: String },

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

/// Statement parameter. Deployment values are always bound as text and cast
/// by DuckDB to the column type.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Integer(i64),
    Text(String),
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl DbValue {
    fn to_duckdb(&self) -> Value {
        match self {
            DbValue::Integer(v) => Value::BigInt(*v),
            DbValue::Text(v) => Value::Text(v.clone()),
        }
    }
}

/// Handle to one DuckDB database.
///
/// Clones share the same connection (and, for files, the same lock), so the
/// engine and the loader of a run see each other's writes. The database is
/// released when the last clone is dropped.
#[derive(Clone)]
pub struct DbConnection {
    conn: Rc<duckdb::Connection>,
    lock: Option<Rc<DbLockGuard>>,
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnection")
            .field("locked_file", &self.lock.as_ref().map(|g| g.lock_path()))
            .finish()
    }
}

impl DbConnection {
    /// Open `duckdb::memory:` or `duckdb:<path>`.
    pub fn open_from_url(url: &str) -> Result<Self, BackendError> {
        match url.strip_prefix("duckdb:") {
            Some(":memory:") => Self::open_duckdb_memory(),
            Some(path) if !path.is_empty() => Self::open_duckdb(Path::new(path)),
            _ => Err(BackendError::UnsupportedUrl(url.to_string())),
        }
    }

    /// Open a database file, creating its directory and taking the
    /// single-writer lock first.
    pub fn open_duckdb(path: &Path) -> Result<Self, BackendError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| BackendError::Setup(format!("{}: {}", parent.display(), e)))?;
        }

        let lock = DbLockGuard::acquire(path).map_err(|e| match e {
            LockError::Locked(p) => BackendError::Locked(p.display().to_string()),
            other => BackendError::Setup(other.to_string()),
        })?;
        let conn = duckdb::Connection::open(path)?;
        info!("Opened DuckDB database {}", path.display());

        Ok(Self {
            conn: Rc::new(conn),
            lock: Some(Rc::new(lock)),
        })
    }

    pub fn open_duckdb_memory() -> Result<Self, BackendError> {
        let conn = duckdb::Connection::open_in_memory()?;
        info!("Opened in-memory DuckDB database");
        Ok(Self {
            conn: Rc::new(conn),
            lock: None,
        })
    }

    /// Run one parameterized statement, returning the affected row count.
    pub fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, BackendError> {
        execute_on(&self.conn, sql, params)
    }

    /// Run one or more statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<(), BackendError> {
        let span = statement_span("db.exec_batch", sql);
        let _enter = span.enter();
        let start = Instant::now();
        self.conn.execute_batch(sql)?;
        record_duration(&span, start);
        Ok(())
    }

    /// First column of the single row returned by `sql`.
    pub fn query_scalar<T: FromSql>(
        &self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<T, BackendError> {
        let span = statement_span("db.query", sql);
        let _enter = span.enter();
        let start = Instant::now();
        let values: Vec<Value> = params.iter().map(DbValue::to_duckdb).collect();
        let value = self
            .conn
            .query_row(sql, duckdb::params_from_iter(values), |row| row.get(0))?;
        record_duration(&span, start);
        Ok(value)
    }

    /// Run `op` between BEGIN and COMMIT; any error rolls everything back.
    pub fn transaction<T, F>(&self, op: F) -> Result<T, BackendError>
    where
        F: FnOnce(&mut DbTransaction<'_>) -> Result<T, BackendError>,
    {
        self.conn.execute_batch("BEGIN")?;
        let mut tx = DbTransaction { conn: &self.conn };
        match op(&mut tx) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(cause) => match self.conn.execute_batch("ROLLBACK") {
                Ok(()) => Err(cause),
                Err(rollback) => Err(BackendError::Rollback {
                    cause: cause.to_string(),
                    rollback: rollback.to_string(),
                }),
            },
        }
    }
}

/// Statements issued inside [`DbConnection::transaction`].
pub struct DbTransaction<'a> {
    conn: &'a duckdb::Connection,
}

impl DbTransaction<'_> {
    pub fn execute(&mut self, sql: &str, params: &[DbValue]) -> Result<u64, BackendError> {
        execute_on(self.conn, sql, params)
    }
}

fn execute_on(
    conn: &duckdb::Connection,
    sql: &str,
    params: &[DbValue],
) -> Result<u64, BackendError> {
    let span = statement_span("db.exec", sql);
    let _enter = span.enter();
    let start = Instant::now();
    let values: Vec<Value> = params.iter().map(DbValue::to_duckdb).collect();
    let rows = conn.execute(sql, duckdb::params_from_iter(values))?;
    record_duration(&span, start);
    Ok(rows as u64)
}

fn statement_span(kind: &'static str, sql: &str) -> Span {
    let op = sql.split_whitespace().next().unwrap_or("unknown");
    debug_span!(
        "db",
        kind,
        op,
        sql_hash = %hash_sql(sql),
        duration_ms = tracing::field::Empty
    )
}

fn record_duration(span: &Span, start: Instant) {
    span.record("duration_ms", start.elapsed().as_millis() as u64);
}

/// FNV-1a 64-bit, hex encoded.
fn hash_sql(sql: &str) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in sql.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:016x}", hash)
}

/// Quote a single SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote each segment of a dotted name such as `schema.table`.
pub fn quote_ident_path(path: &str) -> String {
    path.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}
