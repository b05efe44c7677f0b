//! DuckDB backend for cxdeploy.
//!
//! Schema export and seed-data loading both run against a single synchronous
//! connection. Nothing here knows about schema objects or deployments; the
//! orchestrator crate drives this layer through its engine and loader.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cxdeploy_db::{DbConnection, DbValue};
//!
//! let conn = DbConnection::open_from_url("duckdb::memory:")?;
//! conn.execute_batch("CREATE TABLE users (login VARCHAR)")?;
//! conn.execute("INSERT INTO users VALUES (?)", &[DbValue::from("admin")])?;
//! let count: i64 = conn.query_scalar("SELECT COUNT(*) FROM users", &[])?;
//! ```

mod backend;
pub mod lock;

pub use backend::{
    quote_ident, quote_ident_path, BackendError, DbConnection, DbTransaction, DbValue,
};
pub use lock::{lock_path_for, DbLockGuard, LockError};

/// Database URL for an in-memory DuckDB instance.
pub const MEMORY_URL: &str = "duckdb::memory:";
