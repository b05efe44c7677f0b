//! Single-writer lock for on-disk databases.
//!
//! A run that opens `deploy.duckdb` holds an advisory lock on
//! `deploy.duckdb.lock` until its last connection clone is dropped. Next to
//! the lock a `deploy.duckdb.lock.json` file names the holding process, so a
//! refused run can tell the user who to wait for.

use chrono::Utc;
use fs2::FileExt;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Database is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    #[error("Cannot open lock file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot lock {}: {source}", path.display())]
    Acquire {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Serialize)]
struct LockHolder<'a> {
    tool: &'static str,
    pid: u32,
    exe: Option<String>,
    database: &'a Path,
    acquired_at: String,
}

/// Exclusive lock on one database file, released on drop.
pub struct DbLockGuard {
    _file: File,
    lock_path: PathBuf,
    holder_path: Option<PathBuf>,
}

impl DbLockGuard {
    /// Take the lock for `db_path` without blocking.
    pub fn acquire(db_path: &Path) -> Result<Self, LockError> {
        let lock_path = lock_path_for(db_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| LockError::Open {
                path: lock_path.clone(),
                source,
            })?;

        // fs2's trait method, not std's `File::try_lock_exclusive`.
        if let Err(source) = FileExt::try_lock_exclusive(&file) {
            if source.kind() == io::ErrorKind::WouldBlock {
                return Err(LockError::Locked(db_path.to_path_buf()));
            }
            return Err(LockError::Acquire {
                path: lock_path,
                source,
            });
        }

        debug!(lock = %lock_path.display(), "Acquired database lock");
        let holder_path = write_holder(db_path, &lock_path);
        Ok(Self {
            _file: file,
            lock_path,
            holder_path,
        })
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// The holder description next to the lock, if it could be written.
    pub fn holder_path(&self) -> Option<&Path> {
        self.holder_path.as_deref()
    }
}

impl Drop for DbLockGuard {
    fn drop(&mut self) {
        if let Some(path) = self.holder_path.take() {
            if let Err(e) = fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "Could not remove lock holder file");
            }
        }
        debug!(lock = %self.lock_path.display(), "Released database lock");
    }
}

impl std::fmt::Debug for DbLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbLockGuard")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

/// `<db_path>.lock`, whatever the database file is called.
pub fn lock_path_for(db_path: &Path) -> PathBuf {
    with_suffix(db_path, ".lock")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_holder(db_path: &Path, lock_path: &Path) -> Option<PathBuf> {
    let holder = LockHolder {
        tool: "cxdeploy",
        pid: std::process::id(),
        exe: std::env::current_exe()
            .ok()
            .map(|p| p.display().to_string()),
        database: db_path,
        acquired_at: Utc::now().to_rfc3339(),
    };
    let path = with_suffix(lock_path, ".json");
    let written = serde_json::to_vec_pretty(&holder)
        .map_err(io::Error::other)
        .and_then(|payload| fs::write(&path, payload));

    match written {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not write lock holder file");
            None
        }
    }
}
