//! cxdeploy Test Utilities
//!
//! Helpers shared by the unit and integration tests of the cxdeploy crates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cxdeploy_test_utils::{capture_logs, write_type, TypeFixture};
//!
//! let out = tempfile::TempDir::new()?;
//! write_type(out.path(), "com.acme.Users", &TypeFixture::table("users"))?;
//!
//! let (summary, logs) = capture_logs(|| deployment.execute());
//! assert_eq!(logs.count(Level::ERROR), 0);
//! ```

pub mod fixtures;
pub mod logs;

pub use fixtures::{
    type_entry_name, write_archive, write_corrupt_type, write_deployment, write_type, TypeFixture,
};
pub use logs::{capture_logs, CapturedLogs};
pub use tracing::Level;
