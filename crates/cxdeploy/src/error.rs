//! Error types for schema discovery and deployment

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for a deployment run.
///
/// Only failures that make the whole run meaningless end up here. Problems
/// with a single candidate, package or deployment file are logged and
/// skipped where they happen.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Classpath preparation failed: {0}")]
    Classpath(#[from] ClasspathError),

    #[error("DDL engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] cxdeploy_db::BackendError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(Error, Debug)]
pub enum ClasspathError {
    #[error("Classpath root does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("Cannot access classpath root {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to load or instantiate one type.
#[derive(Error, Debug)]
pub enum TypeError {
    #[error("Type not found: {0}")]
    NotFound(String),

    #[error("Cannot read descriptor {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Malformed descriptor for {name}: {source}")]
    Descriptor {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Type {0} has no object definition")]
    MissingObject(String),

    #[error("Type {0} cannot be default-constructed")]
    NotConstructible(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("DDL engine is closed")]
    Closed,

    #[error("Database error: {0}")]
    Database(#[from] cxdeploy_db::BackendError),
}

/// Failure to apply one deployment file.
#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed XML in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Invalid deployment {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("Database rejected {}: {source}", path.display())]
    Database {
        path: PathBuf,
        #[source]
        source: cxdeploy_db::BackendError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
