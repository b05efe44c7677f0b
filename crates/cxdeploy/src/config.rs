//! Configuration for a deployment run

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inputs of one discovery-and-deployment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Compiled-output root that is scanned for types and deployments
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Extra classpath roots (directories or archives), after the output root
    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    /// Logical packages to scan. `None` skips discovery entirely.
    #[serde(default)]
    pub packages: Option<Vec<String>>,

    /// Drop the schema before creating it
    #[serde(default)]
    pub drop: bool,

    #[serde(default = "default_deployments_suffix")]
    pub deployments_suffix: String,

    /// Explicit deployment identifiers, relative to the output root
    #[serde(default)]
    pub deployments: Vec<String>,

    /// Close the DDL engine when the run ends
    #[serde(default = "default_close_engine")]
    pub close_engine: bool,

    #[serde(default = "default_type_suffix")]
    pub type_suffix: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target/classes")
}

fn default_deployments_suffix() -> String {
    ".cxd.xml".to_string()
}

fn default_close_engine() -> bool {
    true
}

fn default_type_suffix() -> String {
    ".type.json".to_string()
}

fn default_database_url() -> String {
    cxdeploy_db::MEMORY_URL.to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            classpath: Vec::new(),
            packages: None,
            drop: false,
            deployments_suffix: default_deployments_suffix(),
            deployments: Vec::new(),
            close_engine: default_close_engine(),
            type_suffix: default_type_suffix(),
            database_url: default_database_url(),
        }
    }
}

impl DeployConfig {
    /// Config for an output root with everything else defaulted.
    pub fn for_output(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// Relative paths in the file are taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: DeployConfig = toml::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deployments_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "deployments_suffix must not be empty".to_string(),
            ));
        }
        if self.type_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "type_suffix must not be empty".to_string(),
            ));
        }
        if let Some(packages) = &self.packages {
            if let Some(bad) = packages.iter().find(|p| p.contains('/') || p.contains('\\')) {
                return Err(ConfigError::Invalid(format!(
                    "package '{}' must be dot-separated, not a path",
                    bad
                )));
            }
        }
        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
        for entry in &mut self.classpath {
            if entry.is_relative() {
                *entry = base.join(&*entry);
            }
        }
    }
}
