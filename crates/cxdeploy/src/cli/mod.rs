//! Command-line interface for cxdeploy
//!
//! `schema` runs a full export and deployment; `scan` and `plan` only look
//! at the compiled output and never open a database.

pub mod plan;
pub mod scan;
pub mod schema;

use anyhow::{Context, Result};
use clap::Args;
use cxdeploy::DeployConfig;
use std::path::{Path, PathBuf};

/// Project selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Compiled output directory (overrides `output_dir` from the config file)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Extra classpath root, directory or zip archive (repeatable)
    #[arg(long = "classpath", value_name = "PATH")]
    pub classpath: Vec<PathBuf>,

    /// Package to scan, e.g. com.acme.model (repeatable)
    #[arg(short = 'p', long = "package", value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Deployment file relative to the output root (repeatable)
    #[arg(long = "deployment", value_name = "FILE")]
    pub deployments: Vec<String>,

    /// Suffix of deployment files
    #[arg(long, value_name = "SUFFIX")]
    pub deployments_suffix: Option<String>,

    /// Suffix of type descriptor files
    #[arg(long, value_name = "SUFFIX")]
    pub type_suffix: Option<String>,
}

impl ProjectArgs {
    /// Merge the flags over the config file (if any) and validate the result.
    pub fn to_config(&self, config_path: Option<&Path>) -> Result<DeployConfig> {
        let mut config = match config_path {
            Some(path) => DeployConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => DeployConfig::default(),
        };

        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        config.classpath.extend(self.classpath.iter().cloned());
        if !self.packages.is_empty() {
            config.packages = Some(self.packages.clone());
        }
        for deployment in &self.deployments {
            if !config.deployments.contains(deployment) {
                config.deployments.push(deployment.clone());
            }
        }
        if let Some(suffix) = &self.deployments_suffix {
            config.deployments_suffix = suffix.clone();
        }
        if let Some(suffix) = &self.type_suffix {
            config.type_suffix = suffix.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Print an error as a JSON object on stdout, for `--json` callers.
pub fn print_json_error(err: &anyhow::Error) {
    let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
    let payload = serde_json::json!({
        "error": err.to_string(),
        "causes": causes,
    });
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("{:?}", err),
    }
}
