//! cxdeploy command-line launcher
//!
//! Discovers schema objects in a compiled output directory, exports them to
//! DuckDB and applies deployment data files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use cxdeploy_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(
    name = "cxdeploy",
    version,
    about = "Schema discovery and deployment for compiled build output"
)]
struct Cli {
    /// Enable debug logging on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file; relative paths inside it resolve against its directory
    #[arg(long, global = true, env = "CXDEPLOY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover schema objects, export them and apply deployments
    Schema(cli::schema::SchemaArgs),

    /// List schema objects found in the configured packages
    Scan(cli::scan::ScanArgs),

    /// Show the order in which deployments would be applied
    Plan(cli::plan::PlanArgs),
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Schema(args) => args.json,
            Commands::Scan(args) => args.json,
            Commands::Plan(args) => args.json,
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Schema(args) => cli::schema::run(args, config),
        Commands::Scan(args) => cli::scan::run(args, config),
        Commands::Plan(args) => cli::plan::run(args, config),
    }
}

/// Install logging, retrying without the log file if that fails.
///
/// Returns the warnings for the user; logging may not be up to report them.
fn setup_logging(config: LogConfig<'_>) -> Vec<String> {
    let mut warnings = Vec::new();
    let (app_name, verbose, file) = (config.app_name, config.verbose, config.file);
    if let Err(err) = init_logging(config) {
        warnings.push(format!("Warning: failed to initialize logging: {:#}", err));
        if file {
            let mut console_only = LogConfig::new(app_name);
            console_only.verbose = verbose;
            console_only.file = false;
            if let Err(err) = init_logging(console_only) {
                warnings.push(format!(
                    "Warning: failed to initialize console logging: {:#}",
                    err
                ));
            }
        }
    }
    warnings
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.command.wants_json();

    let mut log_config = LogConfig::new("cxdeploy");
    log_config.verbose = cli.verbose;
    log_config.file = matches!(cli.command, Commands::Schema(_));
    for warning in setup_logging(log_config) {
        eprintln!("{}", warning);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::print_json_error(&err);
            } else {
                eprintln!("Error: {:?}", err);
            }
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn failed_console_fallback_is_reported() {
        // Any earlier install leaves a global subscriber behind, so both
        // attempts below are refused.
        let mut console = LogConfig::new("cxdeploy");
        console.file = false;
        setup_logging(console);

        let tmp = TempDir::new().unwrap();
        let mut with_file = LogConfig::new("cxdeploy");
        with_file.log_dir = Some(tmp.path().to_path_buf());
        let warnings = setup_logging(with_file);

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Warning: failed to initialize logging"));
        assert!(warnings[1].starts_with("Warning: failed to initialize console logging"));
    }

    #[test]
    fn console_only_failure_is_not_retried() {
        let mut console = LogConfig::new("cxdeploy");
        console.file = false;
        setup_logging(console);

        let mut again = LogConfig::new("cxdeploy");
        again.file = false;
        let warnings = setup_logging(again);

        assert_eq!(warnings.len(), 1);
    }
}
