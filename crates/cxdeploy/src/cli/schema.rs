//! `cxdeploy schema`: discover, export and deploy.

use super::ProjectArgs;
use anyhow::{Context, Result};
use clap::Args;
use cxdeploy::{DdlUnit, DeploymentStatus, RunSummary, SchemaDeployment, XmlDeploymentLoader};
use cxdeploy_db::DbConnection;
use std::path::Path;

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Drop the schema before creating it
    #[arg(long)]
    pub drop: bool,

    /// Database URL: duckdb:<path> or duckdb::memory:
    #[arg(long, env = "CXDEPLOY_DATABASE_URL", value_name = "URL")]
    pub database_url: Option<String>,

    /// Leave the DDL engine open after the run
    #[arg(long)]
    pub keep_engine_open: bool,

    /// Output the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: SchemaArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = args.project.to_config(config_path)?;
    if args.drop {
        config.drop = true;
    }
    if let Some(url) = &args.database_url {
        config.database_url = url.clone();
    }
    if args.keep_engine_open {
        config.close_engine = false;
    }

    let conn = DbConnection::open_from_url(&config.database_url)
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    let engine = DdlUnit::new(conn.clone());
    let loader = XmlDeploymentLoader::new(conn);

    let summary = SchemaDeployment::new(config, engine, loader)
        .execute()
        .context("DDL export failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Run {}", summary.run_id);
    println!(
        "Schema objects: {} in {} schema(s)",
        summary.objects.len(),
        summary.schemata
    );
    for object in &summary.objects {
        println!("  {}.{}", object.schema, object.name);
    }
    if summary.created {
        println!(
            "Statements: {} ({} failed){}",
            summary.messages.len(),
            summary.error_count(),
            if summary.dropped { ", schema dropped first" } else { "" }
        );
    }

    println!("Deployments:");
    for outcome in &summary.deployments {
        let status = match &outcome.status {
            DeploymentStatus::Applied { rows } => format!("applied ({} rows)", rows),
            DeploymentStatus::Missing => "missing".to_string(),
            DeploymentStatus::Failed { error } => format!("FAILED: {}", error),
        };
        println!("  {:<40} {}", outcome.deployment, status);
    }
}
