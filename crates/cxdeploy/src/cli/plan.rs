//! `cxdeploy plan`: show the deployment order without applying anything.

use super::ProjectArgs;
use anyhow::{Context, Result};
use clap::Args;
use cxdeploy::{build_context, deployment_path, plan_deployments};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PlannedDeployment {
    deployment: String,
    exists: bool,
}

pub fn run(args: PlanArgs, config_path: Option<&Path>) -> Result<()> {
    let config = args.project.to_config(config_path)?;
    let ctx = build_context(&config).context("Failed to build execution context")?;
    let plan = plan_deployments(&ctx, &config);

    let entries: Vec<PlannedDeployment> = plan
        .iter()
        .map(|id| PlannedDeployment {
            deployment: id.to_string(),
            exists: deployment_path(ctx.output_root(), id).is_file(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No deployments planned.");
    }
    for (i, entry) in entries.iter().enumerate() {
        let marker = if entry.exists { "" } else { "  (missing)" };
        println!("{:>3}. {}{}", i + 1, entry.deployment, marker);
    }
    Ok(())
}
