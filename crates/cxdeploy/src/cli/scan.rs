//! `cxdeploy scan`: list schema objects without touching a database.

use super::ProjectArgs;
use anyhow::{Context, Result};
use clap::Args;
use cxdeploy::{
    build_context, CandidateScanner, DdlEngine, EngineError, Message, SchemaObject,
    SchemaObjectResolver, SchemaRegistry,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum CandidateStatus {
    Object { schema: String, name: String },
    Duplicate { schema: String, name: String },
    Skipped,
    Error { error: String },
}

#[derive(Debug, Serialize)]
struct ScannedCandidate {
    type_name: String,
    package: String,
    source: PathBuf,
    #[serde(flatten)]
    status: CandidateStatus,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    packages: Vec<String>,
    schemata: usize,
    candidates: Vec<ScannedCandidate>,
}

/// Registry backend that only tracks namespaces.
#[derive(Default)]
struct DryRunEngine {
    namespaces: BTreeSet<String>,
}

impl DdlEngine for DryRunEngine {
    fn add_object(&mut self, object: Rc<dyn SchemaObject>) {
        self.namespaces.insert(object.schema_name().to_string());
    }

    fn schemata(&self) -> usize {
        self.namespaces.len()
    }

    fn drop(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn create(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn msgs(&self) -> &[Message] {
        &[]
    }

    fn close(&mut self) {}
}

pub fn run(args: ScanArgs, config_path: Option<&Path>) -> Result<()> {
    let config = args.project.to_config(config_path)?;
    let ctx = Rc::new(build_context(&config).context("Failed to build execution context")?);
    let _scope = ctx.enter();

    let packages = config.packages.clone().unwrap_or_default();
    let scanner = CandidateScanner::new(config.type_suffix.clone());
    let resolver = SchemaObjectResolver::new();
    let mut registry = SchemaRegistry::new(DryRunEngine::default());
    let mut candidates = Vec::new();

    for package in &packages {
        for candidate in scanner.scan(&ctx, package) {
            let status = match resolver.try_resolve(&ctx, &candidate) {
                Ok(Some(object)) => {
                    let schema = object.schema_name().to_string();
                    let name = object.object_name().to_string();
                    if registry.add_object(object) {
                        CandidateStatus::Object { schema, name }
                    } else {
                        CandidateStatus::Duplicate { schema, name }
                    }
                }
                Ok(None) => CandidateStatus::Skipped,
                Err(e) => CandidateStatus::Error {
                    error: e.to_string(),
                },
            };
            candidates.push(ScannedCandidate {
                type_name: candidate.type_name,
                package: candidate.package,
                source: candidate.source,
                status,
            });
        }
    }

    let report = ScanReport {
        packages,
        schemata: registry.schemata(),
        candidates,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    if report.packages.is_empty() {
        println!("No packages configured; nothing to scan.");
        return;
    }

    for candidate in &report.candidates {
        let status = match &candidate.status {
            CandidateStatus::Object { schema, name } => format!("{}.{}", schema, name),
            CandidateStatus::Duplicate { schema, name } => {
                format!("{}.{} (duplicate, ignored)", schema, name)
            }
            CandidateStatus::Skipped => "-".to_string(),
            CandidateStatus::Error { error } => format!("ERROR: {}", error),
        };
        println!("  {:<48} {}", candidate.type_name, status);
    }

    let objects = report
        .candidates
        .iter()
        .filter(|c| matches!(c.status, CandidateStatus::Object { .. }))
        .count();
    println!(
        "{} candidate(s), {} schema object(s) in {} schema(s)",
        report.candidates.len(),
        objects,
        report.schemata
    );
}
