use crate::context::ExecutionContext;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, warn};

/// Stem of the deployment that is always planned first.
pub const DEFAULT_DEPLOYMENT_STEM: &str = "default";

/// Ordered, de-duplicated deployment identifiers relative to the output root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeploymentPlan {
    entries: Vec<String>,
}

impl DeploymentPlan {
    /// Append `id` unless it is already planned.
    fn push(&mut self, seen: &mut HashSet<String>, id: String) {
        if seen.insert(id.clone()) {
            self.entries.push(id);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

pub struct DeploymentPlanner<'a> {
    ctx: &'a ExecutionContext,
    suffix: &'a str,
}

impl<'a> DeploymentPlanner<'a> {
    pub fn new(ctx: &'a ExecutionContext, suffix: &'a str) -> Self {
        Self { ctx, suffix }
    }

    /// Plan order: the implicit default, then per-package discoveries in
    /// package order, then root discoveries, then explicit identifiers.
    /// Each identifier appears once, at its first position.
    pub fn plan(&self, packages: Option<&[String]>, explicit: &[String]) -> DeploymentPlan {
        let mut plan = DeploymentPlan::default();
        let mut seen = HashSet::new();

        plan.push(&mut seen, format!("{}{}", DEFAULT_DEPLOYMENT_STEM, self.suffix));

        if let Some(packages) = packages {
            for package in packages {
                let rel = package.replace('.', "/");
                for id in self.discover(&rel) {
                    plan.push(&mut seen, id);
                }
            }
        }

        for id in self.discover("") {
            plan.push(&mut seen, id);
        }

        for id in explicit {
            plan.push(&mut seen, id.clone());
        }

        debug!(deployments = plan.len(), "Planned deployments");
        plan
    }

    /// Identifiers of the deployment files directly inside `rel_dir`.
    fn discover(&self, rel_dir: &str) -> Vec<String> {
        let Some(listing) = self.ctx.list_files(Path::new(rel_dir)) else {
            warn!("Could not process deployments for package {}.", rel_dir);
            return Vec::new();
        };

        let mut found = Vec::new();
        for entry in listing {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    error!(error = %e, "Could not list deployments in {}", rel_dir);
                    continue;
                }
            };
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(self.suffix) {
                continue;
            }
            if rel_dir.is_empty() {
                found.push(name.to_string());
            } else {
                found.push(format!("{}/{}", rel_dir, name));
            }
        }
        found
    }
}
