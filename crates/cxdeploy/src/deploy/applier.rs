use super::loader::{deployment_path, DeploymentLoader};
use super::planner::DeploymentPlan;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeploymentStatus {
    Applied { rows: usize },
    Missing,
    Failed { error: String },
}

/// Result of applying one planned deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentOutcome {
    pub deployment: String,
    #[serde(flatten)]
    pub status: DeploymentStatus,
}

impl DeploymentOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, DeploymentStatus::Applied { .. })
    }
}

/// Applies a [`DeploymentPlan`] in order, one loader call per file.
///
/// A missing or failing deployment never stops the ones after it.
pub struct DeploymentApplier<'a, L: DeploymentLoader> {
    output_root: &'a Path,
    loader: &'a mut L,
}

impl<'a, L: DeploymentLoader> DeploymentApplier<'a, L> {
    pub fn new(output_root: &'a Path, loader: &'a mut L) -> Self {
        Self {
            output_root,
            loader,
        }
    }

    pub fn apply(&mut self, plan: &DeploymentPlan) -> Vec<DeploymentOutcome> {
        plan.iter().map(|id| self.apply_one(id)).collect()
    }

    fn apply_one(&mut self, id: &str) -> DeploymentOutcome {
        let path = deployment_path(self.output_root, id);
        let status = if !path.is_file() {
            warn!("Omitting non-existent deployment {}.", id);
            DeploymentStatus::Missing
        } else {
            match self.loader.load_data(&path) {
                Ok(rows) => {
                    info!(rows, "Deployment {} processed successfully.", id);
                    DeploymentStatus::Applied { rows }
                }
                Err(e) => {
                    error!(error = %e, "Could not process deployment {}.", id);
                    DeploymentStatus::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };
        DeploymentOutcome {
            deployment: id.to_string(),
            status,
        }
    }
}
