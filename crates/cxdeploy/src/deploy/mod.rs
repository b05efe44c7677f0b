//! Deployment planning and application.

mod applier;
mod loader;
mod planner;

pub use applier::{DeploymentApplier, DeploymentOutcome, DeploymentStatus};
pub use loader::{deployment_path, DeploymentLoader, OnExist, XmlDeploymentLoader};
pub use planner::{DeploymentPlan, DeploymentPlanner, DEFAULT_DEPLOYMENT_STEM};
