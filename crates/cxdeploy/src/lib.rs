//! cxdeploy - schema discovery and deployment for compiled build output.
//!
//! A run builds an isolated [`ExecutionContext`] from the build's output and
//! dependency roots, scans the configured packages for types that declare
//! themselves schema objects, exports them through a [`DdlEngine`] and then
//! applies deployment data files in a deterministic order.
//!
//! Failures are isolated at the smallest scope: one broken type, one missing
//! package or one bad deployment file is logged and skipped.

pub mod classpath;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod orchestrator;
pub mod resolve;
pub mod scanner;
pub mod schema;

#[cfg(test)]
mod test_support;

pub use classpath::{ArtifactClasspath, ClasspathRoot};
pub use config::DeployConfig;
pub use context::{ContextScope, ExecutionContext, FileListing};
pub use deploy::{
    deployment_path, DeploymentApplier, DeploymentLoader, DeploymentOutcome, DeploymentPlan,
    DeploymentPlanner, DeploymentStatus, OnExist, XmlDeploymentLoader,
};
pub use error::{
    ClasspathError, ConfigError, DeployError, DeploymentError, EngineError, Result, TypeError,
};
pub use orchestrator::{
    build_context, discover, plan_deployments, ObjectSummary, RunSummary, SchemaDeployment,
};
pub use resolve::{
    is_schema_object_type, DescriptorResolver, LoadedType, ObjectDefinition, SchemaObjectResolver,
    TypeResolver,
};
pub use scanner::{is_top_level_type_name, Candidate, CandidateScanner, PackageScan};
pub use schema::{DdlEngine, DdlUnit, Message, MessageKind, SchemaObject, SchemaRegistry};
