//! End-to-end run: discover, export, deploy.

use crate::classpath::ArtifactClasspath;
use crate::config::DeployConfig;
use crate::context::ExecutionContext;
use crate::deploy::{
    DeploymentApplier, DeploymentLoader, DeploymentOutcome, DeploymentPlan, DeploymentPlanner,
};
use crate::error::Result;
use crate::resolve::SchemaObjectResolver;
use crate::scanner::CandidateScanner;
use crate::schema::{DdlEngine, Message, SchemaObject, SchemaRegistry};
use serde::Serialize;
use std::rc::Rc;
use tracing::{info, info_span};
use uuid::Uuid;

/// What a run did, for callers that want more than the log.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub objects: Vec<ObjectSummary>,
    pub schemata: usize,
    pub dropped: bool,
    pub created: bool,
    pub messages: Vec<Message>,
    pub deployments: Vec<DeploymentOutcome>,
}

impl RunSummary {
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.kind() == crate::schema::MessageKind::Error)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub schema: String,
    pub name: String,
}

impl ObjectSummary {
    fn of(object: &dyn SchemaObject) -> Self {
        Self {
            schema: object.schema_name().to_string(),
            name: object.object_name().to_string(),
        }
    }
}

/// Build the isolated context for `config`: the output root followed by the
/// extra classpath entries.
pub fn build_context(config: &DeployConfig) -> Result<ExecutionContext> {
    config.validate()?;
    let classpath = ArtifactClasspath::build([&config.output_dir], &config.classpath)?;
    let output_root = config.output_dir.canonicalize()?;
    Ok(ExecutionContext::with_descriptors(
        classpath,
        output_root,
        &config.type_suffix,
    ))
}

/// Scan the configured packages and register every schema object found.
///
/// Does nothing when no packages are configured.
pub fn discover<E: DdlEngine>(
    ctx: &ExecutionContext,
    config: &DeployConfig,
    registry: &mut SchemaRegistry<E>,
) -> usize {
    let Some(packages) = config.packages.as_deref() else {
        return 0;
    };

    let scanner = CandidateScanner::new(config.type_suffix.clone());
    let resolver = SchemaObjectResolver::new();
    let mut added = 0;
    for package in packages {
        for candidate in scanner.scan(ctx, package) {
            if let Some(object) = resolver.resolve(ctx, &candidate) {
                if registry.add_object(object) {
                    added += 1;
                }
            }
        }
    }
    added
}

/// Plan the deployments of `config` against `ctx`.
pub fn plan_deployments(ctx: &ExecutionContext, config: &DeployConfig) -> DeploymentPlan {
    DeploymentPlanner::new(ctx, &config.deployments_suffix)
        .plan(config.packages.as_deref(), &config.deployments)
}

/// One discovery-and-deployment run over a DDL engine and a data loader.
pub struct SchemaDeployment<E: DdlEngine, L: DeploymentLoader> {
    config: DeployConfig,
    engine: E,
    loader: L,
}

impl<E: DdlEngine, L: DeploymentLoader> SchemaDeployment<E, L> {
    pub fn new(config: DeployConfig, engine: E, loader: L) -> Self {
        Self {
            config,
            engine,
            loader,
        }
    }

    /// Run discovery, drop/create and deployments.
    ///
    /// Fails only when the context cannot be built or the engine itself is
    /// unusable. The engine is closed on every exit path when `close_engine`
    /// is set.
    pub fn execute(self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("schema_deploy", run_id = %run_id);
        let _enter = span.enter();

        let Self {
            config,
            engine,
            mut loader,
        } = self;

        let mut registry = SchemaRegistry::new(engine);
        if config.close_engine {
            registry = registry.close_on_drop();
        }

        let ctx = Rc::new(build_context(&config)?);
        let _scope = ctx.enter();

        discover(&ctx, &config, &mut registry);

        let schemata = registry.schemata();
        let mut messages = Vec::new();
        let mut dropped = false;
        let mut created = false;
        if schemata > 0 {
            if config.drop {
                messages.extend(registry.drop()?);
                dropped = true;
            }
            messages.extend(registry.create()?);
            created = true;
        } else {
            info!("No schema objects found to export.");
        }

        let plan = plan_deployments(&ctx, &config);
        let deployments = DeploymentApplier::new(ctx.output_root(), &mut loader).apply(&plan);

        let objects = registry
            .objects()
            .iter()
            .map(|o| ObjectSummary::of(o.as_ref()))
            .collect();

        Ok(RunSummary {
            run_id,
            objects,
            schemata,
            dropped,
            created,
            messages,
            deployments,
        })
    }
}
