//! Type resolution and schema-object capability checks.

mod descriptor;

pub use descriptor::{DescriptorResolver, ObjectDefinition};

use crate::context::ExecutionContext;
use crate::error::TypeError;
use crate::scanner::Candidate;
use crate::schema::SchemaObject;
use std::rc::Rc;
use tracing::error;

/// A type loaded from the execution context.
pub trait LoadedType {
    fn name(&self) -> &str;

    fn is_abstract(&self) -> bool;

    fn is_interface(&self) -> bool;

    /// Whether the type declares the schema-object capability.
    fn is_schema_object(&self) -> bool;

    /// Declared type of the type's singleton field, if it has one.
    fn singleton_field(&self) -> Option<&str>;

    /// The value of the singleton field. Repeated calls return the same instance.
    fn singleton_instance(&self) -> Result<Rc<dyn SchemaObject>, TypeError>;

    /// A fresh default instance.
    fn instantiate(&self) -> Result<Rc<dyn SchemaObject>, TypeError>;
}

/// Resolves fully-qualified type names within one execution context.
pub trait TypeResolver {
    /// `Ok(None)` when no classpath root defines `name`.
    fn resolve(&self, name: &str) -> Result<Option<Rc<dyn LoadedType>>, TypeError>;
}

/// Concrete (not abstract, not an interface) and schema-object capable.
pub fn is_schema_object_type(ty: &dyn LoadedType) -> bool {
    !ty.is_abstract() && !ty.is_interface() && ty.is_schema_object()
}

/// Turns candidates into live schema objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaObjectResolver;

impl SchemaObjectResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `candidate` to at most one schema object.
    ///
    /// Errors never escape: they are logged with the candidate's source path
    /// and reported as "no object".
    pub fn resolve(
        &self,
        ctx: &ExecutionContext,
        candidate: &Candidate,
    ) -> Option<Rc<dyn SchemaObject>> {
        match self.try_resolve(ctx, candidate) {
            Ok(found) => found,
            Err(e) => {
                error!(
                    path = %candidate.source.display(),
                    error = %e,
                    "Failed to process a file: {}",
                    candidate.source.display()
                );
                None
            }
        }
    }

    pub fn try_resolve(
        &self,
        ctx: &ExecutionContext,
        candidate: &Candidate,
    ) -> Result<Option<Rc<dyn SchemaObject>>, TypeError> {
        let ty = ctx
            .resolve(&candidate.type_name)?
            .ok_or_else(|| TypeError::NotFound(candidate.type_name.clone()))?;

        if let Some(declared) = ty.singleton_field() {
            let declared_ty = if declared == ty.name() {
                Rc::clone(&ty)
            } else {
                ctx.resolve(declared)?
                    .ok_or_else(|| TypeError::NotFound(declared.to_string()))?
            };
            if is_schema_object_type(declared_ty.as_ref()) {
                return ty.singleton_instance().map(Some);
            }
            return Ok(None);
        }

        if is_schema_object_type(ty.as_ref()) {
            return ty.instantiate().map(Some);
        }

        Ok(None)
    }
}
