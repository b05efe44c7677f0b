//! Schema objects and the registry that exports them.

mod engine;
mod registry;

pub use engine::{DdlEngine, DdlUnit, DEFAULT_NAMESPACE};
pub use registry::SchemaRegistry;

use serde::Serialize;

/// A named database object discovered in compiled output.
///
/// The orchestrator only looks at the name and namespace. The statements
/// are for the [`DdlEngine`].
pub trait SchemaObject {
    fn object_name(&self) -> &str;

    /// Namespace the object lives in.
    fn schema_name(&self) -> &str;

    fn create_statements(&self) -> &[String];

    fn drop_statements(&self) -> &[String];
}

impl std::fmt::Debug for dyn SchemaObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema_name(), self.object_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Error,
    /// Carries SQL only; never logged above debug.
    Diagnostic,
}

/// One result line produced by the DDL engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    kind: MessageKind,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<String>,
}

impl Message {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            text: text.into(),
            sql: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
            sql: None,
        }
    }

    pub fn diagnostic(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            kind: MessageKind::Diagnostic,
            text: String::new(),
            sql: Some(sql),
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }
}
