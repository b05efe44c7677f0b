//! Writers for compiled-output fixtures: type descriptors, archives and
//! deployment files.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const TYPE_SUFFIX: &str = ".type.json";

/// Builder for one `.type.json` descriptor.
#[derive(Debug, Clone)]
pub struct TypeFixture {
    kind: &'static str,
    is_abstract: bool,
    capable: bool,
    singleton: Option<String>,
    constructible: bool,
    object: Option<Value>,
}

impl TypeFixture {
    /// A concrete, constructible schema object creating table `name` in `main`.
    pub fn table(name: &str) -> Self {
        Self::table_in("main", name)
    }

    /// Like [`TypeFixture::table`] but in namespace `schema`.
    pub fn table_in(schema: &str, name: &str) -> Self {
        let qualified = format!("{}.{}", schema, name);
        let create = format!(
            "CREATE TABLE {} (id BIGINT PRIMARY KEY, label VARCHAR)",
            qualified
        );
        Self {
            kind: "class",
            is_abstract: false,
            capable: true,
            singleton: None,
            constructible: true,
            object: Some(json!({
                "name": name,
                "schema": schema,
                "create": [create],
                "drop": [format!("DROP TABLE IF EXISTS {}", qualified)],
            })),
        }
    }

    /// A type without the schema-object capability.
    pub fn plain() -> Self {
        Self {
            kind: "class",
            is_abstract: false,
            capable: false,
            singleton: None,
            constructible: true,
            object: None,
        }
    }

    pub fn interface(mut self) -> Self {
        self.kind = "interface";
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn without_capability(mut self) -> Self {
        self.capable = false;
        self
    }

    /// Expose a singleton field whose declared type is `declared_type`.
    pub fn singleton(mut self, declared_type: &str) -> Self {
        self.singleton = Some(declared_type.to_string());
        self
    }

    pub fn not_constructible(mut self) -> Self {
        self.constructible = false;
        self
    }

    /// Replace the create statements.
    pub fn create(mut self, statements: &[&str]) -> Self {
        if let Some(Value::Object(obj)) = self.object.as_mut() {
            obj.insert("create".to_string(), json!(statements));
        }
        self
    }

    /// Replace the drop statements.
    pub fn drop_statements(mut self, statements: &[&str]) -> Self {
        if let Some(Value::Object(obj)) = self.object.as_mut() {
            obj.insert("drop".to_string(), json!(statements));
        }
        self
    }

    pub fn to_value(&self) -> Value {
        let mut doc = json!({
            "kind": self.kind,
            "abstract": self.is_abstract,
            "capabilities": if self.capable { json!(["schema_object"]) } else { json!([]) },
            "constructible": self.constructible,
        });
        if let Value::Object(map) = &mut doc {
            if let Some(singleton) = &self.singleton {
                map.insert("singleton".to_string(), json!(singleton));
            }
            if let Some(object) = &self.object {
                map.insert("object".to_string(), object.clone());
            }
        }
        doc
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }
}

/// Relative entry name for a type: `com.acme.Users` → `com/acme/Users.type.json`.
pub fn type_entry_name(type_name: &str) -> String {
    format!("{}{}", type_name.replace('.', "/"), TYPE_SUFFIX)
}

/// Write the descriptor of `type_name` under `root`, returning its path.
pub fn write_type(root: &Path, type_name: &str, fixture: &TypeFixture) -> Result<PathBuf> {
    write_file(&root.join(type_entry_name(type_name)), &fixture.to_json())
}

/// Write a descriptor for `type_name` that is not valid JSON.
pub fn write_corrupt_type(root: &Path, type_name: &str) -> Result<PathBuf> {
    write_file(&root.join(type_entry_name(type_name)), "{ \"kind\": ")
}

/// Write a deployment file at `root/<rel>`.
pub fn write_deployment(root: &Path, rel: &str, xml: &str) -> Result<PathBuf> {
    write_file(&root.join(rel), xml)
}

/// Write a zip archive containing `(type_name, fixture)` descriptors.
pub fn write_archive(path: &Path, types: &[(&str, &TypeFixture)]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    for (type_name, fixture) in types {
        writer
            .start_file(type_entry_name(type_name), options)
            .with_context(|| format!("Failed to add {} to archive", type_name))?;
        writer.write_all(fixture.to_json().as_bytes())?;
    }
    writer.finish().context("Failed to finish archive")?;
    Ok(path.to_path_buf())
}

fn write_file(path: &Path, contents: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}
