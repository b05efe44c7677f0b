use super::{LoadedType, TypeResolver};
use crate::classpath::{ArtifactClasspath, ClasspathRoot};
use crate::error::TypeError;
use crate::schema::{SchemaObject, DEFAULT_NAMESPACE};
use serde::Deserialize;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

const SCHEMA_OBJECT_CAPABILITY: &str = "schema_object";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TypeKind {
    Class,
    Interface,
}

fn default_kind() -> TypeKind {
    TypeKind::Class
}

fn default_true() -> bool {
    true
}

fn default_schema() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// On-disk description of one compiled type.
#[derive(Debug, Clone, Deserialize)]
struct TypeDescriptor {
    #[serde(default = "default_kind")]
    kind: TypeKind,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default)]
    capabilities: Vec<String>,
    /// Declared type of the singleton field.
    #[serde(default)]
    singleton: Option<String>,
    #[serde(default = "default_true")]
    constructible: bool,
    #[serde(default)]
    object: Option<ObjectDefinition>,
}

/// The database object a described type stands for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectDefinition {
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub create: Vec<String>,
    #[serde(default)]
    pub drop: Vec<String>,
}

impl SchemaObject for ObjectDefinition {
    fn object_name(&self) -> &str {
        &self.name
    }

    fn schema_name(&self) -> &str {
        &self.schema
    }

    fn create_statements(&self) -> &[String] {
        &self.create
    }

    fn drop_statements(&self) -> &[String] {
        &self.drop
    }
}

struct DescribedType {
    name: String,
    descriptor: TypeDescriptor,
    singleton: OnceCell<Rc<dyn SchemaObject>>,
}

impl DescribedType {
    fn build(&self) -> Result<Rc<dyn SchemaObject>, TypeError> {
        let def = self
            .descriptor
            .object
            .clone()
            .ok_or_else(|| TypeError::MissingObject(self.name.clone()))?;
        let object: Rc<dyn SchemaObject> = Rc::new(def);
        Ok(object)
    }
}

impl LoadedType for DescribedType {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_abstract(&self) -> bool {
        self.descriptor.is_abstract
    }

    fn is_interface(&self) -> bool {
        self.descriptor.kind == TypeKind::Interface
    }

    fn is_schema_object(&self) -> bool {
        self.descriptor
            .capabilities
            .iter()
            .any(|c| c == SCHEMA_OBJECT_CAPABILITY)
    }

    fn singleton_field(&self) -> Option<&str> {
        self.descriptor.singleton.as_deref()
    }

    fn singleton_instance(&self) -> Result<Rc<dyn SchemaObject>, TypeError> {
        if let Some(existing) = self.singleton.get() {
            return Ok(Rc::clone(existing));
        }
        let built = self.build()?;
        Ok(Rc::clone(self.singleton.get_or_init(|| built)))
    }

    fn instantiate(&self) -> Result<Rc<dyn SchemaObject>, TypeError> {
        if !self.descriptor.constructible {
            return Err(TypeError::NotConstructible(self.name.clone()));
        }
        self.build()
    }
}

/// [`TypeResolver`] reading JSON descriptors from classpath roots.
///
/// `com.acme.Users` is looked up as `com/acme/Users<suffix>` in every root in
/// order; the first root that has it wins. Loaded types are cached for the
/// lifetime of the resolver.
pub struct DescriptorResolver {
    classpath: ArtifactClasspath,
    suffix: String,
    cache: RefCell<HashMap<String, Rc<DescribedType>>>,
}

impl DescriptorResolver {
    pub fn new(classpath: ArtifactClasspath, suffix: &str) -> Self {
        Self {
            classpath,
            suffix: suffix.to_string(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn entry_name(&self, name: &str) -> String {
        format!("{}{}", name.replace('.', "/"), self.suffix)
    }

    fn read_entry(&self, entry: &str) -> Result<Option<String>, TypeError> {
        for root in self.classpath.roots() {
            let found = match root {
                ClasspathRoot::Directory(dir) => read_from_directory(dir, entry)?,
                ClasspathRoot::Archive(archive) => read_from_archive(archive, entry)?,
            };
            if found.is_some() {
                debug!(root = %root.path().display(), entry, "Loaded type descriptor");
                return Ok(found);
            }
        }
        Ok(None)
    }
}

impl TypeResolver for DescriptorResolver {
    fn resolve(&self, name: &str) -> Result<Option<Rc<dyn LoadedType>>, TypeError> {
        if let Some(cached) = self.cache.borrow().get(name) {
            let ty: Rc<dyn LoadedType> = cached.clone();
            return Ok(Some(ty));
        }

        let Some(content) = self.read_entry(&self.entry_name(name))? else {
            return Ok(None);
        };
        let descriptor: TypeDescriptor =
            serde_json::from_str(&content).map_err(|source| TypeError::Descriptor {
                name: name.to_string(),
                source,
            })?;

        let ty = Rc::new(DescribedType {
            name: name.to_string(),
            descriptor,
            singleton: OnceCell::new(),
        });
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&ty));
        let ty: Rc<dyn LoadedType> = ty;
        Ok(Some(ty))
    }
}

fn read_from_directory(dir: &Path, entry: &str) -> Result<Option<String>, TypeError> {
    let path = dir.join(entry);
    match fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TypeError::Io { path, source }),
    }
}

fn read_from_archive(archive: &Path, entry: &str) -> Result<Option<String>, TypeError> {
    let archive_err = |source| TypeError::Archive {
        path: archive.to_path_buf(),
        source,
    };
    let file = fs::File::open(archive).map_err(|source| TypeError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(archive_err)?;

    let mut zipped = match zip.by_name(entry) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(archive_err(e)),
    };
    let mut content = String::new();
    zipped
        .read_to_string(&mut content)
        .map_err(|source| TypeError::Io {
            path: archive.join(entry),
            source,
        })?;
    Ok(Some(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxdeploy_test_utils::{write_archive, write_type, TypeFixture};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn descriptor_defaults() {
        let descriptor: TypeDescriptor = serde_json::from_str(
            r#"{ "capabilities": ["schema_object"], "object": { "name": "users" } }"#,
        )
        .unwrap();

        assert_eq!(descriptor.kind, TypeKind::Class);
        assert!(!descriptor.is_abstract);
        assert!(descriptor.constructible);
        let object = descriptor.object.unwrap();
        assert_eq!(object.schema, "main");
        assert!(object.create.is_empty());
    }

    #[test]
    fn first_root_wins_and_archives_are_searched() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("classes");
        write_type(&out, "app.Users", &TypeFixture::table("users_from_output")).unwrap();
        let jar = tmp.path().join("lib").join("model.zip");
        write_archive(
            &jar,
            &[
                ("app.Users", &TypeFixture::table("users_from_archive")),
                ("app.Roles", &TypeFixture::table("roles")),
            ],
        )
        .unwrap();

        let cp = ArtifactClasspath::build([&out], [&jar]).unwrap();
        let resolver = DescriptorResolver::new(cp, ".type.json");

        let users = resolver.resolve("app.Users").unwrap().unwrap();
        assert_eq!(users.instantiate().unwrap().object_name(), "users_from_output");

        let roles = resolver.resolve("app.Roles").unwrap().unwrap();
        assert_eq!(roles.instantiate().unwrap().object_name(), "roles");

        assert!(resolver.resolve("app.Missing").unwrap().is_none());
    }

    #[test]
    fn resolved_types_are_cached() {
        let tmp = TempDir::new().unwrap();
        write_type(tmp.path(), "app.Users", &TypeFixture::table("users")).unwrap();
        let cp = ArtifactClasspath::build([tmp.path()], Vec::<PathBuf>::new()).unwrap();
        let resolver = DescriptorResolver::new(cp, ".type.json");

        let first = resolver.resolve("app.Users").unwrap().unwrap();
        std::fs::remove_file(tmp.path().join("app/Users.type.json")).unwrap();
        let second = resolver.resolve("app.Users").unwrap().unwrap();

        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn instantiate_returns_fresh_objects() {
        let tmp = TempDir::new().unwrap();
        write_type(tmp.path(), "app.Users", &TypeFixture::table("users")).unwrap();
        let cp = ArtifactClasspath::build([tmp.path()], Vec::<PathBuf>::new()).unwrap();
        let resolver = DescriptorResolver::new(cp, ".type.json");
        let ty = resolver.resolve("app.Users").unwrap().unwrap();

        let a = ty.instantiate().unwrap();
        let b = ty.instantiate().unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn capable_type_without_object_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("app")).unwrap();
        std::fs::write(
            tmp.path().join("app/Empty.type.json"),
            r#"{ "capabilities": ["schema_object"] }"#,
        )
        .unwrap();
        let cp = ArtifactClasspath::build([tmp.path()], Vec::<PathBuf>::new()).unwrap();
        let resolver = DescriptorResolver::new(cp, ".type.json");

        let ty = resolver.resolve("app.Empty").unwrap().unwrap();
        assert!(matches!(ty.instantiate(), Err(TypeError::MissingObject(_))));
    }
}
