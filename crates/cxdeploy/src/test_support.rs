//! In-crate doubles for unit tests.

use crate::deploy::DeploymentLoader;
use crate::error::{DeploymentError, EngineError};
use crate::schema::{DdlEngine, Message, SchemaObject};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct StaticObject {
    schema: String,
    name: String,
    create: Vec<String>,
    drop: Vec<String>,
}

impl StaticObject {
    pub fn new(schema: &str, name: &str) -> Rc<dyn SchemaObject> {
        Rc::new(Self {
            schema: schema.to_string(),
            name: name.to_string(),
            create: Vec::new(),
            drop: Vec::new(),
        })
    }
}

impl SchemaObject for StaticObject {
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

/// Engine that records calls and replays canned messages.
#[derive(Default)]
pub struct FakeEngine {
    namespaces: Vec<String>,
    added: usize,
    drop_msgs: Vec<Message>,
    create_msgs: Vec<Message>,
    fail_create: bool,
    msgs: Vec<Message>,
    closes: Rc<Cell<usize>>,
    calls: Rc<RefCell<Vec<&'static str>>>,
}

impl FakeEngine {
    pub fn on_drop(mut self, msgs: Vec<Message>) -> Self {
        self.drop_msgs = msgs;
        self
    }

    pub fn on_create(mut self, msgs: Vec<Message>) -> Self {
        self.create_msgs = msgs;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn added(&self) -> usize {
        self.added
    }

    pub fn close_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.closes)
    }

    pub fn call_log(&self) -> Rc<RefCell<Vec<&'static str>>> {
        Rc::clone(&self.calls)
    }
}

impl DdlEngine for FakeEngine {
    fn add_object(&mut self, object: Rc<dyn SchemaObject>) {
        self.added += 1;
        let schema = object.schema_name().to_string();
        if !self.namespaces.contains(&schema) {
            self.namespaces.push(schema);
        }
    }

    fn schemata(&self) -> usize {
        self.namespaces.len()
    }

    fn drop(&mut self) -> Result<(), EngineError> {
        self.calls.borrow_mut().push("drop");
        self.msgs.extend(self.drop_msgs.iter().cloned());
        Ok(())
    }

    fn create(&mut self) -> Result<(), EngineError> {
        self.calls.borrow_mut().push("create");
        self.msgs.extend(self.create_msgs.iter().cloned());
        if self.fail_create {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    fn msgs(&self) -> &[Message] {
        &self.msgs
    }

    fn close(&mut self) {
        self.calls.borrow_mut().push("close");
        self.closes.set(self.closes.get() + 1);
    }
}

/// Loader that records the files it was asked to load.
#[derive(Default)]
pub struct RecordingLoader {
    loaded: Rc<RefCell<Vec<PathBuf>>>,
    fail_on: Vec<String>,
}

impl RecordingLoader {
    /// Fail every file whose name is `file_name`.
    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.fail_on.push(file_name.to_string());
        self
    }

    pub fn loaded(&self) -> Rc<RefCell<Vec<PathBuf>>> {
        Rc::clone(&self.loaded)
    }
}

impl DeploymentLoader for RecordingLoader {
    fn load_data(&mut self, path: &Path) -> Result<usize, DeploymentError> {
        self.loaded.borrow_mut().push(path.to_path_buf());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_on.contains(&name) {
            return Err(DeploymentError::Format {
                path: path.to_path_buf(),
                message: "rejected by test loader".to_string(),
            });
        }
        Ok(1)
    }
}
