use super::{DdlEngine, Message, MessageKind, SchemaObject};
use crate::error::EngineError;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, error, info};

/// Accumulates discovered schema objects in front of a [`DdlEngine`].
///
/// Registration is idempotent per `(schema, name)`: the first object wins and
/// later ones with the same identity are ignored.
pub struct SchemaRegistry<E: DdlEngine> {
    engine: E,
    identities: HashSet<(String, String)>,
    objects: Vec<Rc<dyn SchemaObject>>,
    close_on_drop: bool,
    closed: bool,
}

impl<E: DdlEngine> SchemaRegistry<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            identities: HashSet::new(),
            objects: Vec::new(),
            close_on_drop: false,
            closed: false,
        }
    }

    /// Close the engine when the registry goes out of scope, on every exit path.
    pub fn close_on_drop(mut self) -> Self {
        self.close_on_drop = true;
        self
    }

    /// Register `object`. Returns `false` if its identity is already known.
    pub fn add_object(&mut self, object: Rc<dyn SchemaObject>) -> bool {
        let identity = (
            object.schema_name().to_string(),
            object.object_name().to_string(),
        );
        if !self.identities.insert(identity) {
            debug!(
                schema = object.schema_name(),
                object = object.object_name(),
                "Ignoring duplicate schema object"
            );
            return false;
        }

        debug!(
            schema = object.schema_name(),
            object = object.object_name(),
            "Found schema object"
        );
        self.objects.push(Rc::clone(&object));
        self.engine.add_object(object);
        true
    }

    pub fn schemata(&self) -> usize {
        self.engine.schemata()
    }

    pub fn objects(&self) -> &[Rc<dyn SchemaObject>] {
        &self.objects
    }

    pub fn drop(&mut self) -> Result<Vec<Message>, EngineError> {
        let start = self.engine.msgs().len();
        let result = self.engine.drop();
        self.collect(start, result)
    }

    pub fn create(&mut self) -> Result<Vec<Message>, EngineError> {
        let start = self.engine.msgs().len();
        let result = self.engine.create();
        self.collect(start, result)
    }

    /// Close the engine. Only the first call reaches it.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.engine.close();
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn collect(
        &self,
        start: usize,
        result: Result<(), EngineError>,
    ) -> Result<Vec<Message>, EngineError> {
        let produced = self.engine.msgs().get(start..).unwrap_or_default().to_vec();
        for msg in &produced {
            log_message(msg);
        }
        result.map(|()| produced)
    }
}

impl<E: DdlEngine> Drop for SchemaRegistry<E> {
    fn drop(&mut self) {
        if self.close_on_drop {
            self.close();
        }
    }
}

fn log_message(msg: &Message) {
    match msg.kind() {
        MessageKind::Info => info!("{}", msg.text()),
        MessageKind::Error => error!("{}", msg.text()),
        MessageKind::Diagnostic => {}
    }
    if let Some(sql) = msg.sql() {
        debug!("{}", sql);
    }
}
