//! DDL engine contract and the DuckDB-backed default.

use super::{Message, SchemaObject};
use crate::error::EngineError;
use cxdeploy_db::{quote_ident, DbConnection};
use std::rc::Rc;
use tracing::debug;

/// Namespace that exists without being created.
pub const DEFAULT_NAMESPACE: &str = "main";

/// Executes create/drop for a set of schema objects.
///
/// Implementations append one or more [`Message`]s per statement to an
/// ever-growing log exposed through [`DdlEngine::msgs`]. A failing statement
/// is reported as an error message, not as `Err`; `Err` is reserved for the
/// engine itself being unusable.
pub trait DdlEngine {
    fn add_object(&mut self, object: Rc<dyn SchemaObject>);

    /// Number of distinct namespaces among the added objects.
    fn schemata(&self) -> usize;

    fn drop(&mut self) -> Result<(), EngineError>;

    fn create(&mut self) -> Result<(), EngineError>;

    fn msgs(&self) -> &[Message];

    /// Stop using the engine; later `drop`/`create` calls fail.
    ///
    /// This releases the engine's own resources only. Whatever the engine
    /// shares with others, such as a database connection also held by a
    /// deployment loader, stays open until those holders are gone.
    fn close(&mut self);
}

struct Namespace {
    name: String,
    objects: Vec<Rc<dyn SchemaObject>>,
}

/// Default [`DdlEngine`] executing statements on a DuckDB connection.
///
/// [`DdlEngine::close`] drops this unit's [`DbConnection`] clone. The
/// database, and its file lock, are released once every other clone (the
/// loader's, the caller's) is dropped as well.
pub struct DdlUnit {
    conn: Option<DbConnection>,
    namespaces: Vec<Namespace>,
    msgs: Vec<Message>,
}

impl DdlUnit {
    pub fn new(conn: DbConnection) -> Self {
        Self {
            conn: Some(conn),
            namespaces: Vec::new(),
            msgs: Vec::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn connection(&self) -> Result<DbConnection, EngineError> {
        self.conn.clone().ok_or(EngineError::Closed)
    }

    fn run(&mut self, conn: &DbConnection, sql: &str) {
        match conn.execute_batch(sql) {
            Ok(()) => self
                .msgs
                .push(Message::info(format!("OK: {}", first_line(sql))).with_sql(sql)),
            Err(e) => self.msgs.push(Message::error(e.to_string()).with_sql(sql)),
        }
    }

    fn custom_namespaces(&self) -> Vec<String> {
        self.namespaces
            .iter()
            .filter(|ns| ns.name != DEFAULT_NAMESPACE)
            .map(|ns| ns.name.clone())
            .collect()
    }

    fn statements<F>(&self, reverse: bool, pick: F) -> Vec<String>
    where
        F: Fn(&dyn SchemaObject) -> &[String],
    {
        let mut objects: Vec<&Rc<dyn SchemaObject>> = self
            .namespaces
            .iter()
            .flat_map(|ns| ns.objects.iter())
            .collect();
        if reverse {
            objects.reverse();
        }
        objects
            .into_iter()
            .flat_map(|o| pick(o.as_ref()).to_vec())
            .collect()
    }
}

impl DdlEngine for DdlUnit {
    fn add_object(&mut self, object: Rc<dyn SchemaObject>) {
        let schema = object.schema_name().to_string();
        match self.namespaces.iter_mut().find(|ns| ns.name == schema) {
            Some(ns) => ns.objects.push(object),
            None => self.namespaces.push(Namespace {
                name: schema,
                objects: vec![object],
            }),
        }
    }

    fn schemata(&self) -> usize {
        self.namespaces.len()
    }

    fn drop(&mut self) -> Result<(), EngineError> {
        let conn = self.connection()?;
        debug!(namespaces = self.namespaces.len(), "Dropping schema");

        for sql in self.statements(true, |o| o.drop_statements()) {
            self.run(&conn, &sql);
        }
        for ns in self.custom_namespaces().into_iter().rev() {
            self.run(&conn, &format!("DROP SCHEMA IF EXISTS {}", quote_ident(&ns)));
        }
        Ok(())
    }

    fn create(&mut self) -> Result<(), EngineError> {
        let conn = self.connection()?;
        debug!(namespaces = self.namespaces.len(), "Creating schema");

        for ns in self.custom_namespaces() {
            self.run(
                &conn,
                &format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&ns)),
            );
        }
        for sql in self.statements(false, |o| o.create_statements()) {
            self.run(&conn, &sql);
        }
        Ok(())
    }

    fn msgs(&self) -> &[Message] {
        &self.msgs
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!("Closed DDL engine");
        }
    }
}

fn first_line(sql: &str) -> &str {
    sql.lines().next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MessageKind;

    struct Table {
        schema: String,
        name: String,
        create: Vec<String>,
        drop: Vec<String>,
    }

    impl Table {
        fn new(schema: &str, name: &str) -> Rc<dyn SchemaObject> {
            let qualified = format!("{}.{}", schema, name);
            Rc::new(Table {
                schema: schema.to_string(),
                name: name.to_string(),
                create: vec![format!("CREATE TABLE {} (id BIGINT)", qualified)],
                drop: vec![format!("DROP TABLE {}", qualified)],
            })
        }
    }

    impl SchemaObject for Table {
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

    fn sqls(unit: &DdlUnit) -> Vec<&str> {
        unit.msgs().iter().filter_map(|m| m.sql()).collect()
    }

    #[test]
    fn create_makes_namespaces_then_objects_in_registration_order() {
        let conn = DbConnection::open_duckdb_memory().unwrap();
        let mut unit = DdlUnit::new(conn.clone());
        unit.add_object(Table::new("app", "users"));
        unit.add_object(Table::new("main", "settings"));
        unit.add_object(Table::new("app", "roles"));

        assert_eq!(unit.schemata(), 2);
        unit.create().unwrap();

        assert_eq!(
            sqls(&unit),
            vec![
                "CREATE SCHEMA IF NOT EXISTS \"app\"",
                "CREATE TABLE app.users (id BIGINT)",
                "CREATE TABLE app.roles (id BIGINT)",
                "CREATE TABLE main.settings (id BIGINT)",
            ]
        );
        assert!(unit.msgs().iter().all(|m| m.kind() == MessageKind::Info));

        let count: i64 = conn
            .query_scalar(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'app'",
                &[],
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn drop_is_reverse_of_create() {
        let conn = DbConnection::open_duckdb_memory().unwrap();
        let mut unit = DdlUnit::new(conn);
        unit.add_object(Table::new("app", "users"));
        unit.add_object(Table::new("app", "roles"));
        unit.create().unwrap();
        let before = unit.msgs().len();

        unit.drop().unwrap();

        let dropped: Vec<&str> = unit.msgs()[before..]
            .iter()
            .filter_map(|m| m.sql())
            .collect();
        assert_eq!(
            dropped,
            vec![
                "DROP TABLE app.roles",
                "DROP TABLE app.users",
                "DROP SCHEMA IF EXISTS \"app\"",
            ]
        );
    }

    #[test]
    fn failing_statement_becomes_error_message_and_execution_continues() {
        let conn = DbConnection::open_duckdb_memory().unwrap();
        let mut unit = DdlUnit::new(conn);
        // Dropping tables that were never created fails without IF EXISTS.
        unit.add_object(Table::new("main", "ghost"));
        unit.add_object(Table::new("main", "other"));

        unit.drop().unwrap();

        assert_eq!(unit.msgs().len(), 2);
        assert!(unit
            .msgs()
            .iter()
            .all(|m| m.kind() == MessageKind::Error && m.sql().is_some()));
    }

    #[test]
    fn closed_engine_refuses_work() {
        let conn = DbConnection::open_duckdb_memory().unwrap();
        let mut unit = DdlUnit::new(conn);
        unit.add_object(Table::new("main", "users"));
        unit.close();

        assert!(unit.is_closed());
        assert!(matches!(unit.create(), Err(EngineError::Closed)));
        assert!(matches!(unit.drop(), Err(EngineError::Closed)));
        assert!(unit.msgs().is_empty());
    }

    #[test]
    fn close_leaves_shared_connection_open() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("deploy.duckdb");
        let conn = DbConnection::open_duckdb(&db_path).unwrap();
        let mut unit = DdlUnit::new(conn.clone());
        unit.add_object(Table::new("main", "users"));
        unit.create().unwrap();
        unit.close();

        let count: i64 = conn.query_scalar("SELECT COUNT(*) FROM users", &[]).unwrap();
        assert_eq!(count, 0);
        assert!(matches!(
            DbConnection::open_duckdb(&db_path),
            Err(cxdeploy_db::BackendError::Locked(_))
        ));

        drop(unit);
        drop(conn);
        assert!(DbConnection::open_duckdb(&db_path).is_ok());
    }
}
