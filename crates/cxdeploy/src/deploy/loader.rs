//! Loading deployment data files into the database.
//!
//! Format of a deployment file:
//!
//! ```xml
//! <deployment schema="app" on-exist="skip">
//!   <users id="1" login="admin"/>
//!   <users id="2">
//!     <login>guest</login>
//!   </users>
//! </deployment>
//! ```
//!
//! Each child of `<deployment>` is one row of the table it is named after.
//! Attributes and simple child elements both become column values.

use crate::error::DeploymentError;
use cxdeploy_db::{quote_ident, quote_ident_path, DbConnection, DbValue};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use tracing::debug;

const ROOT_ELEMENT: &str = "deployment";

/// Applies one deployment file.
pub trait DeploymentLoader {
    /// Load the records in `path`, returning how many rows were written.
    fn load_data(&mut self, path: &Path) -> Result<usize, DeploymentError>;
}

/// What to do when a row with the same key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnExist {
    #[default]
    Fail,
    Skip,
    Update,
}

impl OnExist {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "fail" => Some(OnExist::Fail),
            "skip" => Some(OnExist::Skip),
            "update" => Some(OnExist::Update),
            _ => None,
        }
    }

    fn insert_verb(self) -> &'static str {
        match self {
            OnExist::Fail => "INSERT INTO",
            OnExist::Skip => "INSERT OR IGNORE INTO",
            OnExist::Update => "INSERT OR REPLACE INTO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    table: String,
    columns: Vec<(String, String)>,
}

impl Record {
    fn set(&mut self, column: String, value: String) -> Result<(), String> {
        if self.columns.iter().any(|(c, _)| *c == column) {
            return Err(format!(
                "column '{}' given twice for table '{}'",
                column, self.table
            ));
        }
        self.columns.push((column, value));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Deployment {
    schema: Option<String>,
    on_exist: OnExist,
    records: Vec<Record>,
}

impl Deployment {
    fn push(&mut self, record: Record) -> Result<(), String> {
        if record.columns.is_empty() {
            return Err(format!("record for table '{}' has no columns", record.table));
        }
        self.records.push(record);
        Ok(())
    }

    fn qualified_table(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) if !table.contains('.') => {
                format!("{}.{}", quote_ident(schema), quote_ident(table))
            }
            _ => quote_ident_path(table),
        }
    }
}

/// [`DeploymentLoader`] for XML deployment files.
pub struct XmlDeploymentLoader {
    conn: DbConnection,
}

impl XmlDeploymentLoader {
    pub fn new(conn: DbConnection) -> Self {
        Self { conn }
    }
}

impl DeploymentLoader for XmlDeploymentLoader {
    fn load_data(&mut self, path: &Path) -> Result<usize, DeploymentError> {
        let content = std::fs::read_to_string(path).map_err(|source| DeploymentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let deployment = parse_deployment(path, &content)?;
        if deployment.records.is_empty() {
            debug!(path = %path.display(), "Deployment has no records");
            return Ok(0);
        }

        let verb = deployment.on_exist.insert_verb();
        self.conn
            .transaction(|tx| {
                let mut written = 0usize;
                for record in &deployment.records {
                    let columns: Vec<String> =
                        record.columns.iter().map(|(c, _)| quote_ident(c)).collect();
                    let placeholders = vec!["?"; columns.len()].join(", ");
                    let sql = format!(
                        "{} {} ({}) VALUES ({})",
                        verb,
                        deployment.qualified_table(&record.table),
                        columns.join(", "),
                        placeholders
                    );
                    let params: Vec<DbValue> = record
                        .columns
                        .iter()
                        .map(|(_, v)| DbValue::Text(v.clone()))
                        .collect();
                    written += tx.execute(&sql, &params)? as usize;
                }
                Ok(written)
            })
            .map_err(|source| DeploymentError::Database {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn parse_deployment(path: &Path, content: &str) -> Result<Deployment, DeploymentError> {
    let xml_err = |source: quick_xml::Error| DeploymentError::Xml {
        path: path.to_path_buf(),
        source,
    };
    let format_err = |message: String| DeploymentError::Format {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut deployment: Option<Deployment> = None;
    let mut record: Option<Record> = None;
    let mut column: Option<(String, String)> = None;
    let mut finished = false;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if finished => {
                return Err(format_err(format!(
                    "unexpected element <{}> after </{}>",
                    element_name(&e).map_err(format_err)?,
                    ROOT_ELEMENT
                )));
            }
            Event::Start(e) => {
                let name = element_name(&e).map_err(format_err)?;
                if deployment.is_none() {
                    deployment = Some(open_root(&name, &e).map_err(format_err)?);
                } else if record.is_none() {
                    record = Some(open_record(name, &e).map_err(format_err)?);
                } else if column.is_none() {
                    column = Some((open_column(name, &e).map_err(format_err)?, String::new()));
                } else {
                    return Err(format_err(format!("element <{}> is nested too deeply", name)));
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e).map_err(format_err)?;
                if deployment.is_none() {
                    deployment = Some(open_root(&name, &e).map_err(format_err)?);
                    finished = true;
                } else if let Some(current) = record.as_mut() {
                    if column.is_some() {
                        return Err(format_err(format!(
                            "element <{}> is nested too deeply",
                            name
                        )));
                    }
                    let name = open_column(name, &e).map_err(format_err)?;
                    current.set(name, String::new()).map_err(format_err)?;
                } else if let Some(dep) = deployment.as_mut() {
                    dep.push(open_record(name, &e).map_err(format_err)?)
                        .map_err(format_err)?;
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_err)?;
                append_text(column.as_mut(), &text).map_err(format_err)?;
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                append_text(column.as_mut(), &text).map_err(format_err)?;
            }
            Event::End(_) => {
                if let Some((name, value)) = column.take() {
                    if let Some(current) = record.as_mut() {
                        current.set(name, value).map_err(format_err)?;
                    }
                } else if let Some(done) = record.take() {
                    if let Some(dep) = deployment.as_mut() {
                        dep.push(done).map_err(format_err)?;
                    }
                } else {
                    finished = true;
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    match deployment {
        Some(dep) if finished => Ok(dep),
        Some(_) => Err(format_err(format!("unclosed <{}> element", ROOT_ELEMENT))),
        None => Err(format_err(format!("missing <{}> root element", ROOT_ELEMENT))),
    }
}

fn element_name(e: &BytesStart<'_>) -> Result<String, String> {
    std::str::from_utf8(e.name().as_ref())
        .map(str::to_string)
        .map_err(|_| "element name is not valid UTF-8".to_string())
}

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|_| "attribute name is not valid UTF-8".to_string())?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| err.to_string())?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn open_root(name: &str, e: &BytesStart<'_>) -> Result<Deployment, String> {
    if name != ROOT_ELEMENT {
        return Err(format!(
            "root element must be <{}>, found <{}>",
            ROOT_ELEMENT, name
        ));
    }
    let mut deployment = Deployment::default();
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "schema" => deployment.schema = Some(value),
            "on-exist" => {
                deployment.on_exist = OnExist::parse(&value)
                    .ok_or_else(|| format!("unknown on-exist value '{}'", value))?;
            }
            other => return Err(format!("unknown attribute '{}' on <{}>", other, ROOT_ELEMENT)),
        }
    }
    Ok(deployment)
}

fn open_record(table: String, e: &BytesStart<'_>) -> Result<Record, String> {
    let mut record = Record {
        table,
        columns: Vec::new(),
    };
    for (key, value) in attributes(e)? {
        record.set(key, value)?;
    }
    Ok(record)
}

/// Column elements carry their value as text only.
fn open_column(name: String, e: &BytesStart<'_>) -> Result<String, String> {
    match e.attributes().next() {
        None => Ok(name),
        Some(_) => Err(format!("column <{}> must not have attributes", name)),
    }
}

fn append_text(column: Option<&mut (String, String)>, text: &str) -> Result<(), String> {
    match column {
        Some((_, value)) => {
            value.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(format!("unexpected text '{}' outside a column", text.trim())),
    }
}

/// Resolve a planned identifier against the output root.
pub fn deployment_path(output_root: &Path, id: &str) -> PathBuf {
    id.split('/')
        .filter(|part| !part.is_empty())
        .fold(output_root.to_path_buf(), |acc, part| acc.join(part))
}
