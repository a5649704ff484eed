//! JSON reader
//!
//! Either the whole file is one document, or a record path leads to a list of
//! records, each a document. Meta paths copy values from the levels above the
//! records into every record, keyed by the dot-joined path.

use serde_json::{Map, Value};
use tracing::debug;

use super::{assemble, DocumentIter, Reader};
use crate::error::Result;
use crate::extractors::{Context, Scope};
use crate::field::Field;
use crate::sources::Source;
use crate::{Document, Format};

/// Reader for JSON files
#[derive(Debug, Clone)]
pub struct JsonReader {
    fields: Vec<Field>,
    single_document: bool,
    record_path: Vec<String>,
    meta: Vec<Vec<String>>,
}

impl JsonReader {
    pub fn new(fields: Vec<Field>) -> Self {
        JsonReader {
            fields,
            single_document: false,
            record_path: Vec::new(),
            meta: Vec::new(),
        }
    }

    /// Treat every source as exactly one document
    pub fn single_document(mut self) -> Self {
        self.single_document = true;
        self
    }

    /// Keys descending to the list of records
    pub fn record_path<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_path = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Add a meta path; a single key is read from the root
    pub fn meta<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        if !path.is_empty() {
            self.meta.push(path);
        }
        self
    }

    /// The record nodes of one parsed file
    fn records(&self, root: Value) -> Vec<Value> {
        if self.single_document {
            return vec![root];
        }
        if self.record_path.is_empty() {
            return match root {
                Value::Array(items) => items,
                other => vec![other],
            };
        }
        let mut records = Vec::new();
        let mut seen = Map::new();
        self.unnest(&root, &self.record_path, 0, &mut seen, &mut records);
        records
    }

    fn unnest(&self, data: &Value, path: &[String], level: usize, seen: &mut Map<String, Value>, out: &mut Vec<Value>) {
        let objects: Vec<&Value> = match data {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let last_level = path.len() == 1;
        for object in objects {
            // Above the records a meta path is read at its own depth; at the
            // record level, longer paths are walked from the current object.
            for meta in &self.meta {
                let applies = if last_level { meta.len() > level } else { meta.len() == level + 1 };
                if applies {
                    seen.insert(meta.join("."), pull(object, &meta[level..]));
                }
            }

            let Some(next) = object.get(&path[0]) else {
                debug!(key = %path[0], level, "Record path segment missing");
                continue;
            };
            if path.len() > 1 {
                self.unnest(next, &path[1..], level + 1, seen, out);
                continue;
            }

            let items: Vec<&Value> = match next {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for item in items {
                let mut record = match item {
                    Value::Object(map) => map.clone(),
                    scalar => {
                        let mut map = Map::new();
                        map.insert("0".to_string(), scalar.clone());
                        map
                    }
                };
                for (key, value) in seen.iter() {
                    if record.contains_key(key) {
                        debug!(key = %key, "Record key shadows meta value");
                        continue;
                    }
                    record.insert(key.clone(), value.clone());
                }
                out.push(Value::Object(record));
            }
        }
    }
}

/// The value at `keys` below `object`, `null` when any key is missing
fn pull(object: &Value, keys: &[String]) -> Value {
    keys.iter()
        .try_fold(object, |node, key| node.get(key))
        .cloned()
        .unwrap_or(Value::Null)
}

impl Reader for JsonReader {
    fn format(&self) -> Format {
        Format::Json
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn read_source(&self, source: Source) -> Result<DocumentIter<'_>> {
        let content = source.location.read_bytes(Format::Json)?;
        let root: Value = serde_json::from_slice(&content)?;

        let mut docs: Vec<Document> = Vec::new();
        for (index, record) in self.records(root).iter().enumerate() {
            let ctx = Context::new(Scope::Json(record), &source.metadata).at(index);
            if let Some(doc) = assemble(&self.fields, &ctx)? {
                docs.push(doc);
            }
        }
        Ok(Box::new(docs.into_iter().map(Ok)))
    }
}
