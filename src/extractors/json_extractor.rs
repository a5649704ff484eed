//! JSON path extraction

use serde_json::Value;

use super::{Context, Scope};
use crate::error::{Error, Result};

/// Key path into a JSON record
///
/// A single key containing dots is first looked up literally (flattened
/// records carry keys like `SCENE.TITLE`), then as a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    keys: Vec<String>,
}

impl JsonPath {
    pub fn new(key: impl Into<String>) -> Self {
        JsonPath {
            keys: vec![key.into()],
        }
    }

    /// Successive keys; numeric keys index into arrays
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JsonPath {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.keys
    }

    pub(super) fn extract(&self, ctx: &Context<'_>) -> Result<Value> {
        let Scope::Json(record) = ctx.scope else {
            return Err(Error::ContextMismatch {
                extractor: "JSON",
                expected: "JSON record",
            });
        };
        Ok(self.resolve(record).cloned().unwrap_or(Value::Null))
    }

    /// The value at this path, if every segment exists
    pub fn resolve<'v>(&self, record: &'v Value) -> Option<&'v Value> {
        if let [key] = self.keys.as_slice() {
            if let Some(value) = record.get(key.as_str()) {
                return Some(value);
            }
            if key.contains('.') {
                return descend(record, key.split('.'));
            }
            return None;
        }
        descend(record, self.keys.iter().map(String::as_str))
    }
}

fn descend<'v, 'k>(mut node: &'v Value, keys: impl Iterator<Item = &'k str>) -> Option<&'v Value> {
    for key in keys {
        node = match node {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}
