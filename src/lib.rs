//! Declarative document extraction
//!
//! Turns heterogeneous source files into a flat sequence of records:
//! - CSV / delimited files (row groups)
//! - XML and HTML (anchor and entry tags)
//! - JSON (single documents or nested record lists)
//! - RDF graphs in Turtle or N-Triples (one document per subject)
//!
//! Every output field is computed by an [`Extractor`] bound to a [`Field`].

pub mod error;
pub mod extractors;
pub mod field;
pub mod graph;
pub mod readers;
pub mod sources;
pub mod spec;
pub mod transforms;
pub mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::{Error, Result, TransformError};
pub use extractors::{Context, Extractor, Scope};
pub use field::Field;
pub use readers::{
    AnyReader, CsvReader, DocumentIter, Documents, HtmlReader, JsonReader, RdfReader, Reader, SubjectSelector, XmlReader,
};
pub use sources::{Location, Source};

/// One extracted record: field name to value, in field declaration order
pub type Document = Map<String, Value>;

/// Per-source metadata handed to every extractor
pub type Metadata = Map<String, Value>;

/// Source formats understood by the readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Csv,
    Xml,
    Html,
    Json,
    Rdf,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Csv => "CSV",
            Format::Xml => "XML",
            Format::Html => "HTML",
            Format::Json => "JSON",
            Format::Rdf => "RDF",
        };
        f.write_str(name)
    }
}

/// Whether a value counts as present
///
/// `null`, `false`, zero, empty strings and empty collections are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}
