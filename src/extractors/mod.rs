//! Field extractors
//!
//! An [`Extractor`] computes one field value from an extraction [`Context`].
//! Generic kinds (constants, metadata, choices, backups, ...) work with every
//! reader; each format module provides the leaf kind for its own context.

mod csv_extractor;
mod external_extractor;
mod json_extractor;
mod rdf_extractor;
mod xml_extractor;

pub use csv_extractor::*;
pub use external_extractor::*;
pub use json_extractor::*;
pub use rdf_extractor::*;
pub use xml_extractor::*;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::error::{Result, TransformError};
use crate::graph::{Graph, Term};
use crate::tree::Node;
use crate::{is_truthy, Format, Metadata};

/// The format-specific part of an extraction context
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// No document data, only metadata (used for applicability checks)
    Empty,
    /// The rows of one CSV document
    Rows(&'a [Row]),
    /// The anchor node of a source and the entry node of one document
    Tree { top: Node<'a>, entry: Node<'a> },
    /// One JSON record
    Json(&'a Value),
    /// One subject of an RDF graph
    Graph { graph: &'a Graph, subject: &'a Term },
}

/// Everything an extractor may read while computing a value
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub scope: Scope<'a>,
    pub metadata: &'a Metadata,
    /// Position of the document within its source
    pub index: Option<usize>,
}

impl<'a> Context<'a> {
    pub fn new(scope: Scope<'a>, metadata: &'a Metadata) -> Self {
        Context {
            scope,
            metadata,
            index: None,
        }
    }

    /// A context holding only metadata
    pub fn metadata_only(metadata: &'a Metadata) -> Self {
        Context::new(Scope::Empty, metadata)
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// The same context with different metadata
    pub fn with_metadata(self, metadata: &'a Metadata) -> Self {
        Context { metadata, ..self }
    }
}

type TransformFn = dyn Fn(&Value) -> std::result::Result<Value, TransformError> + Send + Sync;

/// Post-processing applied to an extracted value
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    pub fn new(
        f: impl Fn(&Value) -> std::result::Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Transform(Arc::new(f))
    }

    pub fn call(&self, value: &Value) -> std::result::Result<Value, TransformError> {
        (self.0)(value)
    }

    /// Run `next` on the output of this transform
    pub fn then(self, next: Transform) -> Self {
        Transform::new(move |value| next.call(&self.call(value)?))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Decides from metadata alone whether an extractor applies
#[derive(Clone)]
pub enum Condition {
    /// Applies when the extractor, run on metadata only, yields a truthy value
    Extractor(Box<Extractor>),
    Predicate(Arc<dyn Fn(&Metadata) -> bool + Send + Sync>),
}

impl Condition {
    fn holds(&self, metadata: &Metadata) -> Result<bool> {
        match self {
            Condition::Extractor(extractor) => {
                let value = extractor.apply(&Context::metadata_only(metadata))?;
                Ok(is_truthy(&value))
            }
            Condition::Predicate(predicate) => Ok(predicate(metadata)),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Extractor(extractor) => f.debug_tuple("Extractor").field(extractor).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// What an extractor does
#[derive(Debug, Clone)]
pub enum Kind {
    /// Always the same value
    Constant(Value),
    /// A metadata value
    Metadata(String),
    /// Another extractor's value, so a second transform can be layered on top
    Pass(Box<Extractor>),
    /// The document's position within its source
    Order,
    /// The first candidate applicable to the metadata
    Choice(Vec<Extractor>),
    /// The first candidate producing a truthy value
    Backup(Vec<Extractor>),
    /// Every candidate's value, as an array
    Combined(Vec<Extractor>),
    Csv(CsvColumn),
    Json(JsonPath),
    Xml(XmlQuery),
    Rdf(RdfQuery),
    ExternalFile(StreamHandler),
}

impl Kind {
    /// Name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Constant(_) => "Constant",
            Kind::Metadata(_) => "Metadata",
            Kind::Pass(_) => "Pass",
            Kind::Order => "Order",
            Kind::Choice(_) => "Choice",
            Kind::Backup(_) => "Backup",
            Kind::Combined(_) => "Combined",
            Kind::Csv(_) => "CSV",
            Kind::Json(_) => "JSON",
            Kind::Xml(_) => "XML",
            Kind::Rdf(_) => "RDF",
            Kind::ExternalFile(_) => "ExternalFile",
        }
    }
}

/// A value-producing unit bound to a field
#[derive(Debug, Clone)]
pub struct Extractor {
    kind: Kind,
    applicable: Option<Condition>,
    transform: Option<Transform>,
}

impl From<Kind> for Extractor {
    fn from(kind: Kind) -> Self {
        Extractor {
            kind,
            applicable: None,
            transform: None,
        }
    }
}

impl Extractor {
    pub fn constant(value: impl Into<Value>) -> Self {
        Kind::Constant(value.into()).into()
    }

    pub fn metadata(key: impl Into<String>) -> Self {
        Kind::Metadata(key.into()).into()
    }

    pub fn pass(inner: Extractor) -> Self {
        Kind::Pass(Box::new(inner)).into()
    }

    pub fn order() -> Self {
        Kind::Order.into()
    }

    pub fn choice(candidates: Vec<Extractor>) -> Self {
        Kind::Choice(candidates).into()
    }

    pub fn backup(candidates: Vec<Extractor>) -> Self {
        Kind::Backup(candidates).into()
    }

    pub fn combined(parts: Vec<Extractor>) -> Self {
        Kind::Combined(parts).into()
    }

    pub fn csv(column: CsvColumn) -> Self {
        Kind::Csv(column).into()
    }

    pub fn json(path: JsonPath) -> Self {
        Kind::Json(path).into()
    }

    pub fn xml(query: XmlQuery) -> Self {
        Kind::Xml(query).into()
    }

    pub fn rdf(query: RdfQuery) -> Self {
        Kind::Rdf(query).into()
    }

    pub fn external_file(handler: StreamHandler) -> Self {
        Kind::ExternalFile(handler).into()
    }

    /// Add a transform; an existing transform runs first
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(match self.transform.take() {
            Some(existing) => existing.then(transform),
            None => transform,
        });
        self
    }

    /// Add a transform from a closure
    pub fn map(
        self,
        f: impl Fn(&Value) -> std::result::Result<Value, TransformError> + Send + Sync + 'static,
    ) -> Self {
        self.with_transform(Transform::new(f))
    }

    /// Only apply when `condition`, run on metadata alone, is truthy
    pub fn applicable_if(mut self, condition: Extractor) -> Self {
        self.applicable = Some(Condition::Extractor(Box::new(condition)));
        self
    }

    /// Only apply when the predicate accepts the metadata
    pub fn applicable_when(mut self, predicate: impl Fn(&Metadata) -> bool + Send + Sync + 'static) -> Self {
        self.applicable = Some(Condition::Predicate(Arc::new(predicate)));
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Whether this extractor applies to documents with this metadata
    pub fn is_applicable(&self, metadata: &Metadata) -> Result<bool> {
        match &self.applicable {
            Some(condition) => condition.holds(metadata),
            None => Ok(true),
        }
    }

    /// Compute the value for one document
    ///
    /// Inapplicable extractors yield `null` without extracting. A failing
    /// transform is logged and also yields `null`. Errors are reserved for
    /// contexts the extractor cannot work with at all.
    pub fn apply(&self, ctx: &Context<'_>) -> Result<Value> {
        if !self.is_applicable(ctx.metadata)? {
            return Ok(Value::Null);
        }

        let raw = self.extract(ctx)?;

        let Some(transform) = &self.transform else {
            return Ok(raw);
        };
        match transform.call(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(extractor = self.kind.name(), value = %raw, error = %e, "Value could not be transformed");
                Ok(Value::Null)
            }
        }
    }

    fn extract(&self, ctx: &Context<'_>) -> Result<Value> {
        match &self.kind {
            Kind::Constant(value) => Ok(value.clone()),
            Kind::Metadata(key) => Ok(ctx.metadata.get(key).cloned().unwrap_or(Value::Null)),
            Kind::Pass(inner) => inner.apply(ctx),
            Kind::Order => Ok(ctx.index.map(Value::from).unwrap_or(Value::Null)),
            Kind::Choice(candidates) => {
                for candidate in candidates {
                    if candidate.is_applicable(ctx.metadata)? {
                        return candidate.apply(ctx);
                    }
                }
                Ok(Value::Null)
            }
            Kind::Backup(candidates) => {
                for candidate in candidates {
                    let value = candidate.apply(ctx)?;
                    if is_truthy(&value) {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }
            Kind::Combined(parts) => parts
                .iter()
                .map(|part| part.apply(ctx))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Kind::Csv(column) => column.extract(ctx),
            Kind::Json(path) => path.extract(ctx),
            Kind::Xml(query) => query.extract(ctx),
            Kind::Rdf(query) => query.extract(ctx),
            Kind::ExternalFile(handler) => handler.extract(ctx),
        }
    }

    /// Whether this extractor (and everything nested in it) can run on `format`
    pub fn supports(&self, format: Format) -> bool {
        let condition_ok = match &self.applicable {
            Some(Condition::Extractor(condition)) => condition.metadata_only(),
            _ => true,
        };
        let kind_ok = match &self.kind {
            Kind::Constant(_) | Kind::Metadata(_) | Kind::Order | Kind::ExternalFile(_) => true,
            Kind::Pass(inner) => inner.supports(format),
            Kind::Choice(list) | Kind::Backup(list) | Kind::Combined(list) => {
                list.iter().all(|e| e.supports(format))
            }
            Kind::Csv(_) => format == Format::Csv,
            Kind::Json(_) => format == Format::Json,
            Kind::Xml(_) => matches!(format, Format::Xml | Format::Html),
            Kind::Rdf(_) => format == Format::Rdf,
        };
        condition_ok && kind_ok
    }

    /// Whether this extractor can run on metadata alone, as conditions do
    fn metadata_only(&self) -> bool {
        let condition_ok = match &self.applicable {
            Some(Condition::Extractor(condition)) => condition.metadata_only(),
            _ => true,
        };
        let kind_ok = match &self.kind {
            Kind::Constant(_) | Kind::Metadata(_) => true,
            Kind::Pass(inner) => inner.metadata_only(),
            Kind::Choice(list) | Kind::Backup(list) | Kind::Combined(list) => list.iter().all(Extractor::metadata_only),
            Kind::Order | Kind::ExternalFile(_) | Kind::Csv(_) | Kind::Json(_) | Kind::Xml(_) | Kind::Rdf(_) => false,
        };
        condition_ok && kind_ok
    }

    /// The XML query, when this is an XML extractor reading an external file
    pub fn external_xml(&self) -> Option<&XmlQuery> {
        match &self.kind {
            Kind::Xml(query) if query.external_file.is_some() => Some(query),
            _ => None,
        }
    }
}
