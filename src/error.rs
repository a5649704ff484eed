//! Error types for document extraction

use thiserror::Error;

use crate::Format;

/// Result type for reader and extractor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort reading a source
///
/// Data problems inside a single field never show up here: they degrade the
/// field to `null`. These variants cover configuration mistakes and sources
/// that cannot be interpreted at all.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while opening or reading a source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited file
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed XML
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed XML attribute
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// Malformed JSON
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed RDF serialization
    #[error("RDF parse error: {0}")]
    Rdf(String),

    /// Failure fetching a URL source
    #[error("HTTP error: {0}")]
    Http(String),

    /// The reader does not know how to open this kind of location
    #[error("{format} reader cannot read a {kind} source")]
    UnsupportedSource { format: Format, kind: &'static str },

    /// A field uses an extractor that cannot run against this format
    #[error("field `{field}` uses an extractor that cannot be used with {format} data")]
    IncompatibleExtractor { field: String, format: Format },

    /// Two fields share a name
    #[error("duplicate field name `{0}`")]
    DuplicateField(String),

    /// An extractor was handed a context of the wrong shape
    #[error("{extractor} extractor needs a {expected} context")]
    ContextMismatch {
        extractor: &'static str,
        expected: &'static str,
    },

    /// An extractor relies on a metadata key the source did not provide
    #[error("missing metadata key `{0}`")]
    MissingMetadata(String),

    /// Invalid reader definition
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Error::Http(err.to_string())
    }
}

impl From<rio_turtle::TurtleError> for Error {
    fn from(err: rio_turtle::TurtleError) -> Self {
        Error::Rdf(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Failure of a transform or stream handler on one value
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        TransformError(message.into())
    }
}

impl From<String> for TransformError {
    fn from(message: String) -> Self {
        TransformError(message)
    }
}

impl From<&str> for TransformError {
    fn from(message: &str) -> Self {
        TransformError(message.to_string())
    }
}

impl From<std::io::Error> for TransformError {
    fn from(err: std::io::Error) -> Self {
        TransformError(err.to_string())
    }
}
