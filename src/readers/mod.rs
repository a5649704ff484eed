//! Readers: from sources to documents
//!
//! Every reader turns one source into zero or more extraction contexts and
//! runs its fields over each context. [`Reader::documents`] chains sources
//! lazily: a source is only opened once the previous one is exhausted.

mod csv;
mod html;
mod json;
mod rdf;
mod xml;

pub use self::csv::CsvReader;
pub use self::html::HtmlReader;
pub use self::json::JsonReader;
pub use self::rdf::{RdfReader, SubjectSelector};
pub use self::xml::{XmlReader, EXTERNAL_FILE};

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::extractors::Context;
use crate::field::Field;
use crate::sources::Source;
use crate::{is_truthy, Document, Format};

/// Documents of one source
pub type DocumentIter<'r> = Box<dyn Iterator<Item = Result<Document>> + 'r>;

/// A format-specific document reader
pub trait Reader {
    fn format(&self) -> Format;

    /// Fields in output order
    fn fields(&self) -> &[Field];

    /// Documents of a single source
    ///
    /// Fails when the source cannot be opened or parsed at all.
    fn read_source(&self, source: Source) -> Result<DocumentIter<'_>>;

    /// Names of the fields that appear in documents
    fn field_names(&self) -> Vec<&str> {
        self.fields()
            .iter()
            .filter(|f| !f.skip)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Check the field list against this reader's format
    fn validate(&self) -> Result<()> {
        validate_fields(self.fields(), self.format())
    }

    /// All documents of all sources, in order
    ///
    /// Validation happens before the first source is opened. The first error
    /// ends the sequence.
    fn documents<I>(&self, sources: I) -> Documents<'_, I::IntoIter>
    where
        Self: Sized,
        I: IntoIterator<Item = Source>,
    {
        Documents::new(self, sources)
    }
}

/// Reject duplicate names and extractors that cannot run on `format`
pub fn validate_fields(fields: &[Field], format: Format) -> Result<()> {
    let mut names = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(Error::DuplicateField(field.name.clone()));
        }
        if !field.extractor.supports(format) {
            return Err(Error::IncompatibleExtractor {
                field: field.name.clone(),
                format,
            });
        }
    }
    Ok(())
}

/// Lazy document sequence over several sources
pub struct Documents<'r, S> {
    reader: &'r dyn Reader,
    sources: S,
    current: Option<DocumentIter<'r>>,
    pending: Option<Error>,
    finished: bool,
}

impl<'r, S: Iterator<Item = Source>> Documents<'r, S> {
    pub fn new(reader: &'r dyn Reader, sources: impl IntoIterator<IntoIter = S>) -> Self {
        Documents {
            reader,
            sources: sources.into_iter(),
            current: None,
            pending: reader.validate().err(),
            finished: false,
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<Document>> {
        self.finished = true;
        self.current = None;
        Some(Err(err))
    }
}

impl<S: Iterator<Item = Source>> Iterator for Documents<'_, S> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(err) = self.pending.take() {
            return self.fail(err);
        }

        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(Ok(doc)) => return Some(Ok(doc)),
                    Some(Err(err)) => return self.fail(err),
                    None => self.current = None,
                }
            }

            let Some(source) = self.sources.next() else {
                self.finished = true;
                return None;
            };
            match self.reader.read_source(source) {
                Ok(docs) => self.current = Some(docs),
                Err(err) => return self.fail(err),
            }
        }
    }
}

/// Run every non-skipped field over one context
///
/// Returns `None` when a required field comes out falsy.
pub(crate) fn assemble(fields: &[Field], ctx: &Context<'_>) -> Result<Option<Document>> {
    let mut doc = Document::new();
    for field in fields.iter().filter(|f| !f.skip) {
        let value = field.extractor.apply(ctx)?;
        doc.insert(field.name.clone(), value);
    }
    Ok(keep_if_complete(fields, doc))
}

/// Drop documents missing a required field
pub(crate) fn keep_if_complete(fields: &[Field], doc: Document) -> Option<Document> {
    let complete = fields
        .iter()
        .filter(|f| f.required && !f.skip)
        .all(|f| doc.get(&f.name).map(is_truthy).unwrap_or(false));
    complete.then_some(doc)
}

/// Any of the built-in readers
///
/// Lets declaratively configured readers be handled uniformly.
#[derive(Debug)]
pub enum AnyReader {
    Csv(CsvReader),
    Xml(XmlReader),
    Html(HtmlReader),
    Json(JsonReader),
    Rdf(RdfReader),
}

impl AnyReader {
    fn inner(&self) -> &dyn Reader {
        match self {
            AnyReader::Csv(r) => r,
            AnyReader::Xml(r) => r,
            AnyReader::Html(r) => r,
            AnyReader::Json(r) => r,
            AnyReader::Rdf(r) => r,
        }
    }
}

impl Reader for AnyReader {
    fn format(&self) -> Format {
        self.inner().format()
    }

    fn fields(&self) -> &[Field] {
        self.inner().fields()
    }

    fn read_source(&self, source: Source) -> Result<DocumentIter<'_>> {
        self.inner().read_source(source)
    }

    fn validate(&self) -> Result<()> {
        self.inner().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{CsvColumn, Extractor};
    use serde_json::json;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("title", Extractor::metadata("title")).required(),
            Field::new("kind", Extractor::constant("play")),
            Field::new("hidden", Extractor::constant("x")).skip(),
        ]
    }

    #[test]
    fn test_assemble_respects_required_and_skip() {
        let fields = fields();
        let mut meta = crate::Metadata::new();
        meta.insert("title".into(), json!("Hamlet"));
        let doc = assemble(&fields, &Context::metadata_only(&meta)).unwrap().unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"title": "Hamlet", "kind": "play"}));

        meta.insert("title".into(), json!(""));
        assert!(assemble(&fields, &Context::metadata_only(&meta)).unwrap().is_none());
    }

    #[test]
    fn test_validate_fields() {
        let dup = vec![
            Field::new("a", Extractor::constant(1)),
            Field::new("a", Extractor::constant(2)),
        ];
        assert!(matches!(validate_fields(&dup, Format::Csv), Err(Error::DuplicateField(name)) if name == "a"));

        let wrong = vec![Field::new("line", Extractor::csv(CsvColumn::new("line")))];
        assert!(matches!(
            validate_fields(&wrong, Format::Json),
            Err(Error::IncompatibleExtractor { format: Format::Json, .. })
        ));
        assert!(validate_fields(&wrong, Format::Csv).is_ok());
    }
}
