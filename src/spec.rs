//! Declarative reader definitions
//!
//! A reader can be described in JSON and built at runtime:
//!
//! ```json
//! {
//!   "format": "csv",
//!   "field_entry": "character",
//!   "fields": [
//!     {"name": "character", "extractor": {"type": "csv", "column": "character"}, "required": true},
//!     {"name": "lines", "extractor": {"type": "csv", "column": "line", "multiple": true}}
//!   ]
//! }
//! ```
//!
//! Closures (computed tags, custom transforms, stream handlers) have no JSON
//! form and are only available through the builder API.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::extractors::{CsvColumn, Extractor, JsonPath, NodeType, RdfQuery, XmlQuery};
use crate::field::Field;
use crate::readers::{AnyReader, CsvReader, HtmlReader, JsonReader, RdfReader, SubjectSelector, XmlReader};
use crate::transforms;
use crate::tree::{Matcher, Tag, TextMatch};
use crate::Format;

/// A complete reader definition
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderSpec {
    pub format: Format,
    pub fields: Vec<FieldSpec>,

    // CSV
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub skip_lines: usize,
    #[serde(default)]
    pub field_entry: Option<String>,
    #[serde(default)]
    pub required_field: Option<String>,

    // XML / HTML
    #[serde(default)]
    pub tag_toplevel: Option<TagConfig>,
    #[serde(default)]
    pub tag_entry: Option<TagConfig>,

    // JSON
    #[serde(default)]
    pub single_document: bool,
    #[serde(default)]
    pub record_path: Vec<String>,
    /// Keys or key paths copied into every record
    #[serde(default)]
    pub meta: Vec<MetaPath>,

    // RDF
    #[serde(default)]
    pub subjects: SubjectsSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MetaPath {
    Key(String),
    Path(Vec<String>),
}

impl MetaPath {
    fn segments(&self) -> Vec<String> {
        match self {
            MetaPath::Key(key) => vec![key.clone()],
            MetaPath::Path(path) => path.clone(),
        }
    }
}

/// Document subject selection for RDF readers
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubjectsSpec {
    #[default]
    All,
    WithPredicate { predicate: String },
    ObjectOf { predicate: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub extractor: ExtractorSpec,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub skip: bool,
}

/// An extractor, its transforms and its applicability condition
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorSpec {
    #[serde(flatten)]
    pub kind: KindSpec,
    /// Applied in order
    #[serde(default)]
    pub transform: Vec<TransformSpec>,
    /// Metadata key whose truthiness gates the extractor
    #[serde(default)]
    pub applicable_if: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KindSpec {
    Constant {
        value: Value,
    },
    Metadata {
        key: String,
    },
    Pass {
        extractor: Box<ExtractorSpec>,
    },
    Order,
    Choice {
        candidates: Vec<ExtractorSpec>,
    },
    Backup {
        candidates: Vec<ExtractorSpec>,
    },
    Combined {
        parts: Vec<ExtractorSpec>,
    },
    Csv {
        column: String,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        convert_to_none: Option<Vec<String>>,
    },
    Json {
        path: MetaPath,
    },
    Xml(XmlSpec),
    Rdf {
        #[serde(default)]
        predicates: Vec<String>,
        #[serde(default)]
        is_collection: bool,
        #[serde(default)]
        node_type: NodeType,
    },
}

/// Options of an XML / HTML extractor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct XmlSpec {
    pub tag: Option<TagConfig>,
    /// Tag name path, `..` for the parent; takes precedence over `tag`
    pub path: Option<Vec<String>>,
    pub toplevel: bool,
    pub multiple: bool,
    pub recursive: bool,
    pub attribute: Option<String>,
    pub flatten: bool,
    pub parent_level: Option<usize>,
    pub filter_attribute: Option<AttributeFilter>,
    pub secondary_tag: Option<SecondaryTag>,
    /// Anchor of the external file
    pub external_file: Option<TagConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeFilter {
    pub name: String,
    pub value: String,
}

/// Sibling whose text equals a literal or a metadata value
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryTag {
    pub tag: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

/// A tag search step
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub name: Option<String>,
    /// Regular expression over the tag name
    pub pattern: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub recursive: Option<bool>,
}

impl TagConfig {
    pub fn to_tag(&self, default_recursive: bool) -> Result<Tag> {
        let mut matcher = match (&self.name, &self.pattern) {
            (Some(_), Some(_)) => {
                return Err(Error::Config("a tag takes either `name` or `pattern`, not both".into()))
            }
            (Some(name), None) => Matcher::named(name.clone()),
            (None, Some(pattern)) => Matcher::pattern(Regex::new(pattern)?),
            (None, None) => Matcher::any(),
        };
        for (name, value) in &self.attributes {
            matcher = matcher.with_attribute(name.clone(), value.clone());
        }
        if let Some(text) = &self.text {
            matcher = matcher.with_text(TextMatch::Exact(text.clone()));
        }
        Ok(Tag::matching(matcher, self.recursive.unwrap_or(default_recursive)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum TransformSpec {
    Trim,
    Upper,
    Lower,
    Title,
    LocalName,
    ParseInt,
    ParseFloat,
    Join { separator: String },
    Split { separator: String },
}

impl TransformSpec {
    fn build(&self) -> crate::extractors::Transform {
        match self {
            TransformSpec::Trim => transforms::trim(),
            TransformSpec::Upper => transforms::upper(),
            TransformSpec::Lower => transforms::lower(),
            TransformSpec::Title => transforms::title(),
            TransformSpec::LocalName => transforms::local_name(),
            TransformSpec::ParseInt => transforms::parse_int(),
            TransformSpec::ParseFloat => transforms::parse_float(),
            TransformSpec::Join { separator } => transforms::join(separator.clone()),
            TransformSpec::Split { separator } => transforms::split(separator.clone()),
        }
    }
}

impl ExtractorSpec {
    pub fn build(&self) -> Result<Extractor> {
        let mut extractor = match &self.kind {
            KindSpec::Constant { value } => Extractor::constant(value.clone()),
            KindSpec::Metadata { key } => Extractor::metadata(key.clone()),
            KindSpec::Pass { extractor } => Extractor::pass(extractor.build()?),
            KindSpec::Order => Extractor::order(),
            KindSpec::Choice { candidates } => Extractor::choice(build_all(candidates)?),
            KindSpec::Backup { candidates } => Extractor::backup(build_all(candidates)?),
            KindSpec::Combined { parts } => Extractor::combined(build_all(parts)?),
            KindSpec::Csv {
                column,
                multiple,
                convert_to_none,
            } => {
                let mut column = CsvColumn::new(column.clone());
                if *multiple {
                    column = column.multiple();
                }
                if let Some(values) = convert_to_none {
                    column = column.convert_to_none(values.clone());
                }
                Extractor::csv(column)
            }
            KindSpec::Json { path } => match path {
                MetaPath::Key(key) => Extractor::json(JsonPath::new(key.clone())),
                MetaPath::Path(keys) => Extractor::json(JsonPath::keys(keys.iter().cloned())),
            },
            KindSpec::Xml(spec) => Extractor::xml(spec.build()?),
            KindSpec::Rdf {
                predicates,
                is_collection,
                node_type,
            } => {
                let mut query = RdfQuery::new(predicates.iter().cloned()).node_type(*node_type);
                if *is_collection {
                    query = query.collection();
                }
                Extractor::rdf(query)
            }
        };

        for transform in &self.transform {
            extractor = extractor.with_transform(transform.build());
        }
        if let Some(key) = &self.applicable_if {
            extractor = extractor.applicable_if(Extractor::metadata(key.clone()));
        }
        Ok(extractor)
    }
}

fn build_all(specs: &[ExtractorSpec]) -> Result<Vec<Extractor>> {
    specs.iter().map(ExtractorSpec::build).collect()
}

impl XmlSpec {
    pub fn build(&self) -> Result<XmlQuery> {
        let mut query = match (&self.path, &self.tag) {
            (Some(path), _) => XmlQuery::path(path.as_slice(), self.recursive),
            (None, Some(tag)) => XmlQuery::new(tag.to_tag(self.recursive)?),
            (None, None) => XmlQuery::current(),
        };
        if let Some(filter) = &self.filter_attribute {
            query = query.filter_attribute(filter.name.clone(), filter.value.clone());
        }
        if let Some(level) = self.parent_level {
            query = query.parent_level(level);
        }
        if let Some(secondary) = &self.secondary_tag {
            let text = match (&secondary.text, &secondary.metadata) {
                (Some(text), None) => TextMatch::Exact(text.clone()),
                (None, Some(key)) => TextMatch::Metadata(key.clone()),
                _ => {
                    return Err(Error::Config(format!(
                        "secondary tag `{}` needs exactly one of `text` or `metadata`",
                        secondary.tag
                    )))
                }
            };
            query = query.secondary_tag(secondary.tag.clone(), text);
        }
        if self.toplevel {
            query = query.toplevel();
        }
        if self.multiple {
            query = query.multiple();
        }
        if let Some(attribute) = &self.attribute {
            query = query.attribute(attribute.clone());
        }
        if self.flatten {
            query = query.flatten();
        }
        if let Some(anchor) = &self.external_file {
            query = query.external_file(anchor.to_tag(true)?);
        }
        Ok(query)
    }
}

impl FieldSpec {
    pub fn build(&self) -> Result<Field> {
        let mut field = Field::new(self.name.clone(), self.extractor.build()?);
        if self.required {
            field = field.required();
        }
        if self.skip {
            field = field.skip();
        }
        Ok(field)
    }
}

impl ReaderSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        ReaderSpec::from_json(&content)
    }

    /// Build the reader this definition describes
    pub fn build(&self) -> Result<AnyReader> {
        let fields = self
            .fields
            .iter()
            .map(FieldSpec::build)
            .collect::<Result<Vec<_>>>()?;

        let reader = match self.format {
            Format::Csv => {
                let mut reader = CsvReader::new(fields).skip_lines(self.skip_lines);
                if let Some(delimiter) = self.delimiter {
                    let byte = u8::try_from(delimiter)
                        .ok()
                        .filter(u8::is_ascii)
                        .ok_or_else(|| Error::Config(format!("delimiter `{delimiter}` is not ASCII")))?;
                    reader = reader.delimiter(byte);
                }
                if let Some(column) = &self.field_entry {
                    reader = reader.field_entry(column.clone());
                }
                if let Some(column) = &self.required_field {
                    reader = reader.required_field(column.clone());
                }
                AnyReader::Csv(reader)
            }
            Format::Xml => {
                let mut reader = XmlReader::new(fields);
                if let Some(tag) = &self.tag_toplevel {
                    reader = reader.toplevel(tag.to_tag(true)?);
                }
                if let Some(tag) = &self.tag_entry {
                    reader = reader.entry(tag.to_tag(true)?);
                }
                AnyReader::Xml(reader)
            }
            Format::Html => {
                let mut reader = HtmlReader::new(fields);
                if let Some(tag) = &self.tag_toplevel {
                    reader = reader.toplevel(tag.to_tag(true)?);
                }
                if let Some(tag) = &self.tag_entry {
                    reader = reader.entry(tag.to_tag(false)?);
                }
                AnyReader::Html(reader)
            }
            Format::Json => {
                let mut reader = JsonReader::new(fields).record_path(self.record_path.iter().cloned());
                if self.single_document {
                    reader = reader.single_document();
                }
                for meta in &self.meta {
                    reader = reader.meta(meta.segments());
                }
                AnyReader::Json(reader)
            }
            Format::Rdf => {
                let selector = match &self.subjects {
                    SubjectsSpec::All => SubjectSelector::All,
                    SubjectsSpec::WithPredicate { predicate } => SubjectSelector::WithPredicate(predicate.clone()),
                    SubjectsSpec::ObjectOf { predicate } => SubjectSelector::ObjectOf(predicate.clone()),
                };
                AnyReader::Rdf(RdfReader::new(fields).subjects(selector))
            }
        };
        Ok(reader)
    }
}
