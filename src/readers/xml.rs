//! XML reader
//!
//! A source is parsed into one tree. The `tag_toplevel` locator picks the
//! anchor node and every `tag_entry` match inside it becomes a document.
//! Fields marked with an external file are read from a second XML file named
//! by the `external_file` metadata key, after the regular fields.

use serde_json::Value;
use tracing::warn;

use super::{keep_if_complete, DocumentIter, Reader};
use crate::error::Result;
use crate::extractors::{Context, Scope};
use crate::field::Field;
use crate::sources::{Location, Source};
use crate::tree::{Node, TagSpec, XmlTree};
use crate::{Document, Format, Metadata};

/// Metadata key naming the secondary XML file
pub const EXTERNAL_FILE: &str = "external_file";

/// Reader for XML files
#[derive(Debug, Clone)]
pub struct XmlReader {
    fields: Vec<Field>,
    tag_toplevel: Option<TagSpec>,
    tag_entry: Option<TagSpec>,
}

impl XmlReader {
    pub fn new(fields: Vec<Field>) -> Self {
        XmlReader {
            fields,
            tag_toplevel: None,
            tag_entry: None,
        }
    }

    /// Anchor locator; without one the whole document is the anchor
    pub fn toplevel(mut self, spec: impl Into<TagSpec>) -> Self {
        self.tag_toplevel = Some(spec.into());
        self
    }

    /// Entry locator; without one the anchor itself is the only entry
    pub fn entry(mut self, spec: impl Into<TagSpec>) -> Self {
        self.tag_entry = Some(spec.into());
        self
    }
}

impl Reader for XmlReader {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn read_source(&self, source: Source) -> Result<DocumentIter<'_>> {
        let content = source.location.read_bytes(Format::Xml)?;
        let tree = XmlTree::parse(&content)?;

        let external = match source.metadata.get(EXTERNAL_FILE).and_then(Value::as_str) {
            Some(path) => {
                let content = Location::Path(path.into()).read_bytes(Format::Xml)?;
                Some(XmlTree::parse(&content)?)
            }
            None => None,
        };

        let layout = TreeLayout {
            fields: &self.fields,
            toplevel: self.tag_toplevel.as_ref(),
            entry: self.tag_entry.as_ref(),
            recursive_entries: true,
        };
        let docs = layout.documents(
            Node::from(tree.root()),
            external.as_ref().map(|t| Node::from(t.root())),
            &source.metadata,
            &source.location.to_string(),
        )?;
        Ok(Box::new(docs.into_iter().map(Ok)))
    }
}

/// How documents sit inside a parsed tree
pub(super) struct TreeLayout<'s> {
    pub fields: &'s [Field],
    pub toplevel: Option<&'s TagSpec>,
    pub entry: Option<&'s TagSpec>,
    /// Entries may sit anywhere below the anchor, not only directly under it
    pub recursive_entries: bool,
}

impl TreeLayout<'_> {
    /// Documents of one tree, in entry order
    pub fn documents(
        &self,
        root: Node<'_>,
        external: Option<Node<'_>>,
        metadata: &Metadata,
        source_name: &str,
    ) -> Result<Vec<Document>> {
        let Some(top) = anchor(self.toplevel, root, metadata) else {
            warn!(source = source_name, "Top-level tag not found");
            return Ok(Vec::new());
        };

        let entries = match self.entry.and_then(|spec| spec.resolve(metadata)) {
            Some(tag) => {
                let tag = tag.into_owned();
                let tag = if self.recursive_entries { tag } else { tag.with_recursion(false) };
                tag.find_in(top, metadata)
            }
            None => vec![top],
        };

        let mut docs = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let ctx = Context::new(Scope::Tree { top, entry }, metadata).at(index);
            if let Some(doc) = self.document(&ctx, external, source_name)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    fn document(&self, ctx: &Context<'_>, external: Option<Node<'_>>, source_name: &str) -> Result<Option<Document>> {
        let is_external = |field: &Field| external.is_some() && field.extractor.external_xml().is_some();

        let mut values: Vec<Option<Value>> = vec![None; self.fields.len()];
        for (slot, field) in values.iter_mut().zip(self.fields) {
            if field.skip || is_external(field) {
                continue;
            }
            *slot = Some(field.extractor.apply(ctx)?);
        }

        if let Some(external_root) = external {
            // External lookups may be keyed on values extracted so far
            let mut augmented = ctx.metadata.clone();
            for (field, value) in self.fields.iter().zip(&values) {
                if let Some(value) = value {
                    augmented.insert(field.name.clone(), value.clone());
                }
            }

            for (slot, field) in values.iter_mut().zip(self.fields) {
                let Some(query) = field.extractor.external_xml().filter(|_| !field.skip) else {
                    continue;
                };
                let Some(anchor_tag) = &query.external_file else {
                    continue;
                };
                *slot = Some(match anchor_tag.find_first(external_root, &augmented) {
                    Some(anchor) => {
                        field.extractor.apply(&external_context(ctx, anchor, &augmented))?
                    }
                    None => {
                        warn!(source = source_name, field = %field.name, "Top-level tag not found in external file");
                        Value::Null
                    }
                });
            }
        }

        let doc: Document = self
            .fields
            .iter()
            .zip(values)
            .filter_map(|(field, value)| value.map(|v| (field.name.clone(), v)))
            .collect();
        Ok(keep_if_complete(self.fields, doc))
    }
}

fn anchor<'a>(spec: Option<&TagSpec>, root: Node<'a>, metadata: &Metadata) -> Option<Node<'a>> {
    match spec.and_then(|spec| spec.resolve(metadata)) {
        Some(tag) => tag.find_first(root, metadata),
        None => Some(root),
    }
}

/// Context of an external lookup; the entry's position carries over
fn external_context<'a>(ctx: &Context<'_>, anchor: Node<'a>, metadata: &'a Metadata) -> Context<'a> {
    Context {
        index: ctx.index,
        ..Context::new(Scope::Tree { top: anchor, entry: anchor }, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{Extractor, XmlQuery};
    use crate::tree::{Matcher, Tag, TextMatch};
    use serde_json::json;
    use std::io::Write;

    const PLAY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI>
    <title>Hamlet</title>
    <scene n="V">
        <lines character="HAMLET"><l>Whither wilt thou lead me?</l></lines>
        <lines character="GHOST"><l>Mark me.</l></lines>
        <lines character="HAMLET"><l>I will.</l></lines>
        <lines><l>Exeunt</l></lines>
    </scene>
</TEI>"#;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("title", Extractor::xml(XmlQuery::descendant("title").toplevel())),
            Field::new("character", Extractor::xml(XmlQuery::current().attribute("character"))).required(),
            Field::new("line", Extractor::xml(XmlQuery::child("l"))),
            Field::new("index", Extractor::order()),
        ]
    }

    fn read(reader: &XmlReader, source: Source) -> Vec<Document> {
        reader.documents(vec![source]).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_entries_become_documents() {
        let reader = XmlReader::new(fields()).toplevel(Tag::named("scene")).entry(Tag::child("lines"));
        let docs = read(&reader, Source::bytes(PLAY));
        assert_eq!(docs.len(), 3);
        assert_eq!(
            serde_json::to_value(&docs[1]).unwrap(),
            json!({"title": null, "character": "GHOST", "line": "Mark me.", "index": 1})
        );
        // The fourth entry lacks the required character
        assert_eq!(docs[2]["index"], json!(2));
    }

    #[test]
    fn test_missing_toplevel_yields_nothing() {
        let reader = XmlReader::new(fields()).toplevel(Tag::named("act")).entry(Tag::child("lines"));
        assert!(read(&reader, Source::bytes(PLAY)).is_empty());
    }

    #[test]
    fn test_no_entry_tag_reads_anchor() {
        let reader = XmlReader::new(vec![Field::new(
            "title",
            Extractor::xml(XmlQuery::child("title")),
        )])
        .toplevel(Tag::named("TEI"));
        let docs = read(&reader, Source::bytes(PLAY));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["title"], json!("Hamlet"));
    }

    #[test]
    fn test_computed_entry_tag() {
        let entry = TagSpec::computed(|meta| {
            let who = meta.get("speaker")?.as_str()?.to_string();
            Some(Tag::matching(Matcher::named("lines").with_attribute("character", who), false))
        });
        let reader = XmlReader::new(fields()).toplevel(Tag::named("scene")).entry(entry);
        let docs = read(&reader, Source::bytes(PLAY).with("speaker", "HAMLET"));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["line"], json!("I will."));
    }

    #[test]
    fn test_external_file_fields() {
        let mut external = tempfile::NamedTempFile::new().unwrap();
        write!(
            external,
            r#"<catalogue>
                <record><name>HAMLET</name><role>Prince of Denmark</role></record>
                <record><name>GHOST</name><role>Ghost of Hamlet's father</role></record>
            </catalogue>"#
        )
        .unwrap();

        let role = XmlQuery::child("role")
            .secondary_tag("name", TextMatch::Metadata("character".into()))
            .external_file(Tag::named("catalogue"));
        let reader = XmlReader::new(vec![
            Field::new("role", Extractor::xml(role)),
            Field::new("character", Extractor::xml(XmlQuery::current().attribute("character"))).required(),
        ])
        .toplevel(Tag::named("scene"))
        .entry(Tag::child("lines"));

        let source = Source::bytes(PLAY).with(EXTERNAL_FILE, external.path().to_str().unwrap());
        let docs = read(&reader, source);
        assert_eq!(docs.len(), 3);
        assert_eq!(
            serde_json::to_value(&docs[1]).unwrap(),
            json!({"role": "Ghost of Hamlet's father", "character": "GHOST"})
        );
    }

    #[test]
    fn test_external_lookup_keeps_entry_position() {
        let tree = XmlTree::parse(b"<catalogue><record/></catalogue>").unwrap();
        let anchor = Node::from(tree.root());
        let metadata = Metadata::new();
        let entry_ctx = Context::metadata_only(&metadata).at(2);
        let ctx = external_context(&entry_ctx, anchor, &metadata);
        assert_eq!(ctx.index, Some(2));
        assert_eq!(Extractor::order().apply(&ctx).unwrap(), json!(2));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let reader = XmlReader::new(fields());
        let mut docs = reader.documents(vec![Source::bytes("<TEI><scene></TEI>")]);
        assert!(docs.next().unwrap().is_err());
        assert!(docs.next().is_none());
    }
}
