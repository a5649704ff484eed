//! HTML reader
//!
//! Same anchor/entry model as the XML reader, on a scraper-parsed page.
//! Entries are only looked for directly under the anchor, and fields cannot
//! read external files.

use super::xml::TreeLayout;
use super::{validate_fields, DocumentIter, Reader};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::sources::Source;
use crate::tree::{HtmlTree, Node, TagSpec};
use crate::Format;

/// Reader for HTML pages
#[derive(Debug, Clone)]
pub struct HtmlReader {
    fields: Vec<Field>,
    tag_toplevel: Option<TagSpec>,
    tag_entry: Option<TagSpec>,
}

impl HtmlReader {
    pub fn new(fields: Vec<Field>) -> Self {
        HtmlReader {
            fields,
            tag_toplevel: None,
            tag_entry: None,
        }
    }

    pub fn toplevel(mut self, spec: impl Into<TagSpec>) -> Self {
        self.tag_toplevel = Some(spec.into());
        self
    }

    /// Entry locator; searched among the anchor's children only
    pub fn entry(mut self, spec: impl Into<TagSpec>) -> Self {
        self.tag_entry = Some(spec.into());
        self
    }
}

impl Reader for HtmlReader {
    fn format(&self) -> Format {
        Format::Html
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn validate(&self) -> Result<()> {
        validate_fields(&self.fields, Format::Html)?;
        match self.fields.iter().find(|f| f.extractor.external_xml().is_some()) {
            Some(field) => Err(Error::IncompatibleExtractor {
                field: field.name.clone(),
                format: Format::Html,
            }),
            None => Ok(()),
        }
    }

    fn read_source(&self, source: Source) -> Result<DocumentIter<'_>> {
        let content = source.location.read_bytes(Format::Html)?;
        let tree = HtmlTree::parse(&String::from_utf8_lossy(&content));

        let layout = TreeLayout {
            fields: &self.fields,
            toplevel: self.tag_toplevel.as_ref(),
            entry: self.tag_entry.as_ref(),
            recursive_entries: false,
        };
        let docs = layout.documents(
            Node::from(tree.root()),
            None,
            &source.metadata,
            &source.location.to_string(),
        )?;
        Ok(Box::new(docs.into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{Extractor, XmlQuery};
    use crate::tree::{Matcher, Tag};
    use crate::Document;
    use serde_json::json;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Hamlet, Act I, Scene V</title></head>
<body>
    <div id="scene">
        <div class="speech"><b>HAMLET</b><p>Whither wilt thou lead me? Speak, I'll go no further.</p></div>
        <div class="speech"><b>GHOST</b><p>Mark me.</p></div>
        <section><div class="speech"><b>NESTED</b><p>Not an entry.</p></div></section>
    </div>
</body>
</html>"#;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("character", Extractor::xml(XmlQuery::child("b"))).required(),
            Field::new("line", Extractor::xml(XmlQuery::child("p"))),
            Field::new("page", Extractor::xml(XmlQuery::descendant("title").toplevel())),
        ]
    }

    fn read(reader: &HtmlReader) -> Vec<Document> {
        reader
            .documents(vec![Source::bytes(PAGE)])
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_direct_children_only() {
        let scene = Tag::matching(Matcher::named("div").with_attribute("id", "scene"), true);
        let speech = Tag::matching(Matcher::named("div").with_attribute("class", "speech"), true);
        let reader = HtmlReader::new(fields()).toplevel(scene).entry(speech);
        let docs = read(&reader);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["character"], json!("GHOST"));
        assert_eq!(docs[1]["line"], json!("Mark me."));
        assert_eq!(docs[1]["page"], serde_json::Value::Null);
    }

    #[test]
    fn test_whole_page_document() {
        let reader = HtmlReader::new(vec![Field::new(
            "page",
            Extractor::xml(XmlQuery::descendant("title")),
        )]);
        let docs = read(&reader);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["page"], json!("Hamlet, Act I, Scene V"));
    }

    #[test]
    fn test_external_file_rejected() {
        let external = XmlQuery::child("role").external_file(Tag::named("catalogue"));
        let reader = HtmlReader::new(vec![Field::new("role", Extractor::xml(external))]);
        let mut docs = reader.documents(vec![Source::bytes(PAGE)]);
        assert!(matches!(
            docs.next(),
            Some(Err(Error::IncompatibleExtractor { format: Format::Html, .. }))
        ));
        assert!(docs.next().is_none());
    }
}
