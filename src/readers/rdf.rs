//! RDF reader
//!
//! One or more serialized files are merged into one graph; every selected
//! subject anchors a document.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use tracing::debug;

use super::{assemble, DocumentIter, Reader};
use crate::error::Result;
use crate::extractors::{Context, Scope};
use crate::field::Field;
use crate::graph::{Graph, Term};
use crate::sources::{Location, Source};
use crate::{Document, Format};

/// How the document subjects of a graph are chosen
#[derive(Clone, Default)]
pub enum SubjectSelector {
    /// Every distinct subject
    #[default]
    All,
    /// Subjects having this predicate
    WithPredicate(String),
    /// Objects of this predicate
    ObjectOf(String),
    Custom(Arc<dyn Fn(&Graph) -> Vec<Term> + Send + Sync>),
}

impl SubjectSelector {
    pub fn custom(select: impl Fn(&Graph) -> Vec<Term> + Send + Sync + 'static) -> Self {
        SubjectSelector::Custom(Arc::new(select))
    }

    pub fn select(&self, graph: &Graph) -> Vec<Term> {
        let found = match self {
            SubjectSelector::All => graph.subjects(),
            SubjectSelector::WithPredicate(predicate) => graph.subjects_with(predicate),
            SubjectSelector::ObjectOf(predicate) => graph.objects_of(predicate),
            SubjectSelector::Custom(select) => return select(graph),
        };
        found.into_iter().cloned().collect()
    }
}

impl fmt::Debug for SubjectSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectSelector::All => f.write_str("All"),
            SubjectSelector::WithPredicate(p) => f.debug_tuple("WithPredicate").field(p).finish(),
            SubjectSelector::ObjectOf(p) => f.debug_tuple("ObjectOf").field(p).finish(),
            SubjectSelector::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// Reader for RDF graphs in Turtle or N-Triples
#[derive(Debug, Clone)]
pub struct RdfReader {
    fields: Vec<Field>,
    subjects: SubjectSelector,
}

impl RdfReader {
    pub fn new(fields: Vec<Field>) -> Self {
        RdfReader {
            fields,
            subjects: SubjectSelector::default(),
        }
    }

    pub fn subjects(mut self, selector: SubjectSelector) -> Self {
        self.subjects = selector;
        self
    }

    fn load(&self, location: &Location) -> Result<Graph> {
        let mut graph = Graph::new();
        match location {
            Location::Path(path) => graph.load_file(path)?,
            Location::Files(paths) => {
                for path in paths {
                    graph.load_file(path)?;
                }
            }
            Location::Bytes(_) | Location::Url(_) => {
                let content = location.read_bytes(Format::Rdf)?;
                graph.parse_turtle(Cursor::new(content))?;
            }
        }
        Ok(graph)
    }
}

impl Reader for RdfReader {
    fn format(&self) -> Format {
        Format::Rdf
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn read_source(&self, source: Source) -> Result<DocumentIter<'_>> {
        let graph = self.load(&source.location)?;
        let subjects = self.subjects.select(&graph);
        debug!(triples = graph.len(), subjects = subjects.len(), "Selected document subjects");

        let mut docs: Vec<Document> = Vec::new();
        for (index, subject) in subjects.iter().enumerate() {
            let ctx = Context::new(Scope::Graph { graph: &graph, subject }, &source.metadata).at(index);
            if let Some(doc) = assemble(&self.fields, &ctx)? {
                docs.push(doc);
            }
        }
        Ok(Box::new(docs.into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{Extractor, NodeType, RdfQuery};
    use crate::transforms;
    use serde_json::json;

    const SPEAKER: &str = "http://example.org/shakespeare/hasSpeaker";

    const PART_ONE: &str = r#"
        @prefix sh: <http://example.org/shakespeare/> .
        @prefix char: <http://example.org/shakespeare/character/> .
        @prefix vis: <http://example.org/vision/> .

        sh:line0 sh:hasSpeaker char:HAMLET ;
            sh:hasText ( "Whither wilt thou lead me? Speak, I'll go no further." ) .
        sh:line1 sh:hasSpeaker char:GHOST ;
            sh:hasText ( "Mark me." ) .
        char:GHOST vis:hasOpacity 0.3 .
    "#;

    const PART_TWO: &str = r#"
        @prefix sh: <http://example.org/shakespeare/> .
        @prefix char: <http://example.org/shakespeare/character/> .
        sh:line2 sh:hasSpeaker char:HAMLET ;
            sh:hasText ( "I will." ) .
    "#;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("id", Extractor::rdf(RdfQuery::subject())),
            Field::new(
                "character",
                Extractor::rdf(RdfQuery::new([SPEAKER])).with_transform(transforms::local_name()),
            )
            .required(),
            Field::new(
                "lines",
                Extractor::rdf(RdfQuery::new(["http://example.org/shakespeare/hasText"]).collection()),
            ),
            Field::new(
                "opacity",
                Extractor::rdf(RdfQuery::new([SPEAKER, "http://example.org/vision/hasOpacity"])),
            ),
        ]
    }

    #[test]
    fn test_subjects_with_predicate() {
        let reader = RdfReader::new(fields()).subjects(SubjectSelector::WithPredicate(SPEAKER.into()));
        let docs: Vec<Document> = reader
            .documents(vec![Source::bytes(PART_ONE)])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            serde_json::to_value(&docs[1]).unwrap(),
            json!({
                "id": "http://example.org/shakespeare/line1",
                "character": "GHOST",
                "lines": ["Mark me."],
                "opacity": 0.3
            })
        );
        assert_eq!(docs[0]["opacity"], serde_json::Value::Null);
    }

    #[test]
    fn test_all_subjects_filtered_by_required() {
        // List nodes and the character are subjects too, but have no speaker
        let reader = RdfReader::new(fields());
        let docs: Vec<Document> = reader
            .documents(vec![Source::bytes(PART_ONE)])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_graph_from_several_files() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.ttl");
        let two = dir.path().join("two.ttl");
        std::fs::write(&one, PART_ONE).unwrap();
        std::fs::write(&two, PART_TWO).unwrap();

        let reader = RdfReader::new(vec![
            Field::new("character", Extractor::rdf(RdfQuery::subject()).with_transform(transforms::local_name())),
            Field::new(
                "speeches",
                Extractor::rdf(RdfQuery::new([SPEAKER]).node_type(NodeType::Subject).collection()),
            ),
        ])
        .subjects(SubjectSelector::ObjectOf(SPEAKER.into()));
        let docs: Vec<Document> = reader
            .documents(vec![Source::files([one, two])])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["character"], json!("HAMLET"));
        assert_eq!(
            docs[0]["speeches"],
            json!(["http://example.org/shakespeare/line0", "http://example.org/shakespeare/line2"])
        );
    }

    #[test]
    fn test_custom_selector() {
        let selector = SubjectSelector::custom(|graph| {
            let mut subjects: Vec<Term> = graph.subjects_with(SPEAKER).into_iter().cloned().collect();
            subjects.reverse();
            subjects
        });
        let reader = RdfReader::new(vec![Field::new("index", Extractor::order()), Field::new("id", Extractor::rdf(RdfQuery::subject()))])
            .subjects(selector);
        let docs: Vec<Document> = reader
            .documents(vec![Source::bytes(PART_ONE)])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(docs[0]["id"], json!("http://example.org/shakespeare/line1"));
        assert_eq!(docs[0]["index"], json!(0));
    }

    #[test]
    fn test_malformed_turtle_is_an_error() {
        let reader = RdfReader::new(fields());
        let mut docs = reader.documents(vec![Source::bytes("@prefix sh: <http://example.org/> sh:a")]);
        assert!(matches!(docs.next(), Some(Err(crate::Error::Rdf(_)))));
    }
}
