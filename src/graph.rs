//! In-memory RDF graph
//!
//! Triples are parsed with rio (Turtle or N-Triples) into owned terms.
//! Insertion order is kept and duplicate triples are dropped, so subject and
//! object lists come out in file order.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rio_api::model::{Literal, Subject, Term as RioTerm, Triple};
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesParser, TurtleError, TurtleParser};
use serde_json::{Number, Value};
use tracing::{debug, info};

use crate::error::Result;

pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// An RDF node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn is_iri(&self, iri: &str) -> bool {
        matches!(self, Term::Iri(own) if own == iri)
    }

    /// JSON value of this node
    ///
    /// Literals are converted by XSD datatype: integer types to integers,
    /// `decimal`/`double`/`float` to floats, `boolean` to booleans, anything
    /// else (or anything unparsable) to its lexical string. IRIs become their
    /// string, blank nodes `_:id`.
    pub fn to_value(&self) -> Value {
        match self {
            Term::Iri(iri) => Value::String(iri.clone()),
            Term::Blank(id) => Value::String(format!("_:{id}")),
            Term::Literal { value, datatype, .. } => {
                let local = datatype.as_deref().and_then(|dt| dt.strip_prefix(XSD));
                convert_literal(value, local).unwrap_or_else(|| Value::String(value.clone()))
            }
        }
    }
}

fn convert_literal(value: &str, xsd_type: Option<&str>) -> Option<Value> {
    match xsd_type? {
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger" | "positiveInteger"
        | "negativeInteger" | "nonPositiveInteger" | "unsignedInt" | "unsignedLong"
        | "unsignedShort" | "unsignedByte" => value.trim().parse::<i64>().ok().map(Value::from),
        "decimal" | "double" | "float" => value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "boolean" => match value.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Statement {
    subject: Term,
    predicate: String,
    object: Term,
}

/// A set of triples
#[derive(Debug, Default)]
pub struct Graph {
    statements: Vec<Statement>,
    seen: HashSet<Statement>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Add a triple unless it is already present
    pub fn insert(&mut self, subject: Term, predicate: impl Into<String>, object: Term) {
        let statement = Statement {
            subject,
            predicate: predicate.into(),
            object,
        };
        if self.seen.insert(statement.clone()) {
            self.statements.push(statement);
        }
    }

    /// Load a Turtle (or, for `.nt` files, N-Triples) file into this graph
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Loading RDF file");
        let reader = BufReader::new(File::open(path)?);
        let before = self.len();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("nt") => self.parse_ntriples(reader)?,
            _ => self.parse_turtle(reader)?,
        }
        debug!(path = %path.display(), triples = self.len() - before, "Parsed RDF file");
        Ok(())
    }

    pub fn parse_turtle(&mut self, reader: impl BufRead) -> Result<()> {
        TurtleParser::new(reader, None).parse_all(&mut |t| {
            self.insert_rio(&t);
            Ok::<(), TurtleError>(())
        })?;
        Ok(())
    }

    pub fn parse_ntriples(&mut self, reader: impl BufRead) -> Result<()> {
        NTriplesParser::new(reader).parse_all(&mut |t| {
            self.insert_rio(&t);
            Ok::<(), TurtleError>(())
        })?;
        Ok(())
    }

    fn insert_rio(&mut self, triple: &Triple<'_>) {
        let (Some(subject), Some(object)) = (subject_term(triple.subject), object_term(triple.object)) else {
            // RDF-star quoted triples are not supported
            return;
        };
        self.insert(subject, triple.predicate.iri, object);
    }

    /// Distinct subjects in insertion order
    pub fn subjects(&self) -> Vec<&Term> {
        distinct(self.statements.iter().map(|s| &s.subject))
    }

    /// Distinct subjects having `predicate`
    pub fn subjects_with(&self, predicate: &str) -> Vec<&Term> {
        distinct(
            self.statements
                .iter()
                .filter(|s| s.predicate == predicate)
                .map(|s| &s.subject),
        )
    }

    /// Distinct objects of `predicate`, across all subjects
    pub fn objects_of(&self, predicate: &str) -> Vec<&Term> {
        distinct(
            self.statements
                .iter()
                .filter(|s| s.predicate == predicate)
                .map(|s| &s.object),
        )
    }

    /// Objects of `(subject, predicate, ?)`
    pub fn objects(&self, subject: &Term, predicate: &str) -> Vec<&Term> {
        self.statements
            .iter()
            .filter(|s| s.predicate == predicate && &s.subject == subject)
            .map(|s| &s.object)
            .collect()
    }

    /// Subjects of `(?, predicate, object)`
    pub fn subjects_of(&self, predicate: &str, object: &Term) -> Vec<&Term> {
        self.statements
            .iter()
            .filter(|s| s.predicate == predicate && &s.object == object)
            .map(|s| &s.subject)
            .collect()
    }

    /// Whether `node` starts an RDF list
    pub fn is_list(&self, node: &Term) -> bool {
        node.is_iri(RDF_NIL) || !self.objects(node, RDF_FIRST).is_empty()
    }

    /// Members of the RDF list starting at `head`, in list order
    pub fn list_items(&self, head: &Term) -> Vec<&Term> {
        let mut items = Vec::new();
        let mut visited: HashSet<&Term> = HashSet::new();
        let mut node = head;
        while !node.is_iri(RDF_NIL) && visited.insert(node) {
            let Some(first) = self.objects(node, RDF_FIRST).into_iter().next() else {
                break;
            };
            items.push(first);
            match self.objects(node, RDF_REST).into_iter().next() {
                Some(rest) => node = rest,
                None => break,
            }
        }
        items
    }
}

fn distinct<'g>(terms: impl Iterator<Item = &'g Term>) -> Vec<&'g Term> {
    let mut seen = HashSet::new();
    terms.filter(|t| seen.insert(*t)).collect()
}

fn subject_term(subject: Subject<'_>) -> Option<Term> {
    match subject {
        Subject::NamedNode(node) => Some(Term::Iri(node.iri.to_string())),
        Subject::BlankNode(node) => Some(Term::Blank(node.id.to_string())),
        _ => None,
    }
}

fn object_term(term: RioTerm<'_>) -> Option<Term> {
    match term {
        RioTerm::NamedNode(node) => Some(Term::Iri(node.iri.to_string())),
        RioTerm::BlankNode(node) => Some(Term::Blank(node.id.to_string())),
        RioTerm::Literal(Literal::Simple { value }) => Some(Term::literal(value)),
        RioTerm::Literal(Literal::LanguageTaggedString { value, language }) => Some(Term::Literal {
            value: value.to_string(),
            datatype: None,
            language: Some(language.to_string()),
        }),
        RioTerm::Literal(Literal::Typed { value, datatype }) => Some(Term::Literal {
            value: value.to_string(),
            datatype: Some(datatype.iri.to_string()),
            language: None,
        }),
        _ => None,
    }
}
