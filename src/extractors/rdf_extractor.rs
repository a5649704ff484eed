//! RDF predicate extraction

use serde::Deserialize;
use serde_json::Value;

use super::{Context, Scope};
use crate::error::{Error, Result};
use crate::graph::{Graph, Term};

/// Which end of the predicate path to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Follow predicates from the subject to their objects
    #[default]
    Object,
    /// Follow predicates backwards, from the subject to nodes pointing at it
    Subject,
}

/// Predicate path lookup from a document subject
///
/// Without predicates the subject itself is read.
#[derive(Debug, Clone, Default)]
pub struct RdfQuery {
    pub predicates: Vec<String>,
    /// Read every node found (expanding RDF lists) instead of the first one
    pub is_collection: bool,
    pub node_type: NodeType,
}

impl RdfQuery {
    pub fn new<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RdfQuery {
            predicates: predicates.into_iter().map(Into::into).collect(),
            ..RdfQuery::default()
        }
    }

    /// The document subject itself
    pub fn subject() -> Self {
        RdfQuery::default()
    }

    pub fn collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    pub fn node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }

    pub(super) fn extract(&self, ctx: &Context<'_>) -> Result<Value> {
        let Scope::Graph { graph, subject } = ctx.scope else {
            return Err(Error::ContextMismatch {
                extractor: "RDF",
                expected: "graph subject",
            });
        };

        let nodes = self.follow(graph, subject);
        if self.is_collection {
            let mut items = Vec::new();
            for node in nodes {
                if graph.is_list(node) {
                    items.extend(graph.list_items(node).into_iter().map(Term::to_value));
                } else {
                    items.push(node.to_value());
                }
            }
            return Ok(Value::Array(items));
        }
        Ok(nodes.first().map(|n| n.to_value()).unwrap_or(Value::Null))
    }

    fn follow<'g>(&self, graph: &'g Graph, subject: &'g Term) -> Vec<&'g Term> {
        let mut current = vec![subject];
        for predicate in &self.predicates {
            let mut next: Vec<&'g Term> = Vec::new();
            for node in current {
                let found = match self.node_type {
                    NodeType::Object => graph.objects(node, predicate),
                    NodeType::Subject => graph.subjects_of(predicate, node),
                };
                for term in found {
                    if !next.contains(&term) {
                        next.push(term);
                    }
                }
            }
            current = next;
        }
        current
    }
}
