//! XML and HTML extraction
//!
//! Locates nodes with a [`Tag`] relative to the entry (or anchor) node and
//! reads their text, an attribute, or a custom value.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{Context, Scope};
use crate::error::{Error, Result};
use crate::tree::{flatten_text, Matcher, Node, NodeFn, Tag, TextMatch, TreeNode};

/// Computes a value straight from a node
#[derive(Clone)]
pub struct NodeExtract(Arc<dyn for<'a> Fn(Node<'a>) -> Value + Send + Sync>);

impl NodeExtract {
    pub fn new(f: impl for<'a> Fn(Node<'a>) -> Value + Send + Sync + 'static) -> Self {
        NodeExtract(Arc::new(f))
    }

    fn call(&self, node: Node<'_>) -> Value {
        (self.0)(node)
    }
}

impl fmt::Debug for NodeExtract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeExtract(..)")
    }
}

/// Node lookup and read-out for tree documents
#[derive(Debug, Clone, Default)]
pub struct XmlQuery {
    /// `None` reads the starting node itself
    pub tag: Option<Tag>,
    /// Start from the source's anchor node instead of the entry node
    pub toplevel: bool,
    /// Read every match into an array instead of the first match
    pub multiple: bool,
    /// Read this attribute; `name` reads the tag name
    pub attribute: Option<String>,
    /// Read all descendant text, flattened
    pub flatten: bool,
    /// Anchor tag of the external XML file this field is read from
    pub external_file: Option<Tag>,
    /// Applied to every located node before reading
    pub transform_node: Option<NodeFn>,
    /// Replaces the text/attribute read-out
    pub extract_node: Option<NodeExtract>,
}

impl XmlQuery {
    pub fn new(tag: Tag) -> Self {
        XmlQuery {
            tag: Some(tag),
            ..XmlQuery::default()
        }
    }

    /// Read the starting node itself
    pub fn current() -> Self {
        XmlQuery::default()
    }

    /// First direct child with this name
    pub fn child(name: impl Into<String>) -> Self {
        XmlQuery::new(Tag::child(name))
    }

    /// First descendant with this name
    pub fn descendant(name: impl Into<String>) -> Self {
        XmlQuery::new(Tag::named(name))
    }

    /// Walk a path of tag names (`..` for the parent, `.` to stay)
    pub fn path<S: AsRef<str>>(segments: &[S], recursive: bool) -> Self {
        XmlQuery::new(Tag::path(segments, recursive))
    }

    pub fn toplevel(mut self) -> Self {
        self.toplevel = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn recursive(mut self) -> Self {
        self.tag = self.tag.map(|tag| tag.with_recursion(true));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// Climb this many levels before searching
    pub fn parent_level(mut self, level: usize) -> Self {
        let climb = Tag::Parent(level);
        self.tag = Some(match self.tag {
            Some(tag) => climb.then(tag),
            None => climb,
        });
        self
    }

    /// Only accept nodes carrying this attribute value
    pub fn filter_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tag = self.tag.map(|tag| tag.filter_attribute(name, value));
        self
    }

    /// Search next to a `secondary` node whose text matches `text`
    ///
    /// The secondary node is searched recursively; the tag is then searched
    /// under its parent.
    pub fn secondary_tag(mut self, secondary: impl Into<String>, text: TextMatch) -> Self {
        let anchor = Tag::matching(Matcher::named(secondary).with_text(text), true).then(Tag::Parent(1));
        self.tag = Some(match self.tag {
            Some(tag) => anchor.then(tag.with_recursion(true)),
            None => anchor,
        });
        self
    }

    /// Read this field from the external XML file under the given anchor
    pub fn external_file(mut self, toplevel: Tag) -> Self {
        self.external_file = Some(toplevel);
        self
    }

    pub fn transform_node(mut self, f: NodeFn) -> Self {
        self.transform_node = Some(f);
        self
    }

    pub fn extract_node(mut self, f: NodeExtract) -> Self {
        self.extract_node = Some(f);
        self
    }

    pub(super) fn extract(&self, ctx: &Context<'_>) -> Result<Value> {
        let Scope::Tree { top, entry } = ctx.scope else {
            return Err(Error::ContextMismatch {
                extractor: "XML",
                expected: "tree node",
            });
        };
        let start = if self.toplevel { top } else { entry };

        let mut nodes = match &self.tag {
            None => vec![start],
            Some(tag) if self.multiple => tag.find_in(start, ctx.metadata),
            Some(tag) => tag.find_first(start, ctx.metadata).into_iter().collect(),
        };
        if let Some(f) = &self.transform_node {
            nodes = nodes.into_iter().filter_map(|n| f.call(n)).collect();
        }
        if nodes.is_empty() {
            return Ok(Value::Null);
        }

        if let Some(f) = &self.extract_node {
            return Ok(self.per_node(&nodes, |n| f.call(n)));
        }
        if let Some(attribute) = &self.attribute {
            return Ok(self.read_attribute(&nodes, attribute));
        }
        if self.flatten {
            let text = nodes.iter().map(|n| n.text()).collect::<Vec<_>>().join("\n\n");
            return Ok(Value::String(flatten_text(&text)));
        }
        Ok(self.per_node(&nodes, |n| n.string().map(Value::String).unwrap_or(Value::Null)))
    }

    fn per_node(&self, nodes: &[Node<'_>], read: impl Fn(Node<'_>) -> Value) -> Value {
        if self.multiple {
            Value::Array(nodes.iter().map(|n| read(*n)).collect())
        } else {
            nodes.first().map(|n| read(*n)).unwrap_or(Value::Null)
        }
    }

    fn read_attribute(&self, nodes: &[Node<'_>], attribute: &str) -> Value {
        let read = |n: &Node<'_>| -> Option<String> {
            if attribute == "name" {
                Some(n.name().to_string())
            } else {
                n.attribute(attribute).map(str::to_string)
            }
        };
        if self.multiple {
            // Nodes without the attribute are left out
            Value::Array(nodes.iter().filter_map(read).map(Value::String).collect())
        } else {
            nodes
                .first()
                .and_then(read)
                .map(Value::String)
                .unwrap_or(Value::Null)
        }
    }
}
