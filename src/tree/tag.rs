//! Tag locators
//!
//! A [`Tag`] describes how to reach zero or more nodes from a starting node:
//! the node itself, matching children or descendants, ancestors, siblings,
//! or any chain of those. Matching can depend on per-document metadata, so
//! locators are resolved against a node *and* the source's metadata.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::{Direction, Node, TreeNode};
use crate::Metadata;

/// How a tag name is matched
#[derive(Debug, Clone)]
pub enum NameMatch {
    Any,
    Exact(String),
    Pattern(Regex),
}

impl NameMatch {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Any => true,
            NameMatch::Exact(expected) => expected == name,
            NameMatch::Pattern(re) => re.is_match(name),
        }
    }
}

/// How an attribute value or a node's text is matched
#[derive(Debug, Clone)]
pub enum TextMatch {
    /// Any value, as long as it is present
    Present,
    Exact(String),
    Pattern(Regex),
    /// Equal to the metadata value under this key
    Metadata(String),
}

impl TextMatch {
    fn matches(&self, value: Option<&str>, metadata: &Metadata) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            TextMatch::Present => true,
            TextMatch::Exact(expected) => value == expected,
            TextMatch::Pattern(re) => re.is_match(value),
            TextMatch::Metadata(key) => match metadata.get(key) {
                Some(Value::String(s)) => value == s,
                Some(Value::Null) | None => false,
                Some(other) => value == other.to_string(),
            },
        }
    }
}

/// Conditions a single node must satisfy
#[derive(Debug, Clone)]
pub struct Matcher {
    pub name: NameMatch,
    pub attributes: Vec<(String, TextMatch)>,
    /// Compared against the node's direct string, trimmed
    pub text: Option<TextMatch>,
}

impl Matcher {
    /// Match any element
    pub fn any() -> Self {
        Matcher {
            name: NameMatch::Any,
            attributes: vec![],
            text: None,
        }
    }

    /// Match elements with this exact name
    pub fn named(name: impl Into<String>) -> Self {
        Matcher {
            name: NameMatch::Exact(name.into()),
            ..Matcher::any()
        }
    }

    /// Match elements whose name matches a regular expression
    pub fn pattern(re: Regex) -> Self {
        Matcher {
            name: NameMatch::Pattern(re),
            ..Matcher::any()
        }
    }

    /// Also require an attribute with exactly this value
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), TextMatch::Exact(value.into())));
        self
    }

    /// Also require an attribute matching a condition
    pub fn with_attribute_match(mut self, name: impl Into<String>, condition: TextMatch) -> Self {
        self.attributes.push((name.into(), condition));
        self
    }

    /// Also require the node's text to match
    pub fn with_text(mut self, condition: TextMatch) -> Self {
        self.text = Some(condition);
        self
    }

    pub fn matches<'a, N: TreeNode<'a>>(&self, node: &N, metadata: &Metadata) -> bool {
        if !self.name.matches(node.name()) {
            return false;
        }
        let attributes_match = self
            .attributes
            .iter()
            .all(|(name, condition)| condition.matches(node.attribute(name), metadata));
        if !attributes_match {
            return false;
        }
        match &self.text {
            None => true,
            Some(condition) => {
                let text = node.string();
                condition.matches(text.as_deref().map(str::trim), metadata)
            }
        }
    }
}

/// Node-to-node function used by [`Tag::Transformed`]
#[derive(Clone)]
pub struct NodeFn(Arc<dyn for<'a> Fn(Node<'a>) -> Option<Node<'a>> + Send + Sync>);

impl NodeFn {
    pub fn new(f: impl for<'a> Fn(Node<'a>) -> Option<Node<'a>> + Send + Sync + 'static) -> Self {
        NodeFn(Arc::new(f))
    }

    pub fn call<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        (self.0)(node)
    }
}

impl fmt::Debug for NodeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeFn(..)")
    }
}

/// A node locator
#[derive(Debug, Clone)]
pub enum Tag {
    /// The starting node itself
    Current,
    /// Matching children, or all matching descendants when `recursive`
    Find { matcher: Matcher, recursive: bool },
    /// The ancestor this many levels up
    Parent(usize),
    /// Matching ancestors, nearest first
    FindParent(Matcher),
    /// Matching siblings: following ones first, then preceding ones, nearest first
    Sibling(Matcher),
    /// Apply each locator to every result of the previous one
    Chain(Vec<Tag>),
    /// Map every result of a locator through a function, dropping `None`s
    Transformed(Box<Tag>, NodeFn),
}

impl Tag {
    /// Descendants with this name, at any depth
    pub fn named(name: impl Into<String>) -> Self {
        Tag::Find {
            matcher: Matcher::named(name),
            recursive: true,
        }
    }

    /// Direct children with this name
    pub fn child(name: impl Into<String>) -> Self {
        Tag::Find {
            matcher: Matcher::named(name),
            recursive: false,
        }
    }

    /// Descendants (or children) satisfying a matcher
    pub fn matching(matcher: Matcher, recursive: bool) -> Self {
        Tag::Find { matcher, recursive }
    }

    /// A path of tag names; `..` steps to the parent and `.` stays put
    pub fn path<S: AsRef<str>>(segments: &[S], recursive: bool) -> Self {
        let steps = segments
            .iter()
            .map(|segment| match segment.as_ref() {
                ".." => Tag::Parent(1),
                "." => Tag::Current,
                name => Tag::Find {
                    matcher: Matcher::named(name),
                    recursive,
                },
            })
            .collect();
        Tag::Chain(steps)
    }

    /// Follow this locator with another one
    pub fn then(self, next: Tag) -> Self {
        match self {
            Tag::Chain(mut steps) => {
                steps.push(next);
                Tag::Chain(steps)
            }
            first => Tag::Chain(vec![first, next]),
        }
    }

    /// Map every result through a function
    pub fn map(self, f: NodeFn) -> Self {
        Tag::Transformed(Box::new(self), f)
    }

    /// Set recursion on every search step
    pub fn with_recursion(self, recursive: bool) -> Self {
        match self {
            Tag::Find { matcher, .. } => Tag::Find { matcher, recursive },
            Tag::Chain(steps) => Tag::Chain(
                steps
                    .into_iter()
                    .map(|step| step.with_recursion(recursive))
                    .collect(),
            ),
            Tag::Transformed(inner, f) => Tag::Transformed(Box::new(inner.with_recursion(recursive)), f),
            other => other,
        }
    }

    /// Require an attribute value on the nodes the final search step finds
    pub fn filter_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            Tag::Find { matcher, recursive } => Tag::Find {
                matcher: matcher.with_attribute(name, value),
                recursive,
            },
            Tag::Chain(mut steps) => {
                if let Some(last) = steps.pop() {
                    steps.push(last.filter_attribute(name, value));
                }
                Tag::Chain(steps)
            }
            other => other,
        }
    }

    /// All nodes this locator reaches from `node`, in document order per step
    pub fn find_in<'a>(&self, node: Node<'a>, metadata: &Metadata) -> Vec<Node<'a>> {
        match self {
            Tag::Current => vec![node],
            Tag::Find { matcher, recursive } => {
                let candidates = if *recursive {
                    node.descendants()
                } else {
                    node.children()
                };
                candidates
                    .into_iter()
                    .filter(|n| matcher.matches(n, metadata))
                    .collect()
            }
            Tag::Parent(level) => {
                let mut current = Some(node);
                for _ in 0..*level {
                    current = current.and_then(|n| n.parent());
                }
                current.into_iter().collect()
            }
            Tag::FindParent(matcher) => node
                .ancestors()
                .into_iter()
                .filter(|n| matcher.matches(n, metadata))
                .collect(),
            Tag::Sibling(matcher) => node
                .siblings(Direction::Next)
                .into_iter()
                .chain(node.siblings(Direction::Previous))
                .filter(|n| matcher.matches(n, metadata))
                .collect(),
            Tag::Chain(steps) => {
                let mut current = vec![node];
                for step in steps {
                    let mut next: Vec<Node<'a>> = Vec::new();
                    for n in current {
                        for found in step.find_in(n, metadata) {
                            if !next.contains(&found) {
                                next.push(found);
                            }
                        }
                    }
                    current = next;
                }
                current
            }
            Tag::Transformed(inner, f) => inner
                .find_in(node, metadata)
                .into_iter()
                .filter_map(|n| f.call(n))
                .collect(),
        }
    }

    /// The first node this locator reaches, if any
    pub fn find_first<'a>(&self, node: Node<'a>, metadata: &Metadata) -> Option<Node<'a>> {
        self.find_in(node, metadata).into_iter().next()
    }
}

/// Metadata-dependent locator factory
pub type TagFn = Arc<dyn Fn(&Metadata) -> Option<Tag> + Send + Sync>;

/// A locator fixed up front or computed from each source's metadata
#[derive(Clone)]
pub enum TagSpec {
    Fixed(Tag),
    Computed(TagFn),
}

impl TagSpec {
    pub fn computed(f: impl Fn(&Metadata) -> Option<Tag> + Send + Sync + 'static) -> Self {
        TagSpec::Computed(Arc::new(f))
    }

    /// Resolve against one source's metadata
    pub fn resolve(&self, metadata: &Metadata) -> Option<Cow<'_, Tag>> {
        match self {
            TagSpec::Fixed(tag) => Some(Cow::Borrowed(tag)),
            TagSpec::Computed(f) => f(metadata).map(Cow::Owned),
        }
    }
}

impl From<Tag> for TagSpec {
    fn from(tag: Tag) -> Self {
        TagSpec::Fixed(tag)
    }
}

impl fmt::Debug for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSpec::Fixed(tag) => f.debug_tuple("Fixed").field(tag).finish(),
            TagSpec::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
