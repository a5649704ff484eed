//! Markup trees behind a small node interface
//!
//! XML is parsed into an arena built from quick-xml events, HTML is parsed by
//! scraper. Both are exposed through [`TreeNode`], so the tag locators in
//! [`tag`] never touch either library directly.

mod html;
pub mod tag;
mod xml;

pub use html::{HtmlNode, HtmlTree};
pub use tag::{Matcher, NameMatch, NodeFn, Tag, TagSpec, TextMatch};
pub use xml::{XmlNode, XmlTree};

/// Sibling search direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// The capabilities tag locators need from a parsed tree
///
/// Only element nodes (and the document root) are nodes; text is reached
/// through [`TreeNode::text`] and [`TreeNode::string`].
pub trait TreeNode<'a>: Copy + PartialEq + Sized {
    /// Tag name; the document root is called `[document]`
    fn name(&self) -> &'a str;

    fn attribute(&self, name: &str) -> Option<&'a str>;

    fn parent(&self) -> Option<Self>;

    /// Element children in document order
    fn children(&self) -> Vec<Self>;

    /// All descendant text, concatenated
    fn text(&self) -> String;

    /// Text of the single meaningful child, descending through lone elements
    ///
    /// Returns `None` when the node has several children or none.
    /// Whitespace-only text children do not count.
    fn string(&self) -> Option<String>;

    fn children_matching(&self, predicate: impl Fn(&Self) -> bool) -> Vec<Self> {
        self.children().into_iter().filter(|n| predicate(n)).collect()
    }

    /// Descendants in document order, excluding the node itself
    fn descendants(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack: Vec<Self> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().into_iter().rev());
        }
        out
    }

    /// Ancestors, nearest first
    fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            out.push(node);
            current = node.parent();
        }
        out
    }

    /// Siblings in the given direction, nearest first
    fn siblings(&self, direction: Direction) -> Vec<Self> {
        let Some(parent) = self.parent() else {
            return vec![];
        };
        let children = parent.children();
        let Some(position) = children.iter().position(|c| c == self) else {
            return vec![];
        };
        match direction {
            Direction::Next => children[position + 1..].to_vec(),
            Direction::Previous => children[..position].iter().rev().copied().collect(),
        }
    }
}

/// A node from either tree kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Xml(XmlNode<'a>),
    Html(HtmlNode<'a>),
}

impl<'a> From<XmlNode<'a>> for Node<'a> {
    fn from(node: XmlNode<'a>) -> Self {
        Node::Xml(node)
    }
}

impl<'a> From<HtmlNode<'a>> for Node<'a> {
    fn from(node: HtmlNode<'a>) -> Self {
        Node::Html(node)
    }
}

impl<'a> TreeNode<'a> for Node<'a> {
    fn name(&self) -> &'a str {
        match self {
            Node::Xml(n) => n.name(),
            Node::Html(n) => n.name(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        match self {
            Node::Xml(n) => n.attribute(name),
            Node::Html(n) => n.attribute(name),
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            Node::Xml(n) => n.parent().map(Node::Xml),
            Node::Html(n) => n.parent().map(Node::Html),
        }
    }

    fn children(&self) -> Vec<Self> {
        match self {
            Node::Xml(n) => n.children().into_iter().map(Node::Xml).collect(),
            Node::Html(n) => n.children().into_iter().map(Node::Html).collect(),
        }
    }

    fn text(&self) -> String {
        match self {
            Node::Xml(n) => n.text(),
            Node::Html(n) => n.text(),
        }
    }

    fn string(&self) -> Option<String> {
        match self {
            Node::Xml(n) => n.string(),
            Node::Html(n) => n.string(),
        }
    }
}

/// Flatten markup text: tabs dropped, single line breaks and space runs become
/// one space, runs containing a blank line become one newline.
///
/// A line break followed by indentation is joined as well, so indented verse
/// reads as one line; keep the raw text (no `flatten`) to preserve it.
pub fn flatten_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();

    let flush = |run: &mut String, out: &mut String| {
        if run.is_empty() {
            return;
        }
        let newlines = run.chars().filter(|c| *c == '\n').count();
        out.push(if newlines >= 2 { '\n' } else { ' ' });
        run.clear();
    };

    for c in text.chars() {
        if c == '\t' {
            continue;
        }
        if c.is_whitespace() {
            run.push(c);
        } else {
            flush(&mut run, &mut out);
            out.push(c);
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_soft_breaks() {
        let text = "\n        My hour is almost come,\n        When I\tto\n    ";
        assert_eq!(flatten_text(text), "My hour is almost come, When Ito");
    }

    #[test]
    fn test_flatten_paragraphs() {
        assert_eq!(flatten_text("one\n\n\ntwo  three"), "one\ntwo three");
    }

    #[test]
    fn test_node_siblings_and_ancestors() {
        let tree = XmlTree::parse(b"<a><b/><c><d/></c><e/></a>").unwrap();
        let root = Node::from(tree.root());
        let a = root.children()[0];
        let c = a.children()[1];
        let next: Vec<_> = c.siblings(Direction::Next).iter().map(|n| n.name()).collect();
        let previous: Vec<_> = c.siblings(Direction::Previous).iter().map(|n| n.name()).collect();
        assert_eq!(next, vec!["e"]);
        assert_eq!(previous, vec!["b"]);

        let d = c.children()[0];
        let ancestors: Vec<_> = d.ancestors().iter().map(|n| n.name()).collect();
        assert_eq!(ancestors, vec!["c", "a", "[document]"]);

        let names: Vec<_> = root.descendants().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }
}
