//! XML tree built from quick-xml events

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::TreeNode;
use crate::error::Result;

const DOCUMENT_NAME: &str = "[document]";

#[derive(Debug)]
enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A parsed XML document
///
/// Nodes live in one arena; index 0 is the document root, which sits above
/// the root element.
#[derive(Debug)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
}

impl XmlTree {
    /// Parse XML content
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut tree = XmlTree {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: vec![],
            }],
        };

        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        // Open elements, innermost last
        let mut open: Vec<usize> = vec![0];

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let kind = element_kind(&e)?;
                    let id = tree.push(kind, current(&open));
                    open.push(id);
                }
                Event::Empty(e) => {
                    let kind = element_kind(&e)?;
                    tree.push(kind, current(&open));
                }
                Event::End(_) => {
                    if open.len() > 1 {
                        open.pop();
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?.into_owned();
                    tree.push_text(text, current(&open));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    tree.push_text(text, current(&open));
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctypes
                _ => {}
            }
            buf.clear();
        }

        Ok(tree)
    }

    /// The document root
    pub fn root(&self) -> XmlNode<'_> {
        XmlNode { tree: self, id: 0 }
    }

    fn push(&mut self, kind: NodeKind, parent: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: vec![],
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn push_text(&mut self, text: String, parent: usize) {
        // Merge adjacent text and CDATA runs
        if let Some(&last) = self.nodes[parent].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last].kind {
                existing.push_str(&text);
                return;
            }
        }
        self.push(NodeKind::Text(text), parent);
    }
}

fn current(open: &[usize]) -> usize {
    open.last().copied().unwrap_or(0)
}

fn element_kind(e: &BytesStart<'_>) -> Result<NodeKind> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(NodeKind::Element { name, attributes })
}

/// An element (or the document root) inside an [`XmlTree`]
#[derive(Clone, Copy)]
pub struct XmlNode<'a> {
    tree: &'a XmlTree,
    id: usize,
}

impl<'a> XmlNode<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id]
    }

    fn wrap(&self, id: usize) -> XmlNode<'a> {
        XmlNode { tree: self.tree, id }
    }

    fn collect_text(&self, out: &mut String) {
        for &child in &self.data().children {
            match &self.tree.nodes[child].kind {
                NodeKind::Text(text) => out.push_str(text),
                _ => self.wrap(child).collect_text(out),
            }
        }
    }
}

impl PartialEq for XmlNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl fmt::Debug for XmlNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}#{}>", self.name(), self.id)
    }
}

impl<'a> TreeNode<'a> for XmlNode<'a> {
    fn name(&self) -> &'a str {
        match &self.data().kind {
            NodeKind::Element { name, .. } => name,
            _ => DOCUMENT_NAME,
        }
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        match &self.data().kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| self.wrap(id))
    }

    fn children(&self) -> Vec<Self> {
        self.data()
            .children
            .iter()
            .filter(|&&id| matches!(self.tree.nodes[id].kind, NodeKind::Element { .. }))
            .map(|&id| self.wrap(id))
            .collect()
    }

    fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn string(&self) -> Option<String> {
        let meaningful: Vec<usize> = self
            .data()
            .children
            .iter()
            .copied()
            .filter(|&id| match &self.tree.nodes[id].kind {
                NodeKind::Text(text) => !text.trim().is_empty(),
                _ => true,
            })
            .collect();

        match meaningful.as_slice() {
            [only] => match &self.tree.nodes[*only].kind {
                NodeKind::Text(text) => Some(text.clone()),
                _ => self.wrap(*only).string(),
            },
            _ => None,
        }
    }
}
