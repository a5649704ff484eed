//! HTML tree adapter over scraper

use std::fmt;

use scraper::{ElementRef, Html};

use super::TreeNode;

const DOCUMENT_NAME: &str = "[document]";

/// A parsed HTML document
pub struct HtmlTree {
    html: Html,
}

impl HtmlTree {
    /// Parse an HTML document; never fails, like browsers
    pub fn parse(content: &str) -> Self {
        HtmlTree {
            html: Html::parse_document(content),
        }
    }

    /// The document root, above `<html>`
    pub fn root(&self) -> HtmlNode<'_> {
        HtmlNode {
            html: &self.html,
            element: None,
        }
    }
}

impl fmt::Debug for HtmlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlTree").finish_non_exhaustive()
    }
}

/// An element (or the document root) of an [`HtmlTree`]
#[derive(Clone, Copy)]
pub struct HtmlNode<'a> {
    html: &'a Html,
    // None for the document root
    element: Option<ElementRef<'a>>,
}

impl<'a> HtmlNode<'a> {
    fn wrap(&self, element: ElementRef<'a>) -> Self {
        HtmlNode {
            html: self.html,
            element: Some(element),
        }
    }

    fn element_string(element: ElementRef<'a>) -> Option<String> {
        let mut meaningful = element.children().filter(|child| match child.value() {
            scraper::Node::Text(text) => {
                let text: &str = text;
                !text.trim().is_empty()
            }
            scraper::Node::Element(_) => true,
            _ => false,
        });

        let only = meaningful.next()?;
        if meaningful.next().is_some() {
            return None;
        }

        match only.value() {
            scraper::Node::Text(text) => {
                let text: &str = text;
                Some(text.to_string())
            }
            _ => ElementRef::wrap(only).and_then(Self::element_string),
        }
    }
}

impl PartialEq for HtmlNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.html, other.html)
            && self.element.map(|el| el.id()) == other.element.map(|el| el.id())
    }
}

impl fmt::Debug for HtmlNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}

impl<'a> TreeNode<'a> for HtmlNode<'a> {
    fn name(&self) -> &'a str {
        match self.element {
            Some(el) => el.value().name(),
            None => DOCUMENT_NAME,
        }
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        self.element.and_then(|el| el.value().attr(name))
    }

    fn parent(&self) -> Option<Self> {
        let el = self.element?;
        let parent = el.parent()?;
        match ElementRef::wrap(parent) {
            Some(parent_el) => Some(self.wrap(parent_el)),
            // Only the root element hangs off the document node
            None => Some(HtmlNode {
                html: self.html,
                element: None,
            }),
        }
    }

    fn children(&self) -> Vec<Self> {
        match self.element {
            Some(el) => el
                .children()
                .filter_map(ElementRef::wrap)
                .map(|child| self.wrap(child))
                .collect(),
            None => vec![self.wrap(self.html.root_element())],
        }
    }

    fn text(&self) -> String {
        self.element
            .unwrap_or_else(|| self.html.root_element())
            .text()
            .collect()
    }

    fn string(&self) -> Option<String> {
        Self::element_string(self.element.unwrap_or_else(|| self.html.root_element()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_navigation() {
        let tree = HtmlTree::parse(
            r#"<html><body><h1>Hamlet</h1><p><b>HAMLET</b> Whither wilt thou lead me?</p></body></html>"#,
        );
        let root = tree.root();
        assert_eq!(root.name(), "[document]");

        let html = root.children()[0];
        assert_eq!(html.name(), "html");
        assert_eq!(html.parent(), Some(root));

        let body = html.children_matching(|n| n.name() == "body")[0];
        let p = body.children()[1];
        assert_eq!(p.name(), "p");
        assert_eq!(p.string(), None);
        assert_eq!(p.children()[0].string().as_deref(), Some("HAMLET"));
        assert_eq!(p.text(), "HAMLET Whither wilt thou lead me?");
    }

    #[test]
    fn test_html_attributes() {
        let tree = HtmlTree::parse(r#"<div class="speech" data-n="3">Mark me.</div>"#);
        let div = tree
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.name() == "div")
            .unwrap();
        assert_eq!(div.attribute("class"), Some("speech"));
        assert_eq!(div.attribute("data-n"), Some("3"));
        assert_eq!(div.string().as_deref(), Some("Mark me."));
    }
}
