//! The document operations the inliner needs, and their implementation for
//! the arena DOM.

use crate::dom::dom_tree::{Document, ElementNode, NodeId};
use crate::error::{InlinerError, Result};
use crate::style::css_matcher;
use std::fmt::Debug;

/// A mutable HTML tree the inliner can query and write styles into.
pub trait StyleTarget {
    /// Stable element identity; ordering follows document order.
    type Handle: Copy + Ord + Debug;

    /// Elements matching `selector`, in document order.
    fn select(&self, selector: &str) -> Result<Vec<Self::Handle>>;

    /// Elements carrying a `style` attribute, in document order.
    fn elements_with_style_attribute(&self) -> Vec<Self::Handle>;

    fn attribute(&self, element: Self::Handle, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, element: Self::Handle, name: &str, value: &str);

    fn remove_attribute(&mut self, element: Self::Handle, name: &str);

    /// Removes every `<style>` element and returns their contents in
    /// document order.
    fn take_style_blocks(&mut self) -> Vec<String>;

    /// Appends a `<style type="text/css">` element holding `css` to the head.
    fn append_style_block(&mut self, css: &str);
}

impl StyleTarget for Document {
    type Handle = NodeId;

    fn select(&self, selector: &str) -> Result<Vec<NodeId>> {
        css_matcher::select(self, selector)
            .map_err(|err| InlinerError::selector_syntax(selector, err.reason))
    }

    fn elements_with_style_attribute(&self) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(|e| e.has_attribute("style")))
            .collect()
    }

    fn attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        self.element(element)?.attribute(name)
    }

    fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) {
        Document::set_attribute(self, element, name, value);
    }

    fn remove_attribute(&mut self, element: NodeId, name: &str) {
        Document::remove_attribute(self, element, name);
    }

    fn take_style_blocks(&mut self) -> Vec<String> {
        let blocks = self.elements_by_tag("style");
        let contents = blocks.iter().map(|&id| self.text_content(id)).collect();
        for id in blocks {
            self.detach(id);
        }
        contents
    }

    fn append_style_block(&mut self, css: &str) {
        let head = match self.elements_by_tag("head").first() {
            Some(&head) => head,
            None => self.insert_head(),
        };
        let mut style = ElementNode::html("style");
        style.set_attribute("type", "text/css");
        let style = self.create_element(style);
        self.append_text(style, css);
        self.append_child(head, style);
    }
}

impl Document {
    /// Creates a `<head>` as the first child of `<html>`, creating the
    /// `<html>` element too if the tree has none.
    fn insert_head(&mut self) -> NodeId {
        let html = match self.elements_by_tag("html").first() {
            Some(&html) => html,
            None => {
                let html = self.create_element(ElementNode::html("html"));
                self.append_child(self.root(), html);
                html
            }
        };
        let head = self.create_element(ElementNode::html("head"));
        match self.children(html).first() {
            Some(&first) => self.insert_before(first, head),
            None => self.append_child(html, head),
        }
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::dom_tree::new_document;
    use crate::parser::html::create_dom_tree;
    use pretty_assertions::assert_eq;

    #[test]
    fn takes_style_blocks_in_document_order() {
        let mut doc = create_dom_tree(
            "<html><head><style>p { color: red; }</style></head>\
             <body><style>a { color: blue; }</style><p>x</p></body></html>",
        );
        assert_eq!(
            doc.take_style_blocks(),
            vec!["p { color: red; }".to_string(), "a { color: blue; }".to_string()]
        );
        assert!(doc.elements_by_tag("style").is_empty());
    }

    #[test]
    fn appends_style_block_to_head() {
        let mut doc = create_dom_tree("<html><head><title>t</title></head><body></body></html>");
        doc.append_style_block("a:hover{color: red}");
        assert_eq!(
            doc.render().unwrap(),
            "<html><head><title>t</title><style type=\"text/css\">a:hover{color: red}</style>\
             </head><body></body></html>"
        );
    }

    #[test]
    fn creates_missing_head() {
        let mut doc = new_document();
        let html = doc.create_element(ElementNode::html("html"));
        let body = doc.create_element(ElementNode::html("body"));
        doc.append_child(doc.root(), html);
        doc.append_child(html, body);
        doc.append_style_block("p{}");
        assert_eq!(
            doc.render().unwrap(),
            "<html><head><style type=\"text/css\">p{}</style></head><body></body></html>"
        );
    }

    #[test]
    fn reports_selector_errors_with_the_selector() {
        let doc = create_dom_tree("<p></p>");
        match doc.select("p::before") {
            Err(InlinerError::SelectorSyntax { selector, .. }) => assert_eq!(selector, "p::before"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
