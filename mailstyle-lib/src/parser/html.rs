//! Parses HTML into the arena DOM defined in `crate::dom::dom_tree`.
//!
//! html5ever does the tokenizing and tree construction (including the
//! html/head/body repair); this module only provides the `TreeSink`.

use crate::dom::dom_tree::{self, NodeData, NodeId};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink},
    Attribute, LocalName, Namespace, QualName,
};
use log::trace;
use std::borrow::Cow;
use std::cell::RefCell;

/// Creates a DOM tree from the provided HTML content.
pub fn create_dom_tree(html_content: &str) -> dom_tree::Document {
    let tree_sink = MailStyleTreeSink::new();
    html5ever::parse_document(tree_sink, Default::default()).one(html_content)
}

/// A `TreeSink` that builds a [`dom_tree::Document`]. Quirks mode is ignored.
pub struct MailStyleTreeSink {
    document: RefCell<dom_tree::Document>,
}

impl MailStyleTreeSink {
    pub fn new() -> Self {
        Self {
            document: RefCell::new(dom_tree::new_document()),
        }
    }

    fn attach(
        &self,
        child: NodeOrText<NodeId>,
        place: impl FnOnce(&mut dom_tree::Document, NodeId),
    ) {
        let mut doc = self.document.borrow_mut();
        let node = match child {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => doc.create_node(NodeData::Text(text.to_string())),
        };
        place(&mut *doc, node);
    }
}

impl Default for MailStyleTreeSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned element name handed back to html5ever.
#[derive(Debug)]
pub struct MailStyleElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for MailStyleElemName {
    fn local_name(&self) -> &LocalName {
        &self.local
    }

    fn ns(&self) -> &Namespace {
        &self.ns
    }
}

impl TreeSink for MailStyleTreeSink {
    type Handle = NodeId;
    type Output = dom_tree::Document;
    type ElemName<'a>
        = MailStyleElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        trace!("html parse error: {}", msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.document.borrow().root()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        let doc = self.document.borrow();
        match doc.element(*target) {
            Some(elem) => MailStyleElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            },
            None => MailStyleElemName {
                ns: Namespace::from(""),
                local: LocalName::from(""),
            },
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let mut element = dom_tree::ElementNode::new(name);
        element.attributes = attrs
            .into_iter()
            .map(|attr| (attribute_name(&attr.name), attr.value.to_string()))
            .collect();
        self.document.borrow_mut().create_element(element)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.document
            .borrow_mut()
            .create_node(NodeData::Comment(text.to_string()))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        self.document
            .borrow_mut()
            .create_node(NodeData::ProcessingInstruction {
                target: target.to_string(),
                data: data.to_string(),
            })
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        if let NodeOrText::AppendText(text) = &child {
            self.document.borrow_mut().append_text(*parent, text);
            return;
        }
        self.attach(child, |doc, node| doc.append_child(*parent, node));
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.document.borrow().parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        self.document.borrow_mut().doctype = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        trace!("quirks mode: {:?}", mode);
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.attach(child, |doc, node| doc.insert_before(*sibling, node));
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut doc = self.document.borrow_mut();
        if let Some(elem) = doc.element_mut(*target) {
            for attr in attrs {
                let key = attribute_name(&attr.name);
                if !elem.has_attribute(&key) {
                    elem.attributes.push((key, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.document.borrow_mut().detach(*target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut doc = self.document.borrow_mut();
        let children = doc.children(*node).to_vec();
        for child in children {
            doc.append_child(*new_parent, child);
        }
    }
}

/// Attribute key as written in markup, keeping a prefix such as `xlink:`.
fn attribute_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tags(doc: &dom_tree::Document) -> Vec<String> {
        doc.elements()
            .into_iter()
            .filter_map(|id| doc.element(id).map(|e| e.tag.clone()))
            .collect()
    }

    #[test]
    fn repairs_structure_around_fragments() {
        let doc = create_dom_tree("<p>Hello</p>");
        assert_eq!(tags(&doc), vec!["html", "head", "body", "p"]);
    }

    #[test]
    fn keeps_attributes_in_source_order() {
        let doc = create_dom_tree(
            r#"<a href="https://example.com" target="_blank" style="color: red">x</a>"#,
        );
        let a = doc.elements_by_tag("a")[0];
        assert_eq!(
            doc.element(a).map(|e| e.attributes.clone()),
            Some(vec![
                ("href".to_string(), "https://example.com".to_string()),
                ("target".to_string(), "_blank".to_string()),
                ("style".to_string(), "color: red".to_string()),
            ])
        );
    }

    #[test]
    fn records_doctype() {
        let doc = create_dom_tree("<!DOCTYPE html><html><head></head></html>");
        assert_eq!(doc.doctype.as_ref().map(|d| d.name.as_str()), Some("html"));
    }

    #[test]
    fn style_contents_are_raw_text() {
        let doc = create_dom_tree("<style>p > a { color: red; }</style>");
        let style = doc.elements_by_tag("style")[0];
        assert_eq!(doc.text_content(style), "p > a { color: red; }");
    }

    #[test]
    fn table_autocorrection_is_applied() {
        let doc = create_dom_tree("<table><td>Cell</td></table>");
        assert_eq!(
            tags(&doc),
            vec!["html", "head", "body", "table", "tbody", "tr", "td"]
        );
    }
}
