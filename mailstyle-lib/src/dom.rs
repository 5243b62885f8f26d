use html5ever::{LocalName, Namespace, QualName};
use std::cell::OnceCell;

pub mod dom_tree {
    use super::*;
    use crate::parser::dom_indices::DomIndices;

    /// Namespace URL of HTML elements.
    pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

    /// Stable identity of a node inside its [`Document`] arena.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct NodeId(pub(crate) usize);

    #[derive(Debug, Clone)]
    pub enum NodeData {
        DocumentRoot,
        Element(ElementNode),
        Text(String),
        Comment(String),
        ProcessingInstruction { target: String, data: String },
    }

    #[derive(Debug, Clone)]
    pub struct Node {
        pub data: NodeData,
        pub parent: Option<NodeId>,
        pub children: Vec<NodeId>,
    }

    #[derive(Debug, Clone)]
    pub struct ElementNode {
        /// Lowercase local name, e.g. "div".
        pub tag: String,
        pub qual_name: QualName,
        pub attributes: Vec<(String, String)>,
    }

    #[derive(Debug, Clone)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    /// An HTML document stored as an arena of nodes.
    ///
    /// Node ids are never reused, so a detached node keeps its id but is no
    /// longer reachable from the root.
    #[derive(Debug)]
    pub struct Document {
        nodes: Vec<Node>,
        pub doctype: Option<Doctype>,
        indices: OnceCell<DomIndices>,
    }

    impl ElementNode {
        pub fn new(qual_name: QualName) -> Self {
            ElementNode {
                tag: qual_name.local.to_ascii_lowercase().to_string(),
                qual_name,
                attributes: Vec::new(),
            }
        }

        /// Creates an element in the HTML namespace.
        pub fn html(tag: &str) -> Self {
            Self::new(QualName::new(
                None,
                Namespace::from(HTML_NAMESPACE),
                LocalName::from(tag),
            ))
        }

        pub fn attribute(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }

        pub fn has_attribute(&self, name: &str) -> bool {
            self.attribute(name).is_some()
        }

        pub fn set_attribute(&mut self, name: &str, value: &str) {
            match self
                .attributes
                .iter_mut()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
            {
                Some((_, existing)) => *existing = value.to_string(),
                None => self.attributes.push((name.to_string(), value.to_string())),
            }
        }

        pub fn remove_attribute(&mut self, name: &str) {
            self.attributes
                .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        }

        pub fn has_class(&self, class_name: &str) -> bool {
            self.attribute("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
        }
    }

    impl Document {
        pub fn root(&self) -> NodeId {
            NodeId(0)
        }

        pub fn node(&self, id: NodeId) -> &Node {
            &self.nodes[id.0]
        }

        pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
            match &self.nodes.get(id.0)?.data {
                NodeData::Element(elem) => Some(elem),
                _ => None,
            }
        }

        /// Mutable access to an element. Drops the lookup indices, since the
        /// caller may touch `id` or `class`.
        pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
            self.indices.take();
            match &mut self.nodes.get_mut(id.0)?.data {
                NodeData::Element(elem) => Some(elem),
                _ => None,
            }
        }

        pub fn parent(&self, id: NodeId) -> Option<NodeId> {
            self.node(id).parent
        }

        pub fn children(&self, id: NodeId) -> &[NodeId] {
            &self.node(id).children
        }

        pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
            self.children(id)
                .iter()
                .copied()
                .filter(|&child| self.element(child).is_some())
        }

        pub fn create_node(&mut self, data: NodeData) -> NodeId {
            let id = NodeId(self.nodes.len());
            self.nodes.push(Node {
                data,
                parent: None,
                children: Vec::new(),
            });
            id
        }

        pub fn create_element(&mut self, element: ElementNode) -> NodeId {
            self.create_node(NodeData::Element(element))
        }

        pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
            self.detach(child);
            self.nodes[child.0].parent = Some(parent);
            self.nodes[parent.0].children.push(child);
        }

        /// Inserts `child` right before `sibling` under the sibling's parent.
        pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) {
            self.detach(child);
            let Some(parent) = self.parent(sibling) else {
                return;
            };
            let position = self.nodes[parent.0]
                .children
                .iter()
                .position(|&c| c == sibling)
                .unwrap_or(0);
            self.nodes[parent.0].children.insert(position, child);
            self.nodes[child.0].parent = Some(parent);
        }

        pub fn detach(&mut self, id: NodeId) {
            self.indices.take();
            if let Some(parent) = self.nodes[id.0].parent.take() {
                self.nodes[parent.0].children.retain(|&c| c != id);
            }
        }

        /// Appends text to `parent`, merging into a trailing text node.
        pub fn append_text(&mut self, parent: NodeId, text: &str) {
            if let Some(&last) = self.nodes[parent.0].children.last() {
                if let NodeData::Text(existing) = &mut self.nodes[last.0].data {
                    existing.push_str(text);
                    return;
                }
            }
            let node = self.create_node(NodeData::Text(text.to_string()));
            self.append_child(parent, node);
        }

        /// All nodes below `id` in document (pre-)order, `id` excluded.
        pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
            let mut out = Vec::new();
            let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
            while let Some(next) = stack.pop() {
                out.push(next);
                stack.extend(self.children(next).iter().rev().copied());
            }
            out
        }

        /// All elements in document order.
        pub fn elements(&self) -> Vec<NodeId> {
            self.descendants(self.root())
                .into_iter()
                .filter(|&id| self.element(id).is_some())
                .collect()
        }

        pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
            self.elements()
                .into_iter()
                .filter(|&id| self.element(id).is_some_and(|e| e.tag.eq_ignore_ascii_case(tag)))
                .collect()
        }

        pub fn text_content(&self, id: NodeId) -> String {
            let mut text = String::new();
            for node in std::iter::once(id).chain(self.descendants(id)) {
                if let NodeData::Text(t) = &self.node(node).data {
                    text.push_str(t);
                }
            }
            text
        }

        pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
            let structural = is_indexed_attribute(name);
            if let NodeData::Element(elem) = &mut self.nodes[id.0].data {
                elem.set_attribute(name, value);
                if structural {
                    self.indices.take();
                }
            }
        }

        pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
            let structural = is_indexed_attribute(name);
            if let NodeData::Element(elem) = &mut self.nodes[id.0].data {
                elem.remove_attribute(name);
                if structural {
                    self.indices.take();
                }
            }
        }

        /// Id/class/tag lookup tables, rebuilt lazily after structural changes.
        pub fn indices(&self) -> &DomIndices {
            self.indices.get_or_init(|| DomIndices::build(self))
        }
    }

    fn is_indexed_attribute(name: &str) -> bool {
        name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case("class")
    }

    pub fn new_document() -> Document {
        Document {
            nodes: vec![Node {
                data: NodeData::DocumentRoot,
                parent: None,
                children: Vec::new(),
            }],
            doctype: None,
            indices: OnceCell::new(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn element_tags_are_lowercased() {
            let table = ElementNode::html("TABLE");
            assert_eq!(table.tag, "table");
            assert_eq!(&*table.qual_name.local, "TABLE");
        }

        #[test]
        fn append_and_detach_keep_parent_links_consistent() {
            let mut doc = new_document();
            let html = doc.create_element(ElementNode::html("html"));
            let body = doc.create_element(ElementNode::html("body"));
            doc.append_child(doc.root(), html);
            doc.append_child(html, body);
            assert_eq!(doc.parent(body), Some(html));
            assert_eq!(doc.elements(), vec![html, body]);

            doc.detach(body);
            assert_eq!(doc.parent(body), None);
            assert_eq!(doc.elements(), vec![html]);
        }

        #[test]
        fn text_is_merged_into_trailing_text_node() {
            let mut doc = new_document();
            let p = doc.create_element(ElementNode::html("p"));
            doc.append_child(doc.root(), p);
            doc.append_text(p, "Hello ");
            doc.append_text(p, "world");
            assert_eq!(doc.children(p).len(), 1);
            assert_eq!(doc.text_content(p), "Hello world");
        }

        #[test]
        fn attributes_are_case_insensitive_by_name() {
            let mut elem = ElementNode::html("td");
            elem.set_attribute("Style", "color: red;");
            assert_eq!(elem.attribute("style"), Some("color: red;"));
            elem.set_attribute("STYLE", "color: blue;");
            assert_eq!(elem.attributes.len(), 1);
            elem.remove_attribute("style");
            assert!(!elem.has_attribute("style"));
        }

        #[test]
        fn insert_before_places_node_ahead_of_sibling() {
            let mut doc = new_document();
            let html = doc.create_element(ElementNode::html("html"));
            doc.append_child(doc.root(), html);
            let body = doc.create_element(ElementNode::html("body"));
            doc.append_child(html, body);
            let head = doc.create_element(ElementNode::html("head"));
            doc.insert_before(body, head);
            assert_eq!(doc.children(html), &[head, body]);
        }
    }
}
