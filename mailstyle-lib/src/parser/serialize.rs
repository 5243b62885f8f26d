//! Turns the arena DOM back into HTML text using html5ever's serializer.

use crate::dom::dom_tree::{Document, NodeData, NodeId};
use crate::error::Result;
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::{LocalName, Namespace, QualName};
use std::io;

/// A node of a [`Document`] that html5ever can serialize.
pub struct SerializableNode<'a> {
    document: &'a Document,
    node: NodeId,
}

impl<'a> SerializableNode<'a> {
    pub fn new(document: &'a Document, node: NodeId) -> Self {
        SerializableNode { document, node }
    }
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: &mut S,
        traversal_scope: TraversalScope,
    ) -> io::Result<()> {
        match traversal_scope {
            TraversalScope::IncludeNode => serialize_node(self.document, self.node, serializer),
            TraversalScope::ChildrenOnly(_) => {
                serialize_children(self.document, self.node, serializer)
            }
        }
    }
}

fn serialize_children<S: Serializer>(
    document: &Document,
    node: NodeId,
    serializer: &mut S,
) -> io::Result<()> {
    if let NodeData::DocumentRoot = document.node(node).data {
        if let Some(doctype) = &document.doctype {
            serializer.write_doctype(&doctype.name)?;
        }
    }
    for &child in document.children(node) {
        serialize_node(document, child, serializer)?;
    }
    Ok(())
}

fn serialize_node<S: Serializer>(
    document: &Document,
    node: NodeId,
    serializer: &mut S,
) -> io::Result<()> {
    match &document.node(node).data {
        NodeData::DocumentRoot => serialize_children(document, node, serializer),
        NodeData::Element(elem) => {
            let names: Vec<QualName> = elem
                .attributes
                .iter()
                .map(|(name, _)| {
                    QualName::new(None, Namespace::from(""), LocalName::from(name.as_str()))
                })
                .collect();
            let attrs = names
                .iter()
                .zip(&elem.attributes)
                .map(|(name, (_, value))| (name, value.as_str()));
            serializer.start_elem(elem.qual_name.clone(), attrs)?;
            serialize_children(document, node, serializer)?;
            serializer.end_elem(elem.qual_name.clone())
        }
        NodeData::Text(text) => serializer.write_text(text),
        NodeData::Comment(text) => serializer.write_comment(text),
        NodeData::ProcessingInstruction { target, data } => {
            serializer.write_processing_instruction(target, data)
        }
    }
}

impl Document {
    /// Serializes the whole document, doctype included.
    pub fn render(&self) -> Result<String> {
        self.render_scope(self.root(), TraversalScope::ChildrenOnly(None))
    }

    /// Serializes only the content of `<body>`, e.g. for embedding the
    /// result in another template.
    pub fn render_body_content(&self) -> Result<String> {
        match self.elements_by_tag("body").first() {
            Some(&body) => {
                let name = self.element(body).map(|e| e.qual_name.clone());
                self.render_scope(body, TraversalScope::ChildrenOnly(name))
            }
            None => Ok(String::new()),
        }
    }

    fn render_scope(&self, node: NodeId, traversal_scope: TraversalScope) -> Result<String> {
        let mut bytes = Vec::new();
        let opts = SerializeOpts {
            traversal_scope,
            ..Default::default()
        };
        serialize(&mut bytes, &SerializableNode::new(self, node), opts)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
