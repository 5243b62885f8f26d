use std::collections::HashMap;

use crate::dom::dom_tree::{Document, NodeData, NodeId};
use crate::style::css_matcher::CompoundSelector;

/// Indexes for fast candidate lookup during selector matching.
///
/// Every list is in document order.
#[derive(Debug, Default)]
pub struct DomIndices {
    /// Maps an element's "id" attribute to the nodes carrying it.
    pub id_map: HashMap<String, Vec<NodeId>>,
    /// Maps a class name to all nodes that have that class.
    pub class_map: HashMap<String, Vec<NodeId>>,
    /// Maps a lowercase tag name (e.g., "div") to all nodes with that tag.
    pub tag_map: HashMap<String, Vec<NodeId>>,
}

impl DomIndices {
    /// Build the indices for the entire document.
    pub fn build(document: &Document) -> Self {
        let mut indices = DomIndices::default();
        for node in document.descendants(document.root()) {
            if let NodeData::Element(elem) = &document.node(node).data {
                indices
                    .tag_map
                    .entry(elem.tag.to_ascii_lowercase())
                    .or_default()
                    .push(node);

                if let Some(id_value) = elem.attribute("id") {
                    indices
                        .id_map
                        .entry(id_value.to_string())
                        .or_default()
                        .push(node);
                }
                if let Some(class_attr) = elem.attribute("class") {
                    for class in class_attr.split_whitespace() {
                        let nodes = indices.class_map.entry(class.to_string()).or_default();
                        // `class="a a"` must not list the node twice.
                        if nodes.last() != Some(&node) {
                            nodes.push(node);
                        }
                    }
                }
            }
        }
        indices
    }

    /// The narrowest indexed candidate list for a key compound, or `None`
    /// when the compound has nothing indexable (e.g. `*` or `:first-child`).
    pub fn candidates_for(&self, compound: &CompoundSelector) -> Option<&[NodeId]> {
        if let Some(id) = &compound.id {
            return Some(self.id_map.get(id).map_or(&[][..], Vec::as_slice));
        }
        if let Some(class) = compound.classes.first() {
            return Some(self.class_map.get(class).map_or(&[][..], Vec::as_slice));
        }
        compound
            .tag
            .as_ref()
            .map(|tag| self.tag_map.get(tag).map_or(&[][..], Vec::as_slice))
    }
}
