//! Memoization of the pure steps of an inlining pass.
//!
//! Every entry is keyed by content, so a hit returns exactly what a fresh
//! computation would. The inliner clears everything at the start of a pass.

use crate::style::declarations::{parse_declarations_block, DeclarationMap};
use crate::style::merge::merge_declarations;
use crate::style::rules::RuleSet;
use crate::style::specificity::specificity;
use core::hash::{Hash as _, Hasher as _};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;

/// Hash of a piece of CSS text, used as a cache key.
pub fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct InlinerCaches {
    declarations: HashMap<String, DeclarationMap>,
    rule_sets: HashMap<u64, RuleSet>,
    specificity: HashMap<u64, u32>,
    merged_styles: HashMap<(u64, u64), String>,
}

impl InlinerCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.declarations.clear();
        self.rule_sets.clear();
        self.specificity.clear();
        self.merged_styles.clear();
    }

    /// Parsed form of a declaration block.
    pub fn declarations(&mut self, block: &str) -> &DeclarationMap {
        self.declarations
            .entry(block.to_string())
            .or_insert_with(|| parse_declarations_block(block))
    }

    pub fn specificity(&mut self, selector: &str) -> u32 {
        *self
            .specificity
            .entry(content_hash(selector))
            .or_insert_with(|| specificity(selector))
    }

    /// `existing` merged with `incoming`, both given as declaration text.
    pub fn merged_style(&mut self, existing: &str, incoming: &str) -> String {
        let key = (content_hash(existing), content_hash(incoming));
        if let Some(merged) = self.merged_styles.get(&key) {
            return merged.clone();
        }
        let existing_map = self.declarations(existing).clone();
        let merged = merge_declarations(&existing_map, self.declarations(incoming));
        self.merged_styles.insert(key, merged.clone());
        merged
    }

    /// The rule set previously stored for `css`.
    pub fn rule_set(&self, css: &str) -> Option<RuleSet> {
        self.rule_sets.get(&content_hash(css)).cloned()
    }

    pub fn store_rule_set(&mut self, css: &str, rule_set: RuleSet) {
        self.rule_sets.insert(content_hash(css), rule_set);
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
            && self.rule_sets.is_empty()
            && self.specificity.is_empty()
            && self.merged_styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cached_results_equal_fresh_ones() {
        let mut caches = InlinerCaches::new();
        let first = caches.declarations("color: red; margin: 0").clone();
        let second = caches.declarations("color: red; margin: 0").clone();
        assert_eq!(first, second);
        assert_eq!(first, parse_declarations_block("color: red; margin: 0"));
        assert_eq!(caches.specificity("#a .b"), 10_100);
        assert_eq!(caches.specificity("#a .b"), 10_100);
        assert_eq!(caches.merged_style("color: red", "margin: 0"), "color: red; margin: 0;");
        assert_eq!(caches.merged_style("color: red", "margin: 0"), "color: red; margin: 0;");
    }

    #[test]
    fn rule_sets_are_keyed_by_css_text() {
        let mut caches = InlinerCaches::new();
        assert_eq!(caches.rule_set("p { color: red }"), None);
        caches.store_rule_set("p { color: red }", RuleSet::default());
        assert_eq!(caches.rule_set("p { color: red }"), Some(RuleSet::default()));
        assert_eq!(caches.rule_set("p { color: blue }"), None);
        caches.clear();
        assert!(caches.is_empty());
    }
}
