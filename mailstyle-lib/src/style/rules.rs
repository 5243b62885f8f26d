//! Splitting CSS into single-selector rules and sorting out which of them
//! can become `style` attributes.

use crate::style::preprocess::CssSegment;
use crate::style::pseudo::has_unmatchable_pseudo;
use crate::style::specificity::cascade_order;
use log::trace;

/// One selector of a CSS rule together with the rule's declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    /// `@media <query>`, or empty for unscoped rules.
    pub media: String,
    /// A single selector, trimmed.
    pub selector: String,
    pub has_unmatchable_pseudo: bool,
    /// The declaration block text, trimmed.
    pub declarations: String,
    /// Position of the source rule in the stylesheet. Shared by all the
    /// selectors of one rule.
    pub source_index: usize,
}

impl ParsedRule {
    pub fn is_inlinable(&self) -> bool {
        self.media.is_empty() && !self.has_unmatchable_pseudo
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub inlinable: Vec<ParsedRule>,
    pub uninlinable: Vec<ParsedRule>,
}

impl RuleSet {
    /// Parses the rules of all segments, in order.
    pub fn parse(segments: &[CssSegment]) -> Self {
        let mut rule_set = RuleSet::default();
        let mut source_index = 0;
        for segment in segments {
            for (selectors, declarations) in top_level_rules(&segment.css) {
                let declarations = declarations.trim();
                if declarations.is_empty() {
                    continue;
                }
                for selector in split_selector_list(selectors) {
                    let rule = ParsedRule {
                        media: segment.media.clone(),
                        selector: selector.to_string(),
                        has_unmatchable_pseudo: has_unmatchable_pseudo(selector),
                        declarations: declarations.to_string(),
                        source_index,
                    };
                    trace!(
                        "rule #{} `{}` ({})",
                        source_index,
                        rule.selector,
                        if rule.is_inlinable() { "inlinable" } else { "uninlinable" }
                    );
                    if rule.is_inlinable() {
                        rule_set.inlinable.push(rule);
                    } else {
                        rule_set.uninlinable.push(rule);
                    }
                }
                source_index += 1;
            }
        }
        rule_set
    }

    /// Puts the inlinable rules in cascade order, so that applying them in
    /// sequence lets the winning declarations come last.
    pub fn sort_inlinable(&mut self, mut specificity_of: impl FnMut(&str) -> u32) {
        self.inlinable.sort_by(|a, b| {
            cascade_order(
                (specificity_of(&a.selector), a.source_index),
                (specificity_of(&b.selector), b.source_index),
            )
        });
    }
}

/// `selectors { declarations }` pairs of a flat stylesheet.
///
/// Stray closing braces and whitespace before a selector list are skipped.
/// A block that is never closed ends the scan.
fn top_level_rules(css: &str) -> Vec<(&str, &str)> {
    let mut rules = Vec::new();
    let mut rest = css;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
            break;
        };
        let selectors = rest[..open].trim_start_matches(|c: char| c.is_whitespace() || c == '}');
        if !selectors.trim().is_empty() {
            rules.push((selectors, &rest[open + 1..close]));
        }
        rest = &rest[close + 1..];
    }
    rules
}

/// Splits a selector list on the commas that are not inside parentheses,
/// brackets or quotes. Empty entries are dropped.
pub fn split_selector_list(selectors: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    let mut escaped = false;
    for (index, c) in selectors.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) => quote = Some(c),
            ('(' | '[', None) => depth += 1,
            (')' | ']', None) => depth = depth.saturating_sub(1),
            (',', None) if depth == 0 => {
                parts.push(&selectors[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&selectors[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
