//! The inlining pass: resolves the cascade for every element, writes the
//! result into `style` attributes and keeps the rules that cannot be
//! inlined in a `<style>` element.

use crate::dom::dom_tree::Document;
use crate::error::{InlinerError, Result};
use crate::parser::html::create_dom_tree;
use crate::style::cache::InlinerCaches;
use crate::style::declarations::DeclarationMap;
use crate::style::merge::{merge_declarations, strip_important};
use crate::style::owned_css::CssConcatenator;
use crate::style::preprocess::{preprocess, DEFAULT_ALLOWED_MEDIA_TYPES};
use crate::style::pseudo::remove_unmatchable_pseudo_components;
use crate::style::rules::{ParsedRule, RuleSet};
use crate::target::StyleTarget;
use log::{debug, trace, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Where an inliner is in its pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InlinerPhase {
    Idle,
    Preprocessed,
    Classified,
    Inlined,
    Finalized,
}

/// Inlines CSS into the `style` attributes of one document.
///
/// ```
/// use mailstyle_lib::CssInliner;
///
/// let mut inliner = CssInliner::from_html("<html><body><p>Hi</p></body></html>");
/// inliner.inline_css("p { color: red; }").unwrap();
/// assert_eq!(
///     inliner.render_body_content().unwrap(),
///     "<p style=\"color: red;\">Hi</p>"
/// );
/// ```
#[derive(Debug)]
pub struct CssInliner<T: StyleTarget = Document> {
    document: T,
    allowed_media_types: BTreeSet<String>,
    excluded_selectors: BTreeSet<String>,
    parse_inline_style_attributes: bool,
    parse_style_blocks: bool,
    debug: bool,
    caches: InlinerCaches,
    phase: InlinerPhase,
    matching_uninlinable_rules: Option<Vec<ParsedRule>>,
}

impl CssInliner<Document> {
    /// Parses `html` and wraps the resulting document.
    pub fn from_html(html: &str) -> Self {
        Self::new(create_dom_tree(html))
    }

    /// The whole document as HTML, doctype included.
    pub fn render(&self) -> Result<String> {
        self.document.render()
    }

    /// Only the content of `<body>`.
    pub fn render_body_content(&self) -> Result<String> {
        self.document.render_body_content()
    }
}

impl<T: StyleTarget> CssInliner<T> {
    pub fn new(document: T) -> Self {
        CssInliner {
            document,
            allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES
                .iter()
                .map(|media_type| media_type.to_string())
                .collect(),
            excluded_selectors: BTreeSet::new(),
            parse_inline_style_attributes: true,
            parse_style_blocks: true,
            debug: false,
            caches: InlinerCaches::new(),
            phase: InlinerPhase::Idle,
            matching_uninlinable_rules: None,
        }
    }

    pub fn document(&self) -> &T {
        &self.document
    }

    pub fn into_document(self) -> T {
        self.document
    }

    pub fn phase(&self) -> InlinerPhase {
        self.phase
    }

    /// Ignore the existing `style` attributes. They are still removed.
    pub fn disable_inline_style_attributes_parsing(&mut self) -> &mut Self {
        self.parse_inline_style_attributes = false;
        self
    }

    /// Ignore the `<style>` elements of the document. They are kept as they are.
    pub fn disable_style_blocks_parsing(&mut self) -> &mut Self {
        self.parse_style_blocks = false;
        self
    }

    pub fn add_allowed_media_type(&mut self, media_type: &str) -> &mut Self {
        self.allowed_media_types
            .insert(media_type.trim().to_ascii_lowercase());
        self
    }

    pub fn remove_allowed_media_type(&mut self, media_type: &str) -> &mut Self {
        self.allowed_media_types
            .remove(&media_type.trim().to_ascii_lowercase());
        self
    }

    /// Elements matching `selector` get no inline styles.
    pub fn add_excluded_selector(&mut self, selector: &str) -> &mut Self {
        self.excluded_selectors.insert(selector.trim().to_string());
        self
    }

    pub fn remove_excluded_selector(&mut self, selector: &str) -> &mut Self {
        self.excluded_selectors.remove(selector.trim());
        self
    }

    /// In debug mode unsupported selectors and scanner failures abort the
    /// pass instead of being skipped.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Runs a full inlining pass with `css` plus, unless disabled, the
    /// contents of the document's `<style>` elements.
    ///
    /// On error the document keeps the styles applied so far.
    pub fn inline_css(&mut self, css: &str) -> Result<&mut Self> {
        self.caches.clear();
        self.phase = InlinerPhase::Idle;
        self.matching_uninlinable_rules = None;

        let original_styles = self.normalize_style_attributes();
        let mut combined_css = css.to_string();
        if self.parse_style_blocks {
            for block in self.document.take_style_blocks() {
                combined_css.push_str("\n\n");
                combined_css.push_str(&block);
            }
        }

        let preprocessed = preprocess(&combined_css, &self.allowed_media_types, self.debug)?;
        self.phase = InlinerPhase::Preprocessed;

        let rule_set = match self.caches.rule_set(&combined_css) {
            Some(rule_set) => rule_set,
            None => {
                let mut rule_set = RuleSet::parse(&preprocessed.segments);
                let caches = &mut self.caches;
                rule_set.sort_inlinable(|selector| caches.specificity(selector));
                self.caches.store_rule_set(&combined_css, rule_set.clone());
                rule_set
            }
        };
        self.phase = InlinerPhase::Classified;
        debug!(
            "{} inlinable and {} uninlinable rule(s)",
            rule_set.inlinable.len(),
            rule_set.uninlinable.len()
        );

        let excluded = self.excluded_elements()?;
        for rule in &rule_set.inlinable {
            self.apply_rule(rule, &excluded)?;
        }
        if self.parse_inline_style_attributes {
            self.restore_original_styles(&original_styles);
        }
        self.remove_important_markers();
        self.phase = InlinerPhase::Inlined;

        let matching = self.determine_matching_uninlinable_rules(&rule_set.uninlinable)?;
        let mut concatenator = CssConcatenator::new();
        for rule in &matching {
            concatenator.append(
                std::slice::from_ref(&rule.selector),
                &rule.declarations,
                &rule.media,
            );
        }
        let residual_css = format!(
            "{}{}{}",
            preprocessed.import_rules, preprocessed.at_rules, concatenator
        );
        if !residual_css.is_empty() {
            self.document.append_style_block(&residual_css);
        }
        debug!(
            "kept {} of {} uninlinable rule(s), residual stylesheet of {} byte(s)",
            matching.len(),
            rule_set.uninlinable.len(),
            residual_css.len()
        );
        self.matching_uninlinable_rules = Some(matching);
        self.phase = InlinerPhase::Finalized;
        Ok(self)
    }

    /// Selectors of the uninlinable rules that were kept in the residual
    /// stylesheet by the last [`inline_css`](Self::inline_css) call.
    pub fn matching_uninlinable_selectors(&self) -> Result<Vec<String>> {
        let rules = self
            .matching_uninlinable_rules
            .as_ref()
            .ok_or(InlinerError::IllegalState(
                "matching uninlinable rules are only known after inline_css",
            ))?;
        Ok(rules.iter().map(|rule| rule.selector.clone()).collect())
    }

    /// Elements matching `selector`, or `None` if the selector is not
    /// supported and debug mode is off.
    fn query(&self, selector: &str) -> Result<Option<Vec<T::Handle>>> {
        match self.document.select(selector) {
            Ok(found) => Ok(Some(found)),
            Err(err @ InlinerError::SelectorSyntax { .. }) if !self.debug => {
                warn!("{}", err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Captures the original `style` attributes and removes them, so that
    /// they can be applied again after all the rules.
    fn normalize_style_attributes(&mut self) -> BTreeMap<T::Handle, DeclarationMap> {
        let mut original_styles = BTreeMap::new();
        for element in self.document.elements_with_style_attribute() {
            if self.parse_inline_style_attributes {
                let style = self.document.attribute(element, "style").unwrap_or_default();
                let declarations = self.caches.declarations(style).clone();
                original_styles.entry(element).or_insert(declarations);
            }
            self.document.remove_attribute(element, "style");
        }
        trace!("captured {} inline style(s)", original_styles.len());
        original_styles
    }

    fn excluded_elements(&self) -> Result<BTreeSet<T::Handle>> {
        let mut excluded = BTreeSet::new();
        for selector in &self.excluded_selectors {
            if let Some(found) = self.query(selector)? {
                excluded.extend(found);
            }
        }
        Ok(excluded)
    }

    fn apply_rule(&mut self, rule: &ParsedRule, excluded: &BTreeSet<T::Handle>) -> Result<()> {
        let Some(matches) = self.query(&rule.selector)? else {
            return Ok(());
        };
        if self.caches.declarations(&rule.declarations).is_empty() {
            return Ok(());
        }
        for element in matches {
            if excluded.contains(&element) {
                continue;
            }
            let current = self
                .document
                .attribute(element, "style")
                .unwrap_or_default()
                .to_string();
            let merged = self.caches.merged_style(&current, &rule.declarations);
            self.set_style(element, &merged);
        }
        Ok(())
    }

    fn restore_original_styles(&mut self, original_styles: &BTreeMap<T::Handle, DeclarationMap>) {
        for (&element, original) in original_styles {
            let current = self
                .document
                .attribute(element, "style")
                .unwrap_or_default()
                .to_string();
            let merged = merge_declarations(self.caches.declarations(&current), original);
            self.set_style(element, &merged);
        }
    }

    fn remove_important_markers(&mut self) {
        for element in self.document.elements_with_style_attribute() {
            let style = self
                .document
                .attribute(element, "style")
                .unwrap_or_default()
                .to_string();
            let reordered = strip_important(self.caches.declarations(&style));
            self.set_style(element, &reordered);
        }
    }

    fn set_style(&mut self, element: T::Handle, style: &str) {
        if style.is_empty() {
            self.document.remove_attribute(element, "style");
        } else {
            self.document.set_attribute(element, "style", style);
        }
    }

    /// Keeps the uninlinable rules whose selector, with the dynamic parts
    /// removed, still matches something.
    fn determine_matching_uninlinable_rules(
        &self,
        rules: &[ParsedRule],
    ) -> Result<Vec<ParsedRule>> {
        let mut matching = Vec::new();
        for rule in rules {
            let selector = if rule.has_unmatchable_pseudo {
                remove_unmatchable_pseudo_components(&rule.selector)
            } else {
                rule.selector.clone()
            };
            let exists = match self.query(&selector)? {
                Some(found) => !found.is_empty(),
                None => true,
            };
            if exists {
                matching.push(rule.clone());
            } else {
                trace!("dropping `{}`: no element matches `{}`", rule.selector, selector);
            }
        }
        Ok(matching)
    }
}
