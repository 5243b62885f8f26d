//! An owned, append-only stylesheet that folds adjacent rules together
//! before it is written back into a `<style>` element.
use std::fmt;

/// A rule with one or more selectors and a raw declarations block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRule {
    /// e.g. "a:hover", "p.footer"; no duplicates.
    pub selectors: Vec<String>,
    pub declarations: String,
}

/// Consecutive rules sharing the same media prelude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaGroup {
    /// `@media <query>`, or empty for unscoped rules.
    pub media: String,
    pub rules: Vec<OwnedRule>,
}

/// Builds compact CSS from `(selectors, declarations, media)` triples.
///
/// Appending keeps the input order. A rule with the same declarations as
/// the previous one in the same media group gets merged into it, and so
/// does a rule with the same set of selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssConcatenator {
    media_groups: Vec<MediaGroup>,
}

impl OwnedRule {
    fn has_equivalent_selectors(&self, selectors: &[String]) -> bool {
        self.selectors.len() == selectors.len()
            && selectors.iter().all(|s| self.selectors.contains(s))
    }
}

impl CssConcatenator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, selectors: &[String], declarations: &str, media: &str) {
        let group = self.group_to_append_to(media);
        let Some(last) = group.rules.last_mut() else {
            group.rules.push(new_rule(selectors, declarations));
            return;
        };

        if last.declarations == declarations {
            for selector in selectors {
                if !last.selectors.contains(selector) {
                    last.selectors.push(selector.clone());
                }
            }
        } else if last.has_equivalent_selectors(selectors) {
            let previous = last.declarations.trim_end().trim_end_matches(';');
            last.declarations = format!("{};{}", previous, declarations);
        } else {
            group.rules.push(new_rule(selectors, declarations));
        }
    }

    fn group_to_append_to(&mut self, media: &str) -> &mut MediaGroup {
        let reuse_last = self
            .media_groups
            .last()
            .is_some_and(|group| group.media == media);
        if !reuse_last {
            self.media_groups.push(MediaGroup {
                media: media.to_string(),
                rules: Vec::new(),
            });
        }
        let last = self.media_groups.len() - 1;
        &mut self.media_groups[last]
    }
}

fn new_rule(selectors: &[String], declarations: &str) -> OwnedRule {
    let mut unique: Vec<String> = Vec::with_capacity(selectors.len());
    for selector in selectors {
        if !unique.contains(selector) {
            unique.push(selector.clone());
        }
    }
    OwnedRule {
        selectors: unique,
        declarations: declarations.to_string(),
    }
}

impl fmt::Display for OwnedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.selectors.join(","), self.declarations)
    }
}

impl fmt::Display for MediaGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.media.is_empty() {
            write!(f, "{}{{", self.media)?;
        }
        for rule in &self.rules {
            write!(f, "{}", rule)?;
        }
        if !self.media.is_empty() {
            f.write_str("}")?;
        }
        Ok(())
    }
}

impl fmt::Display for CssConcatenator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.media_groups {
            write!(f, "{}", group)?;
        }
        Ok(())
    }
}
