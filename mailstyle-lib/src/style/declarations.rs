//! Declaration blocks (`color: red; margin: 0`) as ordered property maps.

use std::fmt;

/// One `property: value` pair. The value keeps any `!important` marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    /// Lowercase property name.
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: &str, value: &str) -> Self {
        Declaration {
            property: property.to_ascii_lowercase(),
            value: value.to_string(),
            important: is_important(value),
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {};", self.property.trim(), self.value.trim())
    }
}

/// Property → declaration map that remembers insertion order.
///
/// Re-inserting a property replaces its value in place; it does not move.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeclarationMap {
    entries: Vec<Declaration>,
}

impl DeclarationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, declaration: Declaration) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.property == declaration.property)
        {
            Some(existing) => *existing = declaration,
            None => self.entries.push(declaration),
        }
    }

    pub fn get(&self, property: &str) -> Option<&Declaration> {
        self.entries.iter().find(|d| d.property == property)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Declaration> for DeclarationMap {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        let mut map = DeclarationMap::new();
        for declaration in iter {
            map.insert(declaration);
        }
        map
    }
}

impl IntoIterator for DeclarationMap {
    type Item = Declaration;
    type IntoIter = std::vec::IntoIter<Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Parses a declaration block into an ordered map.
///
/// Declarations are split on `;` unless the semicolon introduces a data URI
/// parameter (`;base64`, `;charset`). A declaration is kept only if it looks
/// like `name: value` with a name made of ASCII letters and hyphens; anything
/// else is skipped. When a property repeats, the last value wins.
pub fn parse_declarations_block(block: &str) -> DeclarationMap {
    split_declarations(block)
        .into_iter()
        .filter_map(|raw| parse_declaration(raw.trim()))
        .collect()
}

fn split_declarations(block: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (index, _) in block.match_indices(';') {
        let rest = &block[index + 1..];
        if rest.starts_with("base64") || rest.starts_with("charset") {
            continue;
        }
        parts.push(&block[start..index]);
        start = index + 1;
    }
    parts.push(&block[start..]);
    parts
}

fn parse_declaration(declaration: &str) -> Option<Declaration> {
    let name_end = declaration
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '-'))
        .unwrap_or(declaration.len());
    if name_end == 0 {
        return None;
    }
    let (name, rest) = declaration.split_at(name_end);
    let value = rest.trim_start().strip_prefix(':')?.trim_start();
    if value.is_empty() {
        return None;
    }
    Some(Declaration::new(name, value))
}

fn is_css_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Position of the `!` of a trailing `! important` marker, if any.
fn important_marker_start(value: &str) -> Option<usize> {
    const MARKER: &str = "important";
    let split = value.len().checked_sub(MARKER.len())?;
    if !value.is_char_boundary(split) || !value[split..].eq_ignore_ascii_case(MARKER) {
        return None;
    }
    let before = value[..split].trim_end_matches(is_css_whitespace);
    before.strip_suffix('!').map(str::len)
}

/// True if the value ends in `!important` (any case, whitespace allowed
/// between `!` and `important`).
pub fn is_important(value: &str) -> bool {
    important_marker_start(value).is_some()
}

/// Removes a trailing `!important` marker together with the whitespace before it.
pub fn strip_important_marker(value: &str) -> &str {
    match important_marker_start(value) {
        Some(bang) => value[..bang].trim_end_matches(is_css_whitespace),
        None => value,
    }
}
