//! Detection and removal of pseudo-classes and pseudo-elements that cannot
//! be resolved against a static document (`:hover`, `::before`, …).

use crate::style::rules::split_selector_list;

/// Pseudo-classes that only depend on the document structure.
pub const STRUCTURAL_PSEUDO_CLASSES: [&str; 12] = [
    "empty",
    "first-child",
    "last-child",
    "only-child",
    "nth-child",
    "nth-last-child",
    "first-of-type",
    "last-of-type",
    "only-of-type",
    "nth-of-type",
    "nth-last-of-type",
    "not",
];

fn is_of_type(name: &str) -> bool {
    name.ends_with("-of-type")
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn is_combinator_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, '>' | '+' | '~')
}

/// The outcome of scanning a selector.
struct Scan {
    approximated: String,
    unmatchable: bool,
}

/// True if the selector uses a pseudo-element, a dynamic pseudo-class, or an
/// `…-of-type` pseudo-class on a compound without an element type.
pub fn has_unmatchable_pseudo(selector: &str) -> bool {
    scan(selector, false).unmatchable
}

/// Rewrites a selector so that it can be matched statically, widening it
/// where a pseudo component had to be dropped.
///
/// An unmatchable component that starts a compound becomes `*`; elsewhere
/// it is removed. A `:not(…)` whose argument is itself unmatchable is
/// treated as one unmatchable component.
pub fn remove_unmatchable_pseudo_components(selector: &str) -> String {
    scan(selector, false).approximated
}

/// `enclosing_has_type` is set when scanning a `:not(…)` argument whose
/// compound already names an element type.
fn scan(selector: &str, enclosing_has_type: bool) -> Scan {
    let chars: Vec<char> = selector.chars().collect();
    let mut out = String::with_capacity(selector.len());
    let mut unmatchable = false;
    let mut compound_start = true;
    let mut compound_has_type = enclosing_has_type;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if is_combinator_char(c) {
            while i < chars.len() && is_combinator_char(chars[i]) {
                out.push(chars[i]);
                i += 1;
            }
            compound_start = true;
            compound_has_type = false;
            continue;
        }
        match c {
            '[' => {
                let end = bracket_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' => {
                let is_element = chars.get(i + 1) == Some(&':');
                let name_start = if is_element { i + 2 } else { i + 1 };
                let name_end = ident_end(&chars, name_start);
                let end = parenthesized_end(&chars, name_end);
                let name = chars[name_start..name_end]
                    .iter()
                    .collect::<String>()
                    .to_ascii_lowercase();

                let dropped = is_element
                    || !STRUCTURAL_PSEUDO_CLASSES.contains(&name.as_str())
                    || (is_of_type(&name) && !compound_has_type)
                    || (name == "not"
                        && negation_is_unmatchable(
                            &parenthesized_argument(&chars, name_end, end),
                            compound_has_type,
                        ));
                if dropped {
                    unmatchable = true;
                    if compound_start {
                        out.push('*');
                    }
                } else {
                    out.extend(&chars[i..end]);
                }
                i = end;
            }
            _ if is_ident_char(c) || c == '\\' => {
                if compound_start {
                    compound_has_type = true;
                }
                let end = ident_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
        compound_start = false;
    }

    Scan {
        approximated: out,
        unmatchable,
    }
}

fn negation_is_unmatchable(argument: &str, compound_has_type: bool) -> bool {
    split_selector_list(argument)
        .into_iter()
        .any(|selector| scan(selector.trim(), compound_has_type).unmatchable)
}

/// End of an identifier starting at `start`, escapes included.
fn ident_end(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() {
        if chars[i] == '\\' {
            i = (i + 2).min(chars.len());
        } else if is_ident_char(chars[i]) {
            i += 1;
        } else {
            break;
        }
    }
    i
}

/// End of a balanced `(...)` group at `start`, or `start` if there is none.
fn parenthesized_end(chars: &[char], start: usize) -> usize {
    if chars.get(start) != Some(&'(') {
        return start;
    }
    let mut depth = 0;
    for (offset, &c) in chars[start..].iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return start + offset + 1;
                }
            }
            _ => {}
        }
    }
    chars.len()
}

/// The text between the parentheses of a group found by [`parenthesized_end`].
fn parenthesized_argument(chars: &[char], open: usize, end: usize) -> String {
    if end <= open {
        return String::new();
    }
    let close = if end - 1 > open && chars[end - 1] == ')' {
        end - 1
    } else {
        end
    };
    chars[open + 1..close].iter().collect()
}

/// End of an attribute selector opened at `start`, quotes respected.
fn bracket_end(chars: &[char], start: usize) -> usize {
    let mut quote = None;
    let mut i = start + 1;
    while i < chars.len() {
        match (chars[i], quote) {
            ('\\', _) => i += 1,
            (c @ ('"' | '\''), None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            (']', None) => return i + 1,
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn structural_pseudo_classes_are_matchable() {
        for selector in [
            "p",
            "li:first-child",
            "tr:nth-child(2n+1) td",
            "p:not(.x)",
            "div > p:last-of-type",
            "td:empty",
            "a[href=\"http://example.com\"]",
            ".sm\\:hidden",
        ] {
            assert!(!has_unmatchable_pseudo(selector), "{}", selector);
        }
    }

    #[test]
    fn dynamic_pseudo_components_are_unmatchable() {
        for selector in [
            "a:hover",
            "p::first-line",
            "p:after",
            "input:not(:focus)",
            ".x:first-of-type",
            ":only-of-type",
            "html:root",
        ] {
            assert!(has_unmatchable_pseudo(selector), "{}", selector);
        }
    }

    #[test]
    fn approximates_selectors() {
        assert_eq!(remove_unmatchable_pseudo_components("a:hover"), "a");
        assert_eq!(remove_unmatchable_pseudo_components(":hover"), "*");
        assert_eq!(remove_unmatchable_pseudo_components("p ::before"), "p *");
        assert_eq!(remove_unmatchable_pseudo_components("ul > :focus.x"), "ul > *.x");
        assert_eq!(
            remove_unmatchable_pseudo_components("a:hover:first-child::after"),
            "a:first-child"
        );
        assert_eq!(remove_unmatchable_pseudo_components("input:not(:focus)"), "input");
        assert_eq!(remove_unmatchable_pseudo_components("p :not(:hover)"), "p *");
        assert_eq!(remove_unmatchable_pseudo_components("p:not(.x):hover"), "p:not(.x)");
        assert_eq!(remove_unmatchable_pseudo_components(".a:first-of-type"), ".a");
        assert_eq!(
            remove_unmatchable_pseudo_components("div:first-of-type"),
            "div:first-of-type"
        );
        assert_eq!(
            remove_unmatchable_pseudo_components("p:not(:first-of-type)"),
            "p:not(:first-of-type)"
        );
        assert_eq!(remove_unmatchable_pseudo_components(".a:not(:last-of-type)"), ".a");
    }

    #[test]
    fn negated_of_type_uses_the_enclosing_element_type() {
        for selector in [
            "p:not(:first-of-type)",
            "li:not(:last-of-type):not(.skip)",
            "tr td:not(.x, :nth-of-type(2n))",
        ] {
            assert!(!has_unmatchable_pseudo(selector), "{}", selector);
        }
        for selector in [
            ".a:not(:first-of-type)",
            "td :not(.x, :nth-of-type(2n))",
            "p:not(:first-of-type:hover)",
            "p:not(.a, :focus)",
        ] {
            assert!(has_unmatchable_pseudo(selector), "{}", selector);
        }
    }
}
