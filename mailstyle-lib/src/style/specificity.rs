//! Selector specificity as a single weighted number.

use std::cmp::Ordering;

pub const ID_WEIGHT: u32 = 10_000;
pub const CLASS_WEIGHT: u32 = 100;
pub const TYPE_WEIGHT: u32 = 1;

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Computes the specificity of a single selector.
///
/// `#id` counts 10000; `.class`, `[attr]` and pseudo-classes count 100;
/// type names and pseudo-elements count 1. `:not(` itself is free but its
/// argument is counted. The arguments of other functional pseudo-classes
/// (`:nth-child(2n+1)`) are not.
pub fn specificity(selector: &str) -> u32 {
    let chars: Vec<char> = selector.chars().collect();
    let mut total = 0;
    let mut i = 0;

    let skip_ident = |mut i: usize| {
        while i < chars.len() && (is_ident_char(chars[i]) || chars[i] == '\\') {
            i += if chars[i] == '\\' { 2 } else { 1 };
        }
        i
    };
    let skip_parenthesized = |mut i: usize| {
        if chars.get(i) != Some(&'(') {
            return i;
        }
        let mut depth = 0;
        while i < chars.len() {
            match chars[i] {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        i
    };

    while i < chars.len() {
        match chars[i] {
            '#' => {
                total += ID_WEIGHT;
                i = skip_ident(i + 1);
            }
            '.' => {
                total += CLASS_WEIGHT;
                i = skip_ident(i + 1);
            }
            '[' => {
                total += CLASS_WEIGHT;
                let mut quote = None;
                i += 1;
                while i < chars.len() {
                    match (chars[i], quote) {
                        ('\\', _) => i += 1,
                        (c @ ('"' | '\''), None) => quote = Some(c),
                        (c, Some(q)) if c == q => quote = None,
                        (']', None) => break,
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                total += TYPE_WEIGHT;
                i = skip_parenthesized(skip_ident(i + 2));
            }
            ':' => {
                let name_end = skip_ident(i + 1);
                let name: String = chars[i + 1..name_end].iter().collect();
                if name.eq_ignore_ascii_case("not") && chars.get(name_end) == Some(&'(') {
                    i = name_end + 1;
                } else {
                    total += CLASS_WEIGHT;
                    i = skip_parenthesized(name_end);
                }
            }
            c if is_ident_char(c) || c == '\\' => {
                total += TYPE_WEIGHT;
                i = skip_ident(i);
            }
            _ => i += 1,
        }
    }
    total
}

/// Cascade order: ascending specificity, then ascending source position.
pub fn cascade_order(
    (specificity_a, source_a): (u32, usize),
    (specificity_b, source_b): (u32, usize),
) -> Ordering {
    specificity_a
        .cmp(&specificity_b)
        .then(source_a.cmp(&source_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn weights_ids_classes_and_types() {
        assert_eq!(specificity("*"), 0);
        assert_eq!(specificity("p"), 1);
        assert_eq!(specificity(".a"), 100);
        assert_eq!(specificity("#a"), 10_000);
        assert_eq!(specificity("div p.lead"), 102);
        assert_eq!(specificity("#a #b .c"), 20_100);
        assert_eq!(specificity("a[href^=\"http://x.y\"]"), 101);
    }

    #[test]
    fn an_id_outranks_any_number_of_classes() {
        assert!(specificity("#a") > specificity(".a.b.c"));
        assert!(specificity(".a") > specificity("html body div p span"));
    }

    #[test]
    fn pseudo_classes_and_elements() {
        assert_eq!(specificity("a:hover"), 101);
        assert_eq!(specificity("p::first-line"), 2);
        assert_eq!(specificity("li:nth-child(2n+1)"), 101);
        assert_eq!(specificity("p:not(.x)"), 101);
        assert_eq!(specificity("p:not(#x)"), 10_001);
    }

    #[test]
    fn ties_break_on_source_position() {
        assert_eq!(cascade_order((100, 3), (100, 1)), Ordering::Greater);
        assert_eq!(cascade_order((1, 9), (100, 1)), Ordering::Less);
        assert_eq!(cascade_order((5, 2), (5, 2)), Ordering::Equal);
    }
}
