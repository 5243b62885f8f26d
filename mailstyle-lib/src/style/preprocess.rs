//! Splits raw CSS into the parts the inliner treats differently: `@import`
//! rules, other at-rules, and plain or media-scoped rule text.

use crate::error::{InlinerError, Result};
use log::{debug, error, trace};
use std::collections::BTreeSet;

/// Blocks nested deeper than this are rejected instead of scanned.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Media types inlined CSS may target unless configured otherwise.
pub const DEFAULT_ALLOWED_MEDIA_TYPES: [&str; 3] = ["all", "screen", "print"];

/// A run of rule text, optionally scoped by an `@media` prelude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSegment {
    pub css: String,
    /// `@media <query>`, or empty for unscoped rules.
    pub media: String,
}

/// The output of [`preprocess`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessedCss {
    /// Leading `@import` rules, verbatim.
    pub import_rules: String,
    /// Valid non-media at-rules (`@font-face`, `@keyframes`, …), verbatim.
    pub at_rules: String,
    pub segments: Vec<CssSegment>,
}

/// Runs all preprocessing steps.
///
/// In non-strict mode a scanner failure is logged and the step falls back
/// to its unmodified input.
pub fn preprocess(
    css: &str,
    allowed_media_types: &BTreeSet<String>,
    strict: bool,
) -> Result<PreprocessedCss> {
    let without_comments = strip_comments(css);
    let (without_imports, import_rules) = extract_import_and_charset_rules(&without_comments);

    let (without_at_rules, at_rules) = match extract_uninlinable_at_rules(&without_imports) {
        Err(InlinerError::InternalPattern(message)) if !strict => {
            error!("at-rule extraction failed, keeping CSS as is: {}", message);
            (without_imports.clone(), String::new())
        }
        other => other?,
    };

    let segments = match split_css_and_media_queries(&without_at_rules, allowed_media_types) {
        Err(InlinerError::InternalPattern(message)) if !strict => {
            error!("media splitting failed, keeping CSS as is: {}", message);
            vec![CssSegment {
                css: without_at_rules.clone(),
                media: String::new(),
            }]
        }
        other => other?,
    };

    debug!(
        "preprocessed CSS: {} segment(s), {} byte(s) of at-rules, {} byte(s) of imports",
        segments.len(),
        at_rules.len(),
        import_rules.len()
    );
    Ok(PreprocessedCss {
        import_rules,
        at_rules,
        segments,
    })
}

/// Removes `/* ... */` comments. Comments do not nest; an unterminated
/// comment is left alone.
pub fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        match rest[start + 2..].find("*/") {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + 2 + end + 2..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Pulls the `@import`/`@charset` rules off the start of the stylesheet.
///
/// Returns the remaining CSS and the collected `@import` rules (each with
/// its trailing whitespace). `@charset` is dropped. `@import` is matched
/// case-insensitively, `@charset` only in lowercase.
pub fn extract_import_and_charset_rules(css: &str) -> (String, String) {
    let mut rest = css;
    let mut import_rules = String::new();
    loop {
        let trimmed = rest.trim_start();
        let Some(after_at) = trimmed.strip_prefix('@') else {
            break;
        };
        let is_import = after_at
            .get(..6)
            .is_some_and(|name| name.eq_ignore_ascii_case("import"));
        let name_len = if is_import {
            6
        } else if after_at.starts_with("charset") {
            7
        } else {
            break;
        };
        let Some(len) = directive_len(&after_at[name_len..]) else {
            break;
        };
        let rule_len = 1 + name_len + len;
        let with_whitespace = rule_len + leading_whitespace_len(&trimmed[rule_len..]);
        if is_import {
            import_rules.push_str(&trimmed[..with_whitespace]);
        }
        rest = &trimmed[with_whitespace..];
    }
    (rest.to_string(), import_rules)
}

/// Length of `\s[^;]+;` at the start of `text`.
fn directive_len(text: &str) -> Option<usize> {
    let first = text.chars().next()?;
    if !first.is_whitespace() {
        return None;
    }
    let body = &text[first.len_utf8()..];
    let semicolon = body.find(';')?;
    (semicolon > 0).then_some(first.len_utf8() + semicolon + 1)
}

fn leading_whitespace_len(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Index just past the closing quote of the string starting at `open`.
fn string_end(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            byte if byte == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the `}` that closes the block opened at `open`, or
/// `None` if the block is never closed. Quoted strings are skipped.
pub fn block_end(css: &str, open: usize) -> Result<Option<usize>> {
    let bytes = css.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = string_end(bytes, i);
                continue;
            }
            b'{' => {
                depth += 1;
                if depth > MAX_NESTING_DEPTH {
                    return Err(InlinerError::InternalPattern(format!(
                        "blocks nested deeper than {} levels at byte {}",
                        MAX_NESTING_DEPTH, i
                    )));
                }
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(Some(i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(None)
}

/// The identifier following the `@` at `at`.
fn at_keyword(css: &str, at: usize) -> &str {
    let start = at + 1;
    let len = css[start..]
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(css.len() - start);
    &css[start..start + len]
}

/// The first `{` or `;` at or after `from`, outside strings.
fn prelude_end(css: &str, from: usize) -> Option<(usize, u8)> {
    let bytes = css.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(bytes, i),
            byte @ (b'{' | b';') => return Some((i, byte)),
            _ => i += 1,
        }
    }
    None
}

/// `@font-face` needs both a family and a source to be usable.
fn is_valid_at_rule(name: &str, body: &str) -> bool {
    if !name.eq_ignore_ascii_case("font-face") {
        return true;
    }
    let body = body.to_ascii_lowercase();
    body.contains("font-family") && body.contains("src")
}

/// Moves top-level at-rules with a block body (other than `@media`) out
/// of the CSS.
///
/// Returns the remaining CSS and the kept at-rules, verbatim with trailing
/// whitespace. Invalid `@font-face` rules are dropped.
pub fn extract_uninlinable_at_rules(css: &str) -> Result<(String, String)> {
    let bytes = css.as_bytes();
    let mut remaining = String::with_capacity(css.len());
    let mut at_rules = String::new();
    let mut copied_to = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(bytes, i),
            b'{' => i = block_end(css, i)?.unwrap_or(bytes.len()),
            b'@' => {
                let name = at_keyword(css, i);
                let Some((block_start, terminator)) = prelude_end(css, i + 1 + name.len()) else {
                    break;
                };
                if terminator == b';' {
                    i = block_start + 1;
                    continue;
                }
                let Some(end) = block_end(css, block_start)? else {
                    break;
                };
                if name.is_empty() || name.eq_ignore_ascii_case("media") {
                    i = end;
                    continue;
                }
                let end_with_whitespace = end + leading_whitespace_len(&css[end..]);
                remaining.push_str(&css[copied_to..i]);
                if is_valid_at_rule(name, &css[block_start..end]) {
                    at_rules.push_str(&css[i..end_with_whitespace]);
                } else {
                    debug!("dropping invalid @{} rule", name);
                }
                copied_to = end_with_whitespace;
                i = end_with_whitespace;
            }
            _ => i += 1,
        }
    }
    remaining.push_str(&css[copied_to..]);
    Ok((remaining, at_rules))
}

/// True if a `@media` prelude targets one of the allowed media types.
///
/// A bare `@media` and a query made only of features (`(min-width: …)`)
/// always qualify.
pub fn is_media_query_allowed(prelude: &str, allowed_media_types: &BTreeSet<String>) -> bool {
    let lower = prelude.trim().to_ascii_lowercase();
    let mut query = lower.as_str();
    if let Some(rest) = query.strip_prefix("only") {
        if rest.starts_with(char::is_whitespace) {
            query = rest.trim_start();
        }
    }
    if query.is_empty() || query.starts_with('(') {
        return true;
    }
    let media_type = query
        .split(|c: char| c.is_whitespace() || c == ',' || c == '(')
        .next()
        .unwrap_or_default();
    allowed_media_types.contains(media_type)
}

/// Splits CSS into unscoped runs and the bodies of allowed `@media` blocks.
///
/// Disallowed media blocks and stray `@import`/`@charset` directives are
/// dropped. Blank segments are omitted.
pub fn split_css_and_media_queries(
    css: &str,
    allowed_media_types: &BTreeSet<String>,
) -> Result<Vec<CssSegment>> {
    let bytes = css.as_bytes();
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut copied_to = 0;
    let mut i = 0;

    fn flush(plain: &mut String, segments: &mut Vec<CssSegment>) {
        if !plain.trim().is_empty() {
            segments.push(CssSegment {
                css: std::mem::take(plain),
                media: String::new(),
            });
        }
        plain.clear();
    }

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(bytes, i),
            b'{' => i = block_end(css, i)?.unwrap_or(bytes.len()),
            b'@' => {
                let name = at_keyword(css, i);
                let is_media = name.eq_ignore_ascii_case("media");
                let is_directive =
                    name.eq_ignore_ascii_case("import") || name.eq_ignore_ascii_case("charset");
                if !is_media && !is_directive {
                    i += 1;
                    continue;
                }
                let prelude_start = i + 1 + name.len();
                let Some((block_start, terminator)) = prelude_end(css, prelude_start) else {
                    break;
                };
                plain.push_str(&css[copied_to..i]);
                if is_directive || terminator == b';' {
                    trace!("dropping misplaced @{} directive", name);
                    i = block_start + 1;
                    copied_to = i;
                    continue;
                }

                let end = block_end(css, block_start)?.unwrap_or(bytes.len());
                let body_end = if css[..end].ends_with('}') { end - 1 } else { end };
                let prelude = css[prelude_start..block_start].trim();
                if is_media_query_allowed(prelude, allowed_media_types) {
                    flush(&mut plain, &mut segments);
                    let media = if prelude.is_empty() {
                        "@media".to_string()
                    } else {
                        format!("@media {}", prelude)
                    };
                    segments.push(CssSegment {
                        css: css[block_start + 1..body_end].to_string(),
                        media,
                    });
                } else {
                    trace!("dropping @media {} block", prelude);
                }
                i = end + leading_whitespace_len(&css[end..]);
                copied_to = i;
            }
            _ => i += 1,
        }
    }
    plain.push_str(&css[copied_to..]);
    flush(&mut plain, &mut segments);
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn default_media() -> BTreeSet<String> {
        DEFAULT_ALLOWED_MEDIA_TYPES
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn strips_comments_non_greedily() {
        assert_eq!(
            strip_comments("a { color: red; } /* one */ b {} /* two */"),
            "a { color: red; }  b {} "
        );
        assert_eq!(strip_comments("p {} /* open"), "p {} /* open");
        assert_eq!(strip_comments("/* a /* b */ c */"), " c */");
    }

    #[test]
    fn extracts_leading_imports_and_drops_charset() {
        let (rest, imports) = extract_import_and_charset_rules(
            "@charset \"UTF-8\";\n@import \"foo.css\";\n\
             @IMPORT url(bar.css) screen;\np { color: green; }",
        );
        assert_eq!(imports, "@import \"foo.css\";\n@IMPORT url(bar.css) screen;\n");
        assert_eq!(rest, "p { color: green; }");
    }

    #[test]
    fn import_after_content_is_not_leading() {
        let (rest, imports) =
            extract_import_and_charset_rules("p { color: red; } @import \"late.css\";");
        assert_eq!(imports, "");
        assert_eq!(rest, "p { color: red; } @import \"late.css\";");
    }

    #[test]
    fn uppercase_charset_stops_extraction() {
        let (rest, imports) = extract_import_and_charset_rules("@CHARSET \"x\"; @import 'a.css';");
        assert_eq!(imports, "");
        assert_eq!(rest, "@CHARSET \"x\"; @import 'a.css';");
    }

    #[test]
    fn extracts_valid_at_rules_and_drops_invalid_font_faces() {
        let css = "p { color: red; }\n\
                   @font-face { font-family: Foo; src: url(foo.woff); }\n\
                   @font-face { font-family: Bar; }\n\
                   @keyframes spin { from { opacity: 0; } to { opacity: 1; } }\n\
                   @media print { p { color: black; } }";
        let (rest, at_rules) = extract_uninlinable_at_rules(css).unwrap();
        assert_eq!(
            at_rules,
            "@font-face { font-family: Foo; src: url(foo.woff); }\n\
             @keyframes spin { from { opacity: 0; } to { opacity: 1; } }\n"
        );
        assert_eq!(rest, "p { color: red; }\n@media print { p { color: black; } }");
    }

    #[test]
    fn excessive_nesting_is_an_internal_pattern_error() {
        let css = format!("@supports (x: y) {}{}", "{".repeat(100), "}".repeat(101));
        assert!(matches!(
            extract_uninlinable_at_rules(&css),
            Err(InlinerError::InternalPattern(_))
        ));
        let outcome = preprocess(&css, &default_media(), false).unwrap();
        assert_eq!(outcome.at_rules, "");
        assert!(preprocess(&css, &default_media(), true).is_err());
    }

    #[test]
    fn splits_allowed_media_and_drops_others() {
        let css = "p { color: red; }\n\
                   @media tv { p { color: blue; } }\n\
                   @media only screen and (max-width: 600px) { p { color: green; } }\n\
                   @media (min-width: 10px) { a { color: pink; } }\n\
                   div { margin: 0; }";
        let segments = split_css_and_media_queries(css, &default_media()).unwrap();
        let media: Vec<&str> = segments.iter().map(|s| s.media.as_str()).collect();
        assert_eq!(
            media,
            vec![
                "",
                "@media only screen and (max-width: 600px)",
                "@media (min-width: 10px)",
                ""
            ]
        );
        assert_eq!(segments[0].css, "p { color: red; }\n");
        assert_eq!(segments[1].css, " p { color: green; } ");
        assert_eq!(segments[3].css, "div { margin: 0; }");
    }

    #[test]
    fn media_type_checks() {
        let allowed = default_media();
        assert!(is_media_query_allowed("", &allowed));
        assert!(is_media_query_allowed("screen", &allowed));
        assert!(is_media_query_allowed("ONLY Print", &allowed));
        assert!(is_media_query_allowed("all and (orientation: portrait)", &allowed));
        assert!(is_media_query_allowed("screen, tv", &allowed));
        assert!(!is_media_query_allowed("tv", &allowed));
        assert!(!is_media_query_allowed("screenx", &allowed));
        assert!(!is_media_query_allowed("not print", &allowed));
    }

    #[test]
    fn drops_misplaced_directives() {
        let segments = split_css_and_media_queries(
            "p { color: red; } @import \"late.css\"; a { color: blue; }",
            &default_media(),
        )
        .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].css, "p { color: red; }  a { color: blue; }");
    }
}
