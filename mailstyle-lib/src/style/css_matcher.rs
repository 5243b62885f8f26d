use crate::dom::dom_tree::{Document, ElementNode, NodeData, NodeId};
use crate::style::rules::split_selector_list;
use std::fmt;

/// ------------------------------
/// 1. Selector Parsing
/// ------------------------------

/// Supported attribute selector operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOperator {
    /// [attr="value"]
    Exact,
    /// [attr~="value"]
    Includes,
    /// [attr|="value"]
    DashMatch,
    /// [attr^="value"]
    Prefix,
    /// [attr$="value"]
    Suffix,
    /// [attr*="value"]
    Substring,
}

/// Represents one attribute condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: Option<AttributeOperator>, // None means only existence check
    pub value: Option<String>,
}

/// The `an+b` argument of the `:nth-*` pseudo-classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i32,
    pub b: i32,
}

impl Nth {
    /// True if `index` (1-based) is `a*n + b` for some `n >= 0`.
    pub fn matches(&self, index: i32) -> bool {
        // i64 so that extreme `b` values cannot overflow
        let (a, b, index) = (i64::from(self.a), i64::from(self.b), i64::from(index));
        if a == 0 {
            return index == b;
        }
        let offset = index - b;
        offset % a == 0 && offset / a >= 0
    }
}

/// Structural pseudo-classes that can be resolved against a static tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild(Nth),
    NthLastChild(Nth),
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthOfType(Nth),
    NthLastOfType(Nth),
    Not(Vec<CompoundSelector>),
}

/// A compound selector: an optional tag, id, classes, attribute conditions
/// and pseudo-classes, all applying to the same element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo_classes: Vec<PseudoClass>,
}

/// A complex selector composed of a key compound selector and a list of ancestor parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub key: CompoundSelector,
    /// Ancestors with their combinators, in right-to-left order.
    pub ancestors: Vec<(Combinator, CompoundSelector)>,
}

/// Supported combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (a space).
    Descendant,
    /// Child combinator (`>`).
    Child,
    /// Adjacent sibling combinator (`+`).
    AdjacentSibling,
    /// General sibling combinator (`~`).
    GeneralSibling,
}

/// A selector the matcher cannot parse or does not support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    pub reason: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

fn error<T>(reason: impl Into<String>) -> Result<T, SelectorError> {
    Err(SelectorError {
        reason: reason.into(),
    })
}

/// Parses a complex selector such as `div.red > p#header + span.foo`.
pub fn parse_selector(selector: &str) -> Result<ComplexSelector, SelectorError> {
    let mut parser = SelectorParser::new(selector);
    parser.skip_whitespace();
    let mut compounds = vec![parser.parse_compound()?];
    let mut combinators = Vec::new();
    loop {
        let saw_whitespace = parser.skip_whitespace();
        let combinator = match parser.peek() {
            None => break,
            Some('>') => Combinator::Child,
            Some('+') => Combinator::AdjacentSibling,
            Some('~') => Combinator::GeneralSibling,
            Some(',') => return error("selector lists are not supported here"),
            Some(_) if saw_whitespace => Combinator::Descendant,
            Some(other) => return error(format!("unexpected character `{}`", other)),
        };
        if combinator != Combinator::Descendant {
            parser.bump();
            parser.skip_whitespace();
        }
        combinators.push(combinator);
        compounds.push(parser.parse_compound()?);
    }

    let key = compounds.pop().unwrap_or_default();
    let mut ancestors = Vec::new();
    while let (Some(combinator), Some(compound)) = (combinators.pop(), compounds.pop()) {
        ancestors.push((combinator, compound));
    }
    Ok(ComplexSelector { key, ancestors })
}

/// Parses a single compound selector, e.g. `div.red#header[disabled]:first-child`.
pub fn parse_compound_selector(selector: &str) -> Result<CompoundSelector, SelectorError> {
    let mut parser = SelectorParser::new(selector.trim());
    let compound = parser.parse_compound()?;
    match parser.peek() {
        None => Ok(compound),
        Some(other) => error(format!("unexpected character `{}`", other)),
    }
}

struct SelectorParser {
    chars: Vec<char>,
    pos: usize,
}

impl SelectorParser {
    fn new(input: &str) -> Self {
        SelectorParser {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => error(format!("expected `{}`, found `{}`", expected, ch)),
            None => error(format!("expected `{}`, found end of selector", expected)),
        }
    }

    fn is_ident_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                match self.bump() {
                    Some(escaped) => ident.push(escaped),
                    None => return error("dangling escape"),
                }
            } else if Self::is_ident_char(ch) {
                ident.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return match self.peek() {
                Some(ch) => error(format!("expected identifier, found `{}`", ch)),
                None => error("expected identifier, found end of selector"),
            };
        }
        Ok(ident)
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();
        let start = self.pos;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
            }
            Some(ch) if Self::is_ident_char(ch) || ch == '\\' => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.parse_ident()?;
                    if compound.id.as_ref().is_some_and(|existing| existing != &id) {
                        // `#a#b` never matches; an empty class forces that.
                        compound.classes.push(String::new());
                    }
                    compound.id = Some(id);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.pseudo_classes.push(self.parse_pseudo_class()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return match self.peek() {
                Some(ch) => error(format!("expected selector, found `{}`", ch)),
                None => error("empty selector"),
            };
        }
        Ok(compound)
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let operator = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => None,
            (Some('='), _) => {
                self.pos += 1;
                Some(AttributeOperator::Exact)
            }
            (Some(op), Some('=')) => {
                let operator = match op {
                    '~' => AttributeOperator::Includes,
                    '|' => AttributeOperator::DashMatch,
                    '^' => AttributeOperator::Prefix,
                    '$' => AttributeOperator::Suffix,
                    '*' => AttributeOperator::Substring,
                    other => return error(format!("unknown attribute operator `{}=`", other)),
                };
                self.pos += 2;
                Some(operator)
            }
            (Some(ch), _) => return error(format!("unexpected `{}` in attribute selector", ch)),
            (None, _) => return error("unterminated attribute selector"),
        };

        let value = match operator {
            None => None,
            Some(_) => {
                self.skip_whitespace();
                Some(self.parse_attribute_value()?)
            }
        };
        self.skip_whitespace();
        // Case-sensitivity flags (`i`/`s`) are not supported.
        self.expect(']')?;
        Ok(AttributeSelector {
            name,
            operator,
            value,
        })
    }

    fn parse_attribute_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(ch) if ch == quote => return Ok(value),
                        Some('\\') => {
                            if let Some(escaped) = self.bump() {
                                value.push(escaped);
                            }
                        }
                        Some(ch) => value.push(ch),
                        None => return error("unterminated string in attribute selector"),
                    }
                }
            }
            _ => self.parse_ident(),
        }
    }

    fn parse_pseudo_class(&mut self) -> Result<PseudoClass, SelectorError> {
        if self.peek() == Some(':') {
            return error("pseudo-elements cannot match elements");
        }
        let name = self.parse_ident()?.to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "root" => PseudoClass::Root,
            "empty" => PseudoClass::Empty,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            "nth-child" => PseudoClass::NthChild(self.parse_nth_argument()?),
            "nth-last-child" => PseudoClass::NthLastChild(self.parse_nth_argument()?),
            "nth-of-type" => PseudoClass::NthOfType(self.parse_nth_argument()?),
            "nth-last-of-type" => PseudoClass::NthLastOfType(self.parse_nth_argument()?),
            "not" => PseudoClass::Not(self.parse_not_argument()?),
            other => return error(format!("unsupported pseudo-class `:{}`", other)),
        };
        Ok(pseudo)
    }

    fn parenthesized(&mut self) -> Result<String, SelectorError> {
        self.expect('(')?;
        let mut depth = 1;
        let mut argument = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(argument);
                    }
                }
                _ => {}
            }
            argument.push(ch);
        }
        error("unterminated pseudo-class argument")
    }

    fn parse_nth_argument(&mut self) -> Result<Nth, SelectorError> {
        let argument = self.parenthesized()?;
        parse_nth(&argument).ok_or_else(|| SelectorError {
            reason: format!("invalid nth argument `{}`", argument.trim()),
        })
    }

    fn parse_not_argument(&mut self) -> Result<Vec<CompoundSelector>, SelectorError> {
        let argument = self.parenthesized()?;
        if argument.trim().is_empty() {
            return error("empty `:not()`");
        }
        split_selector_list(&argument)
            .into_iter()
            .map(parse_compound_selector)
            .collect()
    }
}

/// Parses `odd`, `even`, `5`, `n`, `-n+3`, `2n + 1` and friends.
pub fn parse_nth(argument: &str) -> Option<Nth> {
    let compact: String = argument
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "odd" => return Some(Nth { a: 2, b: 1 }),
        "even" => return Some(Nth { a: 2, b: 0 }),
        "" => return None,
        _ => {}
    }
    match compact.find('n') {
        None => compact.parse().ok().map(|b| Nth { a: 0, b }),
        Some(n_index) => {
            let a = match &compact[..n_index] {
                "" | "+" => 1,
                "-" => -1,
                digits => digits.parse().ok()?,
            };
            let rest = &compact[n_index + 1..];
            let b = if rest.is_empty() {
                0
            } else {
                let digits = rest.strip_prefix('+').unwrap_or(rest);
                if !rest.starts_with(['+', '-']) {
                    return None;
                }
                digits.parse().ok()?
            };
            Some(Nth { a, b })
        }
    }
}

/// ------------------------------
/// 2. Selector Matching
/// ------------------------------

/// Returns true if the given element matches the compound selector.
/// Checks tag, id, classes, attribute conditions and pseudo-classes.
pub fn matches_compound(document: &Document, node: NodeId, compound: &CompoundSelector) -> bool {
    let Some(elem) = document.element(node) else {
        return false;
    };
    if let Some(ref tag) = compound.tag {
        if !elem.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(ref id_val) = compound.id {
        if elem.attribute("id") != Some(id_val.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|class| elem.has_class(class)) {
        return false;
    }
    if !compound
        .attributes
        .iter()
        .all(|attr_sel| matches_attribute(elem, attr_sel))
    {
        return false;
    }
    compound
        .pseudo_classes
        .iter()
        .all(|pseudo| matches_pseudo_class(document, node, elem, pseudo))
}

fn matches_attribute(elem: &ElementNode, attr_sel: &AttributeSelector) -> bool {
    let Some(actual_val) = elem.attribute(&attr_sel.name) else {
        return false;
    };
    let (Some(operator), Some(expected)) = (&attr_sel.operator, &attr_sel.value) else {
        // No operator means just existence; already confirmed.
        return true;
    };
    match operator {
        AttributeOperator::Exact => actual_val == expected,
        AttributeOperator::Includes => actual_val.split_whitespace().any(|word| word == expected),
        AttributeOperator::DashMatch => {
            actual_val == expected
                || actual_val
                    .strip_prefix(expected.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        }
        AttributeOperator::Prefix => {
            !expected.is_empty() && actual_val.starts_with(expected.as_str())
        }
        AttributeOperator::Suffix => {
            !expected.is_empty() && actual_val.ends_with(expected.as_str())
        }
        AttributeOperator::Substring => {
            !expected.is_empty() && actual_val.contains(expected.as_str())
        }
    }
}

/// Element siblings of `node` (including itself), optionally restricted to one tag.
fn sibling_elements(document: &Document, node: NodeId, same_tag_as: Option<&str>) -> Vec<NodeId> {
    let Some(parent) = document.parent(node) else {
        return vec![node];
    };
    document
        .element_children(parent)
        .filter(|&sibling| match same_tag_as {
            Some(tag) => document
                .element(sibling)
                .is_some_and(|e| e.tag.eq_ignore_ascii_case(tag)),
            None => true,
        })
        .collect()
}

/// 1-based position of `node` among `siblings`, from the start and from the end.
fn positions(siblings: &[NodeId], node: NodeId) -> (i32, i32) {
    let index = siblings.iter().position(|&s| s == node).unwrap_or(0) as i32;
    (index + 1, siblings.len() as i32 - index)
}

fn matches_pseudo_class(
    document: &Document,
    node: NodeId,
    elem: &ElementNode,
    pseudo: &PseudoClass,
) -> bool {
    match pseudo {
        PseudoClass::Root => document
            .parent(node)
            .is_some_and(|parent| matches!(document.node(parent).data, NodeData::DocumentRoot)),
        PseudoClass::Empty => document.children(node).iter().all(|&child| {
            match &document.node(child).data {
                NodeData::Text(text) => text.is_empty(),
                NodeData::Comment(_) | NodeData::ProcessingInstruction { .. } => true,
                _ => false,
            }
        }),
        PseudoClass::Not(compounds) => !compounds
            .iter()
            .any(|compound| matches_compound(document, node, compound)),
        positional => {
            let of_type = matches!(
                positional,
                PseudoClass::FirstOfType
                    | PseudoClass::LastOfType
                    | PseudoClass::OnlyOfType
                    | PseudoClass::NthOfType(_)
                    | PseudoClass::NthLastOfType(_)
            );
            let siblings = sibling_elements(document, node, of_type.then_some(elem.tag.as_str()));
            let (from_start, from_end) = positions(&siblings, node);
            match positional {
                PseudoClass::FirstChild | PseudoClass::FirstOfType => from_start == 1,
                PseudoClass::LastChild | PseudoClass::LastOfType => from_end == 1,
                PseudoClass::OnlyChild | PseudoClass::OnlyOfType => siblings.len() == 1,
                PseudoClass::NthChild(nth) | PseudoClass::NthOfType(nth) => nth.matches(from_start),
                PseudoClass::NthLastChild(nth) | PseudoClass::NthLastOfType(nth) => {
                    nth.matches(from_end)
                }
                _ => false,
            }
        }
    }
}

/// Matches a ComplexSelector against a candidate element.
/// The matching proceeds right-to-left, using parent and sibling links,
/// backtracking when a descendant or general-sibling step is ambiguous.
pub fn matches_complex_selector(
    document: &Document,
    node: NodeId,
    complex: &ComplexSelector,
) -> bool {
    matches_compound(document, node, &complex.key)
        && matches_ancestors(document, node, &complex.ancestors)
}

fn matches_ancestors(
    document: &Document,
    node: NodeId,
    ancestors: &[(Combinator, CompoundSelector)],
) -> bool {
    let Some(((combinator, compound), rest)) = ancestors.split_first() else {
        return true;
    };
    let step = |candidate: NodeId| {
        matches_compound(document, candidate, compound)
            && matches_ancestors(document, candidate, rest)
    };
    match combinator {
        Combinator::Child => parent_element(document, node).is_some_and(step),
        Combinator::Descendant => {
            let mut ancestor = parent_element(document, node);
            while let Some(current) = ancestor {
                if step(current) {
                    return true;
                }
                ancestor = parent_element(document, current);
            }
            false
        }
        Combinator::AdjacentSibling => previous_sibling_element(document, node).is_some_and(step),
        Combinator::GeneralSibling => {
            let mut sibling = previous_sibling_element(document, node);
            while let Some(current) = sibling {
                if step(current) {
                    return true;
                }
                sibling = previous_sibling_element(document, current);
            }
            false
        }
    }
}

/// Helper: get the parent element of a node.
fn parent_element(document: &Document, node: NodeId) -> Option<NodeId> {
    document
        .parent(node)
        .filter(|&parent| document.element(parent).is_some())
}

/// Helper: get the immediately preceding element sibling.
fn previous_sibling_element(document: &Document, node: NodeId) -> Option<NodeId> {
    let parent = document.parent(node)?;
    let siblings: Vec<NodeId> = document.element_children(parent).collect();
    let index = siblings.iter().position(|&s| s == node)?;
    index.checked_sub(1).map(|previous| siblings[previous])
}

/// Returns every element matching `selector`, in document order.
pub fn select(document: &Document, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
    let complex = parse_selector(selector)?;
    let all_elements;
    let candidates = match document.indices().candidates_for(&complex.key) {
        Some(indexed) => indexed,
        None => {
            all_elements = document.elements();
            &all_elements[..]
        }
    };
    Ok(candidates
        .iter()
        .copied()
        .filter(|&node| matches_complex_selector(document, node, &complex))
        .collect())
}
