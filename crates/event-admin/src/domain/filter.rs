//! # Property filters
//!
//! Handlers may restrict delivery with a predicate over event properties.
//! The core treats filters as opaque: it only needs [`PropertyFilter::key`]
//! for caching and [`PropertyFilter::matches`] for evaluation.
//!
//! [`LdapFilter`] implements the familiar RFC 1960 style syntax:
//!
//! ```text
//! (&(severity>=3)(|(source=db*)(source=cache))(!(muted=*)))
//! ```
//!
//! Attribute names are case-insensitive. `=*` tests presence, `*` inside a
//! value is a substring wildcard, `~=` is case- and whitespace-insensitive
//! equality, and `\` escapes `(`, `)`, `*` and `\`.

use super::event::{Properties, PropertyValue};
use crate::error::FilterError;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Opaque, cacheable predicate over event properties.
pub trait PropertyFilter: Send + Sync {
    /// Stable identity of this filter. Two filters with the same key must
    /// evaluate identically.
    fn key(&self) -> &str;

    fn matches(&self, properties: &Properties) -> bool;
}

/// How a registration declares its filter.
#[derive(Clone)]
pub enum FilterSource {
    /// A textual LDAP-style expression, parsed (and cached) by the resolver.
    Expression(String),
    /// A pre-built predicate.
    Custom(Arc<dyn PropertyFilter>),
}

impl fmt::Debug for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(expr) => f.debug_tuple("Expression").field(expr).finish(),
            Self::Custom(filter) => f.debug_tuple("Custom").field(&filter.key()).finish(),
        }
    }
}

/// A filter backed by a closure.
pub struct PredicateFilter<F> {
    key: String,
    predicate: F,
}

impl<F> PredicateFilter<F>
where
    F: Fn(&Properties) -> bool + Send + Sync,
{
    pub fn new(key: impl Into<String>, predicate: F) -> Self {
        Self {
            key: key.into(),
            predicate,
        }
    }
}

impl<F> PropertyFilter for PredicateFilter<F>
where
    F: Fn(&Properties) -> bool + Send + Sync,
{
    fn key(&self) -> &str {
        &self.key
    }

    fn matches(&self, properties: &Properties) -> bool {
        (self.predicate)(properties)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Present(String),
    Compare {
        attr: String,
        op: CompareOp,
        operand: String,
    },
    /// `parts.len() >= 2`; first is the required prefix, last the required
    /// suffix, the rest must appear in order in between.
    Substring { attr: String, parts: Vec<String> },
}

/// A parsed LDAP-style filter.
#[derive(Debug, Clone)]
pub struct LdapFilter {
    expression: String,
    root: Node,
}

impl LdapFilter {
    pub fn parse(expression: &str) -> Result<Self, FilterError> {
        let mut parser = Parser {
            src: expression,
            chars: expression.char_indices().collect(),
            pos: 0,
        };
        parser.skip_ws();
        let root = parser.filter()?;
        parser.skip_ws();
        if parser.pos < parser.chars.len() {
            return Err(FilterError::TrailingInput {
                expression: expression.to_string(),
                offset: parser.offset(),
            });
        }
        Ok(Self {
            expression: expression.to_string(),
            root,
        })
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl PropertyFilter for LdapFilter {
    fn key(&self) -> &str {
        &self.expression
    }

    fn matches(&self, properties: &Properties) -> bool {
        eval(&self.root, properties)
    }
}

impl fmt::Display for LdapFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn eval(node: &Node, props: &Properties) -> bool {
    match node {
        Node::And(children) => children.iter().all(|c| eval(c, props)),
        Node::Or(children) => children.iter().any(|c| eval(c, props)),
        Node::Not(child) => !eval(child, props),
        Node::Present(attr) => props.contains_key(attr),
        Node::Compare { attr, op, operand } => props
            .get(attr)
            .is_some_and(|value| compare(value, *op, operand)),
        Node::Substring { attr, parts } => props
            .get(attr)
            .is_some_and(|value| substring(value, parts)),
    }
}

fn compare(value: &PropertyValue, op: CompareOp, operand: &str) -> bool {
    match value {
        PropertyValue::List(items) => items.iter().any(|item| compare(item, op, operand)),
        PropertyValue::Str(s) => match op {
            CompareOp::Equal => s == operand,
            CompareOp::Approx => approx_eq(s, operand),
            CompareOp::GreaterEq => s.as_str() >= operand,
            CompareOp::LessEq => s.as_str() <= operand,
        },
        PropertyValue::Bool(b) => match op {
            CompareOp::Equal | CompareOp::Approx => operand
                .trim()
                .parse::<bool>()
                .map(|parsed| parsed == *b)
                .unwrap_or(false),
            CompareOp::GreaterEq | CompareOp::LessEq => false,
        },
        PropertyValue::Int(i) => operand
            .trim()
            .parse::<i64>()
            .map(|parsed| ordered(i.cmp(&parsed), op))
            .unwrap_or(false),
        PropertyValue::Float(f) => operand
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|parsed| f.partial_cmp(&parsed))
            .is_some_and(|ord| ordered(ord, op)),
    }
}

fn ordered(ord: Ordering, op: CompareOp) -> bool {
    match op {
        CompareOp::Equal | CompareOp::Approx => ord == Ordering::Equal,
        CompareOp::GreaterEq => ord != Ordering::Less,
        CompareOp::LessEq => ord != Ordering::Greater,
    }
}

fn approx_eq(a: &str, b: &str) -> bool {
    let fold = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    };
    fold(a) == fold(b)
}

fn substring(value: &PropertyValue, parts: &[String]) -> bool {
    match value {
        PropertyValue::List(items) => items.iter().any(|item| substring(item, parts)),
        PropertyValue::Str(s) => substring_str(s, parts),
        _ => false,
    }
}

fn substring_str(s: &str, parts: &[String]) -> bool {
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return false,
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return s == first,
    };

    let Some(mut remaining) = s.strip_prefix(first.as_str()) else {
        return false;
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.src.len(), |(offset, _)| *offset)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn end(&self) -> FilterError {
        FilterError::UnexpectedEnd {
            expression: self.src.to_string(),
        }
    }

    fn unexpected(&self, found: char) -> FilterError {
        FilterError::UnexpectedChar {
            expression: self.src.to_string(),
            offset: self.offset(),
            found,
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), FilterError> {
        match self.peek() {
            Some(c) if c == wanted => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.end()),
        }
    }

    fn filter(&mut self) -> Result<Node, FilterError> {
        self.expect('(')?;
        self.skip_ws();
        let node = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Node::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Node::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_ws();
                Node::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.end()),
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(node)
    }

    fn filter_list(&mut self) -> Result<Vec<Node>, FilterError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('(') => nodes.push(self.filter()?),
                Some(c) if nodes.is_empty() => return Err(self.unexpected(c)),
                Some(_) => return Ok(nodes),
                None => return Err(self.end()),
            }
        }
    }

    fn item(&mut self) -> Result<Node, FilterError> {
        let start = self.offset();
        let mut attr = String::new();
        let op = loop {
            match self.peek() {
                None => return Err(self.end()),
                Some(c @ ('(' | ')' | '*' | '\\')) => return Err(self.unexpected(c)),
                Some('=') => {
                    self.pos += 1;
                    break CompareOp::Equal;
                }
                Some(c @ ('~' | '>' | '<')) => {
                    self.pos += 1;
                    self.expect('=')?;
                    break match c {
                        '~' => CompareOp::Approx,
                        '>' => CompareOp::GreaterEq,
                        _ => CompareOp::LessEq,
                    };
                }
                Some(c) => {
                    attr.push(c);
                    self.pos += 1;
                }
            }
        };

        let attr = attr.trim().to_string();
        if attr.is_empty() {
            return Err(FilterError::EmptyAttribute {
                expression: self.src.to_string(),
                offset: start,
            });
        }

        let parts = self.value()?;
        if op != CompareOp::Equal || parts.len() == 1 {
            // Wildcards only carry meaning for '='; elsewhere '*' is literal.
            return Ok(Node::Compare {
                attr,
                op,
                operand: parts.join("*"),
            });
        }
        if parts.len() == 2 && parts.iter().all(String::is_empty) {
            return Ok(Node::Present(attr));
        }
        Ok(Node::Substring { attr, parts })
    }

    /// Reads a value up to the closing ')' and splits it on unescaped '*'.
    fn value(&mut self) -> Result<Vec<String>, FilterError> {
        let mut parts = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.end()),
                Some(')') => return Ok(parts),
                Some('(') => return Err(self.unexpected('(')),
                Some('*') => {
                    self.pos += 1;
                    parts.push(String::new());
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.end())?;
                    self.pos += 1;
                    if let Some(last) = parts.last_mut() {
                        last.push(escaped);
                    }
                }
                Some(c) => {
                    self.pos += 1;
                    if let Some(last) = parts.last_mut() {
                        last.push(c);
                    }
                }
            }
        }
    }
}
