//! Pipematrix Literal Parser
//!
//! Converts expectation resources and tuple literals into plain data.
//! This parser is purely syntactic: it does not decide what a key means.

use pest::{
    error::{Error, LineColLocation},
    iterators::Pair,
    Parser,
};
use pest_derive::Parser;

use crate::errors::MatrixError;
use crate::tuple::{Tuple, Value};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct LiteralParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse a flat key/value resource into its entries, in file order.
///
/// Duplicate keys are returned as-is; callers decide precedence.
pub fn parse_properties(resource: &str, text: &str) -> Result<Vec<(String, String)>, MatrixError> {
    let mut pairs = LiteralParser::parse(Rule::properties, text).map_err(|e| {
        let (line, column, message) = describe(&e);
        MatrixError::MalformedResource {
            resource: resource.to_string(),
            line,
            column,
            message,
        }
    })?;

    let Some(document) = pairs.next() else {
        return Ok(Vec::new());
    };

    Ok(document
        .into_inner()
        .filter(|p| p.as_rule() == Rule::entry)
        .map(build_entry)
        .collect())
}

/// Parse a bracketed tuple literal such as `['value', 1, null]`.
///
/// `key` only labels errors.
pub fn parse_tuple(key: &str, text: &str) -> Result<Tuple, MatrixError> {
    let malformed = |message: String| MatrixError::MalformedTuple {
        key: key.to_string(),
        message,
    };

    let mut pairs = LiteralParser::parse(Rule::tuple, text).map_err(|e| {
        let (_, column, message) = describe(&e);
        malformed(format!("column {}: {}", column, message))
    })?;

    let Some(tuple) = pairs.next() else {
        return Ok(Tuple::default());
    };

    let mut values = Vec::new();
    for element in tuple.into_inner() {
        if element.as_rule() == Rule::EOI {
            continue;
        }
        values.push(build_value(element).map_err(malformed)?);
    }
    Ok(Tuple::new(values))
}

// ============================================================================
// BUILDERS
// ============================================================================

fn build_entry(pair: Pair<Rule>) -> (String, String) {
    let mut inner = pair.into_inner();
    let key = inner.next().map(|p| unescape(p.as_str())).unwrap_or_default();
    let value = inner.next().map(|p| unescape(p.as_str())).unwrap_or_default();
    (key, value)
}

fn build_value(pair: Pair<Rule>) -> Result<Value, String> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::single_quoted | Rule::double_quoted => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Value::Str(unescape_quoted(inner)))
        }
        Rule::null => Ok(Value::Null),
        Rule::boolean => Ok(Value::Bool(text == "true")),
        Rule::float => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("invalid float '{}': {}", text, e)),
        Rule::integer => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("invalid integer '{}': {}", text, e)),
        other => Err(format!("unexpected element {:?}", other)),
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn describe(error: &Error<Rule>) -> (usize, usize, String) {
    let (line, column) = match error.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    (line, column, error.variant.message().to_string())
}

/// Resolve properties-style escapes, including line continuations.
fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('\r') | Some('\n') => {
                // continuation: drop the line break and the next line's indentation
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                while matches!(chars.peek(), Some(' ') | Some('\t') | Some('\u{0C}')) {
                    chars.next();
                }
            }
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('f') => result.push('\u{0C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        result.push_str("\\u");
                        result.push_str(&hex);
                    }
                }
            }
            Some(other) => result.push(other),
            None => {}
        }
    }

    result
}

fn unescape_quoted(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(other) => result.push(other),
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}
