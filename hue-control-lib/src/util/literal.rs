//! Parsing of comma separated literal lists given on the command line, such as `1,3` for a
//! set of lights or `0.3,0.7` for an xy color.
//!
//! Only plain literals are accepted: numbers, quoted strings and bare words made of ASCII
//! letters, digits, `_` and `-`. Anything that looks like an expression is rejected.

use crate::light::gamut::XyPoint;
use crate::light::light_ref::LightRef;
use crate::util::error::ValueError;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    fn parse(item: &str) -> Result<Self, ValueError> {
        if let Some(text) = unquote(item) {
            return Ok(Literal::Text(text.to_string()));
        }
        match item.parse::<f64>() {
            Ok(number) if number.is_finite() && looks_numeric(item) => Ok(Literal::Number(number)),
            _ if is_bare_word(item) => Ok(Literal::Text(item.to_string())),
            _ => Err(ValueError::Literal(format!("unsupported item {:?}", item))),
        }
    }
}

fn looks_numeric(item: &str) -> bool {
    item.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
}

fn is_bare_word(item: &str) -> bool {
    !item.is_empty()
        && item
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn unquote(item: &str) -> Option<&str> {
    let quote = item.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = item.strip_prefix(quote)?.strip_suffix(quote)?;
    (!inner.contains(quote) && !inner.contains('\\')).then_some(inner)
}

/// Splits `input` on commas into trimmed, non-empty items. A single trailing comma is
/// allowed so `1,` reads as a one element list.
fn split_items(input: &str) -> Result<Vec<&str>, ValueError> {
    let input = input.trim();
    let body = input.strip_suffix(',').unwrap_or(input);
    if body.trim().is_empty() {
        return Err(ValueError::Literal("empty list".to_string()));
    }
    body.split(',')
        .map(|item| match item.trim() {
            "" => Err(ValueError::Literal(format!("empty item in {:?}", input))),
            item => Ok(item),
        })
        .collect()
}

/// Parses every item of a comma separated list into a [`Literal`].
pub fn parse_literals(input: &str) -> Result<Vec<Literal>, ValueError> {
    split_items(input)?.into_iter().map(Literal::parse).collect()
}

/// Parses a list of light identifiers, e.g. `1,3` or `"kitchen",2`. Identifiers are kept
/// exactly as written, so `01` stays `01`.
pub fn parse_light_refs(input: &str) -> Result<Vec<LightRef>, ValueError> {
    split_items(input)?
        .into_iter()
        .map(|item| match unquote(item) {
            Some(text) => Ok(LightRef::new(text)),
            None if is_bare_word(item) => Ok(LightRef::new(item)),
            None => Err(ValueError::Literal(format!("{:?} is not a valid light id", item))),
        })
        .collect()
}

/// Parses exactly two numbers inside the unit square, e.g. `0.6,0.4`.
pub fn parse_xy(input: &str) -> Result<XyPoint, ValueError> {
    match parse_literals(input)?.as_slice() {
        [Literal::Number(x), Literal::Number(y)] => XyPoint::checked(*x, *y),
        _ => Err(ValueError::Literal(format!(
            "expected two numbers, got {:?}",
            input
        ))),
    }
}
