//! Selector path parser.
//!
//! Turns `x.prop.inner[0]['key']` into a [`ValueChain`] in a single
//! left-to-right pass. The scanner is permissive: an unterminated `[`
//! becomes a trailing field hop instead of an error, and since unknown
//! fields are no-ops at run time such a hop is harmless.
//!
//! Multi-field selectors (`a, b.c`) and `*` are expanded here with the help
//! of an [`ElementType`].

use crate::{
    ast::{AccessStep, MultiFieldSpec, Spec, ValueChain},
    introspect::ElementType,
    lexer::Position,
    parser::ParseError,
    value::ValueKind,
};

fn parse_kind(name: &str, offset: usize) -> Result<ValueKind, ParseError> {
    name.trim()
        .parse::<ValueKind>()
        .map_err(|_| ParseError::UnknownKind {
            name: name.trim().to_string(),
            position: Position { offset },
        })
}

/// Strip a leading `(kind)` argument cast.
fn split_arg_cast(text: &str) -> Result<(Option<ValueKind>, &str), ParseError> {
    if let Some(rest) = text.strip_prefix('(')
        && let Some((kind, path)) = rest.split_once(')')
    {
        return Ok((Some(parse_kind(kind, 1)?), path.trim_start()));
    }
    Ok((None, text))
}

/// Strip a trailing `as kind` output cast.
///
/// Only the last ` as ` outside brackets and quotes counts, so a key such
/// as `['x as int']` stays part of the path.
fn split_out_cast(text: &str) -> Result<(&str, Option<ValueKind>), ParseError> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut cut = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ' ') if depth == 0 && text[i..].starts_with(" as ") => cut = Some(i),
            (None, _) => {}
        }
    }
    match cut {
        Some(i) => Ok((text[..i].trim_end(), Some(parse_kind(&text[i + 4..], i + 4)?))),
        None => Ok((text, None)),
    }
}

/// Find the `]` closing the bracket opened just before `start`, skipping
/// over quoted sections.
fn find_close(chars: &[char], start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn bracket_step(content: &str) -> AccessStep {
    let content = content.trim();
    if let Ok(n) = content.parse::<i64>() {
        return AccessStep::Index(n);
    }
    let unquoted = ['\'', '"'].iter().find_map(|&q| {
        content
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    });
    AccessStep::Key(unquoted.unwrap_or(content).to_string())
}

fn flush(buffer: &mut String, steps: &mut Vec<AccessStep>) {
    let name = buffer.trim();
    if !name.is_empty() {
        steps.push(AccessStep::Field(name.to_string()));
    }
    buffer.clear();
}

/// Parse a single selector path into a chain.
///
/// # Examples
///
/// ```
/// use sift_lang::ast::AccessStep;
/// use sift_lang::selector::parse_chain;
///
/// let chain = parse_chain("x.prop[0]['key']").unwrap();
/// assert_eq!(chain.steps, vec![
///     AccessStep::Field("prop".into()),
///     AccessStep::Index(0),
///     AccessStep::Key("key".into()),
/// ]);
/// ```
pub fn parse_chain(text: &str) -> Result<ValueChain, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let (arg_cast, rest) = split_arg_cast(text)?;
    let (path, out_cast) = split_out_cast(rest)?;

    // `x` is the element binding
    let path = match path {
        "x" => "",
        p => p
            .strip_prefix("x.")
            .or_else(|| p.strip_prefix("x").filter(|r| r.starts_with('[')))
            .unwrap_or(p),
    };

    let chars: Vec<char> = path.chars().collect();
    let mut steps = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                flush(&mut buffer, &mut steps);
                i += 1;
            }
            '[' => {
                flush(&mut buffer, &mut steps);
                match find_close(&chars, i + 1) {
                    Some(close) => {
                        let content: String = chars[i + 1..close].iter().collect();
                        steps.push(bracket_step(&content));
                        i = close + 1;
                    }
                    None => {
                        // Unterminated: the remainder is a final field hop.
                        buffer.extend(&chars[i + 1..]);
                        break;
                    }
                }
            }
            c => {
                buffer.push(c);
                i += 1;
            }
        }
    }
    flush(&mut buffer, &mut steps);

    Ok(ValueChain {
        steps,
        arg_cast,
        out_cast,
    })
}

/// Split on commas that are not inside brackets or quotes.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Parse a projection selector against an element type.
///
/// - `*` expands to every readable field of `element_type`
/// - `a, b.c` becomes a named row keyed by shortened names
/// - anything else is a single chain
pub fn parse_selector(text: &str, element_type: &ElementType) -> Result<Spec, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    if text == "*" {
        if element_type.fields().is_empty() {
            return Ok(Spec::Chain(ValueChain::default()));
        }
        let mut spec = MultiFieldSpec::new();
        for field in element_type.fields() {
            spec.push(ValueChain::field(field.as_str()));
        }
        return Ok(Spec::Fields(spec));
    }

    let parts = split_top_level(text);
    if parts.len() == 1 {
        return Ok(Spec::Chain(parse_chain(text)?));
    }

    let mut spec = MultiFieldSpec::new();
    for part in parts.into_iter().filter(|p| !p.trim().is_empty()) {
        spec.push(parse_chain(part)?);
    }
    if spec.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(Spec::Fields(spec))
}
