//! Attribute shorthand extraction.
//!
//! A tag token may carry bracketed attributes directly after its name:
//!
//! ```text
//! .div(hero)[color:red]{https://example.com} Hello
//!     ^class ^style     ^href
//! ```
//!
//! Pairs can be chained and repeated; repeats append to the same attribute.
//! Once a pair has been read, nothing but further pairs may follow before the
//! first space.

use thiserror::Error;

use crate::ast::Attributes;

/// The three shorthand attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Class,
    Style,
    Href,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 3] = [
        AttributeKind::Class,
        AttributeKind::Style,
        AttributeKind::Href,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            AttributeKind::Class => "class",
            AttributeKind::Style => "style",
            AttributeKind::Href => "href",
        }
    }

    pub fn open(&self) -> char {
        match self {
            AttributeKind::Class => '(',
            AttributeKind::Style => '[',
            AttributeKind::Href => '{',
        }
    }

    pub fn close(&self) -> char {
        match self {
            AttributeKind::Class => ')',
            AttributeKind::Style => ']',
            AttributeKind::Href => '}',
        }
    }

    /// Joins a repeated attribute onto the earlier value.
    fn separator(&self) -> &'static str {
        match self {
            AttributeKind::Class => " ",
            AttributeKind::Style => ";",
            AttributeKind::Href => "",
        }
    }

    fn opened_by(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.open() == c)
    }

    fn closed_by(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.close() == c)
    }
}

/// A malformed shorthand. `column` is the character offset in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AttributeError {
    pub message: String,
    pub column: usize,
}

/// The result of splitting attributes off a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// The token with all bracket pairs removed.
    pub tag: String,
    pub attributes: Attributes,
    /// Everything from the first space outside brackets onward, untouched.
    pub rest: String,
}

/// Extract attributes from the first token of `text`.
///
/// Scanning stops at the first space outside brackets; the remainder is
/// returned in [`Extracted::rest`].
pub fn extract(text: &str) -> Result<Extracted, AttributeError> {
    scan(text, true)
}

/// Extract attributes from the whole of `text`, spaces included.
///
/// Used for section and tab names, where the name itself contains spaces
/// and a trailing `(...)` holds the description.
pub fn extract_all(text: &str) -> Result<Extracted, AttributeError> {
    scan(text, false)
}

fn scan(text: &str, stop_at_space: bool) -> Result<Extracted, AttributeError> {
    let mut extracted = Extracted::default();
    let mut open: Option<(AttributeKind, String)> = None;
    let mut read_pair = false;
    let mut escaped = false;

    for (column, (offset, c)) in text.char_indices().enumerate() {
        if let Some((kind, value)) = open.as_mut() {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == kind.close() {
                let kind = *kind;
                let value = std::mem::take(value);
                append(&mut extracted.attributes, kind, value);
                open = None;
                read_pair = true;
            } else if AttributeKind::closed_by(c).is_some() {
                return Err(unexpected_closer(c, column));
            } else {
                value.push(c);
            }
            continue;
        }

        if c == ' ' && stop_at_space {
            extracted.rest = text[offset..].to_string();
            break;
        }

        if let Some(kind) = AttributeKind::opened_by(c) {
            open = Some((kind, String::new()));
        } else if AttributeKind::closed_by(c).is_some() {
            return Err(unexpected_closer(c, column));
        } else if read_pair {
            // Whole-text mode tolerates trailing spaces after the last pair.
            if c == ' ' {
                continue;
            }
            return Err(AttributeError {
                message: format!("Unexpected character outside of attribute: '{c}'."),
                column,
            });
        } else {
            extracted.tag.push(c);
        }
    }

    if let Some((kind, _)) = open {
        return Err(AttributeError {
            message: format!("Unclosed attribute: missing '{}'.", kind.close()),
            column: text.chars().count(),
        });
    }

    Ok(extracted)
}

fn append(attributes: &mut Attributes, kind: AttributeKind, value: String) {
    attributes
        .entry(kind.key().to_string())
        .and_modify(|existing| {
            if !existing.is_empty() && !value.is_empty() {
                existing.push_str(kind.separator());
            }
            existing.push_str(&value);
        })
        .or_insert(value);
}

fn unexpected_closer(c: char, column: usize) -> AttributeError {
    AttributeError {
        message: format!("Unexpected attribute closing character: '{c}'."),
        column,
    }
}
