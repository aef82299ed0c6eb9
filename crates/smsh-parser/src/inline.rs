//! Inline text formatting.
//!
//! Text may contain nested spans written as `<tag text>`, where `tag`
//! takes the same attribute shorthand as a line tag:
//!
//! ```text
//! Press <b(key) Ctrl> and <a{#setup} see setup>.<br>
//! ```
//!
//! Void elements (`<br>`, `<hr>`, ...) pass through unchanged, and
//! `<~name a>b>` splices in a template expansion.

use smsh_lexer::is_void_element;

use crate::ast::{Attributes, Element};
use crate::attributes;
use crate::context::Context;
use crate::template;
use crate::{CompileError, ErrorKind};

const FORMAT_START: char = '<';
const FORMAT_END: char = '>';

/// Format `text`, which starts at `column` of source line `line`.
pub fn format(
    ctx: &mut Context,
    text: &str,
    line: usize,
    column: usize,
) -> Result<String, CompileError> {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::new();
    let mut span = String::new();
    let mut span_start = 0;
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            if let Some(entity) = chars.get(i + 1).and_then(|next| escape_entity(*next)) {
                let target = if depth > 0 { &mut span } else { &mut result };
                target.push_str(entity);
                i += 2;
                continue;
            }
        }

        match c {
            FORMAT_START if depth == 0 && chars.get(i + 1) == Some(&'~') => {
                let (html, next) = invoke_template(ctx, &chars, i + 2, line, column)?;
                result.push_str(&html);
                i = next;
                continue;
            }
            FORMAT_START => {
                depth += 1;
                if depth == 1 {
                    span_start = i + 1;
                    i += 1;
                    continue;
                }
            }
            FORMAT_END => {
                if depth == 0 {
                    return Err(ctx
                        .error(ErrorKind::Format, "Unexpected format closing tag.", line)
                        .with_column(column + i));
                }
                depth -= 1;
                if depth == 0 {
                    let html = close_span(ctx, &span, line, column + span_start)?;
                    result.push_str(&html);
                    span.clear();
                    i += 1;
                    continue;
                }
            }
            _ => {}
        }

        let target = if depth > 0 { &mut span } else { &mut result };
        target.push(c);
        i += 1;
    }

    if depth > 0 {
        return Err(ctx
            .error(ErrorKind::Format, "Unclosed format tag.", line)
            .with_column(column + chars.len()));
    }

    Ok(result)
}

/// Escape text for literal output.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_entity(c: char) -> Option<&'static str> {
    match c {
        '\\' => Some("&#92;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    }
}

/// Render the contents of one `<...>` span.
fn close_span(
    ctx: &mut Context,
    span: &str,
    line: usize,
    column: usize,
) -> Result<String, CompileError> {
    if is_void_element(span.trim()) {
        return Ok(format!("<{span}>"));
    }

    let extracted = attributes::extract(span).map_err(|err| {
        ctx.error(ErrorKind::Attribute, err.message, line)
            .with_column(column + err.column)
    })?;

    let body = extracted.rest.trim_start();
    let body_column = column + span.chars().count() - body.chars().count();
    let body = format(ctx, body, line, body_column)?;

    Ok(Element::new(&extracted.tag, body, extracted.attributes).to_html())
}

/// Read `name v1>v2>` starting at `start` and render the template.
///
/// Returns the rendered HTML and the index just past the invocation.
fn invoke_template(
    ctx: &mut Context,
    chars: &[char],
    start: usize,
    line: usize,
    column: usize,
) -> Result<(String, usize), CompileError> {
    let unterminated = |ctx: &Context| {
        ctx.error(ErrorKind::Format, "Unterminated template invocation.", line)
            .with_column(column + chars.len())
    };

    let mut i = start;
    let mut name = String::new();
    while let Some(&c) = chars.get(i) {
        if c == ' ' || c == FORMAT_END {
            break;
        }
        name.push(c);
        i += 1;
    }
    let Some(&terminator) = chars.get(i) else {
        return Err(unterminated(ctx));
    };
    i += 1;

    let arity = ctx
        .template(&name)
        .map(|template| template.arity())
        .ok_or_else(|| {
            ctx.error(ErrorKind::Template, format!("Template `{name}` not found."), line)
                .with_column(column + start)
        })?;

    let mut values = Vec::new();
    if terminator == ' ' {
        // A zero-parameter call written `<~name >` still reads one empty value.
        for _ in 0..arity.max(1) {
            let mut value = String::new();
            loop {
                match chars.get(i) {
                    Some(&FORMAT_END) => break,
                    Some(&c) => value.push(c),
                    None => return Err(unterminated(ctx)),
                }
                i += 1;
            }
            i += 1;
            values.push(value.trim().to_string());
        }
        if arity == 0 && values.iter().all(String::is_empty) {
            values.clear();
        }
    }

    let elements = template::expand(ctx, &name, &values, line)?;
    let mut html = Element::new("span", "", Attributes::new())
        .with_children(elements)
        .to_html();
    if let Some(stripped) = html.strip_suffix("<br></span></span>") {
        html = format!("{stripped}</span></span>");
    }

    Ok((html, i))
}
