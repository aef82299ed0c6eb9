//! Named, parameterized markup snippets.
//!
//! ```text
//! ~+note title body
//!     .div(note)
//!         .b >title
//!         >body
//! ~note Careful>This deletes everything.
//! ```
//!
//! A body is stored dedented and unparsed. Each invocation substitutes
//! `>param` references textually and parses the result as a fresh
//! mini-document, sharing the caller's [`Context`].

use serde::Serialize;
use smsh_lexer::Scanner;

use crate::ast::Element;
use crate::context::Context;
use crate::parser::Parser;
use crate::{CompileError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: String,
    /// Parameter names in declaration order.
    pub parameters: Vec<String>,
    pub content: String,
}

impl Template {
    /// Create a template. `\>` in the body is stored as `&gt;` so it can
    /// never be taken for a parameter reference.
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<String>,
        content: &str,
    ) -> Result<Self, String> {
        let name = name.into();
        for (i, parameter) in parameters.iter().enumerate() {
            if parameters[..i].contains(parameter) {
                return Err(format!(
                    "Duplicate parameter '{parameter}' in template definition {name}."
                ));
            }
        }
        Ok(Self {
            name,
            parameters,
            content: content.replace("\\>", "&gt;"),
        })
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Replace every `>param` in the body with its value.
    ///
    /// Longer names are replaced first so `>ab` is never read as `>a`
    /// followed by `b`.
    pub fn substitute(&self, values: &[String]) -> Result<String, String> {
        if values.len() != self.arity() {
            return Err(format!(
                "Incorrect number of parameters for template {} (expected {}, got {})",
                self.name,
                self.arity(),
                values.len()
            ));
        }

        let mut order: Vec<usize> = (0..self.parameters.len()).collect();
        order.sort_by(|a, b| self.parameters[*b].len().cmp(&self.parameters[*a].len()));

        let mut result = self.content.clone();
        for i in order {
            result = result.replace(&format!(">{}", self.parameters[i]), &values[i]);
        }
        Ok(result)
    }
}

/// Split invocation text into argument values.
///
/// Values are separated by `>` and trimmed; no text means no values.
pub fn parse_values(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.split('>').map(|value| value.trim().to_string()).collect()
}

/// Expand template `name` with `values`, parsing the substituted body.
///
/// Errors raised inside the body are reported at `line`, the invocation.
pub fn expand(
    ctx: &mut Context,
    name: &str,
    values: &[String],
    line: usize,
) -> Result<Vec<Element>, CompileError> {
    let template = ctx
        .template(name)
        .cloned()
        .ok_or_else(|| {
            ctx.error(ErrorKind::Template, format!("Template `{name}` not found."), line)
        })?;

    let source = template
        .substitute(values)
        .map_err(|message| ctx.error(ErrorKind::Template, message, line))?;

    ctx.enter_template(name)
        .map_err(|message| ctx.error(ErrorKind::Template, message, line))?;
    log::debug!("expanding template '{name}' with {} value(s)", values.len());

    let lines = Scanner::split_lines(&source);
    let result = Parser::new(&lines, ctx).parse_fragment();
    ctx.leave_template();

    result.map_err(|err| err.within_template(name, line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template(params: &[&str], content: &str) -> Template {
        Template::new("t", params.iter().map(|p| p.to_string()).collect(), content).unwrap()
    }

    fn values(vals: &[&str]) -> Vec<String> {
        vals.iter().map(|v| v.to_string()).collect()
    }

    // =========================================================================
    // Definition
    // =========================================================================

    #[test]
    fn test_duplicate_parameters_rejected() {
        let err = Template::new("t", values(&["a", "a"]), "").unwrap_err();
        assert!(err.contains("Duplicate parameter 'a'"));
    }

    #[test]
    fn test_escaped_reference_stored_as_entity() {
        assert_eq!(template(&["a"], "x \\>a").content, "x &gt;a");
    }

    // =========================================================================
    // Substitution
    // =========================================================================

    #[test]
    fn test_substitute() {
        let t = template(&["name"], ".b Hello >name");
        assert_eq!(t.substitute(&values(&["World"])).unwrap(), ".b Hello World");
    }

    #[test]
    fn test_longest_parameter_first() {
        let t = template(&["a", "ab"], ">a and >ab");
        assert_eq!(t.substitute(&values(&["1", "2"])).unwrap(), "1 and 2");
    }

    #[test]
    fn test_escaped_reference_not_substituted() {
        let t = template(&["a"], ">a \\>a");
        assert_eq!(t.substitute(&values(&["x"])).unwrap(), "x &gt;a");
    }

    #[test]
    fn test_arity_mismatch() {
        let t = template(&["a", "b"], "");
        assert_eq!(
            t.substitute(&values(&["1"])).unwrap_err(),
            "Incorrect number of parameters for template t (expected 2, got 1)"
        );
    }

    // =========================================================================
    // Invocation values
    // =========================================================================

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values(" a > b c >d "), values(&["a", "b c", "d"]));
    }

    #[test]
    fn test_parse_no_values() {
        assert!(parse_values("   ").is_empty());
    }

    // =========================================================================
    // Expansion
    // =========================================================================

    #[test]
    fn test_expand_parses_body() {
        let mut ctx = Context::new();
        ctx.define_template(template(&["x"], ".b >x\n.i done")).unwrap();
        let elements = expand(&mut ctx, "t", &values(&["bold"]), 4).unwrap();
        let html: Vec<String> = elements.iter().map(Element::to_html).collect();
        assert_eq!(html, vec!["<b>bold<br></b>", "<i>done<br></i>"]);
    }

    #[test]
    fn test_expand_unknown() {
        let err = expand(&mut Context::new(), "missing", &[], 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Template);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_expand_error_reported_at_invocation() {
        let mut ctx = Context::new();
        ctx.define_template(template(&[], "\n.b <i oops")).unwrap();
        let err = expand(&mut ctx, "t", &[], 9).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Format);
        assert_eq!(err.line, 9);
        assert!(err.message.ends_with("(in template `t`)"));
    }

    #[test]
    fn test_self_invocation_rejected() {
        let mut ctx = Context::new();
        ctx.define_template(template(&[], "~t")).unwrap();
        let err = expand(&mut ctx, "t", &[], 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Template);
        assert!(err.message.contains("Recursive template invocation"));
    }
}
