//! CSS code generator.
//!
//! Emits one rule per `$name` custom class, in name order.

use std::fmt::Write;

use crate::CodegenError;
use smsh_parser::ast::Document;

/// Generate CSS for the document's custom classes.
pub fn generate(doc: &Document) -> Result<String, CodegenError> {
    let mut css = String::new();

    for (name, body) in &doc.metadata.custom_classes {
        validate(name, body)?;
        let _ = writeln!(css, ".{name} {{");
        for line in body.lines() {
            let _ = writeln!(css, "  {line}");
        }
        css.push_str("}\n");
    }

    Ok(css)
}

fn validate(name: &str, body: &str) -> Result<(), CodegenError> {
    let valid_name = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if !valid_name {
        return Err(CodegenError {
            message: format!("Invalid custom class name '{name}'"),
        });
    }

    if body.contains(&['{', '}'][..]) {
        return Err(CodegenError {
            message: format!("Custom class '{name}' must not contain braces"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc_with(classes: &[(&str, &str)]) -> Document {
        let mut doc = Document::default();
        for (name, body) in classes {
            doc.metadata
                .custom_classes
                .insert(name.to_string(), body.to_string());
        }
        doc
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(generate(&Document::default()).unwrap(), "");
    }

    #[test]
    fn test_rules_sorted_by_name() {
        let doc = doc_with(&[("warn", "color: orange;"), ("note", "color: blue;\nmargin: 0;")]);
        assert_eq!(
            generate(&doc).unwrap(),
            ".note {\n  color: blue;\n  margin: 0;\n}\n.warn {\n  color: orange;\n}\n"
        );
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(generate(&doc_with(&[("x", "")])).unwrap(), ".x {\n}\n");
    }

    #[test]
    fn test_invalid_name() {
        let err = generate(&doc_with(&[("a b", "")])).unwrap_err();
        assert_eq!(err.message, "Invalid custom class name 'a b'");
        assert!(generate(&doc_with(&[("1x", "")])).is_err());
    }

    #[test]
    fn test_braces_rejected() {
        assert!(generate(&doc_with(&[("x", "} body {")])).is_err());
    }
}
