//! SMSH Code Generator
//!
//! Renders a compiled [`Document`] into an HTML fragment and a stylesheet
//! for its custom classes. Page assembly (head, navigation, theme) is left
//! to the caller.
//!
//! ```text
//! Document → compile() → CompilerOutput { html, css }
//! ```

pub mod css;
pub mod html;

use smsh_parser::Document;

/// The rendered output of an SMSH document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOutput {
    pub html: String,
    pub css: String,
}

/// Code generation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Codegen error: {message}")]
pub struct CodegenError {
    pub message: String,
}

/// Render a compiled document.
pub fn compile(doc: &Document) -> Result<CompilerOutput, CodegenError> {
    let html = html::generate(doc);
    let css = css::generate(doc)?;
    Ok(CompilerOutput { html, css })
}
