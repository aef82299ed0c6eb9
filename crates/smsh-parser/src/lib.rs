//! SMSH Parser
//!
//! Compiles `.smsh` markup into a [`Document`]: tabs of sections of HTML
//! elements plus the prologue metadata. The pieces, leaves first:
//!
//! - [`attributes`]: `(class)[style]{href}` shorthand on tag tokens
//! - [`inline`]: nested `<tag text>` spans and `<~template a>b>` calls
//! - [`parser`]: recursive descent over lines into element trees
//! - [`template`]: `~+` definitions, substitution and re-parsing
//! - [`document`]: sections, tabs, directives and `!` file inclusion
//!
//! ```
//! let doc = smsh_parser::compile_str("# Hello\n.b(big) World").unwrap();
//! let section = doc.sections().next().unwrap();
//! assert_eq!(section.elements[0].to_html(), "<b class=\"big\">World<br></b>");
//! ```

pub mod ast;
pub mod attributes;
pub mod context;
pub mod document;
pub mod include;
pub mod inline;
pub mod parser;
pub mod template;

use std::fmt::Write;
use std::path::{Path, PathBuf};

pub use ast::{Attributes, Document, Element, Metadata, Section, Tab, Theme};
pub use context::Context;
pub use document::Compiler;
pub use include::{FsLoader, MemoryLoader, SourceLoader};
pub use parser::Parser;
pub use template::Template;

/// Compile a source string. Includes resolve against the working directory.
pub fn compile_str(source: &str) -> Result<Document, CompileError> {
    Compiler::new().compile_str(source)
}

/// Compile a file from disk.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Document, CompileError> {
    Compiler::new().compile_file(path.as_ref())
}

/// Category of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong indentation character, partial level or depth jump.
    Indentation,
    /// Unknown, duplicate, malformed or misplaced directive.
    Directive,
    /// Malformed `(..)[..]{..}` shorthand.
    Attribute,
    /// Unbalanced inline `<..>` spans.
    Format,
    /// A production used where it is not allowed (element outside a
    /// section, section inside an element, image without link, ...).
    Structure,
    /// Template definition or invocation problems.
    Template,
    /// Missing, mistyped or circular file inclusion.
    Include,
}

/// The single fatal compile error.
///
/// `line` and `column` are zero-based; [`Display`](std::fmt::Display) shows
/// them one-based, followed by the chain of including files.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}{}", location(.file, .line, .column), include_trace(.include_stack))]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub file: Option<PathBuf>,
    pub line: usize,
    pub column: Option<usize>,
    /// Files being compiled when the error occurred, outermost first.
    pub include_stack: Vec<PathBuf>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            line,
            column: None,
            include_stack: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Report an error raised inside a template body at the invocation site.
    pub(crate) fn within_template(mut self, name: &str, line: usize) -> Self {
        self.message = format!("{} (in template `{name}`)", self.message);
        self.line = line;
        self.column = None;
        self
    }
}

fn location(file: &Option<PathBuf>, line: &usize, column: &Option<usize>) -> String {
    let mut out = match file {
        Some(file) => format!("{}:{}", file.display(), line + 1),
        None => format!("line {}", line + 1),
    };
    if let Some(column) = column {
        let _ = write!(out, ":{}", column + 1);
    }
    out
}

fn include_trace(stack: &[PathBuf]) -> String {
    let mut out = String::new();
    // The last entry is the file the error is in.
    for file in stack.iter().rev().skip(1) {
        let _ = write!(out, "\n  included from {}", file.display());
    }
    out
}
