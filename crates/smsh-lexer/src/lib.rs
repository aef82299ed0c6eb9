//! SMSH Lexer
//!
//! Splits `.smsh` source into lines, measures each line's indentation
//! against the configured unit (tabs, or `N` spaces after `:spaces N`)
//! and classifies it by its leading keyword character.
//!
//! # Example
//!
//! ```
//! use smsh_lexer::{Indentation, LineKind, Scanner};
//!
//! let scanner = Scanner::new(Indentation::Tabs);
//! let line = scanner.scan(0, "\t.b Hello").unwrap();
//! assert_eq!(line.depth, 1);
//! assert_eq!(line.kind, LineKind::Tag);
//! ```

pub mod line;
pub mod scanner;

pub use line::{is_void_element, Indentation, Line, LineKind, KEYWORD_CHARS, VOID_ELEMENTS};
pub use scanner::Scanner;

/// Lexer error with position information.
///
/// `line` and `column` are zero-based.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Lexer error at line {}, column {}: {message}", .line + 1, .column + 1)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}
