use crate::line::{Indentation, Line, LineKind};
use crate::LexerError;

/// SMSH line scanner.
///
/// Unlike a token stream, SMSH is scanned one line at a time: the parser
/// owns the cursor and the indentation unit can change mid-document (via
/// `:spaces N`), so each line is measured against whatever unit is active
/// when the parser reaches it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    indentation: Indentation,
}

impl Scanner {
    /// Create a scanner for the given indentation unit.
    pub fn new(indentation: Indentation) -> Self {
        Self { indentation }
    }

    pub fn indentation(&self) -> Indentation {
        self.indentation
    }

    /// Normalize line endings and split source into lines.
    ///
    /// Carriage returns are dropped and a trailing newline is appended, so
    /// the last line is always blank.
    pub fn split_lines(source: &str) -> Vec<String> {
        let mut text = source.replace('\r', "");
        text.push('\n');
        text.split('\n').map(str::to_owned).collect()
    }

    /// Measure and classify a single raw line.
    pub fn scan<'a>(&self, number: usize, raw: &'a str) -> Result<Line<'a>, LexerError> {
        let raw = raw.trim_end();

        if raw.trim_start().is_empty() {
            return Ok(Line {
                number,
                depth: 0,
                indent_width: 0,
                content: "",
                kind: LineKind::Blank,
            });
        }

        let (depth, indent_width) = self.measure(number, raw)?;
        let content = &raw[indent_width..];

        Ok(Line {
            number,
            depth,
            indent_width,
            content,
            kind: LineKind::classify(content),
        })
    }

    // --- Indentation ---

    /// Count indentation levels, rejecting the wrong whitespace character
    /// and partial levels.
    fn measure(&self, number: usize, raw: &str) -> Result<(usize, usize), LexerError> {
        let unit = self.indentation.unit_char();
        let width = raw.chars().take_while(|c| *c == unit).count();

        let next = raw[width..].chars().next();
        if matches!(next, Some(' ') | Some('\t')) {
            let message = match self.indentation {
                Indentation::Tabs => "Invalid indentation (expected tab, not space)".to_string(),
                Indentation::Spaces(n) => {
                    format!("Invalid indentation (expected {n} spaces per level, not tab)")
                }
            };
            return Err(LexerError {
                message,
                line: number,
                column: width,
            });
        }

        let unit_len = self.indentation.unit_len();
        if width % unit_len != 0 {
            return Err(LexerError {
                message: format!(
                    "Invalid indentation ({width} spaces is not a multiple of {unit_len})"
                ),
                line: number,
                column: width,
            });
        }

        Ok((width / unit_len, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: scan with tab indentation and panic on error.
    fn scan(raw: &str) -> Line<'_> {
        Scanner::default().scan(0, raw).unwrap()
    }

    /// Helper: scan with `n`-space indentation and panic on error.
    fn scan_spaces(n: usize, raw: &str) -> Line<'_> {
        Scanner::new(Indentation::Spaces(n)).scan(0, raw).unwrap()
    }

    // =========================================================================
    // Splitting
    // =========================================================================

    #[test]
    fn test_split_appends_trailing_line() {
        assert_eq!(Scanner::split_lines("a"), vec!["a", ""]);
    }

    #[test]
    fn test_split_strips_carriage_returns() {
        assert_eq!(Scanner::split_lines("a\r\nb\r\n"), vec!["a", "b", "", ""]);
    }

    #[test]
    fn test_split_empty_source() {
        assert_eq!(Scanner::split_lines(""), vec!["", ""]);
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn test_keyword_characters() {
        let cases = [
            ("# Intro", LineKind::Section),
            ("@ Tab", LineKind::Tab),
            ("! other", LineKind::Include),
            (":title Hi", LineKind::Directive),
            ("$note", LineKind::CustomClass),
            ("> comment", LineKind::Comment),
            (", 2", LineKind::Margin),
            (".b bold", LineKind::Tag),
            ("~card a>b", LineKind::Template),
            ("\\# not a section", LineKind::Escaped),
        ];
        for (raw, kind) in cases {
            assert_eq!(scan(raw).kind, kind, "classifying {raw:?}");
        }
    }

    #[test]
    fn test_plain_text() {
        let line = scan("Hello world");
        assert_eq!(line.kind, LineKind::Text);
        assert_eq!(line.content, "Hello world");
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(scan("").kind, LineKind::Blank);
        assert_eq!(scan("\t\t").kind, LineKind::Blank);
        assert_eq!(scan("   ").kind, LineKind::Blank);
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        assert_eq!(scan(".b hi  \t").content, ".b hi");
    }

    #[test]
    fn test_token() {
        assert_eq!(scan(".div(x) Hello there").token(), ".div(x)");
        assert_eq!(scan(",").token(), ",");
    }

    // =========================================================================
    // Tab indentation
    // =========================================================================

    #[test]
    fn test_tab_depth() {
        let line = scan("\t\t.p text");
        assert_eq!(line.depth, 2);
        assert_eq!(line.indent_width, 2);
        assert_eq!(line.content, ".p text");
    }

    #[test]
    fn test_space_rejected_in_tab_mode() {
        let err = Scanner::default().scan(4, "  .p").unwrap_err();
        assert!(err.message.contains("expected tab"));
        assert_eq!(err.line, 4);
        assert_eq!(err.column, 0);
    }

    #[test]
    fn test_space_after_tabs_rejected() {
        let err = Scanner::default().scan(0, "\t .p").unwrap_err();
        assert_eq!(err.column, 1);
    }

    // =========================================================================
    // Space indentation
    // =========================================================================

    #[test]
    fn test_space_depth() {
        let line = scan_spaces(2, "    .p");
        assert_eq!(line.depth, 2);
        assert_eq!(line.indent_width, 4);
    }

    #[test]
    fn test_tab_rejected_in_space_mode() {
        let err = Scanner::new(Indentation::Spaces(2)).scan(0, "\t.p").unwrap_err();
        assert!(err.message.contains("not tab"));
    }

    #[test]
    fn test_partial_level_rejected() {
        let err = Scanner::new(Indentation::Spaces(4)).scan(0, "      .p").unwrap_err();
        assert!(err.message.contains("not a multiple of 4"));
    }

    #[test]
    fn test_from_width() {
        assert_eq!(Indentation::from_width(0), Indentation::Tabs);
        assert_eq!(Indentation::from_width(3), Indentation::Spaces(3));
    }

    #[test]
    fn test_error_display_is_one_based() {
        let err = Scanner::default().scan(0, " x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Lexer error at line 1, column 1: Invalid indentation (expected tab, not space)"
        );
    }
}
