/// How one level of indentation is spelled.
///
/// Documents indent with tabs until a `:spaces N` directive switches them
/// to exactly `N` spaces per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indentation {
    #[default]
    Tabs,
    Spaces(usize),
}

impl Indentation {
    /// `0` keeps tab indentation, anything else selects that many spaces.
    pub fn from_width(width: usize) -> Self {
        if width == 0 {
            Indentation::Tabs
        } else {
            Indentation::Spaces(width)
        }
    }

    /// Number of characters making up one level.
    pub fn unit_len(&self) -> usize {
        match self {
            Indentation::Tabs => 1,
            Indentation::Spaces(width) => *width,
        }
    }

    pub fn unit_char(&self) -> char {
        match self {
            Indentation::Tabs => '\t',
            Indentation::Spaces(_) => ' ',
        }
    }
}

/// Grammar production selected by a line's first significant character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Whitespace only.
    Blank,
    /// `#` section boundary (`##` for an untitled section).
    Section,
    /// `@` tab boundary.
    Tab,
    /// `!` file include.
    Include,
    /// `:` prologue directive.
    Directive,
    /// `$` custom CSS class block.
    CustomClass,
    /// `>` comment, ignored.
    Comment,
    /// `,` margin shorthand.
    Margin,
    /// `.` explicit tag.
    Tag,
    /// `~` template define (`~+`), undefine (`~-`) or invoke.
    Template,
    /// `\` escapes a keyword character; the rest is plain text.
    Escaped,
    /// Anything else: implicit plain-text tag.
    Text,
}

impl LineKind {
    /// Classify a line whose indentation has already been stripped.
    pub fn classify(content: &str) -> Self {
        match content.chars().next() {
            None => LineKind::Blank,
            Some('#') => LineKind::Section,
            Some('@') => LineKind::Tab,
            Some('!') => LineKind::Include,
            Some(':') => LineKind::Directive,
            Some('$') => LineKind::CustomClass,
            Some('>') => LineKind::Comment,
            Some(',') => LineKind::Margin,
            Some('.') => LineKind::Tag,
            Some('~') => LineKind::Template,
            Some('\\') => LineKind::Escaped,
            Some(_) => LineKind::Text,
        }
    }
}

/// One source line with its indentation measured and its production chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// Zero-based line number.
    pub number: usize,
    /// Indentation depth in levels.
    pub depth: usize,
    /// Indentation width in characters.
    pub indent_width: usize,
    /// The line without its indentation and trailing whitespace.
    pub content: &'a str,
    pub kind: LineKind,
}

impl Line<'_> {
    /// The first space-delimited token of the content.
    pub fn token(&self) -> &str {
        self.content.split(' ').next().unwrap_or_default()
    }
}

/// Reserved leading characters.
pub const KEYWORD_CHARS: &[char] = &['.', ',', '>', '@', '#', ':', '$', '!', '~'];

/// Void elements that inline format spans emit verbatim.
pub const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

/// Check if a tag name is a void element (no closing tag, no children).
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}
