//! Element tree builder for SMSH.
//!
//! Recursive descent over the line array. The parser owns the cursor; each
//! production consumes its own line plus every deeper line belonging to it
//! and leaves the cursor on the first line it did not consume.
//!
//! Sections, tabs, includes and directives are handled one level up in
//! [`crate::document`]; here they are only recognized so they can be
//! rejected inside elements.

use smsh_lexer::{Line, LineKind, KEYWORD_CHARS};

use crate::ast::{Attributes, Element};
use crate::attributes;
use crate::context::Context;
use crate::inline;
use crate::template::{self, Template};
use crate::{CompileError, ErrorKind};

/// Tags that expand into an outer/inner pair: `.uli a` is `<ul><li>a</li></ul>`.
const SHORTHANDS: &[(&str, &str, &str)] = &[
    ("uli", "ul", "li"),
    ("oli", "ol", "li"),
    ("trow", "table", "tr"),
];

/// SMSH line parser.
pub struct Parser<'a> {
    lines: &'a [String],
    pos: usize,
    ctx: &'a mut Context,
}

/// A tag line split into its parts.
struct TagLine {
    /// Tag name without the leading `.` and raw marker.
    tag: String,
    attributes: Attributes,
    text: String,
    text_column: usize,
    /// `.~tag`: text is escaped instead of formatted.
    raw: bool,
}

impl<'a> Parser<'a> {
    pub fn new(lines: &'a [String], ctx: &'a mut Context) -> Self {
        Self { lines, pos: 0, ctx }
    }

    pub fn context(&mut self) -> &mut Context {
        &mut *self.ctx
    }

    /// Move the cursor to the next line that is neither blank nor a
    /// comment and return it scanned.
    pub fn next_line(&mut self) -> Result<Option<Line<'a>>, CompileError> {
        match self.peek_significant(self.pos) {
            Some(index) => {
                self.pos = index;
                self.scan(index).map(Some)
            }
            None => {
                self.pos = self.lines.len();
                Ok(None)
            }
        }
    }

    /// Step past the line under the cursor.
    pub fn advance(&mut self) {
        self.pos += 1;
    }

    /// Parse a template body: elements starting at depth zero until the
    /// end of the lines.
    pub fn parse_fragment(&mut self) -> Result<Vec<Element>, CompileError> {
        self.parse_block(0)
    }

    /// Parse the production on `line`, which must be under the cursor.
    ///
    /// Returns zero elements for lines that only change state (comments,
    /// custom classes, template definitions) and several for a template
    /// invocation.
    pub fn parse_line(&mut self, line: &Line<'a>) -> Result<Vec<Element>, CompileError> {
        log::trace!("line {}: {:?} at depth {}", line.number + 1, line.kind, line.depth);

        match line.kind {
            LineKind::Blank | LineKind::Comment => {
                self.pos = line.number + 1;
                Ok(Vec::new())
            }
            LineKind::Section => Err(self.error(
                ErrorKind::Structure,
                "Sections can only be declared at the top level.",
                line,
            )),
            LineKind::Tab => Err(self.error(
                ErrorKind::Structure,
                "Tabs can only be declared at the top level.",
                line,
            )),
            LineKind::Include => Err(self.error(
                ErrorKind::Include,
                "Files can only be included at the top level.",
                line,
            )),
            LineKind::Directive if self.ctx.is_expanding() => {
                self.pos = line.number + 1;
                self.ctx.directive(line)?;
                Ok(Vec::new())
            }
            LineKind::Directive => Err(self.error(
                ErrorKind::Directive,
                "Directives can only be declared at the top level.",
                line,
            )),
            LineKind::CustomClass => {
                self.parse_custom_class(line)?;
                Ok(Vec::new())
            }
            LineKind::Template => self.parse_template_line(line),
            LineKind::Margin => {
                self.pos = line.number + 1;
                Ok(vec![margin(line.content)])
            }
            LineKind::Tag | LineKind::Text | LineKind::Escaped => self.parse_tag(line),
        }
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Parse consecutive elements at exactly `depth`, stopping at the first
    /// shallower line.
    fn parse_block(&mut self, depth: usize) -> Result<Vec<Element>, CompileError> {
        let mut elements = Vec::new();

        while let Some(index) = self.peek_significant(self.pos) {
            let line = self.scan(index)?;
            if line.depth < depth {
                break;
            }
            if line.depth > depth {
                return Err(self.error(
                    ErrorKind::Indentation,
                    format!(
                        "Too large amount of indentation (expected {depth}, got {}).",
                        line.depth
                    ),
                    &line,
                ));
            }
            self.pos = index;
            elements.extend(self.parse_line(&line)?);
        }

        Ok(elements)
    }

    fn parse_children(&mut self, depth: usize) -> Result<Vec<Element>, CompileError> {
        self.parse_block(depth + 1)
    }

    /// Consume every line deeper than `line`, blank lines included.
    ///
    /// Trailing blank lines are left for the caller.
    fn take_block(&mut self, line: &Line<'a>) -> Result<Vec<&'a str>, CompileError> {
        let lines = self.lines;
        let start = line.number + 1;
        let mut end = start;
        let mut index = start;

        while index < lines.len() {
            let raw = lines[index].as_str();
            if !raw.trim().is_empty() {
                if self.scan(index)?.depth <= line.depth {
                    break;
                }
                end = index + 1;
            }
            index += 1;
        }

        self.pos = end;
        Ok(lines[start..end].iter().map(String::as_str).collect())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    fn parse_tag(&mut self, line: &Line<'a>) -> Result<Vec<Element>, CompileError> {
        let head = self.read_tag(line)?;

        let Some(&(_, outer, inner)) = SHORTHANDS.iter().find(|(name, ..)| *name == head.tag)
        else {
            return Ok(vec![self.build(line, head, None)?]);
        };

        let token_end = line
            .content
            .find(|c: char| matches!(c, ' ' | '(' | '[' | '{'))
            .unwrap_or(line.content.len());
        let token = &line.content[..token_end];

        let mut items = vec![self.build(line, head, Some(inner))?];
        while let Some(index) = self.peek_nonblank(self.pos) {
            let sibling = self.scan(index)?;
            if sibling.depth != line.depth
                || sibling.kind != LineKind::Tag
                || !shorthand_matches(sibling.content, token)
            {
                break;
            }
            self.pos = index;
            let head = self.read_tag(&sibling)?;
            items.push(self.build(&sibling, head, Some(inner))?);
        }

        Ok(vec![Element::new(outer, "", Attributes::new()).with_children(items)])
    }

    fn read_tag(&self, line: &Line<'a>) -> Result<TagLine, CompileError> {
        let plain = |text: &str, text_column: usize| TagLine {
            tag: String::new(),
            attributes: Attributes::new(),
            text: text.to_string(),
            text_column,
            raw: false,
        };

        match line.kind {
            LineKind::Text => return Ok(plain(line.content, line.indent_width)),
            LineKind::Escaped => {
                let rest = &line.content[1..];
                // `\<`, `\>` and `\\` are inline escapes and keep their backslash.
                let escapes_keyword = rest
                    .chars()
                    .next()
                    .is_some_and(|c| KEYWORD_CHARS.contains(&c) && c != '>');
                return Ok(if escapes_keyword {
                    plain(rest, line.indent_width + 1)
                } else {
                    plain(line.content, line.indent_width)
                });
            }
            _ => {}
        }

        let extracted = attributes::extract(line.content).map_err(|err| {
            self.error(ErrorKind::Attribute, err.message, line)
                .with_column(line.indent_width + err.column)
        })?;

        let tag = extracted.tag.strip_prefix('.').unwrap_or(&extracted.tag);
        let (tag, raw) = match tag.strip_prefix('~') {
            Some(tag) => (tag, true),
            None => (tag, false),
        };

        let text = extracted.rest.trim();
        let text_column = line.indent_width + line.content.chars().count()
            - extracted.rest.trim_start().chars().count();

        Ok(TagLine {
            tag: tag.to_string(),
            attributes: extracted.attributes,
            text: text.to_string(),
            text_column,
            raw,
        })
    }

    /// Build the element for a tag line and its children. `inner` replaces
    /// the tag of a shorthand item.
    fn build(
        &mut self,
        line: &Line<'a>,
        head: TagLine,
        inner: Option<&str>,
    ) -> Result<Element, CompileError> {
        self.pos = line.number + 1;

        let tag = inner.unwrap_or(&head.tag);
        if tag == "img" {
            return self.build_image(line, head);
        }

        let mut text = if head.raw {
            inline::escape_html(&head.text)
        } else {
            inline::format(self.ctx, &head.text, line.number, head.text_column)?
        };
        if !head.text.is_empty() {
            text.push_str("<br>");
        }

        let children = self.parse_children(line.depth)?;
        Ok(Element::new(tag, text, head.attributes).with_children(children))
    }

    /// `.img{src} alt text`
    fn build_image(&mut self, line: &Line<'a>, head: TagLine) -> Result<Element, CompileError> {
        let mut attributes = head.attributes;
        let src = attributes.remove("href").ok_or_else(|| {
            self.error(ErrorKind::Structure, "Image must have a link attribute.", line)
        })?;
        attributes.insert("src".into(), src);

        let alt = if head.text.is_empty() { "Image".to_string() } else { head.text };
        attributes.insert("alt".into(), alt);

        if let Some(index) = self.peek_significant(self.pos) {
            let next = self.scan(index)?;
            if next.depth > line.depth {
                return Err(self.error(ErrorKind::Structure, "Images cannot have children.", &next));
            }
        }

        Ok(Element::new("img", "", attributes))
    }

    // =========================================================================
    // Custom classes and templates
    // =========================================================================

    /// `$name` followed by an indented CSS body.
    fn parse_custom_class(&mut self, line: &Line<'a>) -> Result<(), CompileError> {
        let name = line.content[1..].trim();
        if name.is_empty() {
            return Err(self.error(ErrorKind::Directive, "Custom class requires a name.", line));
        }

        let body = self
            .take_block(line)?
            .iter()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        self.ctx
            .define_class(name, body)
            .map_err(|message| self.error(ErrorKind::Directive, message, line))
    }

    /// `~+name params...`, `~-name` or `~name values...`.
    fn parse_template_line(&mut self, line: &Line<'a>) -> Result<Vec<Element>, CompileError> {
        let content = line.content;

        if let Some(rest) = content.strip_prefix("~+") {
            let mut words = rest.split_whitespace();
            let name = words.next().ok_or_else(|| {
                self.error(ErrorKind::Template, "Template definition requires a name.", line)
            })?;
            let parameters = words.map(str::to_string).collect();

            let dedent = self.ctx.indentation().unit_len() * (line.depth + 1);
            let body = self
                .take_block(line)?
                .into_iter()
                .map(|raw| raw.get(dedent..).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\n");

            let template = Template::new(name, parameters, &body)
                .map_err(|message| self.error(ErrorKind::Template, message, line))?;
            self.ctx
                .define_template(template)
                .map_err(|message| self.error(ErrorKind::Template, message, line))?;
            return Ok(Vec::new());
        }

        self.pos = line.number + 1;

        if let Some(rest) = content.strip_prefix("~-") {
            self.ctx
                .remove_template(rest.trim())
                .map_err(|message| self.error(ErrorKind::Template, message, line))?;
            return Ok(Vec::new());
        }

        let token = line.token();
        let values = template::parse_values(&content[token.len()..]);
        template::expand(self.ctx, &token[1..], &values, line.number)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn scan(&self, index: usize) -> Result<Line<'a>, CompileError> {
        let lines = self.lines;
        self.ctx
            .scanner()
            .scan(index, &lines[index])
            .map_err(|err| self.ctx.lexer_error(err))
    }

    fn peek_nonblank(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&index| !self.lines[index].trim().is_empty())
    }

    fn peek_significant(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&index| {
            let text = self.lines[index].trim();
            !text.is_empty() && !text.starts_with('>')
        })
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>, line: &Line<'_>) -> CompileError {
        self.ctx.error(kind, message, line.number)
    }
}

/// `, amount`: empty is one unit, a bare integer counts units, anything
/// else is a CSS length.
fn margin(content: &str) -> Element {
    let amount = content[1..].trim();
    let amount = if amount.is_empty() {
        "16px".to_string()
    } else if let Ok(units) = amount.parse::<u32>() {
        format!("{}px", u64::from(units) * 16)
    } else {
        amount.to_string()
    };

    let mut attributes = Attributes::new();
    attributes.insert("style".into(), format!("margin-bottom:{amount}"));
    Element::new("div", "", attributes)
}

/// A sibling continues a shorthand run when its tag token is the same
/// token, optionally followed by attributes.
fn shorthand_matches(content: &str, token: &str) -> bool {
    content
        .strip_prefix(token)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(&[' ', '(', '[', '{'][..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use smsh_lexer::{Indentation, Scanner};

    fn parse_with(ctx: &mut Context, source: &str) -> Result<Vec<Element>, CompileError> {
        let lines = Scanner::split_lines(source);
        Parser::new(&lines, ctx).parse_fragment()
    }

    fn parse(source: &str) -> Vec<Element> {
        parse_with(&mut Context::new(), source).unwrap()
    }

    fn html(source: &str) -> String {
        parse(source).iter().map(Element::to_html).collect()
    }

    fn parse_err(source: &str) -> CompileError {
        parse_with(&mut Context::new(), source).unwrap_err()
    }

    // =========================================================================
    // Tags and text
    // =========================================================================

    #[test]
    fn test_tag_with_all_attributes() {
        let elements = parse(".div(hero)[color:red]{https://x} Hello");
        let el = &elements[0];
        assert_eq!(el.tag, "div");
        assert_eq!(el.attributes["class"], "hero");
        assert_eq!(el.attributes["style"], "color:red");
        assert_eq!(el.attributes["href"], "https://x");
        assert_eq!(el.attributes["target"], "_blank");
        assert_eq!(el.text, "Hello<br>");
    }

    #[test]
    fn test_implicit_text() {
        assert_eq!(html("Hello there"), "<span class=\"t\">Hello there<br></span>");
    }

    #[test]
    fn test_escaped_keyword() {
        assert_eq!(html("\\# not a section"), "<span class=\"t\"># not a section<br></span>");
    }

    #[test]
    fn test_escaped_angle_kept_for_formatter() {
        assert_eq!(html("\\<b\\>"), "<span class=\"t\">&lt;b&gt;<br></span>");
    }

    #[test]
    fn test_inline_formatting_in_text() {
        assert_eq!(html(".p a <b b>"), "<p>a <b>b</b><br></p>");
    }

    #[test]
    fn test_raw_tag_escapes_text() {
        assert_eq!(html(".~code <b> & co"), "<code>&lt;b&gt; &amp; co<br></code>");
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        assert_eq!(html("> note\n\n.b x"), "<b>x<br></b>");
    }

    #[test]
    fn test_attribute_error_column() {
        let err = parse_err("\t\n.b(x)y z");
        assert_eq!(err.kind, ErrorKind::Attribute);
        assert_eq!(err.line, 1);
        assert_eq!(err.column, Some(5));
    }

    // =========================================================================
    // Children
    // =========================================================================

    #[test]
    fn test_children() {
        assert_eq!(
            html(".div\n\t.b x\n\n\t.i y\n.p z"),
            "<div><b>x<br></b><i>y<br></i></div><p>z<br></p>"
        );
    }

    #[test]
    fn test_nested_children() {
        assert_eq!(
            html(".card\n\t.div\n\t\tText"),
            "<div class=\"card\"><div><span class=\"t\">Text<br></span></div></div>"
        );
    }

    #[test]
    fn test_text_and_children() {
        assert_eq!(html(".p Intro\n\t.b x"), "<p>Intro<br><b>x<br></b></p>");
    }

    #[test]
    fn test_depth_jump_rejected() {
        let err = parse_err(".div\n\t\t.b x");
        assert_eq!(err.kind, ErrorKind::Indentation);
        assert_eq!(err.line, 1);
        assert_eq!(err.message, "Too large amount of indentation (expected 1, got 2).");
    }

    #[test]
    fn test_space_indentation() {
        let mut ctx = Context::new();
        ctx.apply_directive("spaces", "2").unwrap();
        let elements = parse_with(&mut ctx, ".div\n  .b x").unwrap();
        assert_eq!(elements[0].children.len(), 1);
    }

    #[test]
    fn test_section_inside_element_rejected() {
        let err = parse_err(".div\n\t# Oops");
        assert_eq!(err.kind, ErrorKind::Structure);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_directive_inside_element_rejected() {
        let err = parse_err(":title x");
        assert_eq!(err.kind, ErrorKind::Directive);
        assert_eq!(err.message, "Directives can only be declared at the top level.");
    }

    // =========================================================================
    // Specializations
    // =========================================================================

    #[test]
    fn test_margin() {
        assert_eq!(parse(", 2")[0].attributes["style"], "margin-bottom:32px");
        assert_eq!(parse(",")[0].attributes["style"], "margin-bottom:16px");
        assert_eq!(parse(", 1.5em")[0].attributes["style"], "margin-bottom:1.5em");
    }

    #[test]
    fn test_image() {
        assert_eq!(html(".img{logo.png} Logo"), "<img alt=\"Logo\" src=\"logo.png\">");
        assert_eq!(html(".img(wide){a.png}"), "<img alt=\"Image\" class=\"wide\" src=\"a.png\">");
    }

    #[test]
    fn test_image_without_link() {
        let err = parse_err(".img Logo");
        assert_eq!(err.message, "Image must have a link attribute.");
    }

    #[test]
    fn test_image_children_rejected() {
        assert_eq!(parse_err(".img{a.png}\n\t.b x").kind, ErrorKind::Structure);
    }

    // =========================================================================
    // Shorthands
    // =========================================================================

    #[test]
    fn test_list_shorthand_groups_siblings() {
        assert_eq!(
            html(".uli one\n.uli(x) two\n\n.uli three\n.p after"),
            "<ul><li>one<br></li><li class=\"x\">two<br></li><li>three<br></li></ul><p>after<br></p>"
        );
    }

    #[test]
    fn test_ordered_and_table_shorthands() {
        assert_eq!(html(".oli a"), "<ol><li>a<br></li></ol>");
        assert_eq!(
            html(".trow\n\t.td a\n.trow\n\t.td b"),
            "<table><tr><td>a<br></td></tr><tr><td>b<br></td></tr></table>"
        );
    }

    #[test]
    fn test_shorthand_needs_exact_token() {
        let elements = parse(".uli a\n.ulix b");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].tag, "ulix");
    }

    #[test]
    fn test_shorthand_stops_at_other_kind() {
        assert_eq!(parse(".uli a\n> comment\n.uli b").len(), 2);
    }

    // =========================================================================
    // Custom classes
    // =========================================================================

    #[test]
    fn test_custom_class() {
        let mut ctx = Context::new();
        let source = "$note\n\tcolor: red;\n\n\tpadding: 1px;\n.b x";
        let elements = parse_with(&mut ctx, source).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(
            ctx.metadata().custom_classes["note"],
            "color: red;\npadding: 1px;"
        );
    }

    // =========================================================================
    // Templates
    // =========================================================================

    #[test]
    fn test_template_define_and_invoke() {
        assert_eq!(
            html("~+greet who\n\t.b Hi >who\n\n~greet Bob\n~greet Ann"),
            "<b>Hi Bob<br></b><b>Hi Ann<br></b>"
        );
    }

    #[test]
    fn test_template_body_keeps_nesting() {
        assert_eq!(
            html("~+box t\n\t.div\n\t\t.b >t\n~box x"),
            "<div><b>x<br></b></div>"
        );
    }

    #[test]
    fn test_template_in_space_mode() {
        let mut ctx = Context::new();
        ctx.apply_directive("spaces", "4").unwrap();
        let elements = parse_with(&mut ctx, "~+t\n    .div\n        .b y\n~t").unwrap();
        assert_eq!(elements[0].to_html(), "<div><b>y<br></b></div>");
        assert_eq!(ctx.indentation(), Indentation::Spaces(4));
    }

    #[test]
    fn test_template_undefine() {
        let err = parse_err("~+t\n\t.b x\n~-t\n~t");
        assert_eq!(err.kind, ErrorKind::Template);
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_template_arity_mismatch() {
        let err = parse_err("~+pair a b\n\t.b >a >b\n~pair one");
        assert_eq!(err.kind, ErrorKind::Template);
        assert!(err.message.contains("expected 2, got 1"));
    }

    #[test]
    fn test_duplicate_template() {
        let err = parse_err("~+t\n~+t");
        assert_eq!(err.message, "Template 't' already defined.");
    }

    #[test]
    fn test_shorthand_matches() {
        assert!(shorthand_matches(".uli", ".uli"));
        assert!(shorthand_matches(".uli(x) a", ".uli"));
        assert!(!shorthand_matches(".ulist", ".uli"));
        assert!(!shorthand_matches(".oli", ".uli"));
    }
}
