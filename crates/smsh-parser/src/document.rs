//! Top-level compilation.
//!
//! Handles the productions that only exist outside elements: `:` directives,
//! `#` sections, `@` tabs and `!` includes. Everything else is handed to
//! the [`Parser`] and the resulting elements land in the open section.

use std::path::{Path, PathBuf};

use smsh_lexer::{Line, LineKind, Scanner};

use crate::ast::{Document, Element, Section, Tab};
use crate::attributes;
use crate::context::Context;
use crate::include::{with_source_extension, FsLoader, SourceLoader};
use crate::inline;
use crate::parser::Parser;
use crate::{CompileError, ErrorKind};

/// SMSH compiler.
///
/// Each call to [`compile_str`](Compiler::compile_str) or
/// [`compile_file`](Compiler::compile_file) starts from a fresh
/// [`Context`]; nothing leaks between compiles.
#[derive(Debug, Clone, Default)]
pub struct Compiler<L: SourceLoader = FsLoader> {
    loader: L,
}

impl Compiler {
    /// A compiler reading includes from disk.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: SourceLoader> Compiler<L> {
    pub fn with_loader(loader: L) -> Self {
        Self { loader }
    }

    /// Compile source text. Includes resolve against the working directory.
    pub fn compile_str(&self, source: &str) -> Result<Document, CompileError> {
        let mut ctx = Context::new();
        let tabs = self.compile_source(&mut ctx, source, Path::new("."))?;
        Ok(into_document(ctx, tabs))
    }

    /// Compile the file at `path`. Includes resolve against its directory.
    pub fn compile_file(&self, path: &Path) -> Result<Document, CompileError> {
        let mut ctx = Context::new();
        let cannot_open = |ctx: &Context, err: std::io::Error| {
            ctx.error(
                ErrorKind::Include,
                format!("Cannot open {}: {err}", path.display()),
                0,
            )
        };

        let resolved = self.loader.resolve(path).map_err(|err| cannot_open(&ctx, err))?;
        let source = self.loader.load(&resolved).map_err(|err| cannot_open(&ctx, err))?;
        log::debug!("compiling {}", resolved.display());

        let base = parent_dir(&resolved);
        ctx.push_file(resolved);
        let tabs = self.compile_source(&mut ctx, &source, &base)?;
        ctx.pop_file();

        Ok(into_document(ctx, tabs))
    }

    fn compile_source(
        &self,
        ctx: &mut Context,
        source: &str,
        base: &Path,
    ) -> Result<Vec<Tab>, CompileError> {
        let lines = Scanner::split_lines(source);
        let mut parser = Parser::new(&lines, ctx);
        let mut aggregator = Aggregator::default();

        while let Some(line) = parser.next_line()? {
            if line.depth > 0 {
                return Err(parser.context().error(
                    ErrorKind::Indentation,
                    "Too large amount of indentation (expected none).",
                    line.number,
                ));
            }

            match line.kind {
                LineKind::Section => {
                    parser.advance();
                    let ctx = parser.context();
                    let has_title = !line.content.starts_with("##");
                    let (name, description) = heading(ctx, &line, if has_title { 1 } else { 2 })?;
                    aggregator.open_section(ctx, name, description, has_title);
                }
                LineKind::Tab => {
                    parser.advance();
                    let ctx = parser.context();
                    let (name, description) = heading(ctx, &line, 1)?;
                    aggregator.open_tab(ctx, name, description);
                }
                LineKind::Directive => {
                    parser.advance();
                    parser.context().directive(&line)?;
                }
                LineKind::Include => {
                    parser.advance();
                    let tabs = self.include(parser.context(), &line, base)?;
                    aggregator.splice(tabs);
                }
                _ => {
                    let elements = parser.parse_line(&line)?;
                    if !elements.is_empty() && !aggregator.push(elements) {
                        return Err(parser.context().error(
                            ErrorKind::Structure,
                            "No section defined.",
                            line.number,
                        ));
                    }
                }
            }
        }

        Ok(aggregator.finish())
    }

    /// `! path`: compile another file into the shared context.
    fn include(
        &self,
        ctx: &mut Context,
        line: &Line<'_>,
        base: &Path,
    ) -> Result<Vec<Tab>, CompileError> {
        let target = line.content[1..].trim();
        if target.is_empty() {
            return Err(ctx.error(ErrorKind::Include, "Include requires a file path.", line.number));
        }

        let relative = with_source_extension(target)
            .map_err(|message| ctx.error(ErrorKind::Include, message, line.number))?;
        let resolved = self.loader.resolve(&base.join(&relative)).map_err(|_| {
            ctx.error(
                ErrorKind::Include,
                format!("File not found: {}", relative.display()),
                line.number,
            )
        })?;

        if ctx.is_including(&resolved) {
            let chain: Vec<String> = ctx
                .include_stack()
                .iter()
                .chain(std::iter::once(&resolved))
                .map(|path| path.display().to_string())
                .collect();
            return Err(ctx.error(
                ErrorKind::Include,
                format!("Circular file inclusion: {}", chain.join(" -> ")),
                line.number,
            ));
        }

        let source = self.loader.load(&resolved).map_err(|err| {
            ctx.error(
                ErrorKind::Include,
                format!("Cannot read {}: {err}", resolved.display()),
                line.number,
            )
        })?;

        log::debug!("including {}", resolved.display());
        let base = parent_dir(&resolved);
        ctx.push_file(resolved);
        let tabs = self.compile_source(ctx, &source, &base);
        ctx.pop_file();

        tabs
    }
}

// ---------------------------------------------------------------------------
// Sections and tabs
// ---------------------------------------------------------------------------

/// Collects sections into tabs as boundary lines arrive.
///
/// An open section always has an open tab to close into.
#[derive(Debug, Default)]
struct Aggregator {
    tabs: Vec<Tab>,
    tab: Option<Tab>,
    section: Option<Section>,
}

impl Aggregator {
    fn open_section(
        &mut self,
        ctx: &mut Context,
        name: Option<String>,
        description: Option<String>,
        has_title: bool,
    ) {
        self.close_section();
        if self.tab.is_none() {
            self.tab = Some(Tab::new(ctx.allocate_id(), None, None));
        }

        let id = ctx.allocate_id();
        log::debug!("section {id}: {}", name.as_deref().unwrap_or("(untitled)"));
        ctx.mark_structure();
        self.section = Some(Section {
            id,
            name,
            description,
            has_title,
            elements: Vec::new(),
        });
    }

    fn open_tab(&mut self, ctx: &mut Context, name: Option<String>, description: Option<String>) {
        self.close_tab();
        let id = ctx.allocate_id();
        log::debug!("tab {id}: {}", name.as_deref().unwrap_or("(anonymous)"));
        ctx.mark_structure();
        self.tab = Some(Tab::new(id, name, description));
    }

    /// Add elements to the open section. Returns `false` if there is none.
    fn push(&mut self, elements: Vec<Element>) -> bool {
        match self.section.as_mut() {
            Some(section) => {
                section.elements.extend(elements);
                true
            }
            None => false,
        }
    }

    /// Close everything and append the tabs of an included file.
    fn splice(&mut self, tabs: Vec<Tab>) {
        self.close_tab();
        self.tabs.extend(tabs);
    }

    fn close_section(&mut self) {
        if let (Some(section), Some(tab)) = (self.section.take(), self.tab.as_mut()) {
            tab.sections.push(section);
        }
    }

    fn close_tab(&mut self) {
        self.close_section();
        if let Some(tab) = self.tab.take() {
            self.tabs.push(tab);
        }
    }

    fn finish(mut self) -> Vec<Tab> {
        self.close_tab();
        self.tabs
    }
}

/// Split `# Name(description)` into a formatted name and a description.
fn heading(
    ctx: &mut Context,
    line: &Line<'_>,
    marker: usize,
) -> Result<(Option<String>, Option<String>), CompileError> {
    let raw = &line.content[marker..];
    let text = raw.trim();
    let column = line.indent_width + marker + (raw.len() - raw.trim_start().len());

    let (name, shorthand) = text.split_at(shorthand_start(text));
    let shorthand_column = column + name.chars().count();

    let mut description = None;
    if !shorthand.is_empty() {
        let mut extracted = attributes::extract_all(shorthand).map_err(|err| {
            ctx.error(ErrorKind::Attribute, err.message, line.number)
                .with_column(shorthand_column + err.column)
        })?;

        description = extracted.attributes.remove("class");
        if !extracted.attributes.is_empty() {
            return Err(ctx
                .error(
                    ErrorKind::Attribute,
                    "Only a (description) can follow a section or tab name.",
                    line.number,
                )
                .with_column(shorthand_column));
        }
    }

    let name = name.trim();
    let name = if name.is_empty() {
        None
    } else {
        Some(inline::format(ctx, name, line.number, column)?)
    };

    Ok((name, description))
}

/// Byte offset where the trailing `(..)[..]{..}` groups of a heading start,
/// or `text.len()` if there are none. Brackets inside `<..>` spans belong to
/// the name.
fn shorthand_start(text: &str) -> usize {
    let mut brackets = Vec::new();
    let mut depth = 0usize;
    let mut chars = text.char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '(' | '[' | '{' | ')' | ']' | '}' if depth == 0 => brackets.push((offset, c)),
            _ => {}
        }
    }

    let mut start = text.len();
    while let Some(&(close, c)) = brackets.last() {
        let open = match c {
            ')' => '(',
            ']' => '[',
            '}' => '{',
            _ => break,
        };
        if close + 1 != start {
            break;
        }
        let Some(index) = brackets.iter().rposition(|&(_, b)| b == open) else {
            break;
        };
        start = brackets[index].0;
        brackets.truncate(index);
    }
    start
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn into_document(ctx: Context, tabs: Vec<Tab>) -> Document {
    let (metadata, templates) = ctx.into_parts();
    Document {
        metadata,
        tabs,
        templates,
    }
}
