//! Compile-scoped state.
//!
//! One [`Context`] lives for exactly one top-level compile and is shared by
//! every included file and every template expansion, so directives, custom
//! classes, templates and anchor ids apply document-wide.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use smsh_lexer::{Indentation, LexerError, Line, Scanner};

use crate::ast::{Metadata, Theme};
use crate::template::Template;
use crate::{CompileError, ErrorKind};

/// Mutable state threaded through a compile.
#[derive(Debug, Default)]
pub struct Context {
    metadata: Metadata,
    templates: BTreeMap<String, Template>,
    indentation: Indentation,
    next_id: usize,
    has_structure: bool,
    include_stack: Vec<PathBuf>,
    expansion_stack: Vec<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn scanner(&self) -> Scanner {
        Scanner::new(self.indentation)
    }

    pub fn indentation(&self) -> Indentation {
        self.indentation
    }

    /// Hand out the next anchor id. Ids are shared by sections and tabs
    /// and never reused.
    pub fn allocate_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Whether any section or tab has been opened, in any file.
    pub fn has_structure(&self) -> bool {
        self.has_structure
    }

    pub(crate) fn mark_structure(&mut self) {
        self.has_structure = true;
    }

    pub fn into_parts(self) -> (Metadata, BTreeMap<String, Template>) {
        (self.metadata, self.templates)
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Build an error located in the file currently being compiled.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>, line: usize) -> CompileError {
        let mut error = CompileError::new(kind, message, line);
        error.file = self.current_file().map(Path::to_path_buf);
        error.include_stack = self.include_stack.clone();
        error
    }

    pub fn lexer_error(&self, error: LexerError) -> CompileError {
        self.error(ErrorKind::Indentation, error.message, error.line)
            .with_column(error.column)
    }

    // =========================================================================
    // Directives
    // =========================================================================

    /// Handle a `:name value` line. Directives are only valid before the
    /// first section or tab, in any file.
    pub fn directive(&mut self, line: &Line<'_>) -> Result<(), CompileError> {
        if self.has_structure {
            return Err(self.error(
                ErrorKind::Directive,
                "Directives must be declared above all sections and tabs.",
                line.number,
            ));
        }

        let body = &line.content[1..];
        let (name, value) = body.split_once(' ').unwrap_or((body, ""));
        log::debug!("directive :{name}");
        self.apply_directive(name, value.trim())
            .map_err(|message| self.error(ErrorKind::Directive, message, line.number))
    }

    /// Apply a `:name value` prologue directive.
    ///
    /// Returns the error message on failure; the caller knows the line.
    pub fn apply_directive(&mut self, name: &str, value: &str) -> Result<(), String> {
        let meta = &mut self.metadata;
        match name {
            "title" => set_once(&mut meta.title, "title", required(name, value)?),
            "theme" => {
                let theme = Theme::parse(value)
                    .ok_or_else(|| format!("Invalid theme '{value}' (expected light or dark)."))?;
                set_once(&mut meta.theme, "theme", theme)
            }
            "totoptext" => set_once(&mut meta.totop_text, "totoptext", required(name, value)?),
            "hidecredit" => {
                if !value.is_empty() {
                    return Err(":hidecredit takes no value.".into());
                }
                if meta.hide_credit {
                    return Err("hidecredit already defined.".into());
                }
                meta.hide_credit = true;
                Ok(())
            }
            "spaces" => {
                let width: usize = value
                    .parse()
                    .map_err(|_| format!("Invalid number of spaces '{value}'."))?;
                set_once(&mut meta.spaces, "spaces", width)?;
                self.indentation = Indentation::from_width(width);
                Ok(())
            }
            "font" => set_once(&mut meta.font, "font", required(name, value)?),
            "favicon" => set_once(&mut meta.favicon, "favicon", required(name, value)?),
            "initialhash" => {
                set_once(&mut meta.initial_hash, "initialhash", required(name, value)?)
            }
            _ => Err(format!("Unknown directive ':{name}'.")),
        }
    }

    /// Register a `$name` custom CSS class.
    pub fn define_class(&mut self, name: &str, body: String) -> Result<(), String> {
        if self.metadata.custom_classes.contains_key(name) {
            return Err(format!("Custom class '{name}' already defined."));
        }
        self.metadata.custom_classes.insert(name.to_string(), body);
        Ok(())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn define_template(&mut self, template: Template) -> Result<(), String> {
        if self.templates.contains_key(&template.name) {
            return Err(format!("Template '{}' already defined.", template.name));
        }
        log::debug!("defined template '{}'", template.name);
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    pub fn remove_template(&mut self, name: &str) -> Result<(), String> {
        self.templates
            .remove(name)
            .map(|_| log::debug!("removed template '{name}'"))
            .ok_or_else(|| format!("Template '{name}' not found."))
    }

    /// Mark a template as being expanded. Fails if it already is.
    pub(crate) fn enter_template(&mut self, name: &str) -> Result<(), String> {
        if self.expansion_stack.iter().any(|active| active == name) {
            return Err(format!(
                "Recursive template invocation: {} -> {name}.",
                self.expansion_stack.join(" -> ")
            ));
        }
        self.expansion_stack.push(name.to_string());
        Ok(())
    }

    pub(crate) fn leave_template(&mut self) {
        self.expansion_stack.pop();
    }

    /// Whether a template body is being expanded.
    pub fn is_expanding(&self) -> bool {
        !self.expansion_stack.is_empty()
    }

    // =========================================================================
    // File inclusion
    // =========================================================================

    /// The file currently being compiled, if any.
    pub fn current_file(&self) -> Option<&Path> {
        self.include_stack.last().map(PathBuf::as_path)
    }

    /// Files being compiled, outermost first.
    pub fn include_stack(&self) -> &[PathBuf] {
        &self.include_stack
    }

    pub fn is_including(&self, path: &Path) -> bool {
        self.include_stack.iter().any(|active| active == path)
    }

    pub(crate) fn push_file(&mut self, path: PathBuf) {
        self.include_stack.push(path);
    }

    pub(crate) fn pop_file(&mut self) {
        self.include_stack.pop();
    }
}

fn set_once<T>(slot: &mut Option<T>, name: &str, value: T) -> Result<(), String> {
    if slot.is_some() {
        return Err(format!("{}{} already defined.", name[..1].to_uppercase(), &name[1..]));
    }
    *slot = Some(value);
    Ok(())
}

fn required(name: &str, value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err(format!(":{name} requires a value."));
    }
    Ok(value.to_string())
}
