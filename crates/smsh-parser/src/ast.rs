//! Document tree for SMSH.
//!
//! A compiled document is a list of tabs, each holding sections, each
//! holding elements. Elements serialize themselves to HTML because the
//! inline formatter splices rendered spans straight into element text.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;
use smsh_lexer::is_void_element;

use crate::template::Template;

/// Attribute map of an element. Sorted so serialization is deterministic.
pub type Attributes = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attributes: Attributes,
    /// Already formatted HTML text, emitted before the children.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Build an element, normalizing the tag:
    ///
    /// - a leading `.` is dropped,
    /// - the empty tag becomes a `span` with class `t` (plain text),
    /// - `card` becomes a `div` with class `card`,
    /// - a non-anchor `href` opens in a new tab.
    pub fn new(tag: &str, text: impl Into<String>, mut attributes: Attributes) -> Self {
        let tag = tag.strip_prefix('.').unwrap_or(tag);

        let tag = match tag {
            "" => {
                let class = attributes
                    .remove("class")
                    .map_or_else(|| "t".to_string(), |class| format!("t {class}"));
                attributes.insert("class".into(), class);
                "span"
            }
            "card" => {
                attributes
                    .entry("class".into())
                    .and_modify(|class| class.push_str(" card"))
                    .or_insert_with(|| "card".into());
                "div"
            }
            other => other,
        };

        let opens_new_tab = attributes
            .get("href")
            .is_some_and(|href| !href.starts_with('#'));
        if opens_new_tab {
            attributes
                .entry("target".into())
                .or_insert_with(|| "_blank".into());
        }

        Self {
            tag: tag.to_string(),
            attributes,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }

    /// Serialize to an HTML string.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Serialize into an existing buffer.
    pub fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            // Writing into a String cannot fail.
            let _ = write!(out, " {name}=\"{}\"", value.replace('"', "&quot;"));
        }
        out.push('>');

        if is_void_element(&self.tag) {
            return;
        }

        out.push_str(&self.text);
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

// ---------------------------------------------------------------------------
// Sections and tabs
// ---------------------------------------------------------------------------

/// A group of elements with a unique anchor id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub id: usize,
    /// Formatted section name.
    pub name: Option<String>,
    pub description: Option<String>,
    /// `#` sections render their name as a heading, `##` sections don't.
    pub has_title: bool,
    pub elements: Vec<Element>,
}

/// A group of sections shown as its own view.
///
/// A tab without a name holds the sections declared outside any `@` line
/// and renders as just its sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub id: usize,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sections: Vec<Section>,
}

impl Tab {
    pub fn new(id: usize, name: Option<String>, description: Option<String>) -> Self {
        Self {
            id,
            name,
            description,
            sections: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Colour scheme selected with `:theme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// Accepts `light`, `dark` and their one-letter forms.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" | "l" => Some(Theme::Light),
            "dark" | "d" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// Prologue values collected from `:` directives and `$` class blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub theme: Option<Theme>,
    pub totop_text: Option<String>,
    pub hide_credit: bool,
    pub spaces: Option<usize>,
    pub font: Option<String>,
    pub favicon: Option<String>,
    pub initial_hash: Option<String>,
    /// Custom CSS class name → class body.
    pub custom_classes: BTreeMap<String, String>,
}

/// A compiled SMSH document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub metadata: Metadata,
    pub tabs: Vec<Tab>,
    /// Templates still defined when compilation finished.
    pub templates: BTreeMap<String, Template>,
}

impl Document {
    /// All sections in document order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.tabs.iter().flat_map(|tab| tab.sections.iter())
    }
}
