//! HTML code generator.
//!
//! Walks tabs and sections and serializes their elements. Section and tab
//! ids become the `id` attribute, so `{#3}` links jump to them.

use std::fmt::Write;

use smsh_parser::ast::{Document, Section, Tab};

/// Generate the HTML fragment for a document.
pub fn generate(doc: &Document) -> String {
    let mut out = String::new();
    for tab in &doc.tabs {
        generate_tab(tab, &mut out);
    }
    out
}

/// An anonymous tab is just its sections; a named one wraps them.
fn generate_tab(tab: &Tab, out: &mut String) {
    let Some(name) = &tab.name else {
        for section in &tab.sections {
            generate_section(section, out);
        }
        return;
    };

    let _ = write!(out, "<section class=\"tab\" id=\"{}\">", tab.id);
    let _ = write!(out, "<h1 class=\"tab-title\">{name}</h1>");
    if let Some(description) = &tab.description {
        let _ = write!(out, "<p class=\"subtitle\">{description}</p>");
    }
    for section in &tab.sections {
        generate_section(section, out);
    }
    out.push_str("</section>");
}

fn generate_section(section: &Section, out: &mut String) {
    let _ = write!(out, "<section id=\"{}\">", section.id);

    if section.has_title {
        if let Some(name) = &section.name {
            let _ = write!(out, "<h1>{name}</h1>");
        }
    }
    if let Some(description) = &section.description {
        let _ = write!(out, "<p class=\"subtitle\">{description}</p>");
    }

    for element in &section.elements {
        element.write_html(out);
    }
    out.push_str("</section>");
}
