use std::fmt::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use smsh_codegen::CompilerOutput;
use smsh_parser::inline::escape_html;
use smsh_parser::{Document, Theme};

#[derive(Parser)]
#[command(name = "smsh")]
#[command(about = "Compile indentation-based SMSH markup to HTML")]
#[command(version)]
struct Cli {
    /// Log compiler progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an .smsh file to a standalone HTML page
    Build {
        /// Input .smsh file
        path: PathBuf,

        /// Output file (defaults to the input with an .html or .json extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the compiled document as JSON instead of HTML
        #[arg(long)]
        json: bool,
    },

    /// Check an .smsh file for errors without writing output
    Check {
        /// Input .smsh file
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Build { path, output, json } => cmd_build(&path, output, json),
        Command::Check { path } => cmd_check(&path),
    }
}

fn compile(path: &Path) -> Document {
    match smsh_parser::compile_file(path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn render(doc: &Document) -> CompilerOutput {
    match smsh_codegen::compile(doc) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn cmd_build(path: &Path, output: Option<PathBuf>, json: bool) {
    let doc = compile(path);

    let (contents, extension) = if json {
        match serde_json::to_string_pretty(&doc) {
            Ok(contents) => (contents, "json"),
            Err(e) => {
                eprintln!("Error serializing {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    } else {
        (page(&doc, &render(&doc)), "html")
    };

    let out_path = output.unwrap_or_else(|| path.with_extension(extension));
    if let Err(e) = std::fs::write(&out_path, contents) {
        eprintln!("Error writing {}: {e}", out_path.display());
        std::process::exit(1);
    }

    log::info!("{} section(s) in {} tab(s)", doc.sections().count(), doc.tabs.len());
    eprintln!("Built: {}", out_path.display());
}

fn cmd_check(path: &Path) {
    let doc = compile(path);
    render(&doc);
    eprintln!("OK: {}", path.display());
}

/// Wrap a rendered fragment in a minimal standalone page.
fn page(doc: &Document, output: &CompilerOutput) -> String {
    let meta = &doc.metadata;
    let title = meta.title.as_deref().unwrap_or("Untitled");
    let theme = match meta.theme.unwrap_or(Theme::Light) {
        Theme::Light => "light",
        Theme::Dark => "dark",
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"UTF-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "  <title>{}</title>", escape_html(title));
    if let Some(favicon) = &meta.favicon {
        let _ = writeln!(html, "  <link rel=\"icon\" href=\"{favicon}\">");
    }

    let mut css = output.css.clone();
    if let Some(font) = &meta.font {
        let _ = writeln!(css, "body {{\n  font-family: \"{font}\", sans-serif;\n}}");
    }
    if !css.is_empty() {
        let _ = write!(html, "  <style>\n{css}  </style>\n");
    }
    html.push_str("</head>\n");

    let _ = writeln!(html, "<body class=\"{theme}\">");
    let _ = writeln!(html, "<main>\n{}\n</main>", output.html);
    let _ = writeln!(
        html,
        "<a class=\"totop\" href=\"#\">{}</a>",
        meta.totop_text.as_deref().unwrap_or("Back to top")
    );
    if !meta.hide_credit {
        html.push_str("<footer class=\"credit\">Made with SMSH</footer>\n");
    }
    if let Some(hash) = &meta.initial_hash {
        let _ = writeln!(
            html,
            "<script>if (!location.hash) location.hash = \"{}\";</script>",
            hash.replace('"', "\\\"")
        );
    }
    html.push_str("</body>\n</html>\n");
    html
}
