//! WASM bindings for the SMSH compiler.
//!
//! Exposes `compile()` to JavaScript via wasm-bindgen.
//! Returns a JS object `{ html, css, title }` or throws on error.
//! There is no filesystem here: `!` includes resolve against the `files`
//! map handed to `compileWithFiles()`.

use smsh_codegen::CompilerOutput;
use smsh_parser::{Compiler, MemoryLoader};
use wasm_bindgen::prelude::*;

/// Compile SMSH source to HTML + CSS.
///
/// Returns a JS object with `{ html: string, css: string, title: string | undefined }`.
/// Throws a JS error if compilation fails.
#[wasm_bindgen]
pub fn compile(source: &str) -> Result<JsValue, JsError> {
    let (output, title) = compile_with(MemoryLoader::new(), source)?;
    to_js(output, title)
}

/// Compile SMSH source whose `!` includes are served from `files`,
/// an object mapping file paths to their source.
#[wasm_bindgen(js_name = compileWithFiles)]
pub fn compile_with_files(source: &str, files: &js_sys::Object) -> Result<JsValue, JsError> {
    let mut loader = MemoryLoader::new();
    for entry in js_sys::Object::entries(files).iter() {
        let pair = js_sys::Array::from(&entry);
        let (Some(path), Some(text)) = (pair.get(0).as_string(), pair.get(1).as_string()) else {
            return Err(JsError::new("files must map paths to source strings"));
        };
        loader.insert(path, text);
    }

    let (output, title) = compile_with(loader, source)?;
    to_js(output, title)
}

/// Get the compiler version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn compile_with(
    loader: MemoryLoader,
    source: &str,
) -> Result<(CompilerOutput, Option<String>), JsError> {
    let doc = Compiler::with_loader(loader)
        .compile_str(source)
        .map_err(|e| JsError::new(&e.to_string()))?;
    let output = smsh_codegen::compile(&doc).map_err(|e| JsError::new(&e.to_string()))?;
    Ok((output, doc.metadata.title))
}

fn to_js(output: CompilerOutput, title: Option<String>) -> Result<JsValue, JsError> {
    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"html".into(), &output.html.into())
        .map_err(|_| JsError::new("Failed to set html property"))?;
    js_sys::Reflect::set(&js_obj, &"css".into(), &output.css.into())
        .map_err(|_| JsError::new("Failed to set css property"))?;
    let title = title.map(JsValue::from).unwrap_or(JsValue::UNDEFINED);
    js_sys::Reflect::set(&js_obj, &"title".into(), &title)
        .map_err(|_| JsError::new("Failed to set title property"))?;

    Ok(js_obj.into())
}
