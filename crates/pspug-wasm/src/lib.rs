//! WASM bindings for the pspug compiler.
//!
//! Exposes `compile()` to JavaScript via wasm-bindgen. The browser has no
//! filesystem, so templates must be self-contained (`extends`/`include`
//! report their usual resolution errors).

use wasm_bindgen::prelude::*;

/// Compile a pspug template to its PowerShell script artifact.
///
/// Throws a JS error with the formatted diagnostic if compilation fails.
#[wasm_bindgen]
pub fn compile(source: &str) -> Result<String, JsError> {
    let options = pspug_parser::Options::default();
    let artifact = pspug_codegen::compile_source(source, None, &options)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(artifact.script)
}

/// Get the compiler version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
