//! PSPUG Code Generator
//!
//! Compiles a resolved template into a single PowerShell script artifact.
//! The artifact takes one `$data` argument and returns the rendered HTML
//! (or XML) string; runtime failures inside it are re-raised with
//! `PugLine`/`PugPath` note properties pointing at the template source.
//!
//! ```text
//! template ──resolve──▶ annotated lines ──generate──▶ body ──assemble──▶ script
//! ```

pub mod doctype;
pub mod escape;
pub mod generator;
pub mod runtime;

use indexmap::IndexMap;
use pspug_parser::{resolver, CompileError, Options};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A compiled artifact: the host script plus the files it was built from,
/// keyed to their modification times for external cache invalidation.
#[derive(Debug)]
pub struct Artifact {
    pub script: String,
    pub dependencies: IndexMap<PathBuf, SystemTime>,
}

/// Compile a root template from disk.
pub fn compile_file(path: &Path, options: &Options) -> Result<Artifact, CompileError> {
    let resolved = resolver::resolve_file(path, options)?;
    let body = generator::generate(&resolved.lines, options)?;
    Ok(Artifact {
        script: runtime::assemble(&body, options),
        dependencies: resolved.dependencies,
    })
}

/// Compile an in-memory template. `dir` is the base directory for
/// `include`/`extends` resolution; without it the template must be
/// self-contained.
pub fn compile_source(
    text: &str,
    dir: Option<&Path>,
    options: &Options,
) -> Result<Artifact, CompileError> {
    let resolved = resolver::resolve_source(text, dir, options)?;
    let body = generator::generate(&resolved.lines, options)?;
    Ok(Artifact {
        script: runtime::assemble(&body, options),
        dependencies: resolved.dependencies,
    })
}
