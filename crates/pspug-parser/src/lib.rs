//! PSPUG Parser
//!
//! Source loading and template resolution for the pspug compiler. This
//! crate turns a root template (on disk or in memory) into a single flat
//! sequence of annotated lines: `extends` inheritance is applied with
//! `block` overrides, `include` directives are spliced (recursively for
//! template files, as filter input or literal text otherwise), and every
//! opened file is recorded in a dependency map for external caches.
//!
//! Compile-time errors across the whole compiler use [`CompileError`],
//! whose messages embed a source excerpt around the offending line.

pub mod diagnostics;
pub mod loader;
pub mod resolver;

pub use loader::{load_file, load_str};
pub use resolver::{resolve_file, resolve_source, Resolved};

use pspug_lexer::SourceLine;
use std::path::PathBuf;

/// Compiler flag set, threaded through resolution and code generation.
///
/// `base_dir: None` resolves absolute (`/`- or `\`-prefixed) include paths
/// relative to the current file's directory instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Default suffix for `include`/`extends` resolution.
    pub extension: String,
    /// Root for absolute include paths.
    pub base_dir: Option<PathBuf>,
    /// Boolean attribute rendering: `attr` vs `attr="attr"`.
    pub properties: bool,
    /// Render void tags as `<img />` vs `<img>`.
    pub void_self_close: bool,
    /// Render empty containers as `<div />` vs `<div></div>`.
    pub container_self_close: bool,
    /// Convert CamelCase tag names to kebab-case (off in XML mode).
    pub kebab_case: bool,
    /// Lines of source context around a diagnostic.
    pub error_context: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extension: "pug".to_string(),
            base_dir: None,
            properties: true,
            void_self_close: false,
            container_self_close: false,
            kebab_case: true,
            error_context: 2,
        }
    }
}

/// Compile-time error taxonomy. Every variant that points at a template
/// line carries a pre-rendered diagnostic with a source excerpt (see
/// [`diagnostics::excerpt`]).
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Template not found: {path}")]
    TemplateNotFound { path: String },

    #[error("{message}")]
    ExtendsNotFound { message: String },

    #[error("{message}")]
    IncludeNotFound { message: String },

    #[error("{message}")]
    CyclicExtends { message: String },

    #[error("{message}")]
    ParseError { message: String },

    #[error("{message}")]
    UnterminatedAttribute { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    fn annotated(line: &SourceLine, detail: &str, context: u32) -> String {
        diagnostics::excerpt(&line.path, line.line, detail, context)
    }

    pub fn parse_at(line: &SourceLine, detail: impl AsRef<str>, context: u32) -> Self {
        CompileError::ParseError {
            message: Self::annotated(line, detail.as_ref(), context),
        }
    }

    pub fn extends_not_found(line: &SourceLine, detail: impl AsRef<str>, context: u32) -> Self {
        CompileError::ExtendsNotFound {
            message: Self::annotated(line, detail.as_ref(), context),
        }
    }

    pub fn include_not_found(line: &SourceLine, detail: impl AsRef<str>, context: u32) -> Self {
        CompileError::IncludeNotFound {
            message: Self::annotated(line, detail.as_ref(), context),
        }
    }

    pub fn cyclic_extends(line: &SourceLine, detail: impl AsRef<str>, context: u32) -> Self {
        CompileError::CyclicExtends {
            message: Self::annotated(line, detail.as_ref(), context),
        }
    }

    pub fn unterminated(line: &SourceLine, detail: impl AsRef<str>, context: u32) -> Self {
        CompileError::UnterminatedAttribute {
            message: Self::annotated(line, detail.as_ref(), context),
        }
    }
}
