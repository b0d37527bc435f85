//! Reading a template into annotated lines, from disk or an in-memory
//! stream.

use crate::CompileError;
use pspug_lexer::SourceLine;
use std::path::Path;

/// Read a template file into annotated lines. A missing file is a
/// [`CompileError::TemplateNotFound`]; other read failures propagate as io
/// errors.
pub fn load_file(path: &Path) -> Result<Vec<SourceLine>, CompileError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CompileError::TemplateNotFound {
                path: path.display().to_string(),
            }
        } else {
            CompileError::Io(e)
        }
    })?;
    Ok(load_str(&text, &path.display().to_string()))
}

/// Split an in-memory stream into annotated lines. Newlines inside the
/// stream become distinct lines; `virtual_path` is used as the origin for
/// diagnostics.
pub fn load_str(text: &str, virtual_path: &str) -> Vec<SourceLine> {
    text.split('\n')
        .enumerate()
        .map(|(i, raw)| {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            SourceLine::new(raw, virtual_path, i as u32 + 1)
        })
        .collect()
}
