//! Human-readable diagnostics with a source excerpt.
//!
//! The same formatter serves compile-time errors and the runtime error
//! adapter of external collaborators: given a template coordinate it
//! renders the surrounding lines with a `>` marker on the offending one.

/// Render `detail` with a ±`context`-line excerpt of `path` around `line`.
///
/// ```text
/// views/page.pug:7
///    6 | ul
/// >  7 |   li= $data.missing.sub
///    8 |   li done
///
/// property 'sub' cannot be found
/// ```
///
/// When the file cannot be read the excerpt degrades to the detail plus a
/// file-not-found note.
pub fn excerpt(path: &str, line: u32, detail: &str, context: u32) -> String {
    let Ok(content) = std::fs::read_to_string(path) else {
        return format!("{detail} (File not found: {path}:{line})");
    };
    let lines: Vec<&str> = content.split('\n').collect();
    let first = line.saturating_sub(context).max(1);
    let last = line
        .saturating_add(context)
        .min(lines.len().max(1) as u32);
    let width = last.to_string().len();

    let mut out = format!("{path}:{line}\n");
    for n in first..=last {
        let marker = if n == line { "> " } else { "  " };
        let text = lines
            .get(n as usize - 1)
            .map(|t| t.strip_suffix('\r').unwrap_or(t))
            .unwrap_or("");
        out.push_str(&format!("{marker}{n:>width$} | {text}\n"));
    }
    out.push('\n');
    out.push_str(detail);
    out
}
