/// A physical template line annotated with its origin.
///
/// The resolver rewrites line sequences (inheritance, includes) but always
/// preserves the `path`/`line` a line came from, so compile diagnostics and
/// runtime traces point at the author's source, not the rewritten stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub path: String,
    pub line: u32,
}

impl SourceLine {
    pub fn new(text: impl Into<String>, path: impl Into<String>, line: u32) -> Self {
        Self {
            text: text.into(),
            path: path.into(),
            line,
        }
    }

    /// Leading-whitespace column count of this line.
    pub fn indent(&self) -> usize {
        indent_of(&self.text)
    }

    /// True when the line is empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The line with leading and trailing whitespace removed.
    pub fn content(&self) -> &str {
        self.text.trim()
    }
}

/// Count of leading whitespace characters. Spaces and tabs both measure one
/// column; templates are expected not to mix them within one file.
pub fn indent_of(text: &str) -> usize {
    text.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// The leading-whitespace prefix of `text`.
pub fn leading_whitespace(text: &str) -> &str {
    let end = text
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

/// Strip up to `columns` leading whitespace characters from `text`.
pub fn strip_indent(text: &str, columns: usize) -> &str {
    let mut taken = 0;
    let mut end = 0;
    for (i, c) in text.char_indices() {
        if taken == columns || (c != ' ' && c != '\t') {
            end = i;
            return &text[end..];
        }
        taken += 1;
        end = i + c.len_utf8();
    }
    &text[end..]
}
