//! Conversion of raw template text into PowerShell string expressions.
//!
//! Literal runs become single-quoted PS strings and interpolation forms
//! become parenthesized host expressions; the pieces are joined with `+`.
//! The pass preserves the author's text byte-for-byte outside the escape
//! and interpolation forms.

use crate::generator::Flags;
use pspug_lexer::balanced_span;

/// One piece of a PowerShell string expression. Adjacent literals merge
/// when rendered, so emitted code stays readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Lit(String),
    Expr(String),
}

/// Quote `s` as a PowerShell single-quoted string literal.
pub fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render parts into one PS expression. Adjacent literals are merged; when
/// the first piece is a host expression an empty-string prefix forces
/// string concatenation semantics.
pub fn render_parts(parts: &[Part]) -> String {
    let mut merged: Vec<Part> = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            Part::Lit(s) => {
                if let Some(Part::Lit(acc)) = merged.last_mut() {
                    acc.push_str(s);
                    continue;
                }
                merged.push(part.clone());
            }
            expr => merged.push(expr.clone()),
        }
    }
    if merged.is_empty() {
        return "''".to_string();
    }
    let mut rendered = Vec::with_capacity(merged.len() + 1);
    if matches!(merged[0], Part::Expr(_)) {
        rendered.push("''".to_string());
    }
    for part in &merged {
        match part {
            Part::Lit(s) => rendered.push(ps_quote(s)),
            Part::Expr(e) => rendered.push(e.clone()),
        }
    }
    rendered.join(" + ")
}

/// The result of interpolating a text region: expression parts plus
/// whether any host expression is embedded (and may raise at render time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextExpr {
    pub parts: Vec<Part>,
    pub dynamic: bool,
}

impl TextExpr {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn render(&self) -> String {
        render_parts(&self.parts)
    }
}

/// Interpolate a content region. Handles the escape pairs and the three
/// interpolation forms:
///
/// - `#{expr}` / `#(expr)` — HTML-escaped evaluation,
/// - `${expr}` — raw evaluation,
/// - `#[tag …]` — inline-tag interpolation.
///
/// An opener that never closes is emitted literally.
pub fn text_expr(text: &str, flags: &Flags) -> TextExpr {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut lit = String::new();
    let mut dynamic = false;
    let mut i = 0;

    let flush = |lit: &mut String, parts: &mut Vec<Part>| {
        if !lit.is_empty() {
            parts.push(Part::Lit(std::mem::take(lit)));
        }
    };

    while i < bytes.len() {
        let c = text[i..].chars().next().unwrap();
        let next = text[i + c.len_utf8()..].chars().next();

        if (c == '\\' || c == '`') && matches!(next, Some('$') | Some('`') | Some('\\')) {
            let escaped = next.unwrap();
            lit.push(escaped);
            i += c.len_utf8() + escaped.len_utf8();
            continue;
        }

        if c == '#' && matches!(next, Some('{') | Some('(')) {
            let (open, close) = if next == Some('{') { ('{', '}') } else { ('(', ')') };
            if let Some((start, end)) = balanced_span(text, i + 1, open, close) {
                flush(&mut lit, &mut parts);
                parts.push(Part::Expr(format!("(out_enc ({}))", text[start..end].trim())));
                dynamic = true;
                i = end + 1;
                continue;
            }
        }

        if c == '#' && next == Some('[') {
            if let Some((start, end)) = balanced_span(text, i + 1, '[', ']') {
                if let Some(inline) = crate::generator::inline_tag(&text[start..end], flags) {
                    flush(&mut lit, &mut parts);
                    dynamic |= inline.dynamic;
                    parts.extend(inline.parts);
                    i = end + 1;
                    continue;
                }
            }
        }

        if c == '$' && next == Some('{') {
            if let Some((start, end)) = balanced_span(text, i + 1, '{', '}') {
                flush(&mut lit, &mut parts);
                parts.push(Part::Expr(format!("({})", text[start..end].trim())));
                dynamic = true;
                i = end + 1;
                continue;
            }
        }

        lit.push(c);
        i += c.len_utf8();
    }
    flush(&mut lit, &mut parts);
    TextExpr { parts, dynamic }
}
