//! Low-level text scanning helpers shared by the resolver and the code
//! generator: balanced-delimiter extraction, attribute-pair splitting, and
//! filter-chain parsing.
//!
//! All helpers treat quoted substrings (`'…'` and `"…"`) as opaque and are
//! `Option`-returning; callers attach source coordinates when they turn an
//! absent result into a diagnostic.

/// An attribute pair from a `(...)` attribute list.
///
/// `value: None` is a boolean attribute. `escape` is false only for the
/// `name!=expr` form, whose value is emitted without HTML escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: Option<String>,
    pub escape: bool,
}

/// One link of a `:name(args)` filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCall {
    pub name: String,
    pub positional: Vec<String>,
    pub named: Vec<(String, String)>,
}

/// Given `s[start] == open`, return the byte range `(content_start,
/// close_index)` of the balanced span, honoring nesting depth and skipping
/// quoted substrings. `None` when the span never closes.
pub fn balanced_span(s: &str, start: usize, open: char, close: char) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    debug_assert_eq!(s[start..].chars().next(), Some(open));
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if let Some(q) = quote {
            if c == '\\' || c == '`' {
                i += 2;
                continue;
            }
            if bytes[i] == q {
                quote = None;
            }
        } else if c == '\'' || c == '"' {
            quote = Some(bytes[i]);
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some((start + open.len_utf8(), i));
            }
        }
        i += 1;
    }
    None
}

/// True when `s` opens more `(` than it closes, outside quotes. Used to
/// decide whether a tag-like line continues onto the next physical line.
pub fn unbalanced_paren(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if let Some(q) = quote {
            if c == '\\' || c == '`' {
                i += 2;
                continue;
            }
            if bytes[i] == q {
                quote = None;
            }
        } else if c == '\'' || c == '"' {
            quote = Some(bytes[i]);
        } else if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
        }
        i += 1;
    }
    depth > 0
}

/// Split `s` on commas at nesting depth zero, trimming each piece. Used for
/// mixin parameter lists and call arguments, whose pieces are host
/// expressions that may themselves contain commas inside `(…)`/`@{…}`.
pub fn split_top_commas(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            buf.push(c);
            if c == '\\' || c == '`' {
                if let Some(n) = chars.next() {
                    buf.push(n);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                buf.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                buf.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                buf.push(c);
            }
            ',' if depth == 0 => {
                let piece = buf.trim();
                if !piece.is_empty() {
                    out.push(piece.to_string());
                }
                buf.clear();
            }
            _ => buf.push(c),
        }
    }
    let piece = buf.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
    out
}

/// Split the inside of a `(...)` attribute list into raw pairs.
///
/// Commas at depth zero always separate. Spaces at depth zero separate only
/// when the text so far is a complete pair: not when it ends with `=` (the
/// value is still coming) and not when the next non-space character is `=`
/// (the name was just finished).
pub fn split_attr_pairs(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;

    let flush = |buf: &mut String, out: &mut Vec<String>| {
        let piece = buf.trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        buf.clear();
    };

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            buf.push(c);
            if c == '\\' || c == '`' {
                if i + 1 < chars.len() {
                    buf.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                buf.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                buf.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                buf.push(c);
            }
            ',' if depth == 0 => flush(&mut buf, &mut out),
            ' ' if depth == 0 => {
                let so_far = buf.trim_end();
                let mut j = i;
                while j < chars.len() && chars[j] == ' ' {
                    j += 1;
                }
                let next_is_eq = chars.get(j) == Some(&'=')
                    || (chars.get(j) == Some(&'!') && chars.get(j + 1) == Some(&'='));
                if so_far.is_empty() || so_far.ends_with('=') || next_is_eq {
                    buf.push(c);
                } else {
                    flush(&mut buf, &mut out);
                }
            }
            _ => buf.push(c),
        }
        i += 1;
    }
    flush(&mut buf, &mut out);
    out
}

/// Parse one raw pair into an [`Attr`].
pub fn parse_attr(pair: &str) -> Attr {
    let pair = pair.trim();
    let bytes = pair.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if let Some(q) = quote {
            if c == '\\' || c == '`' {
                i += 2;
                continue;
            }
            if bytes[i] == q {
                quote = None;
            }
        } else if c == '\'' || c == '"' {
            quote = Some(bytes[i]);
        } else if c == '=' {
            let (name_end, escape) = if i > 0 && bytes[i - 1] == b'!' {
                (i - 1, false)
            } else {
                (i, true)
            };
            return Attr {
                name: pair[..name_end].trim().to_string(),
                value: Some(pair[i + 1..].trim().to_string()),
                escape,
            };
        }
        i += 1;
    }
    Attr {
        name: pair.to_string(),
        value: None,
        escape: true,
    }
}

/// Parse a `:fn1(args):fn2(args)…` chain starting at a `:`. Returns the
/// ordered calls and the byte length consumed, or `None` when `s` does not
/// start a chain. `key=val` arguments become named parameters; lone tokens
/// are positional.
pub fn parse_filter_chain(s: &str) -> Option<(Vec<FilterCall>, usize)> {
    let mut calls = Vec::new();
    let mut i = 0;
    let bytes = s.as_bytes();
    while i < bytes.len() && bytes[i] == b':' {
        i += 1;
        let name_start = i;
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'-')
        {
            i += 1;
        }
        if i == name_start {
            return None;
        }
        let name = s[name_start..i].to_string();
        let mut positional = Vec::new();
        let mut named = Vec::new();
        if i < bytes.len() && bytes[i] == b'(' {
            let (content_start, close) = balanced_span(s, i, '(', ')')?;
            for pair in split_attr_pairs(&s[content_start..close]) {
                let attr = parse_attr(&pair);
                match attr.value {
                    Some(value) => named.push((attr.name, value)),
                    None => positional.push(attr.name),
                }
            }
            i = close + 1;
        }
        calls.push(FilterCall {
            name,
            positional,
            named,
        });
    }
    if calls.is_empty() {
        None
    } else {
        Some((calls, i))
    }
}
