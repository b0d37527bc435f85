//! The single-line tag grammar: `name#id.class(attrs)&attributes(x)/= text`,
//! plus mixin definition/call heads and the fixed tag sets.

use crate::scan::{balanced_span, parse_attr, split_attr_pairs, split_top_commas, Attr};

/// HTML void elements: no closing tag, no children.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Tags whose content is whitespace-sensitive; any ancestor in this set
/// suppresses output indentation.
pub const LITERAL_TAGS: &[&str] = &["pre", "code", "textarea", "xmp"];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub fn is_literal_tag(tag: &str) -> bool {
    LITERAL_TAGS.contains(&tag)
}

/// Lower a CamelCase name to kebab-case: `MyWidget` → `my-widget`.
/// Names without uppercase letters pass through unchanged.
pub fn to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The buffered-content operator on a tag line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOp {
    /// `tag= expr` — evaluate and HTML-escape.
    Escaped,
    /// `tag!= expr` — evaluate raw.
    Raw,
}

/// A parsed tag line. `tag` defaults to `div` when the head was only an
/// `#id` or `.class` shorthand.
#[derive(Debug, Clone, PartialEq)]
pub struct TagLine {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<Attr>,
    /// The expression inside a trailing `&attributes(…)` merge clause.
    pub merge_attrs: Option<String>,
    pub self_close: bool,
    /// Trailing `.`: the children are a raw text block.
    pub dot_block: bool,
    pub op: Option<BufferOp>,
    /// `tag: rest` block expansion — the remainder after the colon.
    pub expansion: Option<String>,
    /// Inline content: the buffered expression when `op` is set, otherwise
    /// literal text.
    pub inline: Option<String>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn read_name(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && is_name_char(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

/// Parse a trimmed line against the tag grammar. `None` means the line is
/// not a tag line; the caller reports the parse error with coordinates.
pub fn parse_tag_line(content: &str) -> Option<TagLine> {
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;

    let mut tag = String::new();
    if i < chars.len() && chars[i].is_ascii_alphabetic() {
        let (name, next) = read_name(&chars, i);
        tag = name;
        i = next;
    }

    let mut id = None;
    let mut classes = Vec::new();
    loop {
        match chars.get(i) {
            Some('#') => {
                let (name, next) = read_name(&chars, i + 1);
                if name.is_empty() {
                    return None;
                }
                id = Some(name);
                i = next;
            }
            Some('.') if chars.get(i + 1).is_some_and(|c| is_name_char(*c)) => {
                let (name, next) = read_name(&chars, i + 1);
                classes.push(name);
                i = next;
            }
            _ => break,
        }
    }
    if tag.is_empty() && id.is_none() && classes.is_empty() {
        return None;
    }
    if tag.is_empty() {
        tag = "div".to_string();
    }

    let mut attrs = Vec::new();
    if chars.get(i) == Some(&'(') {
        let byte_at = |ci: usize| -> usize { chars[..ci].iter().map(|c| c.len_utf8()).sum() };
        let (content_start, close) = balanced_span(content, byte_at(i), '(', ')')?;
        for pair in split_attr_pairs(&content[content_start..close]) {
            attrs.push(parse_attr(&pair));
        }
        // move past the ')' in char coordinates
        let mut consumed = 0;
        let mut ci = 0;
        for c in &chars {
            if consumed > close {
                break;
            }
            consumed += c.len_utf8();
            ci += 1;
        }
        i = ci;
    }

    let mut merge_attrs = None;
    let rest: String = chars[i..].iter().collect();
    if let Some(stripped) = rest.strip_prefix("&attributes") {
        if stripped.starts_with('(') {
            let offset = rest.len() - stripped.len();
            let (content_start, close) = balanced_span(&rest, offset, '(', ')')?;
            merge_attrs = Some(rest[content_start..close].trim().to_string());
            let consumed_bytes = close + 1;
            let mut consumed = 0;
            let mut skipped = 0;
            for c in chars[i..].iter() {
                if consumed >= consumed_bytes {
                    break;
                }
                consumed += c.len_utf8();
                skipped += 1;
            }
            i += skipped;
        }
    }

    let mut self_close = false;
    if chars.get(i) == Some(&'/') {
        self_close = true;
        i += 1;
    }

    let mut dot_block = false;
    let mut op = None;
    let mut expansion = None;
    let mut inline = None;

    match chars.get(i) {
        None => {}
        Some('.') if chars[i + 1..].iter().all(|c| c.is_whitespace()) => {
            dot_block = true;
        }
        Some('=') => {
            op = Some(BufferOp::Escaped);
            let rest: String = chars[i + 1..].iter().collect();
            inline = Some(rest.trim().to_string());
        }
        Some('!') if chars.get(i + 1) == Some(&'=') => {
            op = Some(BufferOp::Raw);
            let rest: String = chars[i + 2..].iter().collect();
            inline = Some(rest.trim().to_string());
        }
        Some(':') => {
            let rest: String = chars[i + 1..].iter().collect();
            let rest = rest.trim();
            if rest.is_empty() {
                return None;
            }
            expansion = Some(rest.to_string());
        }
        Some(' ') => {
            let rest: String = chars[i + 1..].iter().collect();
            if !rest.trim().is_empty() {
                inline = Some(rest);
            }
        }
        _ => return None,
    }

    Some(TagLine {
        tag,
        id,
        classes,
        attrs,
        merge_attrs,
        self_close,
        dot_block,
        op,
        expansion,
        inline,
    })
}

/// A `mixin name(params)` definition head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinDef {
    pub name: String,
    pub params: Vec<MixinParam>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinParam {
    pub name: String,
    pub default: Option<String>,
}

/// Parse a `mixin name(a, b=1)` line (already known to start with `mixin`).
pub fn parse_mixin_def(content: &str) -> Option<MixinDef> {
    let rest = content.strip_prefix("mixin")?.trim_start();
    let chars: Vec<char> = rest.chars().collect();
    let (name, i) = read_name(&chars, 0);
    if name.is_empty() {
        return None;
    }
    let mut params = Vec::new();
    let tail: String = chars[i..].iter().collect();
    let tail = tail.trim();
    if !tail.is_empty() {
        if !tail.starts_with('(') {
            return None;
        }
        let (content_start, close) = balanced_span(tail, 0, '(', ')')?;
        if !tail[close + 1..].trim().is_empty() {
            return None;
        }
        for piece in split_top_commas(&tail[content_start..close]) {
            match piece.split_once('=') {
                Some((name, default)) => params.push(MixinParam {
                    name: name.trim().to_string(),
                    default: Some(default.trim().to_string()),
                }),
                None => params.push(MixinParam {
                    name: piece,
                    default: None,
                }),
            }
        }
    }
    Some(MixinDef { name, params })
}

/// A `+name(args)` mixin call head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinCall {
    pub name: String,
    pub args: Vec<String>,
}

/// Parse a `+name(args)` line (already known to start with `+`).
pub fn parse_mixin_call(content: &str) -> Option<MixinCall> {
    let rest = content.strip_prefix('+')?;
    let chars: Vec<char> = rest.chars().collect();
    let (name, i) = read_name(&chars, 0);
    if name.is_empty() {
        return None;
    }
    let tail: String = chars[i..].iter().collect();
    let tail = tail.trim();
    let mut args = Vec::new();
    if !tail.is_empty() {
        if !tail.starts_with('(') {
            return None;
        }
        let (content_start, close) = balanced_span(tail, 0, '(', ')')?;
        if !tail[close + 1..].trim().is_empty() {
            return None;
        }
        args = split_top_commas(&tail[content_start..close]);
    }
    Some(MixinCall { name, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Tag sets and kebab conversion
    // =========================================================================

    #[test]
    fn test_void_tags() {
        assert!(is_void_tag("img"));
        assert!(is_void_tag("br"));
        assert!(!is_void_tag("div"));
    }

    #[test]
    fn test_literal_tags() {
        assert!(is_literal_tag("pre"));
        assert!(is_literal_tag("textarea"));
        assert!(!is_literal_tag("span"));
    }

    #[test]
    fn test_to_kebab() {
        assert_eq!(to_kebab("MyWidget"), "my-widget");
        assert_eq!(to_kebab("backgroundColor"), "background-color");
        assert_eq!(to_kebab("div"), "div");
        assert_eq!(to_kebab("A"), "a");
    }

    // =========================================================================
    // Tag grammar
    // =========================================================================

    #[test]
    fn test_bare_tag() {
        let t = parse_tag_line("div").unwrap();
        assert_eq!(t.tag, "div");
        assert!(t.classes.is_empty());
        assert_eq!(t.inline, None);
    }

    #[test]
    fn test_implicit_div() {
        let t = parse_tag_line(".card").unwrap();
        assert_eq!(t.tag, "div");
        assert_eq!(t.classes, vec!["card"]);

        let t = parse_tag_line("#main").unwrap();
        assert_eq!(t.tag, "div");
        assert_eq!(t.id.as_deref(), Some("main"));
    }

    #[test]
    fn test_id_and_classes() {
        let t = parse_tag_line("a#home.nav.active").unwrap();
        assert_eq!(t.tag, "a");
        assert_eq!(t.id.as_deref(), Some("home"));
        assert_eq!(t.classes, vec!["nav", "active"]);
    }

    #[test]
    fn test_attrs() {
        let t = parse_tag_line("input(type='text', name='q' disabled)").unwrap();
        assert_eq!(t.attrs.len(), 3);
        assert_eq!(t.attrs[0].name, "type");
        assert_eq!(t.attrs[2].value, None);
    }

    #[test]
    fn test_inline_content() {
        let t = parse_tag_line("p Hello world").unwrap();
        assert_eq!(t.inline.as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_buffered_ops() {
        let t = parse_tag_line("h2= $title").unwrap();
        assert_eq!(t.op, Some(BufferOp::Escaped));
        assert_eq!(t.inline.as_deref(), Some("$title"));

        let t = parse_tag_line("div!= $html").unwrap();
        assert_eq!(t.op, Some(BufferOp::Raw));
        assert_eq!(t.inline.as_deref(), Some("$html"));
    }

    #[test]
    fn test_self_close() {
        let t = parse_tag_line("foo/").unwrap();
        assert!(t.self_close);
    }

    #[test]
    fn test_dot_block() {
        let t = parse_tag_line("script.").unwrap();
        assert!(t.dot_block);
        assert_eq!(t.tag, "script");
        // a dot followed by a class name is not a dot block
        let t = parse_tag_line("script.inline").unwrap();
        assert!(!t.dot_block);
        assert_eq!(t.classes, vec!["inline"]);
    }

    #[test]
    fn test_block_expansion() {
        let t = parse_tag_line("li: a(href='/') Home").unwrap();
        assert_eq!(t.tag, "li");
        assert_eq!(t.expansion.as_deref(), Some("a(href='/') Home"));
    }

    #[test]
    fn test_merge_attrs() {
        let t = parse_tag_line("div(id='x')&attributes($extra)").unwrap();
        assert_eq!(t.merge_attrs.as_deref(), Some("$extra"));
        assert_eq!(t.attrs.len(), 1);
    }

    #[test]
    fn test_attrs_then_inline() {
        let t = parse_tag_line("a(href='/about') About us").unwrap();
        assert_eq!(t.attrs.len(), 1);
        assert_eq!(t.inline.as_deref(), Some("About us"));
    }

    #[test]
    fn test_not_a_tag() {
        assert_eq!(parse_tag_line("= $x"), None);
        assert_eq!(parse_tag_line("."), None);
        assert_eq!(parse_tag_line("p@click"), None);
        assert_eq!(parse_tag_line("#"), None);
    }

    // =========================================================================
    // Mixin heads
    // =========================================================================

    #[test]
    fn test_mixin_def_no_params() {
        let m = parse_mixin_def("mixin sep").unwrap();
        assert_eq!(m.name, "sep");
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_mixin_def_params() {
        let m = parse_mixin_def("mixin card(title, kind='info')").unwrap();
        assert_eq!(m.name, "card");
        assert_eq!(m.params.len(), 2);
        assert_eq!(m.params[0].name, "title");
        assert_eq!(m.params[0].default, None);
        assert_eq!(m.params[1].name, "kind");
        assert_eq!(m.params[1].default.as_deref(), Some("'info'"));
    }

    #[test]
    fn test_mixin_call() {
        let c = parse_mixin_call("+card('X', $data.kind)").unwrap();
        assert_eq!(c.name, "card");
        assert_eq!(c.args, vec!["'X'", "$data.kind"]);
    }

    #[test]
    fn test_mixin_call_no_args() {
        let c = parse_mixin_call("+sep").unwrap();
        assert_eq!(c.name, "sep");
        assert!(c.args.is_empty());
    }

    #[test]
    fn test_mixin_call_invalid() {
        assert_eq!(parse_mixin_call("+card('X') trailing"), None);
        assert_eq!(parse_mixin_call("+"), None);
    }
}
