//! The code generator: a single pass over resolved annotated lines driven
//! by an explicit scope stack, emitting the PowerShell body of the
//! artifact.
//!
//! Every open construct (element, control-flow block, mixin definition or
//! call body) is a frame on the stack keyed by its source indent; frame
//! indents strictly increase bottom to top. A line at an indent less than
//! or equal to the top frame pops and closes frames until the invariant
//! holds again, and every pop emits its closing fragment — `</tag>` for
//! elements, `}` for braces — no matter what caused it.

use crate::doctype;
use crate::escape::{ps_quote, text_expr, Part, TextExpr};
use pspug_lexer::{
    is_literal_tag, is_void_tag, parse_filter_chain, parse_mixin_call, parse_mixin_def,
    parse_tag_line, strip_indent, to_kebab, unbalanced_paren, Attr, BufferOp, SourceLine, TagLine,
};
use pspug_parser::{CompileError, Options};

/// Host control-flow keywords that open a block when they lead a `- expr`
/// line.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "elseif", "else", "foreach", "for", "while", "switch", "try", "catch", "finally",
    "default",
];

/// Rendering flags live on the generator because a doctype can re-set them
/// mid-document (XML mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Flags {
    pub properties: bool,
    pub void_self_close: bool,
    pub container_self_close: bool,
    pub kebab_case: bool,
    pub xml: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            properties: true,
            void_self_close: false,
            container_self_close: false,
            kebab_case: true,
            xml: false,
        }
    }
}

impl Flags {
    fn from_options(options: &Options) -> Self {
        Self {
            properties: options.properties,
            void_self_close: options.void_self_close,
            container_self_close: options.container_self_close,
            kebab_case: options.kebab_case,
            xml: false,
        }
    }
}

#[derive(Debug)]
enum Frame {
    Element {
        indent: usize,
        tag: String,
        literal: bool,
    },
    Code {
        indent: usize,
        is_switch: bool,
        explicit: bool,
    },
    MixinDef {
        indent: usize,
    },
    MixinCall {
        indent: usize,
    },
}

impl Frame {
    fn indent(&self) -> usize {
        match self {
            Frame::Element { indent, .. }
            | Frame::Code { indent, .. }
            | Frame::MixinDef { indent }
            | Frame::MixinCall { indent } => *indent,
        }
    }
}

/// Generate the artifact body (the statements inside the `try` block) for a
/// resolved line sequence. The initial `properties` runtime flag is part of
/// the preamble; this only emits re-assignments when a doctype flips it.
pub fn generate(lines: &[SourceLine], options: &Options) -> Result<Vec<String>, CompileError> {
    Generator::new(lines, options).run()
}

struct Generator<'a> {
    lines: &'a [SourceLine],
    pos: usize,
    /// A synthetic line produced by block expansion (`tag: rest`), consumed
    /// before the raw stream.
    injected: Option<SourceLine>,
    stack: Vec<Frame>,
    out: Vec<String>,
    flags: Flags,
    ctx: u32,
    last_path: String,
}

impl<'a> Generator<'a> {
    fn new(lines: &'a [SourceLine], options: &Options) -> Self {
        Self {
            lines,
            pos: 0,
            injected: None,
            stack: Vec::new(),
            out: Vec::new(),
            flags: Flags::from_options(options),
            ctx: options.error_context,
            last_path: String::new(),
        }
    }

    fn run(mut self) -> Result<Vec<String>, CompileError> {
        while let Some(line) = self.next_logical_line()? {
            if line.is_blank() {
                continue;
            }
            let indent = line.indent();
            self.pop_to(indent);
            self.dispatch(&line, indent)?;
        }
        self.pop_to(0);
        Ok(self.out)
    }

    // =========================================================================
    // Line supply
    // =========================================================================

    /// The next logical line: the pending synthetic line if any, else the
    /// next physical line, joined with its continuations while a tag-like
    /// head carries an unterminated `(`.
    fn next_logical_line(&mut self) -> Result<Option<SourceLine>, CompileError> {
        if let Some(line) = self.injected.take() {
            return Ok(Some(line));
        }
        let Some(first) = self.lines.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        if first.is_blank() {
            return Ok(Some(first.clone()));
        }
        let head = first.content().chars().next().unwrap_or(' ');
        let joinable = head.is_ascii_alphanumeric()
            || head == '#'
            || head == '.'
            || head == '+'
            || first.content().starts_with("mixin ");
        if !(joinable && unbalanced_paren(&first.text)) {
            return Ok(Some(first.clone()));
        }
        let mut text = first.text.trim_end().to_string();
        loop {
            let Some(cont) = self.lines.get(self.pos) else {
                return Err(CompileError::unterminated(
                    first,
                    "Unterminated attribute list",
                    self.ctx,
                ));
            };
            self.pos += 1;
            text.push(' ');
            text.push_str(cont.content());
            if !unbalanced_paren(&text) {
                break;
            }
        }
        Ok(Some(SourceLine::new(text, first.path.clone(), first.line)))
    }

    /// True when a deeper-indented line follows in the raw stream.
    fn peek_raw_deeper(&self, indent: usize) -> bool {
        let mut j = self.pos;
        while j < self.lines.len() && self.lines[j].is_blank() {
            j += 1;
        }
        j < self.lines.len() && self.lines[j].indent() > indent
    }

    /// Consume the raw block nested under `indent` (blank lines included,
    /// trailing blanks dropped).
    fn collect_block(&mut self, indent: usize) -> Vec<SourceLine> {
        let mut block = Vec::new();
        while let Some(l) = self.lines.get(self.pos) {
            if l.is_blank() || l.indent() > indent {
                block.push(l.clone());
                self.pos += 1;
            } else {
                break;
            }
        }
        while block.last().is_some_and(|l| l.is_blank()) {
            block.pop();
        }
        block
    }

    // =========================================================================
    // Scope stack
    // =========================================================================

    fn pop_to(&mut self, indent: usize) {
        while self
            .stack
            .last()
            .is_some_and(|frame| frame.indent() >= indent)
        {
            let frame = self.stack.pop().unwrap();
            self.close_frame(frame);
        }
    }

    fn close_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Element { tag, literal, .. } => {
                if literal {
                    // indentation ahead of the closer would become part of
                    // the whitespace-sensitive content
                    self.out.push(format!("$o.Add('</{tag}>')"));
                } else {
                    self.add_output_line(vec![Part::Lit(format!("</{tag}>"))]);
                }
            }
            Frame::Code { explicit: true, .. } => {}
            Frame::Code { .. } | Frame::MixinDef { .. } | Frame::MixinCall { .. } => {
                self.out.push("}".to_string());
            }
        }
    }

    /// The render-time indentation prefix at the current stack state: one
    /// tab per open element frame, empty inside a literal-tag ancestor, and
    /// `$pug_indent`-relative inside a mixin body.
    fn prefix_parts(&self) -> Vec<Part> {
        if self.stack.iter().any(|f| {
            matches!(
                f,
                Frame::Element { literal: true, .. }
            )
        }) {
            return Vec::new();
        }
        let mut elements_above = 0;
        for frame in self.stack.iter().rev() {
            match frame {
                Frame::Element { .. } => elements_above += 1,
                Frame::MixinDef { .. } | Frame::MixinCall { .. } => {
                    let mut parts = vec![Part::Expr("$pug_indent".to_string())];
                    if elements_above > 0 {
                        parts.push(Part::Lit("\t".repeat(elements_above)));
                    }
                    return parts;
                }
                Frame::Code { .. } => {}
            }
        }
        if elements_above > 0 {
            vec![Part::Lit("\t".repeat(elements_above))]
        } else {
            Vec::new()
        }
    }

    /// The current prefix as a standalone PS expression, for mixin call
    /// sites.
    fn indent_arg_expr(&self) -> String {
        let parts = self.prefix_parts();
        match parts.as_slice() {
            [] => "''".to_string(),
            [Part::Lit(tabs)] => ps_quote(tabs),
            [Part::Expr(e)] => e.clone(),
            [Part::Expr(e), Part::Lit(tabs)] => format!("({e} + {})", ps_quote(tabs)),
            _ => unreachable!("prefix is at most one expression and one literal"),
        }
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    /// Emit one rendered output line: `$o.Add(<prefix + parts>)`. Adjacent
    /// literals merge; a leading host expression other than `$pug_indent`
    /// gets an empty-string prefix to force string concatenation.
    fn add_output_line(&mut self, parts: Vec<Part>) {
        let mut all = self.prefix_parts();
        all.extend(parts);
        let mut merged: Vec<Part> = Vec::with_capacity(all.len());
        for part in all {
            match part {
                Part::Lit(s) => {
                    if let Some(Part::Lit(acc)) = merged.last_mut() {
                        acc.push_str(&s);
                        continue;
                    }
                    merged.push(Part::Lit(s));
                }
                expr => merged.push(expr),
            }
        }
        let mut rendered: Vec<String> = Vec::with_capacity(merged.len() + 1);
        match merged.first() {
            None => rendered.push("''".to_string()),
            // a leading host expression needs a string left operand for the
            // concatenation; a lone expression is coerced by Add itself
            Some(Part::Expr(e)) if merged.len() > 1 && e != "$pug_indent" => {
                rendered.push("''".to_string())
            }
            _ => {}
        }
        for part in &merged {
            match part {
                Part::Lit(s) => rendered.push(ps_quote(s)),
                Part::Expr(e) => rendered.push(e.clone()),
            }
        }
        self.out.push(format!("$o.Add({})", rendered.join(" + ")));
    }

    /// Update the runtime trace coordinates ahead of a fragment whose
    /// evaluation may raise.
    fn trace(&mut self, line: &SourceLine) {
        if self.last_path != line.path {
            self.last_path = line.path.clone();
            self.out.push(format!(
                "$script:src_line = {}; $script:src_path = {}",
                line.line,
                ps_quote(&line.path)
            ));
        } else {
            self.out.push(format!("$script:src_line = {}", line.line));
        }
    }

    fn parse_err(&self, line: &SourceLine, detail: &str) -> CompileError {
        CompileError::parse_at(line, detail, self.ctx)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn dispatch(&mut self, line: &SourceLine, indent: usize) -> Result<(), CompileError> {
        let content = line.text.trim_start().to_string();
        let trimmed = content.trim_end();

        if trimmed.starts_with("//-") {
            self.collect_block(indent);
            return Ok(());
        }
        if let Some(rest) = trimmed.strip_prefix("//") {
            self.emit_comment(rest, indent);
            return Ok(());
        }
        if trimmed == "-" {
            self.emit_raw_block(indent);
            return Ok(());
        }
        if let Some(expr) = trimmed.strip_prefix("- ") {
            return self.emit_code(line, expr.trim(), indent);
        }
        if trimmed.starts_with(':') {
            return self.emit_filter(line, trimmed, indent);
        }
        if let Some(kind) = trimmed.strip_prefix("doctype") {
            if kind.is_empty() || kind.starts_with(char::is_whitespace) {
                self.emit_doctype(kind.trim());
                return Ok(());
            }
        }
        if trimmed.starts_with('<') {
            let te = text_expr(trimmed, &self.flags);
            if te.dynamic {
                self.trace(line);
            }
            self.add_output_line(te.parts);
            return Ok(());
        }
        if trimmed == "block" || trimmed.starts_with("block ") {
            self.emit_block_slot();
            return Ok(());
        }
        if trimmed.starts_with("mixin ") {
            return self.emit_mixin_def(line, trimmed, indent);
        }
        if trimmed.starts_with('+') {
            return self.emit_mixin_call(line, trimmed, indent);
        }
        if let Some(expr) = trimmed.strip_prefix("!=") {
            self.trace(line);
            let part = Part::Expr(format!("({})", expr.trim()));
            self.add_output_line(vec![part]);
            return Ok(());
        }
        if let Some(expr) = trimmed.strip_prefix('=') {
            self.trace(line);
            let part = Part::Expr(format!("(out_enc ({}))", expr.trim()));
            self.add_output_line(vec![part]);
            return Ok(());
        }
        if let Some(rest) = content.strip_prefix('|') {
            let text = rest.strip_prefix(' ').unwrap_or(rest);
            let te = text_expr(text, &self.flags);
            if te.dynamic {
                self.trace(line);
            }
            self.add_output_line(te.parts);
            return Ok(());
        }
        if trimmed == "." {
            self.emit_text_block(indent);
            return Ok(());
        }
        match parse_tag_line(&content) {
            Some(tag) => self.emit_tag(line, tag, indent),
            None => Err(self.parse_err(line, &format!("Unrecognized line: {trimmed}"))),
        }
    }

    // =========================================================================
    // Comments, raw code, text blocks
    // =========================================================================

    fn emit_comment(&mut self, rest: &str, indent: usize) {
        let body = self.collect_block(indent);
        let in_switch = matches!(self.stack.last(), Some(Frame::Code { is_switch: true, .. }));
        if in_switch {
            // inside a switch body an HTML comment would be a stray
            // expression between arms; emit host comments instead
            self.out.push(format!("# {}", rest.trim()));
            for l in &body {
                self.out.push(format!("# {}", l.content()));
            }
            return;
        }
        if body.is_empty() {
            self.add_output_line(vec![Part::Lit(format!("<!--{rest} -->"))]);
            return;
        }
        self.add_output_line(vec![Part::Lit(format!("<!--{rest}"))]);
        let min = min_indent(&body);
        for l in &body {
            let text = if l.is_blank() {
                ""
            } else {
                strip_indent(&l.text, min)
            };
            self.add_output_line(vec![Part::Lit(text.to_string())]);
        }
        self.add_output_line(vec![Part::Lit("-->".to_string())]);
    }

    fn emit_raw_block(&mut self, indent: usize) {
        let body = self.collect_block(indent);
        let Some(first) = body.iter().find(|l| !l.is_blank()) else {
            return;
        };
        let first = first.clone();
        self.trace(&first);
        let min = min_indent(&body);
        for l in &body {
            if l.is_blank() {
                self.out.push(String::new());
            } else {
                self.out.push(strip_indent(&l.text, min).to_string());
            }
        }
    }

    /// A raw text block (`.` alone, or the children of `tag.`): each line
    /// interpolated and emitted at the current depth, indent-stripped by
    /// the minimum child indent.
    fn emit_text_block(&mut self, indent: usize) {
        let body = self.collect_block(indent);
        let min = min_indent(&body);
        for l in &body {
            let text = if l.is_blank() {
                ""
            } else {
                strip_indent(&l.text, min)
            };
            let te = text_expr(text, &self.flags);
            if te.dynamic {
                self.trace(l);
            }
            self.add_output_line(te.parts);
        }
    }

    // =========================================================================
    // Host code and control flow
    // =========================================================================

    fn emit_code(
        &mut self,
        line: &SourceLine,
        expr: &str,
        indent: usize,
    ) -> Result<(), CompileError> {
        let first = expr
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("");
        let is_control = CONTROL_KEYWORDS.contains(&first);
        // these keywords continue the statement whose brace just closed;
        // nothing may be emitted between `}` and them
        let continuation = matches!(first, "else" | "elseif" | "catch" | "finally");
        let parent_switch =
            matches!(self.stack.last(), Some(Frame::Code { is_switch: true, .. }));

        if expr.ends_with('{') {
            if !continuation {
                self.trace(line);
            }
            self.out.push(expr.to_string());
            self.stack.push(Frame::Code {
                indent,
                is_switch: first == "switch",
                explicit: true,
            });
        } else if is_control {
            if !parent_switch && !continuation {
                self.trace(line);
            }
            self.out.push(format!("{expr} {{"));
            self.stack.push(Frame::Code {
                indent,
                is_switch: first == "switch",
                explicit: false,
            });
        } else if parent_switch {
            // a case arm; the label is passed through verbatim
            if !is_case_literal(expr) {
                log::warn!(
                    "{}:{}: switch arm `{expr}` is neither a quoted string nor a numeric literal",
                    line.path,
                    line.line
                );
            }
            self.out.push(format!("{expr} {{"));
            self.stack.push(Frame::Code {
                indent,
                is_switch: false,
                explicit: false,
            });
        } else {
            self.trace(line);
            self.out.push(expr.to_string());
        }
        Ok(())
    }

    // =========================================================================
    // Filters
    // =========================================================================

    fn emit_filter(
        &mut self,
        line: &SourceLine,
        content: &str,
        indent: usize,
    ) -> Result<(), CompileError> {
        let (chain, consumed) = parse_filter_chain(content)
            .ok_or_else(|| self.parse_err(line, "Invalid filter chain"))?;
        let inline = content[consumed..].trim();
        let block = self.collect_block(indent);

        // block content sits two columns below the header; anything deeper
        // is the author's (or an included file's) own indentation
        let content_lines: Vec<String> = if !inline.is_empty() {
            vec![inline.to_string()]
        } else {
            block
                .iter()
                .map(|l| {
                    if l.is_blank() {
                        String::new()
                    } else {
                        strip_indent(&l.text, indent + 2).to_string()
                    }
                })
                .collect()
        };
        let mut call = if content_lines.is_empty() {
            "''".to_string()
        } else if content_lines.len() == 1 {
            ps_quote(&content_lines[0])
        } else {
            let joined = content_lines
                .iter()
                .map(|l| ps_quote(l))
                .collect::<Vec<_>>()
                .join(" + \"`n\" + ");
            format!("({joined})")
        };
        for filter in &chain {
            let mut s = format!("({} {call}", filter.name);
            for p in &filter.positional {
                s.push_str(&format!(" ({p})"));
            }
            for (k, v) in &filter.named {
                s.push_str(&format!(" -{k} ({v})"));
            }
            s.push(')');
            call = s;
        }
        self.trace(line);
        self.add_output_line(vec![Part::Expr(call)]);
        Ok(())
    }

    // =========================================================================
    // Doctype
    // =========================================================================

    fn emit_doctype(&mut self, kind: &str) {
        let kind = if kind.is_empty() { "html" } else { kind };
        if kind == "xml" {
            self.flags.xml = true;
            self.flags.void_self_close = true;
            self.flags.container_self_close = true;
            self.flags.kebab_case = false;
            if self.flags.properties {
                self.flags.properties = false;
                self.out.push("$pug_props = $false".to_string());
            }
        }
        self.add_output_line(vec![Part::Lit(doctype::doctype_line(kind))]);
    }

    // =========================================================================
    // Mixins
    // =========================================================================

    fn emit_mixin_def(
        &mut self,
        line: &SourceLine,
        content: &str,
        indent: usize,
    ) -> Result<(), CompileError> {
        let def = parse_mixin_def(content)
            .ok_or_else(|| self.parse_err(line, "Invalid mixin definition"))?;
        let ps_name = def.name.replace('-', "_");
        self.out.push(format!("function mixin_{ps_name} {{"));
        let mut params = vec!["$pug_indent".to_string()];
        for p in &def.params {
            let name = if p.name.starts_with('$') {
                p.name.clone()
            } else {
                format!("${}", p.name)
            };
            match &p.default {
                Some(default) => params.push(format!("{name} = {default}")),
                None => params.push(name),
            }
        }
        params.push("$pug_block".to_string());
        self.out.push(format!("param({})", params.join(", ")));
        self.stack.push(Frame::MixinDef { indent });
        Ok(())
    }

    /// A bare `block` line: inside a mixin definition, invoke the caller's
    /// block with the current relative indent. Outside one it is a leftover
    /// inheritance marker and purely structural.
    fn emit_block_slot(&mut self) {
        let mut elements_above = 0;
        let mut inside_def = false;
        for frame in self.stack.iter().rev() {
            match frame {
                Frame::Element { .. } => elements_above += 1,
                Frame::MixinDef { .. } => {
                    inside_def = true;
                    break;
                }
                Frame::MixinCall { .. } => break,
                Frame::Code { .. } => {}
            }
        }
        if !inside_def {
            return;
        }
        let indent_expr = if elements_above > 0 {
            format!("($pug_indent + {})", ps_quote(&"\t".repeat(elements_above)))
        } else {
            "$pug_indent".to_string()
        };
        self.out
            .push(format!("if ($pug_block) {{ & $pug_block {indent_expr} }}"));
    }

    fn emit_mixin_call(
        &mut self,
        line: &SourceLine,
        content: &str,
        indent: usize,
    ) -> Result<(), CompileError> {
        let call = parse_mixin_call(content)
            .ok_or_else(|| self.parse_err(line, "Invalid mixin call"))?;
        let ps_name = call.name.replace('-', "_");
        let mut cmd = format!("mixin_{ps_name} {}", self.indent_arg_expr());
        for arg in &call.args {
            cmd.push_str(&format!(" ({arg})"));
        }
        self.trace(line);
        if self.peek_raw_deeper(indent) {
            cmd.push_str(" -pug_block {");
            self.out.push(cmd);
            self.out.push("param($pug_indent)".to_string());
            self.stack.push(Frame::MixinCall { indent });
        } else {
            self.out.push(cmd);
        }
        Ok(())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    fn emit_tag(
        &mut self,
        line: &SourceLine,
        tag: TagLine,
        indent: usize,
    ) -> Result<(), CompileError> {
        let name = if self.flags.kebab_case && !self.flags.xml {
            to_kebab(&tag.tag)
        } else {
            tag.tag.clone()
        };
        let (attrs, attrs_dynamic) = attr_parts(&tag);
        let mut open = vec![Part::Lit(format!("<{name}"))];
        open.extend(attrs);

        let content = match tag.op {
            Some(BufferOp::Escaped) => Some(TextExpr {
                parts: vec![Part::Expr(format!(
                    "(out_enc ({}))",
                    tag.inline.as_deref().unwrap_or("")
                ))],
                dynamic: true,
            }),
            Some(BufferOp::Raw) => Some(TextExpr {
                parts: vec![Part::Expr(format!(
                    "({})",
                    tag.inline.as_deref().unwrap_or("")
                ))],
                dynamic: true,
            }),
            None => tag.inline.as_ref().map(|s| text_expr(s, &self.flags)),
        };
        let content_empty = content.as_ref().map(|te| te.is_empty()).unwrap_or(true);
        let dynamic = attrs_dynamic || content.as_ref().map(|te| te.dynamic).unwrap_or(false);
        if dynamic {
            self.trace(line);
        }

        let literal = is_literal_tag(&name);

        if tag.dot_block {
            open.push(Part::Lit(">".to_string()));
            self.add_output_line(open);
            self.stack.push(Frame::Element {
                indent,
                tag: name,
                literal,
            });
            self.emit_text_block(indent);
            let frame = self.stack.pop().unwrap();
            self.close_frame(frame);
            return Ok(());
        }

        if let Some(rest) = &tag.expansion {
            open.push(Part::Lit(">".to_string()));
            self.add_output_line(open);
            self.stack.push(Frame::Element {
                indent,
                tag: name,
                literal,
            });
            self.injected = Some(SourceLine::new(
                format!("{}{}", " ".repeat(indent + 2), rest),
                line.path.clone(),
                line.line,
            ));
            return Ok(());
        }

        let void = is_void_tag(&name);
        if self.peek_raw_deeper(indent) && !void && !tag.self_close {
            open.push(Part::Lit(">".to_string()));
            if let Some(te) = content {
                open.extend(te.parts);
            }
            self.add_output_line(open);
            self.stack.push(Frame::Element {
                indent,
                tag: name,
                literal,
            });
            return Ok(());
        }

        if !content_empty {
            open.push(Part::Lit(">".to_string()));
            open.extend(content.unwrap().parts);
            open.push(Part::Lit(format!("</{name}>")));
            self.add_output_line(open);
            return Ok(());
        }

        // no children, no content: the self-closing rules
        let close = if tag.self_close {
            " />".to_string()
        } else if void {
            if self.flags.void_self_close {
                " />".to_string()
            } else {
                ">".to_string()
            }
        } else if self.flags.container_self_close {
            " />".to_string()
        } else {
            format!("></{name}>")
        };
        open.push(Part::Lit(close));
        self.add_output_line(open);
        Ok(())
    }
}

// =========================================================================
// Attribute emission (shared with inline-tag interpolation)
// =========================================================================

/// Build the runtime attribute calls for a tag. Returns the expression
/// parts and whether any of them embed a host expression.
pub(crate) fn attr_parts(tag: &TagLine) -> (Vec<Part>, bool) {
    if let Some(merge) = &tag.merge_attrs {
        let mut entries = Vec::new();
        let class_attrs: Vec<&Attr> = tag.attrs.iter().filter(|a| a.name == "class").collect();
        if !tag.classes.is_empty() || !class_attrs.is_empty() {
            entries.push(format!("'class' = {}", class_value(tag, &class_attrs)));
        }
        if let Some(id) = &tag.id {
            entries.push(format!("'id' = {}", ps_quote(id)));
        }
        for a in tag.attrs.iter().filter(|a| a.name != "class") {
            let value = match &a.value {
                Some(v) => format!("({v})"),
                None => "$true".to_string(),
            };
            entries.push(format!("{} = {value}", ps_quote(&a.name)));
        }
        let dict = if entries.is_empty() {
            "[ordered]@{}".to_string()
        } else {
            format!("[ordered]@{{ {} }}", entries.join("; "))
        };
        return (
            vec![Part::Expr(format!("(out_merged_attrs ({dict}) ({merge}))"))],
            true,
        );
    }

    let mut parts = Vec::new();
    let mut dynamic = false;
    let class_attrs: Vec<&Attr> = tag.attrs.iter().filter(|a| a.name == "class").collect();
    if !tag.classes.is_empty() || !class_attrs.is_empty() {
        dynamic |= !class_attrs.is_empty();
        parts.push(Part::Expr(format!(
            "(out_attr 'class' {} $true)",
            class_value(tag, &class_attrs)
        )));
    }
    if let Some(id) = &tag.id {
        parts.push(Part::Expr(format!("(out_attr 'id' {} $true)", ps_quote(id))));
    }
    for a in tag.attrs.iter().filter(|a| a.name != "class") {
        let (value, escape) = match &a.value {
            Some(v) => {
                dynamic = true;
                (format!("({v})"), a.escape)
            }
            None => ("$true".to_string(), true),
        };
        parts.push(Part::Expr(format!(
            "(out_attr {} {value} {})",
            ps_quote(&a.name),
            if escape { "$true" } else { "$false" }
        )));
    }
    (parts, dynamic)
}

/// The merged value expression for the `class` attribute: shorthand classes
/// plus any `class=` expressions, deduplicated at render time.
fn class_value(tag: &TagLine, class_attrs: &[&Attr]) -> String {
    if class_attrs.is_empty() {
        return ps_quote(&tag.classes.join(" "));
    }
    let mut elems: Vec<String> = tag.classes.iter().map(|c| ps_quote(c)).collect();
    for a in class_attrs {
        if let Some(v) = &a.value {
            elems.push(format!("({v})"));
        }
    }
    if elems.len() == 1 {
        elems.pop().unwrap()
    } else {
        format!("@({})", elems.join(", "))
    }
}

/// An `#[tag …]` inline interpolation rendered to expression parts.
pub(crate) struct InlineTag {
    pub parts: Vec<Part>,
    pub dynamic: bool,
}

pub(crate) fn inline_tag(content: &str, flags: &Flags) -> Option<InlineTag> {
    let tag = parse_tag_line(content.trim())?;
    if tag.dot_block || tag.expansion.is_some() {
        return None;
    }
    let name = if flags.kebab_case && !flags.xml {
        to_kebab(&tag.tag)
    } else {
        tag.tag.clone()
    };
    let (attrs, mut dynamic) = attr_parts(&tag);
    let mut parts = vec![Part::Lit(format!("<{name}"))];
    parts.extend(attrs);

    let content = match tag.op {
        Some(BufferOp::Escaped) => Some(TextExpr {
            parts: vec![Part::Expr(format!(
                "(out_enc ({}))",
                tag.inline.as_deref().unwrap_or("")
            ))],
            dynamic: true,
        }),
        Some(BufferOp::Raw) => Some(TextExpr {
            parts: vec![Part::Expr(format!("({})", tag.inline.as_deref().unwrap_or("")))],
            dynamic: true,
        }),
        None => tag.inline.as_ref().map(|s| text_expr(s, flags)),
    };
    match content {
        Some(te) if !te.is_empty() => {
            dynamic |= te.dynamic;
            parts.push(Part::Lit(">".to_string()));
            parts.extend(te.parts);
            parts.push(Part::Lit(format!("</{name}>")));
        }
        _ => {
            let close = if tag.self_close {
                " />".to_string()
            } else if is_void_tag(&name) {
                if flags.void_self_close {
                    " />".to_string()
                } else {
                    ">".to_string()
                }
            } else if flags.container_self_close {
                " />".to_string()
            } else {
                format!("></{name}>")
            };
            parts.push(Part::Lit(close));
        }
    }
    Some(InlineTag { parts, dynamic })
}

fn min_indent(lines: &[SourceLine]) -> usize {
    lines
        .iter()
        .filter(|l| !l.is_blank())
        .map(|l| l.indent())
        .min()
        .unwrap_or(0)
}

fn is_case_literal(expr: &str) -> bool {
    let expr = expr.trim();
    if (expr.starts_with('\'') && expr.ends_with('\'') && expr.len() >= 2)
        || (expr.starts_with('"') && expr.ends_with('"') && expr.len() >= 2)
    {
        return true;
    }
    expr.parse::<f64>().is_ok()
}
