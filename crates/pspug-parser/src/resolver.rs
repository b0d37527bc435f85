//! Template resolution: `extends` inheritance with `block` overrides and
//! mixin hoisting, then `include` splicing.
//!
//! Both passes run per file, recursively for each referenced file. The
//! output is a single flat annotated-line sequence ready for the code
//! generator; `block <name>` directive lines are kept in the stream so
//! multi-level `extends` chains stay overridable (the generator treats
//! them as structural no-ops).

use crate::{loader, CompileError, Options};
use indexmap::IndexMap;
use pspug_lexer::{leading_whitespace, parse_filter_chain, strip_indent, SourceLine};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The result of resolving a root template: the flat line sequence and the
/// set of files opened along the way, keyed to their modification time so
/// an external cache can invalidate compiled artifacts.
#[derive(Debug)]
pub struct Resolved {
    pub lines: Vec<SourceLine>,
    pub dependencies: IndexMap<PathBuf, SystemTime>,
}

/// Resolve a root template from disk.
pub fn resolve_file(path: &Path, options: &Options) -> Result<Resolved, CompileError> {
    let mut resolver = Resolver::new(options);
    let lines = loader::load_file(path)?;
    resolver.record_dep(path);
    resolver.ancestors.push(canonical(path));
    let lines = resolver.resolve_lines(lines, path.parent())?;
    Ok(Resolved {
        lines,
        dependencies: resolver.deps,
    })
}

/// Resolve an in-memory template. `dir` is the base for relative includes;
/// without it any `extends`/`include` is an error.
pub fn resolve_source(
    text: &str,
    dir: Option<&Path>,
    options: &Options,
) -> Result<Resolved, CompileError> {
    let mut resolver = Resolver::new(options);
    let lines = loader::load_str(text, "<stream>");
    let lines = resolver.resolve_lines(lines, dir)?;
    Ok(Resolved {
        lines,
        dependencies: resolver.deps,
    })
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// `block <name>` directive check; a bare `block` (the mixin block call)
/// does not count.
fn block_name(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("block")?;
    let name = rest.strip_prefix(char::is_whitespace)?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

struct Resolver<'a> {
    options: &'a Options,
    deps: IndexMap<PathBuf, SystemTime>,
    /// Canonical paths of the files currently being resolved, for cycle
    /// detection across both `extends` and `include`.
    ancestors: Vec<PathBuf>,
}

impl<'a> Resolver<'a> {
    fn new(options: &'a Options) -> Self {
        Self {
            options,
            deps: IndexMap::new(),
            ancestors: Vec::new(),
        }
    }

    fn ctx(&self) -> u32 {
        self.options.error_context
    }

    fn record_dep(&mut self, path: &Path) {
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        log::debug!("template dependency: {}", path.display());
        self.deps.insert(path.to_path_buf(), mtime);
    }

    /// Resolution rule shared by `extends` and `include`: absolute paths
    /// (`/` or `\` prefixed) resolve against `base_dir` when configured,
    /// else the current file's directory; relative paths against the
    /// current directory. A missing extension-less path is retried with the
    /// configured extension and then the literal `.pug` fallback.
    fn resolve_path(&self, raw: &str, dir: Option<&Path>) -> Option<PathBuf> {
        let raw = raw.trim();
        let candidate = if raw.starts_with('/') || raw.starts_with('\\') {
            let trimmed = raw.trim_start_matches(['/', '\\']);
            match &self.options.base_dir {
                Some(base) => base.join(trimmed),
                None => dir?.join(trimmed),
            }
        } else {
            dir?.join(raw)
        };
        if candidate.is_file() {
            return Some(candidate);
        }
        if candidate.extension().is_none() {
            let with_ext = candidate.with_extension(&self.options.extension);
            if with_ext.is_file() {
                return Some(with_ext);
            }
            let with_pug = candidate.with_extension("pug");
            if with_pug.is_file() {
                return Some(with_pug);
            }
        }
        None
    }

    fn resolve_lines(
        &mut self,
        lines: Vec<SourceLine>,
        dir: Option<&Path>,
    ) -> Result<Vec<SourceLine>, CompileError> {
        let lines = self.apply_inheritance(lines, dir)?;
        self.expand_includes(lines, dir)
    }

    // =========================================================================
    // Pass A — inheritance
    // =========================================================================

    fn apply_inheritance(
        &mut self,
        lines: Vec<SourceLine>,
        dir: Option<&Path>,
    ) -> Result<Vec<SourceLine>, CompileError> {
        let Some(first) = lines.iter().find(|l| !l.is_blank()) else {
            return Ok(lines);
        };
        let Some(raw) = first.content().strip_prefix("extends ") else {
            return Ok(lines);
        };
        let raw = raw.trim().to_string();
        let ext_line = first.clone();

        let parent_path = self.resolve_path(&raw, dir).ok_or_else(|| {
            CompileError::extends_not_found(
                &ext_line,
                format!("Extends target not found: {raw}"),
                self.ctx(),
            )
        })?;
        let key = canonical(&parent_path);
        if self.ancestors.contains(&key) {
            return Err(CompileError::cyclic_extends(
                &ext_line,
                format!("Cyclic extends: {}", parent_path.display()),
                self.ctx(),
            ));
        }
        self.record_dep(&parent_path);
        self.ancestors.push(key);
        let parent_lines = loader::load_file(&parent_path)?;
        let parent_lines = self.apply_inheritance(parent_lines, parent_path.parent())?;
        self.ancestors.pop();

        let (blocks, mixins) = scan_overrides(&lines);

        let mut out = mixins;
        let mut i = 0;
        while i < parent_lines.len() {
            let line = &parent_lines[i];
            match block_name(line.content()) {
                Some(name) => {
                    let indent = line.indent();
                    out.push(line.clone());
                    let mut j = i + 1;
                    while j < parent_lines.len()
                        && (parent_lines[j].is_blank() || parent_lines[j].indent() > indent)
                    {
                        j += 1;
                    }
                    match blocks.get(name) {
                        Some(body) => out.extend(reindent(body, indent)),
                        None => out.extend(parent_lines[i + 1..j].iter().cloned()),
                    }
                    i = j;
                }
                None => {
                    out.push(line.clone());
                    i += 1;
                }
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Pass B — includes
    // =========================================================================

    fn expand_includes(
        &mut self,
        lines: Vec<SourceLine>,
        dir: Option<&Path>,
    ) -> Result<Vec<SourceLine>, CompileError> {
        let mut out = Vec::with_capacity(lines.len());
        let mut comment_indent: Option<usize> = None;

        for line in lines {
            if line.is_blank() {
                out.push(line);
                continue;
            }
            let indent = line.indent();
            if let Some(ci) = comment_indent {
                if indent > ci {
                    out.push(line);
                    continue;
                }
                comment_indent = None;
            }
            let content = line.content();
            if content.starts_with("//") {
                comment_indent = Some(indent);
                out.push(line);
                continue;
            }
            let Some(rest) = content.strip_prefix("include") else {
                out.push(line);
                continue;
            };
            if !(rest.is_empty() || rest.starts_with(':') || rest.starts_with(char::is_whitespace))
            {
                out.push(line);
                continue;
            }
            self.expand_one_include(&line, rest, dir, &mut out)?;
        }
        Ok(out)
    }

    fn expand_one_include(
        &mut self,
        line: &SourceLine,
        rest: &str,
        dir: Option<&Path>,
        out: &mut Vec<SourceLine>,
    ) -> Result<(), CompileError> {
        // Relative paths resolve against the file the include line came
        // from; the passed dir only covers stream input.
        let origin = Path::new(&line.path);
        let dir = if origin.is_file() {
            origin.parent().or(dir)
        } else {
            dir
        };
        let ws = leading_whitespace(&line.text).to_string();
        let (chain, path_raw) = if rest.starts_with(':') {
            let (_, consumed) = parse_filter_chain(rest).ok_or_else(|| {
                CompileError::parse_at(line, "Invalid include filter chain", self.ctx())
            })?;
            (Some(&rest[..consumed]), rest[consumed..].trim())
        } else {
            (None, rest.trim())
        };
        if path_raw.is_empty() {
            return Err(CompileError::parse_at(
                line,
                "Include requires a path",
                self.ctx(),
            ));
        }
        let resolved = self.resolve_path(path_raw, dir).ok_or_else(|| {
            CompileError::include_not_found(
                line,
                format!("Include target not found: {path_raw}"),
                self.ctx(),
            )
        })?;
        self.record_dep(&resolved);

        if let Some(chain) = chain {
            // Filter include: a synthetic filter header, then the raw file
            // two columns deeper. The filter owns content semantics; no
            // recursive template processing.
            out.push(SourceLine::new(
                format!("{ws}{chain}"),
                line.path.clone(),
                line.line,
            ));
            for l in loader::load_file(&resolved)? {
                out.push(SourceLine::new(format!("{ws}  {}", l.text), l.path, l.line));
            }
            return Ok(());
        }

        let ext = resolved
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        if ext == self.options.extension || ext == "pug" {
            let key = canonical(&resolved);
            if self.ancestors.contains(&key) {
                return Err(CompileError::cyclic_extends(
                    line,
                    format!("Cyclic include: {}", resolved.display()),
                    self.ctx(),
                ));
            }
            self.ancestors.push(key);
            let sub = loader::load_file(&resolved)?;
            let sub = self.resolve_lines(sub, resolved.parent())?;
            self.ancestors.pop();
            for l in sub {
                if l.is_blank() {
                    out.push(l);
                } else {
                    out.push(SourceLine::new(format!("{ws}{}", l.text), l.path, l.line));
                }
            }
        } else {
            for l in loader::load_file(&resolved)? {
                out.push(SourceLine::new(format!("{ws}| {}", l.text), l.path, l.line));
            }
        }
        Ok(())
    }
}

/// Scan a child template for `block <name>` definitions and top-level
/// `mixin` definitions, skipping `//-` comment regions.
fn scan_overrides(lines: &[SourceLine]) -> (IndexMap<String, Vec<SourceLine>>, Vec<SourceLine>) {
    let mut blocks = IndexMap::new();
    let mut mixins = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if line.is_blank() {
            i += 1;
            continue;
        }
        let indent = line.indent();
        let content = line.content();
        let body_end = |start: usize| {
            let mut j = start;
            while j < lines.len() && (lines[j].is_blank() || lines[j].indent() > indent) {
                j += 1;
            }
            j
        };
        if content.starts_with("//-") {
            i = body_end(i + 1);
        } else if let Some(name) = block_name(content) {
            let j = body_end(i + 1);
            blocks.insert(name.to_string(), lines[i + 1..j].to_vec());
            i = j;
        } else if indent == 0 && content.starts_with("mixin ") {
            // only top-level definitions are hoisted; a mixin nested under
            // other child content is ordinary content and is not lifted out
            // of its construct
            let j = body_end(i + 1);
            mixins.extend(lines[i..j].iter().cloned());
            i = j;
        } else {
            i += 1;
        }
    }
    (blocks, mixins)
}

/// Shift a captured block body so its minimum content indent lands at
/// `target`. Blank lines are preserved verbatim.
fn reindent(body: &[SourceLine], target: usize) -> Vec<SourceLine> {
    let min = body
        .iter()
        .filter(|l| !l.is_blank())
        .map(|l| l.indent())
        .min()
        .unwrap_or(0);
    body.iter()
        .map(|l| {
            if l.is_blank() {
                l.clone()
            } else {
                let text = format!("{}{}", " ".repeat(target), strip_indent(&l.text, min));
                SourceLine::new(text, l.path.clone(), l.line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn texts(resolved: &Resolved) -> Vec<&str> {
        resolved.lines.iter().map(|l| l.text.as_str()).collect()
    }

    // =========================================================================
    // Idempotence
    // =========================================================================

    #[test]
    fn test_plain_file_resolves_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "page.pug", "html\n  body\n    p hi\n");
        let resolved = resolve_file(&path, &Options::default()).unwrap();
        assert_eq!(texts(&resolved), vec!["html", "  body", "    p hi", ""]);
    }

    #[test]
    fn test_resolve_source_without_dir() {
        let resolved = resolve_source("p inline", None, &Options::default()).unwrap();
        assert_eq!(texts(&resolved), vec!["p inline"]);
        assert!(resolved.dependencies.is_empty());
    }

    // =========================================================================
    // Inheritance
    // =========================================================================

    #[test]
    fn test_block_override() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "parent.pug",
            "html\n  body\n    block content\n      p default\n",
        );
        let child = write(
            dir.path(),
            "child.pug",
            "extends parent\nblock content\n  p overridden\n",
        );
        let resolved = resolve_file(&child, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert!(lines.contains(&"    p overridden"));
        assert!(!lines.iter().any(|l| l.contains("default")));
        // the directive line stays in the stream
        assert!(lines.contains(&"    block content"));
    }

    #[test]
    fn test_block_default_kept() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "parent.pug",
            "html\n  block content\n    p default\n",
        );
        let child = write(dir.path(), "child.pug", "extends parent\n");
        let resolved = resolve_file(&child, &Options::default()).unwrap();
        assert!(texts(&resolved).contains(&"    p default"));
    }

    #[test]
    fn test_override_origin_preserved() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "parent.pug", "block content\n  p default\n");
        let child = write(
            dir.path(),
            "child.pug",
            "extends parent\nblock content\n  p mine\n",
        );
        let resolved = resolve_file(&child, &Options::default()).unwrap();
        let over = resolved
            .lines
            .iter()
            .find(|l| l.text.contains("p mine"))
            .unwrap();
        assert!(over.path.ends_with("child.pug"));
        assert_eq!(over.line, 3);
    }

    #[test]
    fn test_mixins_hoisted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "parent.pug", "div\n  block main\n");
        let child = write(
            dir.path(),
            "child.pug",
            "extends parent\nmixin greet(name)\n  p= $name\nblock main\n  +greet('x')\n",
        );
        let resolved = resolve_file(&child, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert_eq!(lines[0], "mixin greet(name)");
        assert_eq!(lines[1], "  p= $name");
        assert!(lines.contains(&"  +greet('x')"));
    }

    #[test]
    fn test_nested_mixin_not_hoisted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "parent.pug", "div\n  block main\n");
        let child = write(
            dir.path(),
            "child.pug",
            "extends parent\n- if ($flag)\n  mixin helper(x)\n    p= $x\nblock main\n  p body\n",
        );
        let resolved = resolve_file(&child, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert!(!lines.iter().any(|l| l.contains("mixin helper")));
        assert!(lines.contains(&"  p body"));
    }

    #[test]
    fn test_multi_level_extends() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base.pug", "main\n  block content\n    p base\n");
        write(dir.path(), "mid.pug", "extends base\n");
        let leaf = write(
            dir.path(),
            "leaf.pug",
            "extends mid\nblock content\n  p leaf\n",
        );
        let resolved = resolve_file(&leaf, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert!(lines.contains(&"  p leaf"));
        assert!(!lines.iter().any(|l| l.contains("p base")));
    }

    #[test]
    fn test_blank_lines_in_override_kept() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "parent.pug", "block content\n");
        let child = write(
            dir.path(),
            "child.pug",
            "extends parent\nblock content\n  p one\n\n  p two\n",
        );
        let resolved = resolve_file(&child, &Options::default()).unwrap();
        let lines = texts(&resolved);
        let a = lines.iter().position(|l| *l == "p one").unwrap();
        assert_eq!(lines[a + 1], "");
        assert_eq!(lines[a + 2], "p two");
    }

    #[test]
    fn test_extends_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let child = write(dir.path(), "child.pug", "extends missing\n");
        let err = resolve_file(&child, &Options::default()).unwrap_err();
        assert!(matches!(err, CompileError::ExtendsNotFound { .. }));
        assert!(err.to_string().contains("extends missing"));
    }

    #[test]
    fn test_cyclic_extends() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.pug", "extends b\n");
        let b = write(dir.path(), "b.pug", "extends a\n");
        let err = resolve_file(&b, &Options::default()).unwrap_err();
        assert!(matches!(err, CompileError::CyclicExtends { .. }));
    }

    // =========================================================================
    // Includes
    // =========================================================================

    #[test]
    fn test_include_template_nested() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "item.pug", "li one\nli two\n");
        let page = write(dir.path(), "page.pug", "ul\n  include item\n");
        let resolved = resolve_file(&page, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert!(lines.contains(&"  li one"));
        assert!(lines.contains(&"  li two"));
        assert!(!lines.iter().any(|l| l.contains("include")));
    }

    #[test]
    fn test_include_extension_retry() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "footer.pug", "p footer\n");
        let page = write(dir.path(), "page.pug", "include footer\n");
        let resolved = resolve_file(&page, &Options::default()).unwrap();
        assert!(texts(&resolved).contains(&"p footer"));
    }

    #[test]
    fn test_include_literal_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "style.css", "body { margin: 0 }\n");
        let page = write(dir.path(), "page.pug", "style\n  include style.css\n");
        let resolved = resolve_file(&page, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert!(lines.contains(&"  | body { margin: 0 }"));
        let css = resolved
            .lines
            .iter()
            .find(|l| l.text.contains("margin"))
            .unwrap();
        assert!(css.path.ends_with("style.css"));
    }

    #[test]
    fn test_include_filter_chain() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "article.md", "# Title\n\nBody text\n");
        let page = write(
            dir.path(),
            "page.pug",
            "section\n  include:markdown article.md\n",
        );
        let resolved = resolve_file(&page, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert!(lines.contains(&"  :markdown"));
        assert!(lines.contains(&"    # Title"));
        assert!(lines.contains(&"    Body text"));
    }

    #[test]
    fn test_include_inside_comment_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let page = write(
            dir.path(),
            "page.pug",
            "//-\n  include missing\np after\n",
        );
        let resolved = resolve_file(&page, &Options::default()).unwrap();
        assert!(texts(&resolved).contains(&"  include missing"));
        assert!(texts(&resolved).contains(&"p after"));
    }

    #[test]
    fn test_include_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let page = write(dir.path(), "page.pug", "div\n  include nope\n");
        let err = resolve_file(&page, &Options::default()).unwrap_err();
        assert!(matches!(err, CompileError::IncludeNotFound { .. }));
        // the diagnostic excerpt points at the include site
        assert!(err.to_string().contains("> 2 |   include nope"));
    }

    #[test]
    fn test_include_recursive_resolution() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "inner.pug", "em deep\n");
        write(dir.path(), "outer.pug", "p outer\ninclude inner\n");
        let page = write(dir.path(), "page.pug", "div\n  include outer\n");
        let resolved = resolve_file(&page, &Options::default()).unwrap();
        let lines = texts(&resolved);
        assert!(lines.contains(&"  p outer"));
        assert!(lines.contains(&"  em deep"));
    }

    #[test]
    fn test_base_dir_absolute_include() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared");
        fs::create_dir(&shared).unwrap();
        write(&shared, "nav.pug", "nav here\n");
        let pages = dir.path().join("pages");
        fs::create_dir(&pages).unwrap();
        let page = write(&pages, "page.pug", "include /nav\n");
        let options = Options {
            base_dir: Some(shared),
            ..Options::default()
        };
        let resolved = resolve_file(&page, &options).unwrap();
        assert!(texts(&resolved).contains(&"nav here"));
    }

    // =========================================================================
    // Dependency tracking
    // =========================================================================

    #[test]
    fn test_dependencies_recorded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "parent.pug", "block content\n");
        write(dir.path(), "footer.pug", "p footer\n");
        let child = write(
            dir.path(),
            "child.pug",
            "extends parent\nblock content\n  include footer\n",
        );
        let resolved = resolve_file(&child, &Options::default()).unwrap();
        let names: Vec<String> = resolved
            .dependencies
            .keys()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["child.pug", "parent.pug", "footer.pug"]);
    }
}
