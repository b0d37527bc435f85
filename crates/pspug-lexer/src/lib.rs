//! PSPUG Lexer
//!
//! Line-level tokenization helpers for the pspug template language.
//! The language is indentation-delimited, so there is no token stream:
//! the compiler walks annotated source lines and uses these helpers to
//! measure indentation, extract balanced delimiter spans, split attribute
//! lists, parse filter chains, and match the single-line tag grammar.
//!
//! # Example
//!
//! ```
//! use pspug_lexer::{indent_of, parse_tag_line};
//!
//! assert_eq!(indent_of("  p Hello"), 2);
//! let tag = parse_tag_line("a#home.nav(href='/') Home").unwrap();
//! assert_eq!(tag.tag, "a");
//! assert_eq!(tag.classes, vec!["nav"]);
//! ```

pub mod line;
pub mod scan;
pub mod tag;

pub use line::{indent_of, leading_whitespace, strip_indent, SourceLine};
pub use scan::{
    balanced_span, parse_attr, parse_filter_chain, split_attr_pairs, split_top_commas,
    unbalanced_paren, Attr, FilterCall,
};
pub use tag::{
    is_literal_tag, is_void_tag, parse_mixin_call, parse_mixin_def, parse_tag_line, to_kebab,
    BufferOp, MixinCall, MixinDef, MixinParam, TagLine, LITERAL_TAGS, VOID_TAGS,
};
