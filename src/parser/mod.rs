//! Approximate structural scanning of source files.
//!
//! [`parse`] extracts a file's coarse public surface (exports, imports,
//! function, class and type names) with one line-oriented scanner per
//! supported language. The scanners match declaration-introducing
//! keywords at the start of a trimmed line; they are deliberately not
//! grammar-correct:
//!
//! - declarations split across several lines may be missed,
//! - declarations nested inside other constructs are reported only when
//!   their own line starts with a recognised keyword,
//! - string literals and comments that happen to start with a keyword can
//!   produce false positives (block comments are skipped where cheap).
//!
//! What counts as exported follows each language's visibility convention:
//!
//! | Language | Exported when |
//! |----------|---------------|
//! | TypeScript, JavaScript | `export` keyword, `module.exports`, `exports.x` |
//! | Rust | bare `pub` (not `pub(crate)` and friends) |
//! | Java, C# | `public` modifier |
//! | Swift | `public` or `open` modifier |
//! | PHP | `public` modifier, class-like declarations, unindented functions |
//! | Kotlin | not marked `private`, `internal` or `protected` |
//! | Python | top-level name without a leading `_` |
//! | Ruby | name without a leading `_` |
//! | Go | identifier starts with an uppercase letter |
//!
//! Exports and imports are capped at [`MAX_LIST_ENTRIES`] in discovery
//! order. Languages without a scanner produce an empty summary.

mod csharp;
mod ecmascript;
mod go;
mod jvm;
mod php;
mod python;
mod ruby;
mod rust;
mod swift;

use serde::Serialize;

use crate::models::Language;

/// Cap applied to `exports` and `imports`.
pub const MAX_LIST_ENTRIES: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralSummary {
    pub exports: Vec<String>,
    pub imports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub types: Vec<String>,
}

impl StructuralSummary {
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
            && self.imports.is_empty()
            && self.functions.is_empty()
            && self.classes.is_empty()
            && self.types.is_empty()
    }
}

/// Scan `content` as `language`.
pub fn parse(content: &str, language: Language) -> StructuralSummary {
    match language {
        Language::TypeScript | Language::JavaScript => ecmascript::scan(content),
        Language::Python => python::scan(content),
        Language::Go => go::scan(content),
        Language::Rust => rust::scan(content),
        Language::Java => jvm::scan_java(content),
        Language::Kotlin => jvm::scan_kotlin(content),
        Language::Swift => swift::scan(content),
        Language::Ruby => ruby::scan(content),
        Language::Php => php::scan(content),
        Language::CSharp => csharp::scan(content),
        Language::C
        | Language::Cpp
        | Language::Vue
        | Language::Svelte
        | Language::Json
        | Language::Yaml
        | Language::Toml
        | Language::Sql
        | Language::Shell => StructuralSummary::default(),
    }
}

/// Accumulates names in discovery order, dropping duplicates.
#[derive(Default)]
struct Collector {
    summary: StructuralSummary,
}

impl Collector {
    fn export(&mut self, name: &str) {
        push_unique(&mut self.summary.exports, name);
    }

    fn import(&mut self, source: &str) {
        push_unique(&mut self.summary.imports, source);
    }

    fn function(&mut self, name: &str) {
        push_unique(&mut self.summary.functions, name);
    }

    fn class(&mut self, name: &str) {
        push_unique(&mut self.summary.classes, name);
    }

    fn type_name(&mut self, name: &str) {
        push_unique(&mut self.summary.types, name);
    }

    fn finish(mut self) -> StructuralSummary {
        self.summary.exports.truncate(MAX_LIST_ENTRIES);
        self.summary.imports.truncate(MAX_LIST_ENTRIES);
        self.summary
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|v| v == value) {
        return;
    }
    list.push(value.to_string());
}

/// Tracks `/* ... */` block comments across lines.
#[derive(Default)]
struct BlockComments {
    inside: bool,
}

impl BlockComments {
    /// Returns `true` when `line` (already trimmed) is comment-only.
    fn skip(&mut self, line: &str) -> bool {
        if self.inside {
            if line.contains("*/") {
                self.inside = false;
            }
            return true;
        }
        if line.starts_with("/*") {
            self.inside = !line.contains("*/");
            return true;
        }
        line.starts_with("//") || line.starts_with('*')
    }
}

/// If `line` starts with the word `kw` followed by whitespace, return the
/// remainder with leading whitespace removed.
fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(kw)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Strip any sequence of the given modifier words, returning the rest and
/// the modifiers found in order.
fn strip_modifiers<'a>(mut line: &'a str, modifiers: &[&'static str]) -> (&'a str, Vec<&'static str>) {
    let mut found = Vec::new();
    'outer: loop {
        for m in modifiers {
            if let Some(rest) = keyword(line, m) {
                found.push(*m);
                line = rest;
                continue 'outer;
            }
        }
        return (line, found);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Leading identifier of `s`, if any.
fn ident(s: &str) -> Option<&str> {
    let mut chars = s.char_indices();
    let (_, first) = chars.next()?;
    if !is_ident_start(first) {
        return None;
    }
    let end = chars
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    Some(&s[..end])
}

/// Trailing identifier of `s`, if any.
fn trailing_ident(s: &str) -> Option<&str> {
    let s = s.trim_end();
    let start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let name = &s[start..];
    if name.starts_with(is_ident_start) {
        Some(name)
    } else {
        None
    }
}

/// Content of the first single-, double- or backtick-quoted string.
fn first_quoted(s: &str) -> Option<&str> {
    let (start, quote) = s
        .char_indices()
        .find(|(_, c)| matches!(c, '\'' | '"' | '`'))?;
    let body = &s[start + 1..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

/// Skip a leading balanced `open ... close` group (e.g. generics or a Go
/// method receiver), returning what follows it.
fn skip_group(s: &str, open: char, close: char) -> &str {
    if !s.starts_with(open) {
        return s;
    }
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return s[i + c.len_utf8()..].trim_start();
            }
        }
    }
    ""
}

/// Statement keywords that can precede `(` without being a declaration.
const CONTROL_WORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "return", "new", "throw",
    "catch", "try", "await", "yield", "using", "lock", "typeof", "sizeof", "synchronized",
    "super", "this",
];

/// Method name for a C-family declaration line such as
/// `List<String> findAll(int limit) {`, after modifiers were stripped.
///
/// A bare `name(` is accepted only when modifiers were present (a
/// constructor); otherwise it is a call statement.
fn method_name(decl: &str, had_modifiers: bool) -> Option<&str> {
    let paren = decl.find('(')?;
    let head = decl[..paren].trim_end();
    let name = trailing_ident(head)?;
    let before = head[..head.len() - name.len()].trim_end();

    if before.contains('=') || before.ends_with('.') || before.ends_with("->") {
        return None;
    }
    let first_word = before.split_whitespace().next().unwrap_or(name);
    if CONTROL_WORDS.contains(&first_word) || CONTROL_WORDS.contains(&name) {
        return None;
    }
    if before.is_empty() && !had_modifiers {
        return None;
    }
    Some(name)
}
