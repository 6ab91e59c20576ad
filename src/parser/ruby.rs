//! Ruby scanner. Names without a leading underscore are exported.

use super::{first_quoted, ident, keyword, Collector, StructuralSummary};

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut in_doc = false;

    for raw in content.lines() {
        // `=begin`/`=end` must start in column zero.
        if in_doc {
            in_doc = !raw.starts_with("=end");
            continue;
        }
        if raw.starts_with("=begin") {
            in_doc = true;
            continue;
        }
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = require_arg(line) {
            if let Some(path) = first_quoted(rest) {
                out.import(path);
            }
            continue;
        }

        if let Some(rest) = keyword(line, "def") {
            let rest = rest.strip_prefix("self.").unwrap_or(rest);
            if let Some(name) = ident(rest) {
                let name = match rest[name.len()..].chars().next() {
                    Some(c @ ('?' | '!')) => &rest[..name.len() + c.len_utf8()],
                    _ => name,
                };
                out.function(name);
                export_if_public(name, &mut out);
            }
            continue;
        }

        if let Some(rest) = keyword(line, "class") {
            if let Some(name) = constant_name(rest) {
                out.class(name);
                export_if_public(name, &mut out);
            }
            continue;
        }
        if let Some(rest) = keyword(line, "module") {
            if let Some(name) = constant_name(rest) {
                out.type_name(name);
                export_if_public(name, &mut out);
            }
        }
    }

    out.finish()
}

fn require_arg(line: &str) -> Option<&str> {
    ["require_relative", "require", "load"].iter().find_map(|kw| {
        let rest = line.strip_prefix(kw)?;
        rest.starts_with([' ', '(']).then_some(rest)
    })
}

/// Last segment of `Api::V1::Users < Base`; `class << self` has none.
fn constant_name(rest: &str) -> Option<&str> {
    let path = rest.split(|c: char| c.is_whitespace() || c == '<').next()?;
    ident(path.rsplit("::").next()?)
}

fn export_if_public(name: &str, out: &mut Collector) {
    if !name.starts_with('_') {
        out.export(name);
    }
}
