//! Swift scanner. `public` and `open` declarations are exported.

use super::{ident, keyword, skip_group, strip_modifiers, BlockComments, Collector, StructuralSummary};

const MODIFIERS: &[&str] = &[
    "public",
    "open",
    "private",
    "fileprivate",
    "internal",
    "final",
    "static",
    "override",
    "mutating",
    "nonmutating",
    "convenience",
    "required",
    "lazy",
    "weak",
    "indirect",
    "nonisolated",
    "dynamic",
];

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || comments.skip(line) {
            continue;
        }

        let import_line = keyword(line, "@testable").unwrap_or(line);
        if let Some(rest) = keyword(import_line, "import") {
            // `import struct Foundation.Date` names a kind before the module.
            let module = rest.split_whitespace().last().unwrap_or(rest);
            out.import(module);
            continue;
        }

        let line = strip_attributes(line);
        let (decl, modifiers) = strip_modifiers(line, MODIFIERS);
        // `class func` / `class var` declare type members, not a class.
        let decl = match keyword(decl, "class") {
            Some(rest) if ident(rest).is_some_and(is_member_keyword) => rest,
            _ => decl,
        };
        let exported = modifiers.iter().any(|m| matches!(*m, "public" | "open"));

        let name = if let Some(rest) = keyword(decl, "func") {
            ident(rest).inspect(|n| out.function(n))
        } else if let Some(rest) = keyword(decl, "class")
            .or_else(|| keyword(decl, "struct"))
            .or_else(|| keyword(decl, "actor"))
        {
            ident(rest).inspect(|n| out.class(n))
        } else if let Some(rest) = keyword(decl, "protocol")
            .or_else(|| keyword(decl, "enum"))
            .or_else(|| keyword(decl, "typealias"))
        {
            ident(rest).inspect(|n| out.type_name(n))
        } else if let Some(rest) = keyword(decl, "let").or_else(|| keyword(decl, "var")) {
            ident(rest)
        } else {
            None
        };

        if let (Some(name), true) = (name, exported) {
            out.export(name);
        }
    }

    out.finish()
}

fn is_member_keyword(word: &str) -> bool {
    matches!(word, "func" | "var" | "let" | "subscript")
}

/// Drop leading attributes such as `@MainActor` or `@available(iOS 15, *)`.
fn strip_attributes(mut line: &str) -> &str {
    while let Some(rest) = line.strip_prefix('@') {
        let name_len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        line = skip_group(&rest[name_len..], '(', ')').trim_start();
    }
    line
}
