//! Java and Kotlin scanners.

use super::{
    ident, keyword, method_name, skip_group, strip_modifiers, BlockComments, Collector,
    StructuralSummary,
};

const JAVA_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "final",
    "abstract",
    "sealed",
    "non-sealed",
    "synchronized",
    "native",
    "default",
    "strictfp",
    "transient",
    "volatile",
];

const KOTLIN_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "internal",
    "protected",
    "open",
    "abstract",
    "final",
    "override",
    "suspend",
    "inline",
    "data",
    "sealed",
    "enum",
    "annotation",
    "inner",
    "value",
    "operator",
    "infix",
    "tailrec",
    "external",
    "lateinit",
    "const",
    "expect",
    "actual",
    "companion",
];

pub(super) fn scan_java(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || comments.skip(line) || keyword(line, "package").is_some() {
            continue;
        }

        if let Some(rest) = keyword(line, "import") {
            let rest = keyword(rest, "static").unwrap_or(rest);
            out.import(rest.trim_end_matches(';').trim());
            continue;
        }

        let line = strip_annotations(line);
        if line.is_empty() {
            continue;
        }
        let (decl, modifiers) = strip_modifiers(line, JAVA_MODIFIERS);
        let exported = modifiers.contains(&"public");

        let name = if let Some(rest) = keyword(decl, "class").or_else(|| keyword(decl, "record")) {
            ident(rest).inspect(|n| out.class(n))
        } else if let Some(rest) = keyword(decl, "interface")
            .or_else(|| keyword(decl, "enum"))
            .or_else(|| keyword(decl, "@interface"))
        {
            ident(rest).inspect(|n| out.type_name(n))
        } else {
            method_name(decl, !modifiers.is_empty()).inspect(|n| out.function(n))
        };

        if let (Some(name), true) = (name, exported) {
            out.export(name);
        }
    }

    out.finish()
}

pub(super) fn scan_kotlin(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || comments.skip(line) || keyword(line, "package").is_some() {
            continue;
        }

        if let Some(rest) = keyword(line, "import") {
            let path = rest.split(" as ").next().unwrap_or(rest).trim();
            out.import(path);
            continue;
        }

        let line = strip_annotations(line);
        let (decl, modifiers) = strip_modifiers(line, KOTLIN_MODIFIERS);
        let exported = !modifiers
            .iter()
            .any(|m| matches!(*m, "private" | "internal" | "protected"));
        let top_level = !raw.starts_with(char::is_whitespace);

        let name = if let Some(rest) = keyword(decl, "fun") {
            let rest = skip_group(rest, '<', '>');
            let head = rest.split('(').next().unwrap_or(rest);
            let name = head.rsplit('.').next().and_then(ident);
            name.inspect(|n| out.function(n))
        } else if let Some(rest) = keyword(decl, "class") {
            let is_type = modifiers.iter().any(|m| matches!(*m, "enum" | "annotation"));
            ident(rest).inspect(|n| {
                if is_type {
                    out.type_name(n)
                } else {
                    out.class(n)
                }
            })
        } else if let Some(rest) = keyword(decl, "object") {
            ident(rest).inspect(|n| out.class(n))
        } else if let Some(rest) = keyword(decl, "interface").or_else(|| keyword(decl, "typealias")) {
            ident(rest).inspect(|n| out.type_name(n))
        } else if top_level {
            keyword(decl, "val")
                .or_else(|| keyword(decl, "var"))
                .and_then(ident)
        } else {
            None
        };

        if let (Some(name), true) = (name, exported) {
            out.export(name);
        }
    }

    out.finish()
}

/// Drop leading annotations such as `@Override` or `@Path("/x")`, keeping
/// `@interface` declarations.
fn strip_annotations(mut line: &str) -> &str {
    while let Some(rest) = line.strip_prefix('@') {
        if keyword(rest, "interface").is_some() {
            break;
        }
        let name_len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.' || c == ':'))
            .unwrap_or(rest.len());
        line = skip_group(&rest[name_len..], '(', ')').trim_start();
    }
    line
}
