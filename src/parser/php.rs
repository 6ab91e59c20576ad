//! PHP scanner.

use super::{first_quoted, ident, keyword, strip_modifiers, BlockComments, Collector, StructuralSummary};

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "abstract",
    "final",
    "readonly",
];

const INCLUDES: &[&str] = &["require_once", "require", "include_once", "include"];

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("<?") || line.starts_with('#') {
            continue;
        }
        if comments.skip(line) {
            continue;
        }
        let top_level = !raw.starts_with(char::is_whitespace);

        // Indented `use` inside a class body imports a trait, not a namespace.
        if let Some(rest) = keyword(line, "use").filter(|_| top_level) {
            let rest = keyword(rest, "function")
                .or_else(|| keyword(rest, "const"))
                .unwrap_or(rest);
            let name = rest.trim_end_matches(';').split(" as ").next().unwrap_or(rest);
            out.import(name.trim().trim_start_matches('\\'));
            continue;
        }
        if let Some(rest) = INCLUDES
            .iter()
            .find_map(|kw| line.strip_prefix(kw).filter(|r| r.starts_with([' ', '('])))
        {
            if let Some(path) = first_quoted(rest) {
                out.import(path);
            }
            continue;
        }

        let (decl, modifiers) = strip_modifiers(line, MODIFIERS);

        if let Some(rest) = keyword(decl, "function") {
            let rest = rest.trim_start_matches('&');
            if let Some(name) = ident(rest) {
                out.function(name);
                let hidden = modifiers.iter().any(|m| matches!(*m, "private" | "protected"));
                if modifiers.contains(&"public") || (top_level && !hidden) {
                    out.export(name);
                }
            }
            continue;
        }

        if let Some(rest) = keyword(decl, "class") {
            if let Some(name) = ident(rest) {
                out.class(name);
                out.export(name);
            }
            continue;
        }
        for kw in ["interface", "trait", "enum"] {
            if let Some(rest) = keyword(decl, kw) {
                if let Some(name) = ident(rest) {
                    out.type_name(name);
                    out.export(name);
                }
                break;
            }
        }
    }

    out.finish()
}
