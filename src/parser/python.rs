//! Python scanner. Top-level names without a leading underscore are public.

use super::{ident, keyword, Collector, StructuralSummary};

/// Base classes that make a class a type declaration as well.
const TYPE_BASES: &[&str] = &[
    "Enum",
    "IntEnum",
    "StrEnum",
    "Flag",
    "TypedDict",
    "Protocol",
    "NamedTuple",
];

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut in_docstring = false;

    for raw in content.lines() {
        let line = raw.trim();
        let top_level = !raw.starts_with(char::is_whitespace);

        let quotes = line.matches("\"\"\"").count() + line.matches("'''").count();
        if in_docstring {
            if quotes % 2 == 1 {
                in_docstring = false;
            }
            continue;
        }
        if quotes % 2 == 1 {
            in_docstring = true;
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = keyword(line, "import") {
            for part in rest.split(',') {
                let module = part.split(" as ").next().unwrap_or_default().trim();
                out.import(module);
            }
            continue;
        }
        if let Some(rest) = keyword(line, "from") {
            if let Some((module, _)) = rest.split_once(" import") {
                out.import(module.trim());
            }
            continue;
        }

        let decl = keyword(line, "async").unwrap_or(line);
        if let Some(rest) = keyword(decl, "def") {
            if let Some(name) = ident(rest) {
                out.function(name);
                if top_level && is_public(name) {
                    out.export(name);
                }
            }
            continue;
        }

        if let Some(rest) = keyword(line, "class") {
            if let Some(name) = ident(rest) {
                out.class(name);
                let bases = rest[name.len()..]
                    .trim_start()
                    .strip_prefix('(')
                    .and_then(|b| b.split(')').next())
                    .unwrap_or_default();
                if bases
                    .split(',')
                    .map(|b| b.trim().rsplit('.').next().unwrap_or_default())
                    .any(|b| TYPE_BASES.contains(&b))
                {
                    out.type_name(name);
                }
                if top_level && is_public(name) {
                    out.export(name);
                }
            }
            continue;
        }

        if !top_level {
            continue;
        }

        // PEP 695 `type Alias = ...` and `Alias: TypeAlias = ...`
        if let Some(rest) = keyword(line, "type") {
            if let Some(name) = ident(rest) {
                if rest[name.len()..].trim_start().starts_with(['=', '[']) {
                    out.type_name(name);
                    if is_public(name) {
                        out.export(name);
                    }
                }
            }
            continue;
        }
        if let Some(name) = ident(line) {
            let tail = line[name.len()..].trim_start();
            if tail.starts_with(": TypeAlias") || tail.starts_with(":TypeAlias") {
                out.type_name(name);
                if is_public(name) {
                    out.export(name);
                }
            }
        }
    }

    out.finish()
}

fn is_public(name: &str) -> bool {
    !name.starts_with('_')
}
