//! Rust scanner. Bare `pub` items are exported; `pub(crate)` and other
//! restricted visibilities are not.

use super::{ident, keyword, strip_modifiers, BlockComments, Collector, StructuralSummary};

const FN_MODIFIERS: &[&str] = &["async", "unsafe", "default", "const", "extern", "\"C\""];

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("#[") || line.starts_with("#![") {
            continue;
        }
        if comments.skip(line) {
            continue;
        }

        let (rest, exported) = visibility(line);

        if let Some(path) = keyword(rest, "use") {
            let path = path.trim_end_matches(';').trim();
            out.import(path);
            if exported {
                if let Some(name) = reexported_name(path) {
                    out.export(name);
                }
            }
            continue;
        }
        if let Some(krate) = keyword(rest, "extern").and_then(|r| keyword(r, "crate")) {
            if let Some(name) = ident(krate) {
                out.import(name);
            }
            continue;
        }

        let Some((name, kind)) = item(rest) else {
            continue;
        };
        match kind {
            Item::Function => out.function(name),
            Item::Class => out.class(name),
            Item::Type => out.type_name(name),
            Item::Value => {}
        }
        if exported {
            out.export(name);
        }
    }

    out.finish()
}

/// Strip a visibility prefix, reporting whether it was a bare `pub`.
fn visibility(line: &str) -> (&str, bool) {
    if let Some(rest) = line.strip_prefix("pub(") {
        let after = rest.split_once(')').map(|(_, r)| r.trim_start()).unwrap_or(rest);
        return (after, false);
    }
    match keyword(line, "pub") {
        Some(rest) => (rest, true),
        None => (line, false),
    }
}

enum Item {
    Function,
    Class,
    Type,
    Value,
}

fn item(line: &str) -> Option<(&str, Item)> {
    if let Some(rest) = keyword(line, "struct").or_else(|| keyword(line, "union")) {
        return ident(rest).map(|n| (n, Item::Class));
    }
    for kw in ["enum", "trait", "type"] {
        if let Some(rest) = keyword(line, kw) {
            return ident(rest).map(|n| (n, Item::Type));
        }
    }
    if let Some(rest) = keyword(line, "unsafe").and_then(|r| keyword(r, "trait")) {
        return ident(rest).map(|n| (n, Item::Type));
    }
    if let Some(rest) = keyword(line, "mod") {
        return ident(rest).map(|n| (n, Item::Value));
    }

    let (rest, modifiers) = strip_modifiers(line, FN_MODIFIERS);
    if let Some(rest) = keyword(rest, "fn") {
        return ident(rest).map(|n| (n, Item::Function));
    }
    // `const NAME` / `static NAME`; `const fn` was consumed above.
    if modifiers.last() == Some(&"const") {
        return ident(rest).map(|n| (n, Item::Value));
    }
    if let Some(rest) = keyword(line, "static") {
        let rest = keyword(rest, "mut").unwrap_or(rest);
        return ident(rest).map(|n| (n, Item::Value));
    }
    None
}

/// Final segment brought into scope by a `pub use`, unless it is a glob or group.
fn reexported_name(path: &str) -> Option<&str> {
    if let Some((_, alias)) = path.rsplit_once(" as ") {
        return ident(alias.trim());
    }
    let last = path.rsplit("::").next()?;
    if last == "*" || last.starts_with('{') || last.ends_with('}') {
        return None;
    }
    ident(last)
}
