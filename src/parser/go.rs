//! Go scanner. Capitalised identifiers are exported.

use super::{first_quoted, ident, keyword, skip_group, BlockComments, Collector, StructuralSummary};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Import,
    Type,
    Value,
}

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();
    let mut block = Block::None;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || comments.skip(line) {
            continue;
        }

        if block != Block::None {
            if line.starts_with(')') {
                block = Block::None;
                continue;
            }
            // Only direct members of the group; deeper lines are indented further.
            let nested = raw.starts_with("\t\t") || raw.starts_with("        ");
            match block {
                Block::Import => {
                    if let Some(path) = first_quoted(line) {
                        out.import(path);
                    }
                }
                Block::Type if !nested => type_spec(line, &mut out),
                Block::Value if !nested => {
                    if let Some(name) = ident(line) {
                        export_if_capital(name, &mut out);
                    }
                }
                _ => {}
            }
            continue;
        }

        if let Some(rest) = keyword(line, "import").or_else(|| line.strip_prefix("import(")) {
            if rest.starts_with('(') || line.starts_with("import(") {
                block = Block::Import;
            } else if let Some(path) = first_quoted(rest) {
                out.import(path);
            }
            continue;
        }

        if let Some(rest) = keyword(line, "func") {
            // Methods carry a receiver group before the name.
            let rest = skip_group(rest, '(', ')');
            if let Some(name) = ident(rest) {
                out.function(name);
                export_if_capital(name, &mut out);
            }
            continue;
        }

        if let Some(rest) = keyword(line, "type") {
            if rest.starts_with('(') {
                block = Block::Type;
            } else {
                type_spec(rest, &mut out);
            }
            continue;
        }

        for kw in ["const", "var"] {
            if let Some(rest) = keyword(line, kw) {
                if rest.starts_with('(') {
                    block = Block::Value;
                } else if let Some(name) = ident(rest) {
                    export_if_capital(name, &mut out);
                }
                break;
            }
        }
    }

    out.finish()
}

/// `Name struct {`, `Name interface {`, `Name = Other`, `Name[T any] ...`.
fn type_spec(spec: &str, out: &mut Collector) {
    let Some(name) = ident(spec) else {
        return;
    };
    let tail = skip_group(spec[name.len()..].trim_start(), '[', ']');
    if keyword(tail, "struct").is_some() || tail.starts_with("struct{") {
        out.class(name);
    } else {
        out.type_name(name);
    }
    export_if_capital(name, out);
}

fn export_if_capital(name: &str, out: &mut Collector) {
    if name.starts_with(|c: char| c.is_uppercase()) {
        out.export(name);
    }
}
