//! TypeScript and JavaScript scanner (ES modules and CommonJS).

use super::{first_quoted, ident, keyword, strip_modifiers, BlockComments, Collector, StructuralSummary};

const DECL_MODIFIERS: &[&str] = &["declare", "abstract", "async", "default"];

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || comments.skip(line) {
            continue;
        }
        scan_line(line, &mut out);
    }

    out.finish()
}

fn scan_line(line: &str, out: &mut Collector) {
    if let Some(rest) = keyword(line, "import") {
        if let Some(source) = import_source(rest) {
            out.import(source);
        }
        return;
    }

    // Closing line of a multi-line `import { ... } from "x"`.
    if line.starts_with('}') && line.contains("from ") {
        if let Some(source) = import_source(line) {
            out.import(source);
        }
        return;
    }

    if let Some(idx) = line.find("require(") {
        if let Some(source) = first_quoted(&line[idx..]) {
            out.import(source);
        }
    }

    if let Some(rest) = keyword(line, "export") {
        scan_export(rest, out);
        return;
    }

    if let Some(rest) = line.strip_prefix("module.exports") {
        scan_module_exports(rest.trim_start(), out);
        return;
    }

    if let Some(rest) = line.strip_prefix("exports.") {
        if let Some(name) = ident(rest) {
            out.export(name);
            if is_function_value(rest) {
                out.function(name);
            }
        }
        return;
    }

    declaration(line, out);
}

/// Module specifier of an import clause: `x from "y"`, `"y"`, `type {a} from "y"`.
fn import_source(clause: &str) -> Option<&str> {
    if let Some(idx) = clause.rfind("from ") {
        return first_quoted(&clause[idx..]);
    }
    if clause.starts_with(['\'', '"']) {
        return first_quoted(clause);
    }
    None
}

fn scan_export(rest: &str, out: &mut Collector) {
    if let Some(after) = keyword(rest, "default") {
        match declaration(after, out) {
            Some(name) => out.export(&name),
            None => out.export("default"),
        }
        return;
    }

    if rest.starts_with('{') || rest.starts_with("type {") {
        let list = rest.trim_start_matches("type").trim_start();
        let inner = list
            .trim_start_matches('{')
            .split('}')
            .next()
            .unwrap_or_default();
        for item in inner.split(',') {
            let item = item.trim().trim_start_matches("type ").trim();
            let exported = match item.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => item,
            };
            if let Some(name) = ident(exported) {
                out.export(name);
            }
        }
        if let Some(source) = import_source(rest) {
            out.import(source);
        }
        return;
    }

    if let Some(star) = rest.strip_prefix('*') {
        if let Some(alias) = keyword(star.trim_start(), "as") {
            if let Some(name) = ident(alias) {
                out.export(name);
            }
        }
        if let Some(source) = import_source(star) {
            out.import(source);
        }
        return;
    }

    if let Some(name) = declaration(rest, out) {
        out.export(&name);
    }
}

/// `module.exports = { a, b: c }`, `module.exports = Name`, `module.exports.x = ...`.
fn scan_module_exports(rest: &str, out: &mut Collector) {
    if let Some(member) = rest.strip_prefix('.') {
        if let Some(name) = ident(member) {
            out.export(name);
            if is_function_value(member) {
                out.function(name);
            }
        }
        return;
    }

    let Some(value) = rest.strip_prefix('=') else {
        return;
    };
    let value = value.trim();
    if let Some(object) = value.strip_prefix('{') {
        let inner = object.split('}').next().unwrap_or_default();
        for item in inner.split(',') {
            let key = item.split(':').next().unwrap_or_default().trim();
            if let Some(name) = ident(key) {
                out.export(name);
            }
        }
    } else if let Some(name) = declaration(value, out).or_else(|| ident(value).map(str::to_string)) {
        if name != "require" {
            out.export(&name);
        }
    }
}

/// Record a declaration and return its name.
fn declaration(line: &str, out: &mut Collector) -> Option<String> {
    let (rest, _) = strip_modifiers(line, DECL_MODIFIERS);

    if let Some(after) = rest
        .strip_prefix("function")
        .filter(|a| a.starts_with(|c: char| c.is_whitespace() || c == '*'))
    {
        let after = after.trim_start_matches(|c: char| c.is_whitespace() || c == '*');
        let name = ident(after)?;
        out.function(name);
        return Some(name.to_string());
    }
    if let Some(after) = keyword(rest, "class") {
        let name = ident(after)?;
        out.class(name);
        return Some(name.to_string());
    }
    if let Some(after) = keyword(rest, "interface") {
        let name = ident(after)?;
        out.type_name(name);
        return Some(name.to_string());
    }
    if let Some(after) = keyword(rest, "type") {
        let name = ident(after)?;
        let tail = after[name.len()..].trim_start();
        if tail.starts_with('=') || tail.starts_with('<') {
            out.type_name(name);
            return Some(name.to_string());
        }
        return None;
    }
    if let Some(after) = keyword(rest, "enum") {
        let name = ident(after)?;
        out.type_name(name);
        return Some(name.to_string());
    }
    if let Some(after) = keyword(rest, "namespace").or_else(|| keyword(rest, "module")) {
        let name = ident(after)?;
        out.type_name(name);
        return Some(name.to_string());
    }

    for binding in ["const", "let", "var"] {
        if let Some(after) = keyword(rest, binding) {
            if let Some(after_enum) = keyword(after, "enum") {
                let name = ident(after_enum)?;
                out.type_name(name);
                return Some(name.to_string());
            }
            let name = ident(after)?;
            if is_function_value(after) {
                out.function(name);
            }
            return Some(name.to_string());
        }
    }

    None
}

/// Whether a `name = value` binding holds a function or arrow function.
fn is_function_value(binding: &str) -> bool {
    let Some((_, value)) = binding.split_once('=') else {
        return false;
    };
    let value = value.trim_start();
    if value.starts_with('>') || value.starts_with('=') {
        // `==`/`=>` belonged to the name side, not an assignment.
        return false;
    }
    let value = value.strip_prefix("async").map(str::trim_start).unwrap_or(value);
    value.starts_with("function") || value.contains("=>")
}
