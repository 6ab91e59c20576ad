//! C# scanner. `public` members and types are exported.

use super::{
    ident, keyword, method_name, strip_modifiers, BlockComments, Collector, StructuralSummary,
};

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "internal",
    "static",
    "abstract",
    "sealed",
    "partial",
    "virtual",
    "override",
    "async",
    "readonly",
    "unsafe",
    "extern",
    "new",
    "required",
    "file",
    "const",
];

pub(super) fn scan(content: &str) -> StructuralSummary {
    let mut out = Collector::default();
    let mut comments = BlockComments::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('[') || line.starts_with('#') {
            continue;
        }
        if comments.skip(line) {
            continue;
        }

        let using_line = keyword(line, "global").unwrap_or(line);
        if let Some(rest) = keyword(using_line, "using") {
            // `using (var x = ...)` and `using var x` are statements.
            if !rest.starts_with('(') && keyword(rest, "var").is_none() {
                let rest = keyword(rest, "static").unwrap_or(rest);
                let target = rest.split_once('=').map(|(_, t)| t).unwrap_or(rest);
                out.import(target.trim().trim_end_matches(';').trim());
                continue;
            }
        }
        if keyword(line, "namespace").is_some() {
            continue;
        }

        let (decl, modifiers) = strip_modifiers(line, MODIFIERS);
        let exported = modifiers.contains(&"public");

        let name = if let Some(rest) = keyword(decl, "record") {
            let rest = keyword(rest, "struct")
                .or_else(|| keyword(rest, "class"))
                .unwrap_or(rest);
            ident(rest).inspect(|n| out.class(n))
        } else if let Some(rest) = keyword(decl, "class").or_else(|| keyword(decl, "struct")) {
            ident(rest).inspect(|n| out.class(n))
        } else if let Some(rest) = keyword(decl, "interface").or_else(|| keyword(decl, "enum")) {
            ident(rest).inspect(|n| out.type_name(n))
        } else if is_property_or_field(decl) {
            None
        } else {
            method_name(decl, !modifiers.is_empty()).inspect(|n| out.function(n))
        };

        if let (Some(name), true) = (name, exported) {
            out.export(name);
        }
    }

    out.finish()
}

/// `public string Name { get; set; }` or `int count = 0;`
fn is_property_or_field(decl: &str) -> bool {
    match (decl.find('('), decl.find(['{', '='])) {
        (None, _) => true,
        (Some(paren), Some(other)) => other < paren,
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csharp_surface() {
        let src = r#"
using System;
using static System.Math;
global using Acme.Core;
using Json = System.Text.Json.JsonSerializer;

namespace Acme.Orders;

/// <summary>Order service.</summary>
[ApiController]
public sealed class OrderService : IOrderService
{
    private readonly IRepository _repo;
    public string Name { get; set; }

    public OrderService(IRepository repo)
    {
        _repo = repo;
    }

    public async Task<Order> GetAsync(Guid id)
    {
        using (var scope = _repo.Begin())
        {
            Console.WriteLine(id);
        }
        using var other = _repo.Begin();
        return await _repo.FindAsync(id);
    }

    private static int Clamp(int value) => Math.Max(0, value);
}

public interface IOrderService {}
internal enum Status { Open }
public record struct Money(decimal Amount);
public record Customer(string Id);
struct Point {}
"#;
        let s = scan(src);
        assert_eq!(
            s.imports,
            vec![
                "System",
                "System.Math",
                "Acme.Core",
                "System.Text.Json.JsonSerializer"
            ]
        );
        assert_eq!(s.classes, vec!["OrderService", "Money", "Customer", "Point"]);
        assert_eq!(s.types, vec!["IOrderService", "Status"]);
        assert_eq!(s.functions, vec!["OrderService", "GetAsync", "Clamp"]);
        assert_eq!(
            s.exports,
            vec!["OrderService", "GetAsync", "IOrderService", "Money", "Customer"]
        );
    }
}
