//! File eligibility, language detection and module classification.
//!
//! All functions here are pure path inspections: nothing is read from
//! disk or the network. Paths are repository-relative and `/`-separated,
//! exactly as the Git trees API returns them.

use crate::models::{Language, ModuleType};

/// Directory names that disqualify any path containing them.
const DENIED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    ".svelte-kit",
    "coverage",
    "vendor",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    ".cache",
    ".turbo",
    ".idea",
    ".vscode",
];

/// Generated lockfiles, excluded by exact file name.
const DENIED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "Gemfile.lock",
    "poetry.lock",
    "composer.lock",
    "go.sum",
];

const EXTENSION_LANGUAGES: &[(&str, Language)] = &[
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("mts", Language::TypeScript),
    ("cts", Language::TypeScript),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("py", Language::Python),
    ("go", Language::Go),
    ("rs", Language::Rust),
    ("java", Language::Java),
    ("kt", Language::Kotlin),
    ("kts", Language::Kotlin),
    ("swift", Language::Swift),
    ("rb", Language::Ruby),
    ("php", Language::Php),
    ("cs", Language::CSharp),
    ("c", Language::C),
    ("h", Language::C),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("hpp", Language::Cpp),
    ("vue", Language::Vue),
    ("svelte", Language::Svelte),
    ("json", Language::Json),
    ("yaml", Language::Yaml),
    ("yml", Language::Yaml),
    ("toml", Language::Toml),
    ("sql", Language::Sql),
    ("sh", Language::Shell),
];

/// Directory-segment hints, checked in this order after the test check.
const TYPE_SEGMENTS: &[(ModuleType, &[&str])] = &[
    (
        ModuleType::Component,
        &["components", "component", "widgets", "ui"],
    ),
    (
        ModuleType::Service,
        &["services", "service", "providers", "clients"],
    ),
    (
        ModuleType::Model,
        &["models", "model", "entities", "schemas", "schema", "types"],
    ),
    (
        ModuleType::Route,
        &[
            "routes",
            "route",
            "pages",
            "api",
            "controllers",
            "handlers",
            "endpoints",
        ],
    ),
    (
        ModuleType::Utility,
        &["utils", "util", "lib", "helpers", "helper", "common", "shared"],
    ),
    (ModuleType::Config, &["config", "configs", "settings"]),
];

/// Whether `path` should be fetched and indexed.
pub fn is_eligible(path: &str) -> bool {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(file_name) = segments.pop() else {
        return false;
    };

    if segments.iter().any(|dir| DENIED_DIRS.contains(dir)) {
        return false;
    }
    if DENIED_FILES.contains(&file_name) || file_name.starts_with('.') {
        return false;
    }

    detect_language(path).is_some()
}

/// Map a path's extension to a language.
pub fn detect_language(path: &str) -> Option<Language> {
    let ext = extension(file_name(path))?;
    EXTENSION_LANGUAGES
        .iter()
        .find(|(e, _)| ext.eq_ignore_ascii_case(e))
        .map(|(_, lang)| *lang)
}

/// Classify a path by naming and directory conventions.
///
/// Test naming wins over everything else, so `components/button.test.tsx`
/// is a test, not a component.
pub fn detect_module_type(path: &str) -> Option<ModuleType> {
    let name = file_name(path).to_ascii_lowercase();
    let dirs: Vec<String> = directories(path).map(|d| d.to_ascii_lowercase()).collect();

    if is_test_name(&name) || dirs.iter().any(|d| matches!(d.as_str(), "__tests__" | "tests" | "test")) {
        return Some(ModuleType::Test);
    }

    for (module_type, hints) in TYPE_SEGMENTS {
        if dirs.iter().any(|d| hints.contains(&d.as_str())) {
            return Some(*module_type);
        }
    }

    let stem = name.split('.').next().unwrap_or_default();
    if name.contains(".config.")
        || matches!(stem, "config" | "settings")
        || detect_language(path).is_some_and(|l| l.is_config_format())
    {
        return Some(ModuleType::Config);
    }

    None
}

/// Display name for a module: the file stem, or the parent directory for
/// index-style entry files (`index.ts`, `mod.rs`, `__init__.py`).
pub fn module_name(path: &str) -> String {
    let name = file_name(path);
    let stem = name.split('.').next().unwrap_or(name);
    if matches!(stem, "index" | "mod" | "__init__" | "main" | "lib") {
        if let Some(parent) = directories(path).last() {
            return parent.to_string();
        }
    }
    if stem.is_empty() {
        name.to_string()
    } else {
        stem.to_string()
    }
}

fn is_test_name(name: &str) -> bool {
    name.contains(".test.")
        || name.contains(".spec.")
        || name.contains("_test.")
        || name.contains("_spec.")
        || name.starts_with("test_")
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn directories(path: &str) -> impl Iterator<Item = &str> {
    let mut parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    parts.pop();
    parts.into_iter()
}

fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(ext)
    }
}
