//! Core data models for the indexing pipeline.
//!
//! These types represent the linked repositories, indexed modules, embedding
//! records and the workspace architecture summary that flow through a full
//! index or a resync run.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Sync state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Syncing,
    Ready,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Syncing => "syncing",
            ConnectionStatus::Ready => "ready",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConnectionStatus::Pending),
            "syncing" => Ok(ConnectionStatus::Syncing),
            "ready" => Ok(ConnectionStatus::Ready),
            "error" => Ok(ConnectionStatus::Error),
            other => anyhow::bail!("Unknown connection status: '{}'", other),
        }
    }
}

/// A linked repository plus its sync state for one workspace.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: String,
    pub workspace_id: String,
    /// `owner/repo`.
    pub repo_name: String,
    pub default_branch: String,
    pub status: ConnectionStatus,
    pub file_count: i64,
    pub module_count: i64,
    pub last_synced_at: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: i64,
}

impl Connection {
    /// Split `repo_name` into `(owner, repo)`.
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        split_repo_name(&self.repo_name)
    }
}

/// Split an `owner/repo` string; both halves must be non-empty.
pub fn split_repo_name(repo_name: &str) -> Option<(&str, &str)> {
    let (owner, repo) = repo_name.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner, repo))
}

/// Coarse role of a file inside its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Component,
    Service,
    Model,
    Route,
    Utility,
    Config,
    Test,
    Unknown,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Component => "component",
            ModuleType::Service => "service",
            ModuleType::Model => "model",
            ModuleType::Route => "route",
            ModuleType::Utility => "utility",
            ModuleType::Config => "config",
            ModuleType::Test => "test",
            ModuleType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "component" => Ok(ModuleType::Component),
            "service" => Ok(ModuleType::Service),
            "model" => Ok(ModuleType::Model),
            "route" => Ok(ModuleType::Route),
            "utility" => Ok(ModuleType::Utility),
            "config" => Ok(ModuleType::Config),
            "test" => Ok(ModuleType::Test),
            "unknown" => Ok(ModuleType::Unknown),
            other => anyhow::bail!(
                "Unknown module type: '{}'. Must be component, service, model, route, utility, config, test, or unknown.",
                other
            ),
        }
    }
}

/// Languages the file filter can recognise by extension.
///
/// Only a subset has a structural scanner; see [`crate::parser::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Rust,
    Java,
    Kotlin,
    Swift,
    Ruby,
    Php,
    CSharp,
    C,
    Cpp,
    Vue,
    Svelte,
    Json,
    Yaml,
    Toml,
    Sql,
    Shell,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::CSharp => "csharp",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Vue => "vue",
            Language::Svelte => "svelte",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Sql => "sql",
            Language::Shell => "shell",
        }
    }

    /// Data/config formats rather than programming languages.
    pub fn is_config_format(&self) -> bool {
        matches!(self, Language::Json | Language::Yaml | Language::Toml)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module row as produced by the per-file indexing step.
#[derive(Debug, Clone)]
pub struct NewModule {
    pub connection_id: String,
    pub file_path: String,
    pub module_name: String,
    pub module_type: ModuleType,
    pub language: Option<Language>,
    pub raw_content: String,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub types: Vec<String>,
}

/// Stored module: one indexed source file.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub id: String,
    pub connection_id: String,
    pub file_path: String,
    pub module_name: String,
    pub module_type: ModuleType,
    /// Kept as text so rows written by older builds still load.
    pub language: Option<String>,
    #[serde(skip_serializing)]
    pub raw_content: String,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub types: Vec<String>,
    pub summary: Option<String>,
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    pub updated_at: i64,
}

/// Source type tag for module embeddings in the shared embedding store.
pub const MODULE_SOURCE_TYPE: &str = "module";

/// One embedded text chunk in the shared embedding store.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub source_id: String,
    pub source_type: String,
    pub chunk_index: i64,
    pub content: String,
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// Artifact type tag for the per-workspace architecture document.
pub const ARCHITECTURE_ARTIFACT_TYPE: &str = "architecture_summary";

#[derive(Debug, Clone, Serialize)]
pub struct ArchitectureSummary {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A hit from the shared embedding store.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingMatch {
    pub source_id: String,
    pub source_type: String,
    pub chunk_index: i64,
    pub content: String,
    pub metadata: serde_json::Value,
    pub score: f32,
}
