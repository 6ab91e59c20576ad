//! In-memory fakes for the pipeline's external seams, plus a harness that
//! wires them to a temporary SQLite database.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use repo_indexer::config::IndexingConfig;
use repo_indexer::db;
use repo_indexer::embedding::EmbeddingProvider;
use repo_indexer::error::SourceError;
use repo_indexer::generation::{GenerationRequest, ModelTier, TextGenerator};
use repo_indexer::github::{GitHubUser, RepoSource, TreeEntry};
use repo_indexer::indexer::{Pipeline, PipelineSettings};
use repo_indexer::migrate;
use repo_indexer::models::{Connection, ConnectionStatus};
use repo_indexer::progress::{IndexProgressEvent, IndexProgressReporter};
use repo_indexer::store::Store;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ─── Repository ─────────────────────────────────────────────────────

/// A repository whose tree is whatever was last put into it.
#[derive(Default)]
pub struct FakeRepo {
    files: Mutex<BTreeMap<String, String>>,
    broken: Mutex<BTreeSet<String>>,
    too_large: Mutex<BTreeSet<String>>,
    unauthorized: Mutex<BTreeSet<String>>,
    missing_tree: AtomicBool,
    fetched: Mutex<Vec<String>>,
}

impl FakeRepo {
    pub fn new(files: &[(&str, &str)]) -> Arc<Self> {
        let repo = Self::default();
        repo.set_files(files);
        Arc::new(repo)
    }

    /// Replace the whole tree.
    pub fn set_files(&self, files: &[(&str, &str)]) {
        let mut map = self.files.lock().unwrap();
        map.clear();
        for (path, content) in files {
            map.insert(path.to_string(), content.to_string());
        }
    }

    /// Fetching `path` fails with HTTP 500.
    pub fn break_file(&self, path: &str) {
        self.broken.lock().unwrap().insert(path.to_string());
    }

    /// Fetching `path` reports content not returned inline.
    pub fn make_too_large(&self, path: &str) {
        self.too_large.lock().unwrap().insert(path.to_string());
    }

    /// Fetching `path` fails as if the token had been revoked.
    pub fn revoke_token_at(&self, path: &str) {
        self.unauthorized.lock().unwrap().insert(path.to_string());
    }

    /// Listing the tree fails with 404.
    pub fn lose_tree(&self) {
        self.missing_tree.store(true, Ordering::SeqCst);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn clear_fetched(&self) {
        self.fetched.lock().unwrap().clear();
    }
}

#[async_trait]
impl RepoSource for FakeRepo {
    async fn fetch_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<TreeEntry>, SourceError> {
        if self.missing_tree.load(Ordering::SeqCst) {
            return Err(SourceError::NotFound(format!("{}/{}@{}", owner, repo, branch)));
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .map(|path| TreeEntry::blob(path.clone()))
            .collect())
    }

    async fn fetch_file_content(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        _reference: &str,
    ) -> Result<String, SourceError> {
        self.fetched.lock().unwrap().push(path.to_string());
        if self.broken.lock().unwrap().contains(path) {
            return Err(SourceError::Fetch {
                path: path.to_string(),
                status: 500,
            });
        }
        if self.too_large.lock().unwrap().contains(path) {
            return Err(SourceError::TooLarge {
                path: path.to_string(),
                size: Some(2 * 1024 * 1024),
            });
        }
        if self.unauthorized.lock().unwrap().contains(path) {
            return Err(SourceError::Unauthorized);
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    async fn fetch_default_branch(&self, _owner: &str, _repo: &str) -> Result<String, SourceError> {
        Ok("main".to_string())
    }

    async fn fetch_user(&self) -> Result<GitHubUser, SourceError> {
        Ok(GitHubUser {
            login: "tester".to_string(),
            name: None,
        })
    }
}

// ─── Generation ─────────────────────────────────────────────────────

/// Summaries read "Summary of <path>."; synthesis returns a fixed overview.
#[derive(Default)]
pub struct FakeGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
    failing_paths: Mutex<BTreeSet<String>>,
    fail_synthesis: AtomicBool,
}

pub const OVERVIEW: &str = "OVERVIEW\nA small web application.";

impl FakeGenerator {
    pub fn fail_summary_for(&self, path: &str) {
        self.failing_paths.lock().unwrap().insert(path.to_string());
    }

    pub fn fail_synthesis(&self) {
        self.fail_synthesis.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self, tier: ModelTier) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.tier == tier)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match request.tier {
            ModelTier::Fast => {
                let path = request
                    .prompt
                    .lines()
                    .find_map(|line| line.strip_prefix("File: "))
                    .unwrap_or("unknown")
                    .to_string();
                if self.failing_paths.lock().unwrap().contains(&path) {
                    bail!("model overloaded");
                }
                Ok(format!("Summary of {}.", path))
            }
            ModelTier::Strong => {
                if self.fail_synthesis.load(Ordering::SeqCst) {
                    bail!("synthesis model unavailable");
                }
                Ok(format!("\n  {}  \n", OVERVIEW))
            }
        }
    }
}

// ─── Embedding ──────────────────────────────────────────────────────

pub struct FakeEmbedder;

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embed"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32, 1.0, 0.5])
            .collect())
    }
}

// ─── Progress ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<IndexProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<IndexProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                IndexProgressEvent::StatusChanged { status, .. } => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn batch_module_counts(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                IndexProgressEvent::BatchCompleted { module_count, .. } => Some(module_count),
                _ => None,
            })
            .collect()
    }
}

impl IndexProgressReporter for RecordingProgress {
    fn report(&self, event: IndexProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ─── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub tmp: TempDir,
    pub store: Store,
    pub repo: Arc<FakeRepo>,
    pub generator: Arc<FakeGenerator>,
    pub progress: Arc<RecordingProgress>,
    pub pipeline: Pipeline,
    pub connection: Connection,
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        indexing: IndexingConfig {
            batch_delay_ms: 0,
            ..IndexingConfig::default()
        },
        ..PipelineSettings::default()
    }
}

pub async fn test_store(tmp: &TempDir) -> Store {
    let pool = db::connect_path(&tmp.path().join("index.sqlite"))
        .await
        .unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    Store::new(pool)
}

/// Pipeline over fakes with one pending connection `acme/web@main` in
/// workspace `ws1`.
pub async fn harness(files: &[(&str, &str)]) -> Harness {
    let tmp = TempDir::new().unwrap();
    let store = test_store(&tmp).await;
    let repo = FakeRepo::new(files);
    let generator = Arc::new(FakeGenerator::default());
    let progress = Arc::new(RecordingProgress::default());

    let pipeline = Pipeline::new(
        store.clone(),
        repo.clone(),
        generator.clone(),
        Arc::new(FakeEmbedder),
        settings(),
    )
    .with_progress(progress.clone());

    let connection = store
        .create_connection("ws1", "acme/web", "main")
        .await
        .unwrap();

    Harness {
        tmp,
        store,
        repo,
        generator,
        progress,
        pipeline,
        connection,
    }
}

impl Harness {
    pub async fn reload(&self) -> Connection {
        self.store
            .get_connection(&self.connection.id)
            .await
            .unwrap()
            .unwrap()
    }
}

/// `count` small TypeScript service files: `src/services/f0.ts`, ...
pub fn service_files(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| {
            (
                format!("src/services/f{}.ts", i),
                format!("import {{ db }} from './db';\nexport function handler{}() {{}}\n", i),
            )
        })
        .collect()
}

pub fn as_refs(files: &[(String, String)]) -> Vec<(&str, &str)> {
    files
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect()
}
