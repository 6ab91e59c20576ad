//! Full index runs.
//!
//! A run moves a connection `pending|ready|error → syncing → ready|error`:
//!
//! 1. claim the connection ([`Store::try_begin_sync`]); a connection that
//!    is already syncing is refused with [`RunError::AlreadySyncing`]
//! 2. list the tree, filter to eligible files, persist `file_count`
//! 3. fetch and index files in batches of `indexing.batch_size`, pausing
//!    `indexing.batch_delay_ms` between batches; files inside a batch are
//!    processed concurrently
//! 4. persist the running `module_count` after every batch
//! 5. summarize modules lacking a summary ([`Pipeline::summarize_modules`])
//! 6. synthesize the workspace architecture document
//! 7. mark the connection ready
//!
//! A failure of one file is logged and the file skipped, unless it is an
//! auth or rate-limit failure: those, like every error outside the per-file
//! step, abort the run and record a readable message on the connection.
//! Modules stored before the failure stay in place.

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, IndexingConfig};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{classify, describe_failure, FailureKind, RunError, SourceError};
use crate::filter;
use crate::generation::{self, TextGenerator};
use crate::github::{GitHubClient, RepoSource};
use crate::models::{Connection, ConnectionStatus, ModuleType, NewModule};
use crate::parser::{self, StructuralSummary};
use crate::progress::{IndexProgressEvent, IndexProgressReporter, NoProgress};
use crate::store::Store;
use crate::summarize::SummaryStats;

/// Knobs the pipeline reads at run time.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub indexing: IndexingConfig,
    pub summary_max_tokens: u32,
    pub synthesis_max_tokens: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            indexing: config.indexing.clone(),
            summary_max_tokens: config.generation.summary_max_tokens,
            synthesis_max_tokens: config.generation.synthesis_max_tokens,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            indexing: IndexingConfig::default(),
            summary_max_tokens: 300,
            synthesis_max_tokens: 4096,
        }
    }
}

/// Outcome of a completed index or resync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Eligible files in the live tree.
    pub eligible: usize,
    /// Files fetched and stored by this run.
    pub indexed: usize,
    /// Files over `max_file_bytes`.
    pub skipped: usize,
    /// Files whose fetch or store failed.
    pub failed: usize,
    /// Modules deleted (resync only).
    pub removed: usize,
    pub summary: SummaryStats,
    pub architecture_updated: bool,
    pub module_count: i64,
}

/// Per-batch indexing totals.
#[derive(Debug, Default)]
pub(crate) struct BatchOutcome {
    pub module_ids: Vec<String>,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Pipeline {
    pub store: Store,
    pub source: Arc<dyn RepoSource>,
    pub generator: Arc<dyn TextGenerator>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub settings: PipelineSettings,
    pub progress: Arc<dyn IndexProgressReporter>,
}

impl Pipeline {
    pub fn new(
        store: Store,
        source: Arc<dyn RepoSource>,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            source,
            generator,
            embedder,
            settings,
            progress: Arc::new(NoProgress),
        }
    }

    /// Build the production pipeline: GitHub source plus the configured
    /// generation and embedding providers.
    pub fn from_config(config: &Config, store: Store) -> Result<Self> {
        let source = GitHubClient::from_config(&config.github)?;
        let generator = generation::create_generator(&config.generation)?;
        let embedder = embedding::create_provider(&config.embedding)?;
        Ok(Self::new(
            store,
            Arc::new(source),
            generator,
            embedder,
            PipelineSettings::from_config(config),
        ))
    }

    pub fn with_progress(mut self, progress: Arc<dyn IndexProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Index every eligible file of the connection's default branch.
    pub async fn run_full_index(&self, connection_id: &str, force: bool) -> Result<RunReport> {
        let connection = self.begin_run(connection_id, force).await?;
        self.run_claimed_index(connection).await
    }

    /// Full index of a connection already claimed with [`Pipeline::begin_run`].
    pub async fn run_claimed_index(&self, connection: Connection) -> Result<RunReport> {
        match self.full_index(&connection).await {
            Ok(report) => Ok(report),
            Err(err) => Err(self.fail_run(&connection, err).await),
        }
    }

    async fn full_index(&self, connection: &Connection) -> Result<RunReport> {
        let (owner, repo) = owner_and_repo(connection)?;
        let eligible = self.list_eligible(connection, owner, repo).await?;

        let outcome = self
            .index_paths(connection, owner, repo, &eligible, 0)
            .await?;

        let pending = self.store.modules_missing_summary(&connection.id).await?;
        let summary = self.summarize_modules(pending).await;
        let architecture = self
            .synthesize_architecture(&connection.workspace_id)
            .await
            .context("Architecture synthesis failed")?;

        let module_count = outcome.module_ids.len() as i64;
        self.finish_run(connection, module_count).await?;

        Ok(RunReport {
            eligible: eligible.len(),
            indexed: outcome.module_ids.len(),
            skipped: outcome.skipped,
            failed: outcome.failed,
            removed: 0,
            summary,
            architecture_updated: architecture.is_some(),
            module_count,
        })
    }

    /// Load a connection and move it to `syncing`.
    ///
    /// Fails with [`RunError::ConnectionNotFound`] or, unless `force` is set,
    /// [`RunError::AlreadySyncing`]. Neither failure touches the stored row.
    pub async fn begin_run(&self, connection_id: &str, force: bool) -> Result<Connection> {
        let connection = self
            .store
            .get_connection(connection_id)
            .await?
            .ok_or_else(|| RunError::ConnectionNotFound(connection_id.to_string()))?;

        if !self.store.try_begin_sync(connection_id, force).await? {
            return Err(RunError::AlreadySyncing(connection_id.to_string()).into());
        }

        tracing::info!(
            connection_id,
            repo = %connection.repo_name,
            branch = %connection.default_branch,
            force,
            "Run started"
        );
        self.progress.report(IndexProgressEvent::StatusChanged {
            connection_id: connection_id.to_string(),
            status: ConnectionStatus::Syncing,
        });
        Ok(connection)
    }

    /// Record a fatal error on the connection and hand it back.
    pub(crate) async fn fail_run(&self, connection: &Connection, err: anyhow::Error) -> anyhow::Error {
        let message = describe_failure(&err);
        tracing::error!(connection_id = %connection.id, error = %format!("{:#}", err), "Run failed");

        if let Err(store_err) = self.store.mark_error(&connection.id, &message).await {
            tracing::warn!(
                connection_id = %connection.id,
                error = %store_err,
                "Failed to record run failure"
            );
        }
        self.progress.report(IndexProgressEvent::StatusChanged {
            connection_id: connection.id.clone(),
            status: ConnectionStatus::Error,
        });
        self.progress.report(IndexProgressEvent::Failed { message });
        err
    }

    pub(crate) async fn finish_run(&self, connection: &Connection, module_count: i64) -> Result<()> {
        self.store.mark_ready(&connection.id, module_count).await?;
        tracing::info!(connection_id = %connection.id, module_count, "Run finished");
        self.progress.report(IndexProgressEvent::StatusChanged {
            connection_id: connection.id.clone(),
            status: ConnectionStatus::Ready,
        });
        self.progress.report(IndexProgressEvent::Finished {
            module_count: module_count.max(0) as u64,
        });
        Ok(())
    }

    /// List the branch, keep eligible blobs and persist their count.
    pub(crate) async fn list_eligible(
        &self,
        connection: &Connection,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<String>> {
        let tree = self
            .source
            .fetch_tree(owner, repo, &connection.default_branch)
            .await
            .with_context(|| {
                format!(
                    "Failed to list {}@{}",
                    connection.repo_name, connection.default_branch
                )
            })?;

        let total = tree.len();
        let eligible: Vec<String> = tree
            .into_iter()
            .filter(|entry| entry.is_file() && filter::is_eligible(&entry.path))
            .map(|entry| entry.path)
            .collect();

        self.store
            .set_file_count(&connection.id, eligible.len() as i64)
            .await?;
        tracing::info!(
            connection_id = %connection.id,
            total,
            eligible = eligible.len(),
            "Tree listed"
        );
        self.progress.report(IndexProgressEvent::Listed {
            eligible: eligible.len() as u64,
            total: total as u64,
        });
        Ok(eligible)
    }

    /// Index `paths` batch by batch. After each batch the connection's
    /// `module_count` is set to `base_count` plus the modules stored so far.
    pub(crate) async fn index_paths(
        &self,
        connection: &Connection,
        owner: &str,
        repo: &str,
        paths: &[String],
        base_count: i64,
    ) -> Result<BatchOutcome> {
        let batch_size = self.settings.indexing.batch_size.max(1);
        let batches = paths.len().div_ceil(batch_size);
        let mut outcome = BatchOutcome::default();

        for (i, batch) in paths.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.indexing.batch_delay()).await;
            }

            let results = join_all(
                batch
                    .iter()
                    .map(|path| self.index_file(connection, owner, repo, path)),
            )
            .await;

            for (path, result) in batch.iter().zip(results) {
                match result {
                    Ok(Some(id)) => outcome.module_ids.push(id),
                    Ok(None) => outcome.skipped += 1,
                    Err(err) => match classify(&err) {
                        // Credentials and quota are run-wide.
                        FailureKind::Auth | FailureKind::RateLimited => return Err(err),
                        _ => {
                            tracing::warn!(
                                connection_id = %connection.id,
                                path = %path,
                                error = %format!("{:#}", err),
                                "Skipping file"
                            );
                            outcome.failed += 1;
                        }
                    },
                }
            }

            let module_count = base_count + outcome.module_ids.len() as i64;
            self.store
                .set_module_count(&connection.id, module_count)
                .await?;
            self.progress.report(IndexProgressEvent::BatchCompleted {
                batch: i as u64 + 1,
                batches: batches as u64,
                module_count: module_count.max(0) as u64,
            });
        }

        Ok(outcome)
    }

    /// Fetch, scan and store one file. `Ok(None)` means the file was
    /// skipped for size.
    pub async fn index_file(
        &self,
        connection: &Connection,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<String>> {
        let content = match self
            .source
            .fetch_file_content(owner, repo, path, &connection.default_branch)
            .await
        {
            Ok(content) => content,
            Err(SourceError::TooLarge { size, .. }) => {
                tracing::debug!(
                    connection_id = %connection.id,
                    path,
                    bytes = ?size,
                    "Skipping file too large to fetch"
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if content.len() > self.settings.indexing.max_file_bytes {
            tracing::debug!(
                connection_id = %connection.id,
                path,
                bytes = content.len(),
                "Skipping oversized file"
            );
            return Ok(None);
        }

        let language = filter::detect_language(path);
        let structure = language
            .map(|lang| parser::parse(&content, lang))
            .unwrap_or_else(StructuralSummary::default);

        let module = NewModule {
            connection_id: connection.id.clone(),
            file_path: path.to_string(),
            module_name: filter::module_name(path),
            module_type: filter::detect_module_type(path).unwrap_or(ModuleType::Unknown),
            language,
            raw_content: content,
            dependencies: structure.imports,
            exports: structure.exports,
            functions: structure.functions,
            classes: structure.classes,
            types: structure.types,
        };

        let id = self.store.upsert_module(&module).await?;
        tracing::debug!(connection_id = %connection.id, path, module_id = %id, "Indexed file");
        Ok(Some(id))
    }
}

pub(crate) fn owner_and_repo(connection: &Connection) -> Result<(&str, &str)> {
    connection
        .owner_and_repo()
        .ok_or_else(|| RunError::InvalidRepoName(connection.repo_name.clone()).into())
}
