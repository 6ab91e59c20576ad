//! Incremental resync.
//!
//! Compares the stored module paths with the live eligible tree:
//!
//! - **removed** paths lose their module row and its embeddings
//! - **added** paths are fetched and indexed like a full run
//! - **unchanged** paths are left alone, content included
//!
//! Only the added modules are summarized; synthesis always runs. The final
//! `module_count` comes from a count query since rows were deleted.

use anyhow::{Context, Result};
use std::collections::BTreeSet;

use crate::indexer::{owner_and_repo, Pipeline, RunReport};
use crate::models::Connection;

/// Path sets produced by [`diff_paths`], each sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

pub fn diff_paths(stored: &[String], live: &[String]) -> SyncDelta {
    let stored: BTreeSet<&str> = stored.iter().map(String::as_str).collect();
    let live: BTreeSet<&str> = live.iter().map(String::as_str).collect();

    SyncDelta {
        added: live.difference(&stored).map(|p| p.to_string()).collect(),
        removed: stored.difference(&live).map(|p| p.to_string()).collect(),
        unchanged: stored.intersection(&live).map(|p| p.to_string()).collect(),
    }
}

impl Pipeline {
    /// Reconcile the stored modules of a connection with its live tree.
    pub async fn run_resync(&self, connection_id: &str, force: bool) -> Result<RunReport> {
        let connection = self.begin_run(connection_id, force).await?;
        self.run_claimed_resync(connection).await
    }

    /// Resync of a connection already claimed with [`Pipeline::begin_run`].
    pub async fn run_claimed_resync(&self, connection: Connection) -> Result<RunReport> {
        match self.resync(&connection).await {
            Ok(report) => Ok(report),
            Err(err) => Err(self.fail_run(&connection, err).await),
        }
    }

    async fn resync(&self, connection: &Connection) -> Result<RunReport> {
        let (owner, repo) = owner_and_repo(connection)?;
        let live = self.list_eligible(connection, owner, repo).await?;
        let stored = self.store.module_paths(&connection.id).await?;
        let delta = diff_paths(&stored, &live);

        tracing::info!(
            connection_id = %connection.id,
            added = delta.added.len(),
            removed = delta.removed.len(),
            unchanged = delta.unchanged.len(),
            "Resync delta"
        );

        let removed = self
            .store
            .delete_modules(&connection.id, &delta.removed)
            .await?;

        let outcome = self
            .index_paths(
                connection,
                owner,
                repo,
                &delta.added,
                delta.unchanged.len() as i64,
            )
            .await?;

        let inserted = self.store.modules_by_ids(&outcome.module_ids).await?;
        let summary = self.summarize_modules(inserted).await;
        let architecture = self
            .synthesize_architecture(&connection.workspace_id)
            .await
            .context("Architecture synthesis failed")?;

        let module_count = self.store.count_modules(&connection.id).await?;
        self.finish_run(connection, module_count).await?;

        Ok(RunReport {
            eligible: live.len(),
            indexed: outcome.module_ids.len(),
            skipped: outcome.skipped,
            failed: outcome.failed,
            removed: removed as usize,
            summary,
            architecture_updated: architecture.is_some(),
            module_count,
        })
    }
}
