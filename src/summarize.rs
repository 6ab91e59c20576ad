//! Summarization stage.
//!
//! Every module without a summary gets a short description from the fast
//! model, followed by an embedding of `path + summary + exports` that is
//! written both onto the module row and into the shared `embeddings`
//! table. Modules are processed in the same batches as indexing.
//!
//! Failures are per module: a failed summary leaves the module untouched,
//! a failed embedding keeps the stored summary. Neither stops the stage.

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;

use crate::embedding::embed_query;
use crate::generation::{GenerationRequest, ModelTier};
use crate::indexer::Pipeline;
use crate::models::{EmbeddingRecord, Module, MODULE_SOURCE_TYPE};
use crate::progress::IndexProgressEvent;

const SUMMARY_INSTRUCTION: &str = "Describe the following source file in 2-3 sentences. \
Cover its purpose, the data it handles, and what it exports. \
Reply with the description only.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub summarized: usize,
    pub embedded: usize,
    /// Modules where summarizing or embedding failed.
    pub failed: usize,
}

enum ModuleOutcome {
    Summarized,
    Embedded,
    EmbeddingFailed,
    Failed,
}

impl Pipeline {
    /// Summarize and embed `modules`. Never fails as a whole.
    pub async fn summarize_modules(&self, modules: Vec<Module>) -> SummaryStats {
        let mut stats = SummaryStats::default();
        if modules.is_empty() {
            return stats;
        }
        if !self.generator.is_enabled() {
            tracing::info!(
                pending = modules.len(),
                "Text generation disabled, skipping summaries"
            );
            return stats;
        }

        self.progress.report(IndexProgressEvent::Summarizing {
            pending: modules.len() as u64,
        });

        let batch_size = self.settings.indexing.batch_size.max(1);
        for (i, batch) in modules.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.indexing.batch_delay()).await;
            }

            let outcomes = join_all(batch.iter().map(|module| self.summarize_one(module))).await;
            for outcome in outcomes {
                match outcome {
                    ModuleOutcome::Summarized => stats.summarized += 1,
                    ModuleOutcome::Embedded => {
                        stats.summarized += 1;
                        stats.embedded += 1;
                    }
                    ModuleOutcome::EmbeddingFailed => {
                        stats.summarized += 1;
                        stats.failed += 1;
                    }
                    ModuleOutcome::Failed => stats.failed += 1,
                }
            }
        }

        tracing::info!(
            summarized = stats.summarized,
            embedded = stats.embedded,
            failed = stats.failed,
            "Summaries complete"
        );
        stats
    }

    async fn summarize_one(&self, module: &Module) -> ModuleOutcome {
        let summary = match self.write_summary(module).await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!(
                    connection_id = %module.connection_id,
                    path = %module.file_path,
                    error = %format!("{:#}", err),
                    "Summarization failed"
                );
                return ModuleOutcome::Failed;
            }
        };

        if !self.embedder.is_enabled() {
            return ModuleOutcome::Summarized;
        }

        match self.write_embedding(module, &summary).await {
            Ok(()) => ModuleOutcome::Embedded,
            Err(err) => {
                tracing::warn!(
                    connection_id = %module.connection_id,
                    path = %module.file_path,
                    error = %format!("{:#}", err),
                    "Embedding failed"
                );
                ModuleOutcome::EmbeddingFailed
            }
        }
    }

    async fn write_summary(&self, module: &Module) -> Result<String> {
        let request = GenerationRequest {
            tier: ModelTier::Fast,
            system: None,
            prompt: summary_prompt(module, self.settings.indexing.summary_prefix_chars),
            max_tokens: self.settings.summary_max_tokens,
        };
        let summary = self.generator.generate(&request).await?;
        let summary = summary.trim();
        self.store.set_summary(&module.id, summary).await?;
        Ok(summary.to_string())
    }

    async fn write_embedding(&self, module: &Module, summary: &str) -> Result<()> {
        let input = embedding_input(module, summary);
        let vector = embed_query(self.embedder.as_ref(), &input).await?;

        self.store.set_module_embedding(&module.id, &vector).await?;
        self.store
            .upsert_embedding(&EmbeddingRecord {
                source_id: module.id.clone(),
                source_type: MODULE_SOURCE_TYPE.to_string(),
                chunk_index: 0,
                content: input,
                vector,
                metadata: serde_json::json!({
                    "file_path": module.file_path,
                    "connection_id": module.connection_id,
                    "module_type": module.module_type.as_str(),
                }),
            })
            .await
    }
}

pub(crate) fn summary_prompt(module: &Module, prefix_chars: usize) -> String {
    format!(
        "{}\n\nFile: {}\nLanguage: {}\nExports: {}\n\n{}",
        SUMMARY_INSTRUCTION,
        module.file_path,
        module.language.as_deref().unwrap_or("unknown"),
        list_or_none(&module.exports),
        content_prefix(&module.raw_content, prefix_chars)
    )
}

/// Text embedded for a module: path, summary, then its exports.
pub(crate) fn embedding_input(module: &Module, summary: &str) -> String {
    let mut input = format!("{}\n{}", module.file_path, summary);
    if !module.exports.is_empty() {
        input.push_str("\nExports: ");
        input.push_str(&module.exports.join(", "));
    }
    input
}

/// First `max_chars` characters of `text`.
pub(crate) fn content_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

pub(crate) fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
