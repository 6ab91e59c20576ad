//! Architecture synthesis.
//!
//! Folds every module summary of a workspace into one prompt for the
//! strong model and stores the reply as the workspace's single
//! `architecture_summary` artifact. The reply is read as plain narrative
//! text, so the model is told to avoid markup; whatever comes back is
//! stored trimmed and otherwise as is.

use anyhow::Result;

use crate::generation::{GenerationRequest, ModelTier};
use crate::indexer::Pipeline;
use crate::models::{ArchitectureSummary, Module};
use crate::progress::IndexProgressEvent;
use crate::summarize::list_or_none;

pub const ARCHITECTURE_TITLE: &str = "Architecture Overview";

const SYNTHESIS_INSTRUCTION: &str = "You write architecture overviews of software systems \
from summaries of their source files. Write plain text only. Do not use Markdown or any other \
markup: no '#' headings, no bullet or numbered list markers, no tables, no code fences, no bold \
or italics. Write in plain paragraphs. Start each section with a label in capital letters on a \
line of its own, for example OVERVIEW, MAJOR COMPONENTS, DATA FLOW, EXTERNAL INTEGRATIONS.";

impl Pipeline {
    /// Regenerate the architecture summary of `workspace_id`.
    ///
    /// Returns `Ok(None)` when no module has a summary yet or text
    /// generation is disabled. Generation errors are returned to the caller.
    pub async fn synthesize_architecture(
        &self,
        workspace_id: &str,
    ) -> Result<Option<ArchitectureSummary>> {
        let modules = self
            .store
            .summarized_modules_for_workspace(workspace_id)
            .await?;
        if modules.is_empty() {
            tracing::debug!(workspace_id, "No summarized modules, skipping synthesis");
            return Ok(None);
        }
        if !self.generator.is_enabled() {
            tracing::info!(workspace_id, "Text generation disabled, skipping synthesis");
            return Ok(None);
        }

        self.progress.report(IndexProgressEvent::Synthesizing {
            modules: modules.len() as u64,
        });

        let request = GenerationRequest {
            tier: ModelTier::Strong,
            system: Some(SYNTHESIS_INSTRUCTION.to_string()),
            prompt: synthesis_prompt(&modules),
            max_tokens: self.settings.synthesis_max_tokens,
        };
        let content = self.generator.generate(&request).await?;

        let summary = self
            .store
            .upsert_architecture_summary(workspace_id, ARCHITECTURE_TITLE, content.trim())
            .await?;
        tracing::info!(
            workspace_id,
            modules = modules.len(),
            "Architecture summary updated"
        );
        Ok(Some(summary))
    }
}

fn synthesis_prompt(modules: &[Module]) -> String {
    let mut prompt = format!(
        "Describe the architecture of the system made of these {} modules.\n",
        modules.len()
    );
    for module in modules {
        prompt.push_str(&format!(
            "\nModule: {}\nType: {}\nLanguage: {}\nExports: {}\nSummary: {}\n",
            module.file_path,
            module.module_type,
            module.language.as_deref().unwrap_or("unknown"),
            list_or_none(&module.exports),
            module.summary.as_deref().unwrap_or_default().trim()
        ));
    }
    prompt
}
