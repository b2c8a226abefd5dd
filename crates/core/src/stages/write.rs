use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::PipelineStage;
use crate::session::PipelineState;

use super::{prompts, require_text, StageContext, StageOutput};

/// Draft the article, or revise it when feedback is pending
pub struct WriteStage;

impl WriteStage {
    pub async fn run(ctx: &StageContext, state: &PipelineState) -> PipelineResult<StageOutput> {
        let stage = PipelineStage::Write;

        let (prompt, revised) = match state.human_feedback.as_deref() {
            Some(feedback) => {
                tracing::info!(revision_count = state.revision_count, "Revising draft");
                let prompt = prompts::revision_prompt(
                    &state.topic,
                    &state.research_notes,
                    &state.draft,
                    feedback,
                );
                (prompt, true)
            }
            None => {
                tracing::info!("Writing first draft");
                (prompts::draft_prompt(&state.topic, &state.research_notes), false)
            }
        };

        let text = ctx
            .generator
            .generate(stage, &prompt)
            .await
            .map_err(|e| PipelineError::upstream(stage, format!("{:#}", e)))?;
        let text = require_text(stage, text)?;

        tracing::info!(chars = text.len(), revised, "Draft complete");
        Ok(StageOutput::Draft { text, revised })
    }
}
