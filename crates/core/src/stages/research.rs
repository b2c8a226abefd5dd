use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::PipelineStage;
use crate::session::PipelineState;

use super::{prompts, require_text, StageContext, StageOutput};

/// Search the topic, then condense the results into research notes
pub struct ResearchStage;

impl ResearchStage {
    pub async fn run(ctx: &StageContext, state: &PipelineState) -> PipelineResult<StageOutput> {
        let stage = PipelineStage::Research;
        tracing::info!(topic = %state.topic, "Researching topic");

        let results = ctx
            .searcher
            .search(&state.topic)
            .await
            .map_err(|e| PipelineError::upstream(stage, format!("search failed: {:#}", e)))?;

        let prompt = prompts::research_prompt(&state.topic, &results);
        let notes = ctx
            .generator
            .generate(stage, &prompt)
            .await
            .map_err(|e| PipelineError::upstream(stage, format!("{:#}", e)))?;
        let notes = require_text(stage, notes)?;

        tracing::info!(chars = notes.len(), "Research complete");
        Ok(StageOutput::ResearchNotes(notes))
    }
}
