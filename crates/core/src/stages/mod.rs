//! # Stages
//!
//! Pure transforms over a [`PipelineState`] value. Each stage makes its
//! delegated calls and returns a [`StageOutput`]; committing that output to
//! the session store is the executor's job.

pub mod prompts;
pub mod research;
pub mod write;

use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::PipelineStage;
use crate::session::PipelineState;
use crate::tools::{Searcher, TextGenerator};

pub use research::ResearchStage;
pub use write::WriteStage;

/// Result of one stage invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    ResearchNotes(String),
    Draft {
        text: String,
        /// Produced from reviewer feedback rather than from scratch
        revised: bool,
    },
}

/// Collaborators shared by all stages
#[derive(Clone)]
pub struct StageContext {
    pub generator: Arc<dyn TextGenerator>,
    pub searcher: Arc<dyn Searcher>,
}

impl StageContext {
    pub fn new(generator: Arc<dyn TextGenerator>, searcher: Arc<dyn Searcher>) -> Self {
        Self {
            generator,
            searcher,
        }
    }
}

/// Dispatch a runnable stage
pub async fn run_stage(
    stage: PipelineStage,
    ctx: &StageContext,
    state: &PipelineState,
) -> PipelineResult<StageOutput> {
    match stage {
        PipelineStage::Research => ResearchStage::run(ctx, state).await,
        PipelineStage::Write => WriteStage::run(ctx, state).await,
        PipelineStage::Checkpoint | PipelineStage::Done => Err(PipelineError::upstream(
            stage,
            "stage has no work to run",
        )),
    }
}

/// Reject blank model output
pub(crate) fn require_text(stage: PipelineStage, text: String) -> PipelineResult<String> {
    if text.trim().is_empty() {
        return Err(PipelineError::upstream(stage, "model returned empty output"));
    }
    Ok(text)
}
