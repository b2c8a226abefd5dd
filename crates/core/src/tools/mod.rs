//! # Collaborators
//!
//! The two external capabilities the stages delegate to. Production
//! implementations live here; test doubles live in `crate::testing`
//! behind the `testing` feature.

pub mod llm;
pub mod search;

use async_trait::async_trait;

use crate::pipeline::PipelineStage;

pub use llm::LlmGenerator;
pub use search::{placeholder_notes, SearchHit, WebSearcher};

/// `GenerateText(prompt) -> text`
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`. `stage` selects per-stage model overrides.
    async fn generate(&self, stage: PipelineStage, prompt: &str) -> anyhow::Result<String>;
}

/// `Search(topic) -> notes`
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, topic: &str) -> anyhow::Result<String>;
}
