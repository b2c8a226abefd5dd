//! # LLM Generator
//!
//! [`TextGenerator`] backed by the `radkit` provider clients. The model is
//! picked per stage from the [`CoordinatorConfig`].

use anyhow::Context;
use async_trait::async_trait;
use radkit::agent::LlmFunction;
use radkit::macros::LLMOutput;
use radkit::models::providers::{
    AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::CoordinatorConfig;
use crate::models::{LlmProvider, ModelConfig};
use crate::pipeline::PipelineStage;

use super::TextGenerator;

/// Free-form model output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct GeneratedText {
    /// The complete response, formatted in Markdown
    pub content: String,
}

pub struct LlmGenerator {
    config: CoordinatorConfig,
}

impl LlmGenerator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    async fn call(&self, stage: PipelineStage, prompt: &str) -> anyhow::Result<String> {
        let model_config = self.config.model_config(stage);
        let output = generate_text(&model_config, prompt.to_string())
            .await
            .with_context(|| {
            format!(
                "{} call failed (provider: {}, model: {})",
                stage,
                model_config.provider.display_name(),
                model_config.model
            )
        })?;
        Ok(output.content)
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, stage: PipelineStage, prompt: &str) -> anyhow::Result<String> {
        tracing::debug!(stage = %stage, prompt_chars = prompt.len(), "Calling LLM");
        let text = self.call(stage, prompt).await?;
        tracing::debug!(stage = %stage, response_chars = text.len(), "LLM responded");
        Ok(text)
    }
}

/// One `GeneratedText` call against whichever provider `config` names
async fn generate_text(config: &ModelConfig, prompt: String) -> anyhow::Result<GeneratedText> {
    let output = match config.provider {
        LlmProvider::Anthropic => {
            let llm = AnthropicLlm::from_env(&config.model)?;
            LlmFunction::<GeneratedText>::new_with_system_instructions(llm, SYSTEM_PROMPT)
                .run(prompt)
                .await?
        }
        LlmProvider::OpenAI => {
            let mut llm = OpenAILlm::from_env(&config.model)?;
            if let Some(base_url) = &config.base_url {
                llm = llm.with_base_url(base_url);
            }
            LlmFunction::<GeneratedText>::new_with_system_instructions(llm, SYSTEM_PROMPT)
                .run(prompt)
                .await?
        }
        LlmProvider::Gemini => {
            let llm = GeminiLlm::from_env(&config.model)?;
            LlmFunction::<GeneratedText>::new_with_system_instructions(llm, SYSTEM_PROMPT)
                .run(prompt)
                .await?
        }
        LlmProvider::OpenRouter => {
            let llm = OpenRouterLlm::from_env(&config.model)?;
            LlmFunction::<GeneratedText>::new_with_system_instructions(llm, SYSTEM_PROMPT)
                .run(prompt)
                .await?
        }
        LlmProvider::Grok => {
            let llm = GrokLlm::from_env(&config.model)?;
            LlmFunction::<GeneratedText>::new_with_system_instructions(llm, SYSTEM_PROMPT)
                .run(prompt)
                .await?
        }
        LlmProvider::DeepSeek => {
            let llm = DeepSeekLlm::from_env(&config.model)?;
            LlmFunction::<GeneratedText>::new_with_system_instructions(llm, SYSTEM_PROMPT)
                .run(prompt)
                .await?
        }
    };
    Ok(output)
}

const SYSTEM_PROMPT: &str = "You are part of an editorial team producing well-researched \
articles. Follow the instructions in the request exactly and put your complete answer in \
the `content` field.";
