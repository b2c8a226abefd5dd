//! # Coordinator Configuration
//!
//! Model selection, revision policy, stage timeouts and search backends.
//! Values come from serde (config file) and are then overridden by the
//! environment, see [`CoordinatorConfig::apply_env_overrides`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{LlmProvider, ModelConfig};
use crate::pipeline::PipelineStage;

/// What happens when a revise arrives after `max_revisions` cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionLimitPolicy {
    /// Finalize the current draft as-is
    #[default]
    Finish,
    /// Move the session to `error` with a revision-limit detail
    Error,
}

/// Search backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Tavily API key (never serialized back out)
    #[serde(skip_serializing)]
    pub tavily_api_key: Option<String>,
    /// Custom SearXNG instance URL (tried before the local fallbacks)
    pub searxng_url: Option<String>,
    /// Maximum results folded into the research notes
    pub max_results: u32,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            searxng_url: None,
            max_results: 5,
            timeout_secs: 10,
        }
    }
}

/// Configuration for the coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Global LLM provider (default: OpenRouter)
    pub global_provider: LlmProvider,
    /// Global model to use for every stage
    pub global_model: Option<String>,
    /// Base URL override for LLM API (for OpenAI-compatible endpoints)
    pub base_url: Option<String>,
    /// Per-stage model overrides (stage name -> model name)
    pub per_stage_models: HashMap<String, String>,
    /// Per-stage provider overrides (stage name -> provider)
    pub per_stage_providers: HashMap<String, LlmProvider>,
    /// Revise cycles allowed before the policy below applies
    pub max_revisions: u32,
    pub revision_limit_policy: RevisionLimitPolicy,
    /// Upper bound on a single stage run; unbounded when unset
    pub stage_timeout_secs: Option<u64>,
    pub search: SearchConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            global_provider: LlmProvider::OpenRouter,
            global_model: None,
            base_url: None,
            per_stage_models: HashMap::new(),
            per_stage_providers: HashMap::new(),
            max_revisions: 5,
            revision_limit_policy: RevisionLimitPolicy::Finish,
            stage_timeout_secs: None,
            search: SearchConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Get model config for a specific stage
    pub fn model_config(&self, stage: PipelineStage) -> ModelConfig {
        let key = stage.as_str();

        // Provider: per-stage override -> global
        let provider = self
            .per_stage_providers
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.global_provider.clone());

        // Model: per-stage override -> global -> default for provider
        let model = self
            .per_stage_models
            .get(key)
            .or(self.global_model.as_ref())
            .cloned()
            .unwrap_or_else(|| provider.default_model().to_string());

        let base_url = if provider.supports_base_url() {
            self.base_url.clone()
        } else {
            None
        };

        ModelConfig {
            provider,
            model,
            base_url,
        }
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }

    /// Apply environment overrides on top of file/default values
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (env in production, a map in tests)
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = non_empty("LLM_PROVIDER") {
            match LlmProvider::parse(&provider) {
                Some(p) => self.global_provider = p,
                None => tracing::warn!(provider = %provider, "Ignoring unknown LLM_PROVIDER"),
            }
        }
        if let Some(model) = non_empty("MODEL_NAME") {
            self.global_model = Some(model);
        }
        if let Some(url) = non_empty("LLM_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(key) = non_empty("TAVILY_API_KEY") {
            self.search.tavily_api_key = Some(key);
        }
        if let Some(url) = non_empty("SEARXNG_URL") {
            self.search.searxng_url = Some(url);
        }
        if let Some(raw) = non_empty("DRAFTLOOP_MAX_REVISIONS") {
            match raw.trim().parse() {
                Ok(n) => self.max_revisions = n,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid DRAFTLOOP_MAX_REVISIONS"),
            }
        }
        if let Some(raw) = non_empty("DRAFTLOOP_STAGE_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(n) => self.stage_timeout_secs = Some(n),
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring invalid DRAFTLOOP_STAGE_TIMEOUT_SECS")
                }
            }
        }
        self
    }
}
