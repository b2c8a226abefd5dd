//! # Persisted Configuration
//!
//! Partial config stored at `.draftloop/config.json`. Values here sit between
//! the built-in defaults and the environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

use draftloop_core::{CoordinatorConfig, LlmProvider, PipelineStage, RevisionLimitPolicy};

pub const CONFIG_PATH: &str = ".draftloop/config.json";

pub fn default_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

/// Persisted configuration (subset of CoordinatorConfig exposed over the API)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, ToSchema)]
pub struct PersistedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_revisions: Option<u32>,
    /// `finish` or `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_limit_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searxng_url: Option<String>,
    /// Stage name (`research`, `write`) -> provider id
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub per_stage_providers: HashMap<String, String>,
    /// Stage name -> model name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub per_stage_models: HashMap<String, String>,
}

impl PersistedConfig {
    /// Missing or unreadable files yield an empty config
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "Ignoring malformed config: {}", e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Overlay every field set in `other`
    pub fn merge(&mut self, other: PersistedConfig) {
        if other.global_provider.is_some() {
            self.global_provider = other.global_provider;
        }
        if other.global_model.is_some() {
            self.global_model = other.global_model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.max_revisions.is_some() {
            self.max_revisions = other.max_revisions;
        }
        if other.revision_limit_policy.is_some() {
            self.revision_limit_policy = other.revision_limit_policy;
        }
        if other.stage_timeout_secs.is_some() {
            self.stage_timeout_secs = other.stage_timeout_secs;
        }
        if other.searxng_url.is_some() {
            self.searxng_url = other.searxng_url;
        }
        self.per_stage_providers.extend(other.per_stage_providers);
        self.per_stage_models.extend(other.per_stage_models);
    }

    /// Reject values that `apply_to` could not use
    pub fn validate(&self) -> Result<(), String> {
        if let Some(provider) = &self.global_provider {
            parse_provider(provider)?;
        }
        for (stage, provider) in &self.per_stage_providers {
            parse_stage(stage)?;
            parse_provider(provider)?;
        }
        for stage in self.per_stage_models.keys() {
            parse_stage(stage)?;
        }
        if let Some(policy) = &self.revision_limit_policy {
            parse_policy(policy)?;
        }
        Ok(())
    }

    /// Layer these values on top of `config`. Invalid entries are skipped.
    pub fn apply_to(&self, mut config: CoordinatorConfig) -> CoordinatorConfig {
        if let Some(provider) = self.global_provider.as_deref() {
            match parse_provider(provider) {
                Ok(p) => config.global_provider = p,
                Err(e) => tracing::warn!("{}", e),
            }
        }
        if self.global_model.is_some() {
            config.global_model = self.global_model.clone();
        }
        if self.base_url.is_some() {
            config.base_url = self.base_url.clone();
        }
        if let Some(max) = self.max_revisions {
            config.max_revisions = max;
        }
        if let Some(policy) = self.revision_limit_policy.as_deref() {
            match parse_policy(policy) {
                Ok(p) => config.revision_limit_policy = p,
                Err(e) => tracing::warn!("{}", e),
            }
        }
        if self.stage_timeout_secs.is_some() {
            config.stage_timeout_secs = self.stage_timeout_secs;
        }
        if self.searxng_url.is_some() {
            config.search.searxng_url = self.searxng_url.clone();
        }
        for (stage, provider) in &self.per_stage_providers {
            match parse_provider(provider) {
                Ok(p) => {
                    config.per_stage_providers.insert(stage.clone(), p);
                }
                Err(e) => tracing::warn!(stage = %stage, "{}", e),
            }
        }
        for (stage, model) in &self.per_stage_models {
            config.per_stage_models.insert(stage.clone(), model.clone());
        }
        config
    }
}

fn parse_provider(value: &str) -> Result<LlmProvider, String> {
    LlmProvider::parse(value).ok_or_else(|| format!("unknown provider '{}'", value))
}

fn parse_stage(value: &str) -> Result<(), String> {
    match value {
        v if v == PipelineStage::Research.as_str() || v == PipelineStage::Write.as_str() => Ok(()),
        other => Err(format!(
            "unknown stage '{}', use 'research' or 'write'",
            other
        )),
    }
}

fn parse_policy(value: &str) -> Result<RevisionLimitPolicy, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "finish" => Ok(RevisionLimitPolicy::Finish),
        "error" => Ok(RevisionLimitPolicy::Error),
        other => Err(format!(
            "unknown revision_limit_policy '{}', use 'finish' or 'error'",
            other
        )),
    }
}

/// Built-in values shown next to the persisted overrides
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigDefaults {
    pub global_provider: &'static str,
    pub global_model: &'static str,
    pub max_revisions: u32,
    pub revision_limit_policy: &'static str,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        let config = CoordinatorConfig::default();
        Self {
            global_provider: config.global_provider.id(),
            global_model: config.global_provider.default_model(),
            max_revisions: config.max_revisions,
            revision_limit_policy: "finish",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("draftloop-{}-{}", name, std::process::id()))
            .join("config.json")
    }

    #[test]
    fn test_merge_overlays_set_fields() {
        let mut base = PersistedConfig {
            global_model: Some("a".into()),
            max_revisions: Some(3),
            ..Default::default()
        };
        base.merge(PersistedConfig {
            global_model: Some("b".into()),
            per_stage_models: HashMap::from([("write".to_string(), "w".to_string())]),
            ..Default::default()
        });

        assert_eq!(base.global_model.as_deref(), Some("b"));
        assert_eq!(base.max_revisions, Some(3));
        assert_eq!(base.per_stage_models.get("write").map(String::as_str), Some("w"));
    }

    #[test]
    fn test_apply_to_coordinator_config() {
        let persisted = PersistedConfig {
            global_provider: Some("anthropic".into()),
            max_revisions: Some(2),
            revision_limit_policy: Some("error".into()),
            stage_timeout_secs: Some(90),
            per_stage_providers: HashMap::from([("research".to_string(), "gemini".to_string())]),
            ..Default::default()
        };
        let config = persisted.apply_to(CoordinatorConfig::default());

        assert_eq!(config.global_provider, LlmProvider::Anthropic);
        assert_eq!(config.max_revisions, 2);
        assert_eq!(config.revision_limit_policy, RevisionLimitPolicy::Error);
        assert_eq!(config.stage_timeout_secs, Some(90));
        assert_eq!(
            config.model_config(PipelineStage::Research).provider,
            LlmProvider::Gemini
        );
    }

    #[test]
    fn test_invalid_values_are_skipped_and_reported() {
        let persisted = PersistedConfig {
            global_provider: Some("mystery".into()),
            revision_limit_policy: Some("loop".into()),
            ..Default::default()
        };
        assert!(persisted.validate().is_err());

        let config = persisted.apply_to(CoordinatorConfig::default());
        assert_eq!(config, CoordinatorConfig::default());
    }

    #[test]
    fn test_unknown_stage_key_rejected() {
        let persisted = PersistedConfig {
            per_stage_models: HashMap::from([("checkpoint".to_string(), "m".to_string())]),
            ..Default::default()
        };
        assert!(persisted.validate().unwrap_err().contains("checkpoint"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = scratch_path("save-load");
        let config = PersistedConfig {
            searxng_url: Some("http://searx.local".into()),
            ..Default::default()
        };
        config.save(&path).await.unwrap();

        assert_eq!(PersistedConfig::load(&path).await, config);
        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let config = PersistedConfig::load(&scratch_path("missing")).await;
        assert_eq!(config, PersistedConfig::default());
    }
}
