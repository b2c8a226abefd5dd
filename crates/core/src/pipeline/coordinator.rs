//! # Coordinator
//!
//! The operations exposed to the transport layer. Owns the session store,
//! executor and feedback router and wires them to the configured
//! collaborators.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::CoordinatorConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::session::{HistoryEntry, SessionStatus, SessionStore, SessionSummary, StatusSnapshot};
use crate::stages::StageContext;
use crate::tools::{LlmGenerator, Searcher, TextGenerator, WebSearcher};

use super::definition::Pipeline;
use super::events::SessionEvent;
use super::executor::Executor;
use super::feedback::{FeedbackOutcome, FeedbackRouter};

pub struct Coordinator {
    config: CoordinatorConfig,
    store: Arc<SessionStore>,
    executor: Arc<Executor>,
    router: FeedbackRouter,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        generator: Arc<dyn TextGenerator>,
        searcher: Arc<dyn Searcher>,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let pipeline = Pipeline::new(config.max_revisions, config.revision_limit_policy);
        let executor = Arc::new(
            Executor::new(
                Arc::clone(&store),
                StageContext::new(generator, searcher),
                pipeline,
            )
            .with_stage_timeout(config.stage_timeout()),
        );
        let router = FeedbackRouter::new(Arc::clone(&store), Arc::clone(&executor));

        Self {
            config,
            store,
            executor,
            router,
        }
    }

    /// Coordinator backed by the LLM providers and web search
    pub fn from_config(config: CoordinatorConfig) -> anyhow::Result<Self> {
        let generator = Arc::new(LlmGenerator::new(config.clone()));
        let searcher = Arc::new(WebSearcher::new(config.search.clone())?);
        tracing::info!(
            provider = config.global_provider.display_name(),
            model = config
                .global_model
                .as_deref()
                .unwrap_or(config.global_provider.default_model()),
            max_revisions = config.max_revisions,
            "Coordinator ready"
        );
        Ok(Self::new(config, generator, searcher))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// `StartSession(topic) -> sessionId`
    pub async fn start_session(&self, topic: &str) -> PipelineResult<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::InvalidInput(
                "topic must not be empty".to_string(),
            ));
        }

        let id = self.store.create(topic).await;
        tracing::info!(session_id = %id, topic = %topic, "Session started");
        self.executor.launch(&id);
        Ok(id)
    }

    /// `GetStatus(sessionId)`; never blocks on a running stage
    pub async fn get_status(&self, id: &str) -> PipelineResult<StatusSnapshot> {
        Ok(self.store.get(id).await?.snapshot())
    }

    /// `SubmitFeedback(sessionId, action, feedbackText?)`
    pub async fn submit_feedback(
        &self,
        id: &str,
        action: &str,
        feedback: Option<&str>,
    ) -> PipelineResult<FeedbackOutcome> {
        self.router.submit(id, action, feedback).await
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.store.list().await
    }

    /// Researcher, writer and reviewer messages in order
    pub async fn history(&self, id: &str) -> PipelineResult<Vec<HistoryEntry>> {
        Ok(self.store.get(id).await?.history)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.store.subscribe()
    }

    /// Poll until the session stops running (`interrupted`, `finished` or `error`)
    pub async fn wait_until_settled(
        &self,
        id: &str,
        poll: Duration,
    ) -> PipelineResult<StatusSnapshot> {
        loop {
            let snapshot = self.get_status(id).await?;
            if !matches!(
                snapshot.status,
                SessionStatus::Starting | SessionStatus::Running
            ) {
                return Ok(snapshot);
            }
            tokio::time::sleep(poll).await;
        }
    }
}
