//! # Executor
//!
//! Runs a session's pipeline to its next suspension point on a background
//! task. Every transition is committed through the [`SessionStore`], so
//! status readers see progress as it happens.
//!
//! Stage failures, timeouts and panics all end in `status = error` with an
//! `error_detail`; nothing escapes the spawned task.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::{PipelineError, PipelineResult};
use crate::session::{PipelineState, SessionStatus, SessionStore};
use crate::stages::{self, StageContext, StageOutput};

use super::definition::{Pipeline, PipelineStage};

/// How a run enters the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// Fresh session in `starting`; the run performs the first transition
    Launch,
    /// The feedback router already moved the session to `running(write)`
    Resume,
}

pub struct Executor {
    store: Arc<SessionStore>,
    ctx: StageContext,
    pipeline: Pipeline,
    stage_timeout: Option<Duration>,
}

impl Executor {
    pub fn new(store: Arc<SessionStore>, ctx: StageContext, pipeline: Pipeline) -> Self {
        Self {
            store,
            ctx,
            pipeline,
            stage_timeout: None,
        }
    }

    /// Fail any stage that runs longer than `timeout`
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// Run a `starting` session through Research and Write to the checkpoint.
    ///
    /// Returns immediately. A second launch for the same id is a no-op: the
    /// session has already left `starting`, so the run is rejected before
    /// any stage executes.
    pub fn launch(self: &Arc<Self>, id: &str) -> JoinHandle<()> {
        self.spawn(id, Entry::Launch)
    }

    /// Re-run Write for a session the feedback router has put back in
    /// `running(write)` with feedback pending.
    pub fn resume(self: &Arc<Self>, id: &str) -> JoinHandle<()> {
        self.spawn(id, Entry::Resume)
    }

    fn spawn(self: &Arc<Self>, id: &str, entry: Entry) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        let id = id.to_string();

        tokio::spawn(async move {
            let run = tokio::spawn({
                let executor = Arc::clone(&executor);
                let id = id.clone();
                async move { executor.run(&id, entry).await }
            });

            // A panicking stage only takes down the inner task
            if let Err(join_err) = run.await {
                let detail = if join_err.is_panic() {
                    "pipeline run panicked".to_string()
                } else {
                    format!("pipeline run aborted: {}", join_err)
                };
                tracing::error!(session_id = %id, "{}", detail);
                executor.record_failure(&id, detail).await;
            }
        })
    }

    #[tracing::instrument(skip(self), fields(session_id = %id))]
    async fn run(&self, id: &str, entry: Entry) {
        match self.drive(id, entry).await {
            Ok(()) => tracing::info!("Session paused for review"),
            Err(e @ PipelineError::InvalidState { .. }) | Err(e @ PipelineError::NotFound(_)) => {
                // Another run owns this session, or it vanished; leave the record alone
                tracing::warn!("Run rejected: {}", e);
            }
            Err(e) => {
                tracing::warn!("Run failed: {}", e);
                self.record_failure(id, e.to_string()).await;
            }
        }
    }

    async fn drive(&self, id: &str, entry: Entry) -> PipelineResult<()> {
        let mut stage = match entry {
            Entry::Launch => {
                let first = self.pipeline.entry();
                self.store
                    .update(id, |record| record.start_stage(first))
                    .await?;
                first
            }
            Entry::Resume => self.pipeline.resume_point(),
        };

        while stage.is_runnable() {
            let record = self.store.get(id).await?;
            if record.status != SessionStatus::Running || record.stage != Some(stage) {
                return Err(PipelineError::invalid_state(
                    id,
                    record.status,
                    format!("expected to be running the {} stage", stage),
                ));
            }

            tracing::debug!(stage = %stage, "Running stage");
            let output = self.run_stage(stage, &record.state).await?;

            let next = self.pipeline.next(stage);
            self.store
                .update(id, |record| {
                    record.complete_stage(&output)?;
                    if next.is_runnable() {
                        record.start_stage(next)
                    } else {
                        record.interrupt()
                    }
                })
                .await?;
            stage = next;
        }
        Ok(())
    }

    async fn run_stage(
        &self,
        stage: PipelineStage,
        state: &PipelineState,
    ) -> PipelineResult<StageOutput> {
        let work = stages::run_stage(stage, &self.ctx, state);
        match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                PipelineError::upstream(stage, format!("timed out after {:?}", limit))
            })?,
            None => work.await,
        }
    }

    async fn record_failure(&self, id: &str, detail: String) {
        if let Err(e) = self.store.update(id, |record| record.fail(detail)).await {
            tracing::warn!(session_id = %id, "Could not record failure: {}", e);
        }
    }
}
