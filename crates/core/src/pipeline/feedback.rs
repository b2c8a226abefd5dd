//! # Feedback Router
//!
//! Applies a reviewer decision to a session paused at the checkpoint.
//! Validation and the resulting transition happen in one store update, so a
//! rejected decision leaves the record exactly as it was.

use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::session::{FinishReason, SessionStore};

use super::definition::{ReviewAction, ReviewRoute};
use super::executor::Executor;

/// What a decision did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// The session is now `finished`
    Finalized(FinishReason),
    /// A revision is running in the background
    Revising,
    /// The revision cap was hit under the `error` policy
    Failed(PipelineError),
}

pub struct FeedbackRouter {
    store: Arc<SessionStore>,
    executor: Arc<Executor>,
}

impl FeedbackRouter {
    pub fn new(store: Arc<SessionStore>, executor: Arc<Executor>) -> Self {
        Self { store, executor }
    }

    /// Validate and apply `action` for session `id`.
    ///
    /// `revise` requires non-blank `feedback`; it is trimmed before storing.
    /// Returns as soon as the decision is committed; a revision runs on a
    /// background task.
    pub async fn submit(
        &self,
        id: &str,
        action: &str,
        feedback: Option<&str>,
    ) -> PipelineResult<FeedbackOutcome> {
        let pipeline = self.executor.pipeline();

        let outcome = self
            .store
            .update(id, |record| {
                record.ensure_interrupted("feedback is only accepted while awaiting review")?;

                let action: ReviewAction = action.parse().map_err(PipelineError::InvalidInput)?;
                let feedback = match action {
                    ReviewAction::Revise => Some(
                        feedback
                            .map(str::trim)
                            .filter(|text| !text.is_empty())
                            .ok_or_else(|| {
                                PipelineError::InvalidInput(
                                    "feedback text is required for revise".to_string(),
                                )
                            })?,
                    ),
                    ReviewAction::Approve => None,
                };

                match pipeline.route_review(action, record.state.revision_count) {
                    ReviewRoute::Finish(reason) => {
                        record.finish(reason)?;
                        Ok(FeedbackOutcome::Finalized(reason))
                    }
                    ReviewRoute::Fail(err) => {
                        record.fail(err.to_string())?;
                        Ok(FeedbackOutcome::Failed(err))
                    }
                    ReviewRoute::Revise => {
                        record.request_revision(feedback.unwrap_or_default())?;
                        record.start_stage(pipeline.resume_point())?;
                        Ok(FeedbackOutcome::Revising)
                    }
                }
            })
            .await?;

        match &outcome {
            FeedbackOutcome::Revising => {
                tracing::info!(session_id = %id, "Revision requested");
                self.executor.resume(id);
            }
            FeedbackOutcome::Finalized(reason) => {
                tracing::info!(session_id = %id, reason = ?reason, "Session finished");
            }
            FeedbackOutcome::Failed(err) => {
                tracing::warn!(session_id = %id, "Session failed at review: {}", err);
            }
        }
        Ok(outcome)
    }
}
