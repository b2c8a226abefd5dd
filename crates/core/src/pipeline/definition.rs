//! # Pipeline Definition
//!
//! The fixed stage graph:
//!
//! ```text
//! Research → Write → Checkpoint ──approve──▶ Done
//!              ▲          │
//!              └─revise───┘
//! ```
//!
//! The executor stops when it reaches [`PipelineStage::Checkpoint`]; only a
//! review decision moves a session past it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::RevisionLimitPolicy;
use crate::error::PipelineError;
use crate::session::FinishReason;

/// Stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Gathering notes for the topic
    Research,
    /// Drafting or revising the article
    Write,
    /// Paused for a human decision
    Checkpoint,
    /// Terminal
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Research => "research",
            PipelineStage::Write => "write",
            PipelineStage::Checkpoint => "checkpoint",
            PipelineStage::Done => "done",
        }
    }

    /// Whether the executor runs work for this stage
    pub fn is_runnable(&self) -> bool {
        matches!(self, PipelineStage::Research | PipelineStage::Write)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision submitted at the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Revise,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Revise => "revise",
        }
    }
}

impl FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(ReviewAction::Approve),
            "revise" => Ok(ReviewAction::Revise),
            other => Err(format!(
                "unknown action '{}', use 'approve' or 'revise'",
                other
            )),
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a session goes after a checkpoint decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewRoute {
    /// Re-enter the Write stage with the feedback applied
    Revise,
    /// Finalize with the current draft
    Finish(FinishReason),
    /// Revision cap hit under the `error` policy
    Fail(PipelineError),
}

/// The pipeline state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    /// Revise cycles permitted before the limit policy applies
    pub max_revisions: u32,
    pub limit_policy: RevisionLimitPolicy,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            max_revisions: 5,
            limit_policy: RevisionLimitPolicy::Finish,
        }
    }
}

impl Pipeline {
    pub fn new(max_revisions: u32, limit_policy: RevisionLimitPolicy) -> Self {
        Self {
            max_revisions,
            limit_policy,
        }
    }

    /// Stage a fresh session starts at
    pub fn entry(&self) -> PipelineStage {
        PipelineStage::Research
    }

    /// Stage a revise decision re-enters at
    pub fn resume_point(&self) -> PipelineStage {
        PipelineStage::Write
    }

    /// Unconditional successor of a stage. Checkpoint and Done are fixed points:
    /// leaving the checkpoint goes through [`Pipeline::route_review`].
    pub fn next(&self, stage: PipelineStage) -> PipelineStage {
        match stage {
            PipelineStage::Research => PipelineStage::Write,
            PipelineStage::Write => PipelineStage::Checkpoint,
            PipelineStage::Checkpoint => PipelineStage::Checkpoint,
            PipelineStage::Done => PipelineStage::Done,
        }
    }

    /// Conditional edge out of the checkpoint
    pub fn route_review(&self, action: ReviewAction, revision_count: u32) -> ReviewRoute {
        match action {
            ReviewAction::Approve => ReviewRoute::Finish(FinishReason::Approved),
            ReviewAction::Revise if revision_count >= self.max_revisions => {
                match self.limit_policy {
                    RevisionLimitPolicy::Finish => ReviewRoute::Finish(FinishReason::RevisionLimit),
                    RevisionLimitPolicy::Error => {
                        ReviewRoute::Fail(PipelineError::RevisionLimitExceeded {
                            limit: self.max_revisions,
                        })
                    }
                }
            }
            ReviewAction::Revise => ReviewRoute::Revise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_advance() {
        let pipeline = Pipeline::default();
        let mut stage = pipeline.entry();
        assert_eq!(stage, PipelineStage::Research);

        stage = pipeline.next(stage);
        assert_eq!(stage, PipelineStage::Write);

        stage = pipeline.next(stage);
        assert_eq!(stage, PipelineStage::Checkpoint);

        // The checkpoint never advances on its own
        assert_eq!(pipeline.next(stage), PipelineStage::Checkpoint);
    }

    #[test]
    fn test_revise_loops_back_to_write() {
        let pipeline = Pipeline::default();
        assert_eq!(pipeline.route_review(ReviewAction::Revise, 0), ReviewRoute::Revise);
        assert_eq!(pipeline.resume_point(), PipelineStage::Write);
    }

    #[test]
    fn test_approve_finishes() {
        let pipeline = Pipeline::default();
        assert_eq!(
            pipeline.route_review(ReviewAction::Approve, 3),
            ReviewRoute::Finish(FinishReason::Approved)
        );
    }

    #[test]
    fn test_revision_cap_finish_policy() {
        let pipeline = Pipeline::new(2, RevisionLimitPolicy::Finish);
        assert_eq!(pipeline.route_review(ReviewAction::Revise, 1), ReviewRoute::Revise);
        assert_eq!(
            pipeline.route_review(ReviewAction::Revise, 2),
            ReviewRoute::Finish(FinishReason::RevisionLimit)
        );
    }

    #[test]
    fn test_revision_cap_error_policy() {
        let pipeline = Pipeline::new(1, RevisionLimitPolicy::Error);
        assert_eq!(
            pipeline.route_review(ReviewAction::Revise, 1),
            ReviewRoute::Fail(PipelineError::RevisionLimitExceeded { limit: 1 })
        );
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("approve".parse::<ReviewAction>(), Ok(ReviewAction::Approve));
        assert_eq!(" Revise ".parse::<ReviewAction>(), Ok(ReviewAction::Revise));
        assert!("reject".parse::<ReviewAction>().is_err());
    }
}
