//! # Pipeline Errors
//!
//! Error taxonomy shared by the stages, the session store, the executor and the
//! feedback router. Collaborator adapters work in `anyhow` and are folded into
//! [`PipelineError::Upstream`] at the stage boundary.

use thiserror::Error;

use crate::pipeline::PipelineStage;
use crate::session::SessionStatus;

/// Errors surfaced by the draft pipeline
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage's delegated call (search or generation) failed or returned unusable output
    #[error("{stage} stage failed: {message}")]
    Upstream {
        stage: PipelineStage,
        message: String,
    },

    /// The operation is not allowed in the session's current status
    #[error("session {id} is {status}: {reason}")]
    InvalidState {
        id: String,
        status: SessionStatus,
        reason: String,
    },

    /// The request itself is malformed (unknown action, missing revise text, empty topic)
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// Unknown session identifier
    #[error("session not found: {0}")]
    NotFound(String),

    /// The revise loop hit its configured cap
    #[error("revision limit of {limit} reached")]
    RevisionLimitExceeded { limit: u32 },
}

impl PipelineError {
    /// Wrap a collaborator failure for the given stage
    pub fn upstream(stage: PipelineStage, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            stage,
            message: err.to_string(),
        }
    }

    /// Reject an operation against a session in the wrong status
    pub fn invalid_state(
        id: impl Into<String>,
        status: SessionStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            id: id.into(),
            status,
            reason: reason.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
