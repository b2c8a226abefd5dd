//! # Session Record
//!
//! One record per session, owned by the [`SessionStore`](super::SessionStore).
//! Every status change goes through a method on [`SessionRecord`] that checks
//! the state machine:
//!
//! ```text
//! starting → running(research) → running(write) → interrupted ─approve─▶ finished
//!                                       ▲              │
//!                                       └───revise─────┘
//! any running/starting state ──stage failure──▶ error
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::PipelineStage;
use crate::stages::StageOutput;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Starting,
    Running,
    Interrupted,
    Finished,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Interrupted => "interrupted",
            SessionStatus::Finished => "finished",
            SessionStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Finished | SessionStatus::Error)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session reached `finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The reviewer approved the draft
    Approved,
    /// A revise arrived after the revision cap; the last draft was kept
    RevisionLimit,
}

/// The state value stages read and transform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Original user input
    pub topic: String,
    /// Output of the Research stage
    pub research_notes: String,
    /// Output of the latest Write stage
    pub draft: String,
    /// Pending revision request, set while a revise is in flight
    pub human_feedback: Option<String>,
    /// Completed revise cycles
    pub revision_count: u32,
}

impl PipelineState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Fold a stage result into the state
    pub fn apply(&mut self, output: &StageOutput) {
        match output {
            StageOutput::ResearchNotes(notes) => {
                self.research_notes = notes.clone();
            }
            StageOutput::Draft { text, revised } => {
                self.draft = text.clone();
                if *revised {
                    self.revision_count += 1;
                    self.human_feedback = None;
                }
            }
        }
    }
}

/// Who produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    Researcher,
    Writer,
    Human,
}

/// Append-only log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// A session as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub state: PipelineState,
    pub status: SessionStatus,
    /// Stage being executed while `status == running`
    pub stage: Option<PipelineStage>,
    /// Populated only when `status == error`
    pub error_detail: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, topic: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            state: PipelineState::new(topic),
            status: SessionStatus::Starting,
            stage: None,
            error_detail: None,
            finish_reason: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `running` at the given stage
    pub fn start_stage(&mut self, stage: PipelineStage) -> PipelineResult<()> {
        let allowed = match (self.status, self.stage) {
            (SessionStatus::Starting, _) => stage == PipelineStage::Research,
            (SessionStatus::Running, Some(PipelineStage::Research)) => {
                stage == PipelineStage::Write
            }
            (SessionStatus::Interrupted, _) => {
                stage == PipelineStage::Write && self.state.human_feedback.is_some()
            }
            _ => false,
        };
        if !allowed {
            return Err(self.reject(format!("cannot start the {} stage", stage)));
        }
        self.status = SessionStatus::Running;
        self.stage = Some(stage);
        self.touch();
        Ok(())
    }

    /// Commit a finished stage's output while still running
    pub fn complete_stage(&mut self, output: &StageOutput) -> PipelineResult<()> {
        let expected = match output {
            StageOutput::ResearchNotes(_) => PipelineStage::Research,
            StageOutput::Draft { .. } => PipelineStage::Write,
        };
        if self.status != SessionStatus::Running || self.stage != Some(expected) {
            return Err(self.reject(format!("no {} stage in progress", expected)));
        }

        let (role, content) = match output {
            StageOutput::ResearchNotes(notes) => (HistoryRole::Researcher, notes.clone()),
            StageOutput::Draft { text, .. } => (HistoryRole::Writer, text.clone()),
        };
        self.state.apply(output);
        self.push_history(role, content);
        self.touch();
        Ok(())
    }

    /// Park at the checkpoint. Requires a completed draft.
    pub fn interrupt(&mut self) -> PipelineResult<()> {
        if self.status != SessionStatus::Running || self.stage != Some(PipelineStage::Write) {
            return Err(self.reject("only a completed write can reach the checkpoint"));
        }
        if self.state.draft.trim().is_empty() {
            return Err(self.reject("cannot pause for review without a draft"));
        }
        self.status = SessionStatus::Interrupted;
        self.stage = Some(PipelineStage::Checkpoint);
        self.touch();
        Ok(())
    }

    /// Record reviewer feedback for the next Write
    pub fn request_revision(&mut self, feedback: impl Into<String>) -> PipelineResult<()> {
        self.ensure_interrupted("revision requests need a paused session")?;
        let feedback = feedback.into();
        self.push_history(HistoryRole::Human, feedback.clone());
        self.state.human_feedback = Some(feedback);
        self.touch();
        Ok(())
    }

    /// Terminal success
    pub fn finish(&mut self, reason: FinishReason) -> PipelineResult<()> {
        self.ensure_interrupted("only a paused session can be finalized")?;
        self.status = SessionStatus::Finished;
        self.stage = Some(PipelineStage::Done);
        self.finish_reason = Some(reason);
        self.state.human_feedback = None;
        self.touch();
        Ok(())
    }

    /// Terminal failure
    pub fn fail(&mut self, detail: impl Into<String>) -> PipelineResult<()> {
        if self.status.is_terminal() {
            return Err(self.reject("session already ended"));
        }
        self.status = SessionStatus::Error;
        self.error_detail = Some(detail.into());
        self.state.human_feedback = None;
        self.touch();
        Ok(())
    }

    pub fn ensure_interrupted(&self, reason: &str) -> PipelineResult<()> {
        if self.status != SessionStatus::Interrupted {
            return Err(self.reject(reason));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            id: self.id.clone(),
            topic: self.state.topic.clone(),
            status: self.status,
            stage: self.stage,
            draft: self.state.draft.clone(),
            research_notes: self.state.research_notes.clone(),
            revision_count: self.state.revision_count,
            error_detail: self.error_detail.clone(),
            finish_reason: self.finish_reason,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            topic: self.state.topic.clone(),
            status: self.status,
            revision_count: self.state.revision_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn reject(&self, reason: impl Into<String>) -> PipelineError {
        PipelineError::invalid_state(&self.id, self.status, reason)
    }

    fn push_history(&mut self, role: HistoryRole, content: String) {
        self.history.push(HistoryEntry {
            role,
            content,
            at: Utc::now(),
        });
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Read-only view returned by `GetStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub id: String,
    pub topic: String,
    pub status: SessionStatus,
    pub stage: Option<PipelineStage>,
    pub draft: String,
    pub research_notes: String,
    pub revision_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub topic: String,
    pub status: SessionStatus,
    pub revision_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
