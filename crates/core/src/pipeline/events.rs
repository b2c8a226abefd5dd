//! # Session Events
//!
//! Progress notifications published by the session store after each
//! committed update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{HistoryRole, SessionRecord, SessionStatus};

use super::definition::PipelineStage;

/// Kind of session event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    /// Session registered, executor about to launch
    SessionStarted,
    /// A stage began running
    StageStarted,
    /// A stage committed its output
    StageCompleted,
    /// Draft ready, waiting at the checkpoint
    Interrupted,
    /// Reviewer asked for a revision
    FeedbackReceived,
    /// Session finalized
    Finished,
    /// Session moved to error
    Failed,
}

/// An event for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Unique event ID
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: SessionEventKind,
    pub session_id: String,
    /// Session status after the update
    pub status: SessionStatus,
    #[serde(default)]
    pub stage: Option<PipelineStage>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, record: &SessionRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            session_id: record.id.clone(),
            status: record.status,
            stage: record.stage,
            data: None,
        }
    }

    pub fn created(record: &SessionRecord) -> Self {
        Self::new(SessionEventKind::SessionStarted, record)
            .with_data(serde_json::json!({ "topic": record.state.topic }))
    }

    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Events describing the change from `before` to `after`
    pub fn diff(before: &SessionRecord, after: &SessionRecord) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for entry in after.history.iter().skip(before.history.len()) {
            let event = match entry.role {
                HistoryRole::Researcher => SessionEvent::new(SessionEventKind::StageCompleted, after)
                    .with_stage(PipelineStage::Research)
                    .with_data(serde_json::json!({ "chars": entry.content.len() })),
                HistoryRole::Writer => SessionEvent::new(SessionEventKind::StageCompleted, after)
                    .with_stage(PipelineStage::Write)
                    .with_data(serde_json::json!({
                        "chars": entry.content.len(),
                        "revision_count": after.state.revision_count,
                    })),
                HistoryRole::Human => SessionEvent::new(SessionEventKind::FeedbackReceived, after)
                    .with_data(serde_json::json!({ "feedback": entry.content })),
            };
            events.push(event);
        }

        let status_changed = before.status != after.status;
        match after.status {
            SessionStatus::Running if status_changed || before.stage != after.stage => {
                events.push(SessionEvent::new(SessionEventKind::StageStarted, after));
            }
            SessionStatus::Interrupted if status_changed => {
                events.push(SessionEvent::new(SessionEventKind::Interrupted, after));
            }
            SessionStatus::Finished if status_changed => {
                events.push(
                    SessionEvent::new(SessionEventKind::Finished, after)
                        .with_data(serde_json::json!({ "finish_reason": after.finish_reason })),
                );
            }
            SessionStatus::Error if status_changed => {
                events.push(
                    SessionEvent::new(SessionEventKind::Failed, after)
                        .with_data(serde_json::json!({ "error": after.error_detail })),
                );
            }
            _ => {}
        }

        events
    }
}
