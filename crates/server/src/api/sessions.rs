//! # Session API
//!
//! Start a draft, poll its state and submit review decisions. The web client
//! polls `/state/{thread_id}` and posts decisions to `/feedback`.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use draftloop_core::session::{HistoryEntry, HistoryRole};
use draftloop_core::{FeedbackOutcome, FinishReason, StatusSnapshot};

use super::error::ApiError;
use super::SharedState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartRequest {
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartResponse {
    pub thread_id: String,
}

/// Session state as seen by a polling client
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StateResponse {
    pub thread_id: String,
    pub topic: String,
    /// `starting`, `running`, `interrupted`, `finished` or `error`
    pub status: String,
    /// Stage in progress while running
    pub stage: Option<String>,
    pub draft: String,
    pub research_data: String,
    pub revision_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `approved` or `revision_limit` once finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    pub updated_at: String,
}

impl From<StatusSnapshot> for StateResponse {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self {
            thread_id: snapshot.id,
            topic: snapshot.topic,
            status: snapshot.status.as_str().to_string(),
            stage: snapshot.stage.map(|s| s.as_str().to_string()),
            draft: snapshot.draft,
            research_data: snapshot.research_notes,
            revision_count: snapshot.revision_count,
            error: snapshot.error_detail,
            finish_reason: snapshot.finish_reason.map(|r| finish_reason_str(r).to_string()),
            updated_at: snapshot.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub thread_id: String,
    /// `approve` or `revise`
    pub action: String,
    /// Required for `revise`
    pub feedback_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedbackResponse {
    /// `approved`, `revising`, `finished` or `error`
    pub status: String,
    pub message: String,
}

impl From<FeedbackOutcome> for FeedbackResponse {
    fn from(outcome: FeedbackOutcome) -> Self {
        let (status, message) = match outcome {
            FeedbackOutcome::Finalized(FinishReason::Approved) => {
                ("approved", "Content approved. Session finished.".to_string())
            }
            FeedbackOutcome::Finalized(FinishReason::RevisionLimit) => (
                "finished",
                "Revision limit reached. The latest draft was kept.".to_string(),
            ),
            FeedbackOutcome::Revising => (
                "revising",
                "Revision requested. The writer is working on it.".to_string(),
            ),
            FeedbackOutcome::Failed(err) => ("error", err.to_string()),
        };
        Self {
            status: status.to_string(),
            message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub thread_id: String,
    pub topic: String,
    pub status: String,
    pub revision_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryMessage {
    /// `researcher`, `writer` or `human`
    pub role: String,
    pub content: String,
    pub at: String,
}

impl From<HistoryEntry> for HistoryMessage {
    fn from(entry: HistoryEntry) -> Self {
        let role = match entry.role {
            HistoryRole::Researcher => "researcher",
            HistoryRole::Writer => "writer",
            HistoryRole::Human => "human",
        };
        Self {
            role: role.to_string(),
            content: entry.content,
            at: entry.at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub messages: Vec<HistoryMessage>,
}

fn finish_reason_str(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Approved => "approved",
        FinishReason::RevisionLimit => "revision_limit",
    }
}

pub fn session_routes() -> Router<SharedState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/state/:thread_id", get(get_state))
        .route("/state/:thread_id/history", get(get_history))
        .route("/feedback", post(submit_feedback))
        .route("/sessions", get(list_sessions))
}

/// Start a new draft session
#[utoipa::path(
    post,
    path = "/start",
    tag = "sessions",
    request_body = StartRequest,
    responses(
        (status = 200, description = "Session started", body = StartResponse),
        (status = 400, description = "Empty topic")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let thread_id = state.coordinator.start_session(&req.topic).await?;
    Ok(Json(StartResponse { thread_id }))
}

/// Current state of a session
#[utoipa::path(
    get,
    path = "/state/{thread_id}",
    tag = "sessions",
    params(("thread_id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session state", body = StateResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_state(
    State(state): State<SharedState>,
    Path(thread_id): Path<String>,
) -> Result<Json<StateResponse>, ApiError> {
    let snapshot = state.coordinator.get_status(&thread_id).await?;
    Ok(Json(snapshot.into()))
}

/// Researcher, writer and reviewer messages for a session
#[utoipa::path(
    get,
    path = "/state/{thread_id}/history",
    tag = "sessions",
    params(("thread_id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Message log", body = HistoryResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_history(
    State(state): State<SharedState>,
    Path(thread_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.coordinator.history(&thread_id).await?;
    Ok(Json(HistoryResponse {
        messages: history.into_iter().map(Into::into).collect(),
    }))
}

/// Approve the draft or request a revision
#[utoipa::path(
    post,
    path = "/feedback",
    tag = "sessions",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Decision applied", body = FeedbackResponse),
        (status = 400, description = "Unknown action or missing feedback text"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Session is not awaiting review")
    )
)]
pub async fn submit_feedback(
    State(state): State<SharedState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let outcome = state
        .coordinator
        .submit_feedback(&req.thread_id, &req.action, req.feedback_text.as_deref())
        .await?;
    Ok(Json(outcome.into()))
}

/// All sessions, newest first
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Session summaries", body = SessionListResponse)
    )
)]
pub async fn list_sessions(State(state): State<SharedState>) -> Json<SessionListResponse> {
    let sessions = state
        .coordinator
        .list_sessions()
        .await
        .into_iter()
        .map(|s| SessionInfo {
            thread_id: s.id,
            topic: s.topic,
            status: s.status.as_str().to_string(),
            revision_count: s.revision_count,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        })
        .collect();
    Json(SessionListResponse { sessions })
}
