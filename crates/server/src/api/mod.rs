//! # HTTP API
//!
//! Session routes at the root (the paths the web client polls) plus
//! the versioned `/api/v1` surface for config, providers, events and the
//! OpenAPI document.

pub mod error;
pub mod sessions;

use axum::{
    body::Body,
    extract::State,
    http::{header, Response, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::{convert::Infallible, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use utoipa::{OpenApi, ToSchema};

use draftloop_core::{Coordinator, LlmProvider};

use crate::config::{ConfigDefaults, PersistedConfig};
use error::ApiError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Application state
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// Where `PATCH /api/v1/config` writes
    pub config_path: PathBuf,
}

pub type SharedState = Arc<AppState>;

// === API Types ===

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub config: PersistedConfig,
    pub defaults: ConfigDefaults,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub default_model: String,
    pub supports_base_url: bool,
    pub env_var: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
}

fn provider_info() -> Vec<ProviderInfo> {
    LlmProvider::all()
        .into_iter()
        .map(|p| ProviderInfo {
            id: p.id().to_string(),
            name: p.display_name().to_string(),
            default_model: p.default_model().to_string(),
            supports_base_url: p.supports_base_url(),
            env_var: p.env_var().to_string(),
        })
        .collect()
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Draftloop API",
        version = "1.0.0",
        description = "Research and drafting pipeline with human review"
    ),
    paths(
        sessions::start_session,
        sessions::get_state,
        sessions::get_history,
        sessions::submit_feedback,
        sessions::list_sessions,
        health,
        get_config,
        update_config,
        get_providers,
        events,
        serve_openapi
    ),
    tags(
        (name = "sessions", description = "Draft sessions and review decisions"),
        (name = "config", description = "Configuration management"),
        (name = "providers", description = "LLM provider discovery"),
        (name = "events", description = "Live session progress"),
        (name = "system", description = "Health checks")
    )
)]
pub struct ApiDoc;

// === Router ===

pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(sessions::session_routes())
        .route("/health", get(health))
        .route("/api/v1/config", get(get_config).patch(update_config))
        .route("/api/v1/providers", get(get_providers))
        .route("/api/v1/events", get(events))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}

// === Handlers ===

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Get persisted configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Persisted configuration and defaults", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    let config = PersistedConfig::load(&state.config_path).await;
    Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
    })
}

/// Update configuration (partial merge). Takes effect on the next start.
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body = PersistedConfig,
    responses(
        (status = 200, description = "Updated configuration", body = ConfigResponse),
        (status = 400, description = "Invalid provider, stage or policy")
    )
)]
pub async fn update_config(
    State(state): State<SharedState>,
    Json(updates): Json<PersistedConfig>,
) -> Result<Json<ConfigResponse>, ApiError> {
    updates.validate().map_err(ApiError::BadRequest)?;

    let mut config = PersistedConfig::load(&state.config_path).await;
    config.merge(updates);
    config.save(&state.config_path).await?;
    tracing::info!(path = %state.config_path.display(), "Configuration saved");

    Ok(Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
    }))
}

/// Get available LLM providers
#[utoipa::path(
    get,
    path = "/api/v1/providers",
    tag = "providers",
    responses(
        (status = 200, description = "List of supported LLM providers", body = ProvidersResponse)
    )
)]
pub async fn get_providers() -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: provider_info(),
    })
}

/// Stream session events as Server-Sent Events, with a heartbeat comment every 15 seconds
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "events",
    responses(
        (status = 200, description = "One `event:` frame per committed session change, named after its kind",
         content_type = "text/event-stream", body = String)
    )
)]
pub async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.coordinator.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    match Event::default().event(event_name(&event)).json_data(&event) {
                        Ok(frame) => return Some((Ok(frame), rx)),
                        Err(e) => tracing::warn!("Failed to encode event: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

fn event_name(event: &draftloop_core::SessionEvent) -> String {
    serde_json::to_value(event.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "session_event".to_string())
}

/// This document
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "system",
    responses((status = 200, description = "OpenAPI document as JSON"))
)]
pub async fn serve_openapi() -> impl IntoResponse {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(spec))
            .map_err(|e| ApiError::Internal(e.to_string())),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::sessions::{FeedbackResponse, StartResponse, StateResponse};
    use super::*;
    use axum::http::Request;
    use draftloop_core::testing::{EchoGenerator, FailingSearcher, StaticSearcher};
    use draftloop_core::tools::Searcher;
    use draftloop_core::CoordinatorConfig;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(searcher: Arc<dyn Searcher>) -> SharedState {
        let coordinator = Coordinator::new(
            CoordinatorConfig::default(),
            Arc::new(EchoGenerator::new()),
            searcher,
        );
        Arc::new(AppState {
            coordinator: Arc::new(coordinator),
            config_path: std::env::temp_dir()
                .join(format!("draftloop-api-{}", std::process::id()))
                .join("config.json"),
        })
    }

    fn test_app() -> (SharedState, Router) {
        let state = test_state(Arc::new(StaticSearcher::new("solar facts")));
        (state.clone(), router(state))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, value: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn start_and_settle(state: &SharedState, app: &Router, topic: &str) -> String {
        let response = app
            .clone()
            .oneshot(post_json("/start", serde_json::json!({ "topic": topic })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let started: StartResponse = body_json(response.into_body()).await;

        state
            .coordinator
            .wait_until_settled(&started.thread_id, Duration::from_millis(5))
            .await
            .unwrap();
        started.thread_id
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_, app) = test_app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_start_poll_revise_approve() {
        let (state, app) = test_app();
        let id = start_and_settle(&state, &app, "solar energy").await;

        let response = app
            .clone()
            .oneshot(get(&format!("/state/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first: StateResponse = body_json(response.into_body()).await;
        assert_eq!(first.status, "interrupted");
        assert_eq!(first.stage.as_deref(), Some("checkpoint"));
        assert!(first.draft.contains("solar facts"));
        assert!(first.error.is_none());

        let response = app
            .clone()
            .oneshot(post_json(
                "/feedback",
                serde_json::json!({
                    "thread_id": id,
                    "action": "revise",
                    "feedback_text": "add more statistics"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack: FeedbackResponse = body_json(response.into_body()).await;
        assert_eq!(ack.status, "revising");

        let revised = state
            .coordinator
            .wait_until_settled(&id, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(revised.revision_count, 1);

        let response = app
            .clone()
            .oneshot(post_json(
                "/feedback",
                serde_json::json!({ "thread_id": id, "action": "approve" }),
            ))
            .await
            .unwrap();
        let ack: FeedbackResponse = body_json(response.into_body()).await;
        assert_eq!(ack.status, "approved");

        let response = app.oneshot(get(&format!("/state/{}", id))).await.unwrap();
        let done: StateResponse = body_json(response.into_body()).await;
        assert_eq!(done.status, "finished");
        assert_eq!(done.finish_reason.as_deref(), Some("approved"));
        assert_eq!(done.revision_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let (_, app) = test_app();

        let response = app.clone().oneshot(get("/state/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["error"], "session not found: nope");

        let response = app
            .oneshot(post_json(
                "/feedback",
                serde_json::json!({ "thread_id": "nope", "action": "approve" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_feedback_is_400() {
        let (state, app) = test_app();
        let id = start_and_settle(&state, &app, "solar energy").await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/feedback",
                serde_json::json!({ "thread_id": id, "action": "reject" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json(
                "/feedback",
                serde_json::json!({ "thread_id": id, "action": "revise", "feedback_text": "  " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_approve_twice_is_409() {
        let (state, app) = test_app();
        let id = start_and_settle(&state, &app, "solar energy").await;
        let approve = serde_json::json!({ "thread_id": id, "action": "approve" });

        let response = app
            .clone()
            .oneshot(post_json("/feedback", approve.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(post_json("/feedback", approve)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_empty_topic_is_400() {
        let (_, app) = test_app();
        let response = app
            .oneshot(post_json("/start", serde_json::json!({ "topic": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failed_search_reports_error_state() {
        let state = test_state(Arc::new(FailingSearcher::new("no search backend")));
        let app = router(state.clone());
        let id = start_and_settle(&state, &app, "solar energy").await;

        let response = app.oneshot(get(&format!("/state/{}", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: StateResponse = body_json(response.into_body()).await;
        assert_eq!(body.status, "error");
        assert!(body.error.unwrap().contains("no search backend"));
        assert!(body.draft.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_and_history() {
        let (state, app) = test_app();
        let id = start_and_settle(&state, &app, "solar energy").await;

        let response = app.clone().oneshot(get("/sessions")).await.unwrap();
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["sessions"][0]["thread_id"], id.as_str());

        let response = app
            .oneshot(get(&format!("/state/{}/history", id)))
            .await
            .unwrap();
        let body: serde_json::Value = body_json(response.into_body()).await;
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["researcher", "writer"]);
    }

    #[tokio::test]
    async fn test_openapi_and_providers() {
        let (_, app) = test_app();

        let response = app
            .clone()
            .oneshot(get("/api/v1/openapi.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let spec: serde_json::Value = body_json(response.into_body()).await;
        assert!(spec["paths"]["/feedback"].is_object());
        assert!(spec["paths"]["/api/v1/events"]["get"].is_object());

        let response = app.oneshot(get("/api/v1/providers")).await.unwrap();
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["providers"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_events_stream_reports_session_start() {
        let (state, app) = test_app();

        let response = app.oneshot(get("/api/v1/events")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        // The handler has subscribed by the time the response exists
        let id = state.coordinator.start_session("solar energy").await.unwrap();

        let mut body = response.into_body();
        let first = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("no event within 5s")
            .expect("stream ended")
            .unwrap()
            .into_data()
            .unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();

        assert!(text.starts_with("event: session_started\n"), "{}", text);
        let data = text
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .expect("data line");
        let payload: serde_json::Value = serde_json::from_str(data).unwrap();
        assert_eq!(payload["kind"], "session_started");
        assert_eq!(payload["session_id"], id.as_str());
    }

    #[tokio::test]
    async fn test_config_patch_rejects_unknown_provider() {
        let (_, app) = test_app();
        let request = Request::builder()
            .method("PATCH")
            .uri("/api/v1/config")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "global_provider": "mystery" }).to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
