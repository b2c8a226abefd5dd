//! # Draftloop Core
//!
//! Session-scoped, interruptible Research → Write pipeline with a human
//! review checkpoint.
//!
//! ## Architecture
//!
//! - `stages/` - Research and Write as pure transforms over the session state
//! - `pipeline/` - Stage graph, executor, feedback router and the [`Coordinator`]
//! - `session/` - Session records and the concurrency-safe store
//! - `tools/` - LLM and web search collaborators
//! - `models` / `config` - Provider selection and coordinator configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use draftloop_core::{Coordinator, CoordinatorConfig};
//!
//! let coordinator = Coordinator::from_config(CoordinatorConfig::default().apply_env_overrides())?;
//! let id = coordinator.start_session("solar energy").await?;
//! let status = coordinator.wait_until_settled(&id, Duration::from_millis(500)).await?;
//! println!("{}", status.draft);
//! coordinator.submit_feedback(&id, "approve", None).await?;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod stages;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tools;

pub use config::{CoordinatorConfig, RevisionLimitPolicy, SearchConfig};
pub use error::{PipelineError, PipelineResult};
pub use models::{LlmProvider, ModelConfig};
pub use pipeline::{Coordinator, FeedbackOutcome, PipelineStage, SessionEvent, SessionEventKind};
pub use session::{FinishReason, SessionStatus, SessionSummary, StatusSnapshot};
