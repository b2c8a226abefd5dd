//! # Pipeline
//!
//! Stage graph, executor, feedback routing and the coordinator facade.

pub mod coordinator;
pub mod definition;
pub mod events;
pub mod executor;
pub mod feedback;

pub use coordinator::Coordinator;
pub use definition::{Pipeline, PipelineStage, ReviewAction, ReviewRoute};
pub use events::{SessionEvent, SessionEventKind};
pub use executor::Executor;
pub use feedback::{FeedbackOutcome, FeedbackRouter};
