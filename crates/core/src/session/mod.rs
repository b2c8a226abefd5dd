//! # Sessions
//!
//! Session records and the concurrency-safe store that owns them.

pub mod record;
pub mod store;

pub use record::{
    FinishReason, HistoryEntry, HistoryRole, PipelineState, SessionRecord, SessionStatus,
    SessionSummary, StatusSnapshot,
};
pub use store::SessionStore;
