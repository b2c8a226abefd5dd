//! # Session Store
//!
//! In-memory map from session id to record. The map lock is only held long
//! enough to find or insert an entry; each record has its own mutex so
//! updates to different sessions never contend.
//!
//! Every committed update is diffed against the previous record and the
//! resulting [`SessionEvent`]s are broadcast to subscribers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::SessionEvent;

use super::record::{SessionRecord, SessionSummary};

const EVENT_CHANNEL_CAPACITY: usize = 256;

type Entry = Arc<Mutex<SessionRecord>>;

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sessions: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Receive events for every session committed after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Allocate a new record in `starting` and return its id
    pub async fn create(&self, topic: impl Into<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let record = SessionRecord::new(id.clone(), topic);
        let event = SessionEvent::created(&record);

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(record)));
        self.publish(event);

        tracing::debug!(session_id = %id, "Session created");
        id
    }

    /// Copy of the latest committed record
    pub async fn get(&self, id: &str) -> PipelineResult<SessionRecord> {
        let entry = self.entry(id).await?;
        let record = entry.lock().await;
        Ok(record.clone())
    }

    /// Apply `mutator` atomically with respect to other updates of the same id.
    ///
    /// The mutator works on a copy; if it returns `Err` nothing is committed.
    pub async fn update<F, T>(&self, id: &str, mutator: F) -> PipelineResult<T>
    where
        F: FnOnce(&mut SessionRecord) -> PipelineResult<T>,
    {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;

        let mut working = guard.clone();
        let value = mutator(&mut working)?;

        let events = SessionEvent::diff(&guard, &working);
        *guard = working;
        drop(guard);

        for event in events {
            self.publish(event);
        }
        Ok(value)
    }

    /// Summaries of every session, most recently created first
    pub async fn list(&self) -> Vec<SessionSummary> {
        let entries: Vec<Entry> = self.sessions.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.lock().await.summary());
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn entry(&self, id: &str) -> PipelineResult<Entry> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
