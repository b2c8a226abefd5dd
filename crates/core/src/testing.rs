//! # Test Doubles
//!
//! Deterministic [`TextGenerator`] and [`Searcher`] implementations used by the
//! unit tests, the integration tests and the server's router tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::pipeline::PipelineStage;
use crate::tools::{Searcher, TextGenerator};

/// Returns the same notes for every topic
pub struct StaticSearcher {
    notes: String,
}

impl StaticSearcher {
    pub fn new(notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
        }
    }
}

#[async_trait]
impl Searcher for StaticSearcher {
    async fn search(&self, topic: &str) -> Result<String> {
        Ok(format!("Results for {}: {}", topic, self.notes))
    }
}

/// Always errors
pub struct FailingSearcher {
    message: String,
}

impl FailingSearcher {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Searcher for FailingSearcher {
    async fn search(&self, _topic: &str) -> Result<String> {
        Err(anyhow!("{}", self.message))
    }
}

/// Echoes the prompt back as `[stage] prompt`, so every input shows up in the output
#[derive(Default)]
pub struct EchoGenerator {
    calls: AtomicUsize,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, stage: PipelineStage, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{}] {}", stage, prompt))
    }
}

/// Returns a fixed string regardless of the prompt
pub struct StaticGenerator {
    text: String,
}

impl StaticGenerator {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TextGenerator for StaticGenerator {
    async fn generate(&self, _stage: PipelineStage, _prompt: &str) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// Always errors
pub struct FailingGenerator {
    message: String,
}

impl FailingGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _stage: PipelineStage, _prompt: &str) -> Result<String> {
        Err(anyhow!("{}", self.message))
    }
}

/// [`EchoGenerator`] for the first `successes` calls, then errors on every call
pub struct FailAfterGenerator {
    inner: EchoGenerator,
    successes: usize,
    message: String,
}

impl FailAfterGenerator {
    pub fn new(successes: usize, message: impl Into<String>) -> Self {
        Self {
            inner: EchoGenerator::new(),
            successes,
            message: message.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for FailAfterGenerator {
    async fn generate(&self, stage: PipelineStage, prompt: &str) -> Result<String> {
        if self.inner.calls() >= self.successes {
            return Err(anyhow!("{}", self.message));
        }
        self.inner.generate(stage, prompt).await
    }
}

/// [`EchoGenerator`] that blocks each call until a permit is released.
///
/// Lets a test hold a session in `running` for as long as it needs.
pub struct GatedGenerator {
    inner: EchoGenerator,
    gate: Arc<Semaphore>,
}

impl Default for GatedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl GatedGenerator {
    /// Starts closed
    pub fn new() -> Self {
        Self {
            inner: EchoGenerator::new(),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Allow `n` more calls through
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate(&self, stage: PipelineStage, prompt: &str) -> Result<String> {
        self.gate.acquire().await?.forget();
        self.inner.generate(stage, prompt).await
    }
}

/// Panics inside `generate`
pub struct PanickingGenerator;

#[async_trait]
impl TextGenerator for PanickingGenerator {
    async fn generate(&self, stage: PipelineStage, _prompt: &str) -> Result<String> {
        panic!("generator blew up during {}", stage);
    }
}
