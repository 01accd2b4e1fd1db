//! Progress reporting port.
//!
//! Sinks are fire-and-forget: `report` must return promptly and never push
//! back on the caller.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Which part of a seeding run an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Agents,
    Guilds,
    Training,
}

/// A progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub current: u32,
    pub total: u32,
    pub percent: f32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_title: Option<String>,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase, current: u32, total: u32, message: impl Into<String>) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            (current as f32 / total as f32 * 100.0).min(100.0)
        };
        Self {
            phase,
            current,
            total,
            percent,
            message: message.into(),
            agent_name: None,
            quest_title: None,
        }
    }

    pub fn with_agent(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }

    pub fn with_quest(mut self, title: impl Into<String>) -> Self {
        self.quest_title = Some(title.into());
        self
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

/// Emits every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: &ProgressEvent) {
        info!(
            phase = ?event.phase,
            current = event.current,
            total = event.total,
            percent = event.percent,
            agent = event.agent_name.as_deref().unwrap_or(""),
            quest = event.quest_title.as_deref().unwrap_or(""),
            "{}",
            event.message
        );
    }
}

/// Fans events out over a broadcast channel. Slow subscribers lag; the
/// sender never waits.
#[derive(Debug, Clone)]
pub struct BroadcastProgress {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastProgress {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }
}

impl ProgressSink for BroadcastProgress {
    fn report(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}
