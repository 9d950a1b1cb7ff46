//! Fire-and-forget mission event notifications.

use std::sync::{Mutex, PoisonError};

use log::{info, warn};
use markerfleet_core::AgentId;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification endpoint unreachable: {0}")]
    Unreachable(String),
}

/// Outbound event for the scoring service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifyEvent {
    ObjectDetected { agent: AgentId, key: String },
    Pickup { agent: AgentId, key: String },
    Drop { agent: AgentId, key: String },
}

impl NotifyEvent {
    pub fn agent(&self) -> &AgentId {
        match self {
            NotifyEvent::ObjectDetected { agent, .. }
            | NotifyEvent::Pickup { agent, .. }
            | NotifyEvent::Drop { agent, .. } => agent,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            NotifyEvent::ObjectDetected { key, .. }
            | NotifyEvent::Pickup { key, .. }
            | NotifyEvent::Drop { key, .. } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotifyEvent::ObjectDetected { .. } => "object_detected",
            NotifyEvent::Pickup { .. } => "pickup",
            NotifyEvent::Drop { .. } => "drop",
        }
    }
}

/// Destination for [`NotifyEvent`]s, shared by every agent.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError>;
}

/// Send `event`, logging and swallowing any failure.
pub fn fire(sink: &dyn NotificationSink, event: NotifyEvent) {
    if let Err(err) = sink.notify(&event) {
        warn!(
            "{}: {} notification for {} dropped: {err}",
            event.agent(),
            event.kind(),
            event.key()
        );
    }
}

/// Writes events to the log and never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        info!("{}: notify {} {}", event.agent(), event.kind(), event.key());
        Ok(())
    }
}

/// Keeps every event in memory, for headless runs and tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<NotifyEvent>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for MemoryNotifier {
    fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
