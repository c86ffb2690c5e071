//! Outbound notification events.
//!
//! The engine hands each event to a [`NotificationSink`] after the state change
//! is computed. Delivery is best-effort: [`deliver`] logs a failed emit and
//! carries on.

use crate::error::Result;
use crate::io;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    DeliverableAdded,
    DeliverableUpdated,
    MilestoneCompleted,
    RevisionAdded,
    CommentAdded,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::DeliverableAdded => "deliverable_added",
            NotificationType::DeliverableUpdated => "deliverable_updated",
            NotificationType::MilestoneCompleted => "milestone_completed",
            NotificationType::RevisionAdded => "revision_added",
            NotificationType::CommentAdded => "comment_added",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub project_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub actor: String,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("notification channel closed")]
    Closed,

    #[error("outbox write failed: {0}")]
    Outbox(String),
}

pub trait NotificationSink {
    fn emit(&self, event: &NotificationEvent) -> std::result::Result<(), SinkError>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn emit(&self, event: &NotificationEvent) -> std::result::Result<(), SinkError> {
        (**self).emit(event)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn emit(&self, event: &NotificationEvent) -> std::result::Result<(), SinkError> {
        (**self).emit(event)
    }
}

/// Pushes events onto an unbounded tokio channel for a consumer task to drain.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn emit(&self, event: &NotificationEvent) -> std::result::Result<(), SinkError> {
        self.tx.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Appends each event as one JSON line to `.sentinel/outbox.jsonl`.
#[derive(Debug, Clone)]
pub struct OutboxSink {
    path: PathBuf,
}

impl OutboxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSink for OutboxSink {
    fn emit(&self, event: &NotificationEvent) -> std::result::Result<(), SinkError> {
        let line = serde_json::to_string(event).map_err(|e| SinkError::Outbox(e.to_string()))?;
        io::append_line(&self.path, &line).map_err(|e| SinkError::Outbox(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn emit(&self, _event: &NotificationEvent) -> std::result::Result<(), SinkError> {
        Ok(())
    }
}

/// Emit and swallow failures. Returns whether the sink accepted the event.
pub fn deliver(sink: &impl NotificationSink, event: &NotificationEvent) -> bool {
    match sink.emit(event) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                error = %e,
                kind = %event.kind,
                project = %event.project_id,
                "notification dropped"
            );
            false
        }
    }
}

/// Read every event recorded in an outbox file, oldest first.
pub fn read_outbox(path: &Path) -> Result<Vec<NotificationEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let mut events = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        events.push(serde_json::from_str(line)?);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: NotificationType) -> NotificationEvent {
        NotificationEvent {
            project_id: "acme".into(),
            kind,
            actor: "ana".into(),
            message: "Logo approved".into(),
            metadata: serde_json::json!({ "deliverable_id": "logo" }),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn channel_sink_hands_events_to_consumer() {
        let (sink, mut rx) = ChannelSink::new();
        let consumer = tokio::spawn(async move { rx.recv().await });
        assert!(deliver(&sink, &event(NotificationType::DeliverableUpdated)));
        let got = consumer.await.unwrap().unwrap();
        assert_eq!(got.kind, NotificationType::DeliverableUpdated);
    }

    #[test]
    fn closed_channel_is_swallowed() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(!deliver(&sink, &event(NotificationType::CommentAdded)));
    }

    #[test]
    fn outbox_appends_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = OutboxSink::new(dir.path().join(".sentinel/outbox.jsonl"));
        deliver(&sink, &event(NotificationType::DeliverableAdded));
        deliver(&sink, &event(NotificationType::RevisionAdded));

        let events = read_outbox(sink.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, NotificationType::RevisionAdded);

        let raw = std::fs::read_to_string(sink.path()).unwrap();
        assert!(raw.contains("\"type\":\"deliverable_added\""));
    }

    #[test]
    fn missing_outbox_reads_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(read_outbox(&dir.path().join("none.jsonl")).unwrap().is_empty());
    }
}
