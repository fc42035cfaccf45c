//! Progress notifications for processed graph objects

use crate::graph::ObjectKind;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Outcome of one popped graph object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedEvent {
    pub kind: ObjectKind,
    pub level: u32,
    /// URL of the object (the discovered URL for fetches, the page URL for parses)
    pub url: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ProcessedEvent {
    pub fn succeeded(kind: ObjectKind, level: u32, url: impl Into<String>) -> Self {
        Self {
            kind,
            level,
            url: url.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(kind: ObjectKind, level: u32, url: impl Into<String>, error: impl ToString) -> Self {
        Self {
            kind,
            level,
            url: url.into(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Receives one notification per processed graph object
pub trait CrawlObserver {
    fn on_processed(&mut self, event: &ProcessedEvent);
}

/// Reports every processed object through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CrawlObserver for LoggingObserver {
    fn on_processed(&mut self, event: &ProcessedEvent) {
        match &event.error {
            None => tracing::debug!("{} {} (level {}) done", event.kind, event.url, event.level),
            Some(error) => tracing::warn!(
                "{} {} (level {}) failed: {}",
                event.kind,
                event.url,
                event.level,
                error
            ),
        }
    }
}

/// Discards notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CrawlObserver for NoopObserver {
    fn on_processed(&mut self, _event: &ProcessedEvent) {}
}

/// Forwards notifications to a channel; a closed receiver is ignored
impl CrawlObserver for UnboundedSender<ProcessedEvent> {
    fn on_processed(&mut self, event: &ProcessedEvent) {
        if self.send(event.clone()).is_err() {
            tracing::trace!("Observer channel closed, dropping event for {}", event.url);
        }
    }
}

/// Collects notifications in order
impl CrawlObserver for Vec<ProcessedEvent> {
    fn on_processed(&mut self, event: &ProcessedEvent) {
        self.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_observer_records_in_order() {
        let mut events: Vec<ProcessedEvent> = Vec::new();
        events.on_processed(&ProcessedEvent::succeeded(ObjectKind::Fetch, 0, "http://x.com/"));
        events.on_processed(&ProcessedEvent::failed(
            ObjectKind::Parse,
            1,
            "http://x.com/",
            "boom",
        ));
        assert_eq!(events.len(), 2);
        assert!(events[0].success);
        assert_eq!(events[1].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_channel_observer_forwards() {
        let (mut sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        sender.on_processed(&ProcessedEvent::succeeded(ObjectKind::Fetch, 2, "http://x.com/a"));
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.url, "http://x.com/a");
        assert_eq!(event.level, 2);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (mut sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        drop(receiver);
        sender.on_processed(&ProcessedEvent::succeeded(ObjectKind::Fetch, 0, "http://x.com/"));
    }
}
