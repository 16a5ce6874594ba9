use std::sync::Arc;

use prometheus::IntGauge;
use tokio::sync::mpsc;

use super::queue::QueueItem;
use super::{EventQueue, LogEvent};
use crate::metrics::{LOG_EVENTS_DROPPED, LOG_EVENTS_PERSISTED, LOG_QUEUE_DEPTH, RECOVERED_FAILURES};
use crate::storage::{SessionFactory, StoreError};

/// Totals reported by the sink when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub persisted: u64,
    pub failed: u64,
}

/// Background task that drains the event queue into storage.
pub struct EventSink {
    rx: mpsc::Receiver<QueueItem>,
    sessions: Arc<dyn SessionFactory>,
    depth: IntGauge,
}

impl EventSink {
    /// Run the sink until the shutdown sentinel arrives or every producer is gone.
    ///
    /// This should be spawned as a background task. A failed insert is
    /// counted and skipped, never retried and never logged.
    pub async fn run(mut self) -> SinkReport {
        tracing::info!("Event sink started");
        let mut report = SinkReport::default();

        while let Some(item) = self.rx.recv().await {
            let event = match item {
                QueueItem::Shutdown => break,
                QueueItem::Event(event) => event,
            };
            self.depth.set(self.rx.len() as i64);

            match self.persist(&event) {
                Ok(()) => {
                    report.persisted += 1;
                    LOG_EVENTS_PERSISTED.inc();
                }
                Err(_) => {
                    report.failed += 1;
                    LOG_EVENTS_DROPPED.with_label_values(&["persist_failed"]).inc();
                    RECOVERED_FAILURES.with_label_values(&["log_persist"]).inc();
                }
            }
        }

        self.depth.set(0);
        tracing::info!(
            persisted = report.persisted,
            failed = report.failed,
            "Event sink stopped"
        );
        report
    }

    fn persist(&self, event: &LogEvent) -> Result<(), StoreError> {
        let mut session = self.sessions.open()?;
        session.add_log(event)?;
        session.commit()
    }
}

/// Create a complete event pipeline.
///
/// Returns:
/// - `EventQueue` - for producers (clone this to share across tasks)
/// - `EventSink` - spawn this as a background task with `tokio::spawn(sink.run())`
///
/// Queue depth is reported on the process-wide `helpdesk_log_queue_depth` gauge.
pub fn create_event_pipeline(
    sessions: Arc<dyn SessionFactory>,
    capacity: usize,
) -> (EventQueue, EventSink) {
    create_event_pipeline_with_gauge(sessions, capacity, LOG_QUEUE_DEPTH.clone())
}

/// Same as [`create_event_pipeline`], reporting depth on a caller-owned gauge.
pub fn create_event_pipeline_with_gauge(
    sessions: Arc<dyn SessionFactory>,
    capacity: usize,
    depth: IntGauge,
) -> (EventQueue, EventSink) {
    let (tx, rx) = mpsc::channel(capacity);
    let queue = EventQueue::new(tx, depth.clone());
    let sink = EventSink {
        rx,
        sessions,
        depth,
    };
    (queue, sink)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::events::LogLevel;
    use crate::storage::{LogFilter, SqliteStore};
    use crate::testing::FailingSessionFactory;

    fn test_gauge() -> IntGauge {
        IntGauge::new("test_sink_depth", "sink depth for tests").unwrap()
    }

    fn create_store() -> (tempfile::TempDir, Arc<SqliteStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("events.db")).unwrap());
        (dir, store)
    }

    fn stored_messages(store: &SqliteStore) -> Vec<String> {
        let mut session = store.open().unwrap();
        let mut logs = session
            .list_logs(&LogFilter::new().with_limit(10_000))
            .unwrap();
        logs.reverse();
        logs.into_iter().map(|l| l.message).collect()
    }

    #[tokio::test]
    async fn test_sink_persists_events_in_order() {
        let (_dir, store) = create_store();
        let (queue, sink) = create_event_pipeline_with_gauge(store.clone(), 10, test_gauge());
        let sink_handle = tokio::spawn(sink.run());

        for n in 0..5 {
            queue.enqueue(LogEvent::new(LogLevel::Warn, format!("event {}", n)));
        }
        assert!(queue.close(Duration::from_secs(1)).await);

        let report = sink_handle.await.unwrap();
        assert_eq!(report.persisted, 5);
        assert_eq!(
            stored_messages(&store),
            (0..5).map(|n| format!("event {}", n)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_sink_stores_correlation_fields() {
        let (_dir, store) = create_store();
        let (queue, sink) = create_event_pipeline_with_gauge(store.clone(), 10, test_gauge());
        let sink_handle = tokio::spawn(sink.run());

        queue.enqueue(
            LogEvent::new(LogLevel::Error, "boom")
                .with_event_type("drafting_failed")
                .with_detail("module", "workflow"),
        );
        queue.close(Duration::from_secs(1)).await;
        sink_handle.await.unwrap();

        let mut session = store.open().unwrap();
        let logs = session.list_logs(&LogFilter::new()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert_eq!(logs[0].event_type.as_deref(), Some("drafting_failed"));
        assert_eq!(logs[0].details.as_ref().unwrap()["module"], "workflow");
    }

    #[tokio::test]
    async fn test_overflow_without_consumer_keeps_capacity_and_drops_rest() {
        let (_dir, store) = create_store();
        let (queue, sink) = create_event_pipeline_with_gauge(store.clone(), 1000, test_gauge());

        let accepted = (0..1500)
            .filter(|n| queue.enqueue(LogEvent::new(LogLevel::Warn, format!("event {}", n))))
            .count();
        assert_eq!(accepted, 1000);
        assert_eq!(queue.depth(), 1000);

        let sink_handle = tokio::spawn(sink.run());
        assert!(queue.close(Duration::from_secs(30)).await);
        let report = sink_handle.await.unwrap();
        assert_eq!(report.persisted, 1000);

        let messages = stored_messages(&store);
        assert_eq!(messages.len(), 1000);
        let unique: HashSet<_> = messages.iter().collect();
        assert_eq!(unique.len(), 1000);
        assert_eq!(messages.first().map(String::as_str), Some("event 0"));
        assert_eq!(messages.last().map(String::as_str), Some("event 999"));
    }

    #[tokio::test]
    async fn test_shutdown_sets_depth_to_zero_and_terminates() {
        let (_dir, store) = create_store();
        let gauge = test_gauge();
        let (queue, sink) = create_event_pipeline_with_gauge(store, 10, gauge.clone());

        for n in 0..3 {
            queue.enqueue(LogEvent::new(LogLevel::Warn, format!("event {}", n)));
        }
        gauge.set(3);

        let sink_handle = tokio::spawn(sink.run());
        assert!(queue.close(Duration::from_secs(1)).await);

        let result = tokio::time::timeout(Duration::from_secs(2), sink_handle).await;
        assert!(result.is_ok(), "Sink should stop after the sentinel");
        assert_eq!(gauge.get(), 0);
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn test_sink_stops_while_producers_still_alive() {
        let (_dir, store) = create_store();
        let (queue, sink) = create_event_pipeline_with_gauge(store, 10, test_gauge());
        let producer = queue.clone();

        let sink_handle = tokio::spawn(sink.run());
        queue.close(Duration::from_secs(1)).await;

        let result = tokio::time::timeout(Duration::from_secs(1), sink_handle).await;
        assert!(result.is_ok(), "Sentinel must stop the sink regardless of live handles");

        // Late events are dropped, not blocked on.
        assert!(!producer.enqueue(LogEvent::new(LogLevel::Warn, "late")));
    }

    #[tokio::test]
    async fn test_sink_continues_on_persist_failure() {
        let failing = Arc::new(FailingSessionFactory::new());
        let (queue, sink) = create_event_pipeline_with_gauge(failing.clone(), 10, test_gauge());
        let sink_handle = tokio::spawn(sink.run());

        for n in 0..3 {
            queue.enqueue(LogEvent::new(LogLevel::Error, format!("event {}", n)));
        }
        queue.close(Duration::from_secs(1)).await;

        let report = sink_handle.await.unwrap();
        assert_eq!(report, SinkReport { persisted: 0, failed: 3 });
        // One unit of work per event, no retries.
        assert_eq!(failing.attempts(), 3);
    }

    #[tokio::test]
    async fn test_sink_exits_when_all_producers_drop() {
        let (_dir, store) = create_store();
        let (queue, sink) = create_event_pipeline_with_gauge(store, 10, test_gauge());
        let sink_handle = tokio::spawn(sink.run());

        queue.enqueue(LogEvent::new(LogLevel::Warn, "last words"));
        drop(queue);

        let report = tokio::time::timeout(Duration::from_secs(2), sink_handle)
            .await
            .expect("Sink should exit once the channel closes")
            .unwrap();
        assert_eq!(report.persisted, 1);
    }
}
