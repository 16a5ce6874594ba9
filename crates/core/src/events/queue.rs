use std::time::Duration;

use prometheus::IntGauge;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::LogEvent;
use crate::metrics::LOG_EVENTS_DROPPED;

/// Item carried by the queue: either an event or the shutdown sentinel.
#[derive(Debug)]
pub(crate) enum QueueItem {
    Event(LogEvent),
    Shutdown,
}

/// Producer side of the bounded event queue.
///
/// This is cheaply cloneable and can be shared across tasks. Enqueueing never
/// blocks: when the queue is full the event is dropped.
///
/// Nothing in here logs through `tracing`, since the tracing layer itself
/// enqueues through this type.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<QueueItem>,
    depth: IntGauge,
}

impl EventQueue {
    pub(crate) fn new(tx: mpsc::Sender<QueueItem>, depth: IntGauge) -> Self {
        Self { tx, depth }
    }

    /// Try to enqueue an event without blocking.
    ///
    /// Returns true if the event was accepted, false if it was dropped
    /// because the queue is full or the sink has already stopped.
    pub fn enqueue(&self, event: LogEvent) -> bool {
        match self.tx.try_send(QueueItem::Event(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                LOG_EVENTS_DROPPED.with_label_values(&["queue_full"]).inc();
                self.depth.set(self.depth() as i64);
                false
            }
            Err(TrySendError::Closed(_)) => {
                LOG_EVENTS_DROPPED.with_label_values(&["closed"]).inc();
                false
            }
        }
    }

    /// Number of events currently waiting in the queue.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Whether the consumer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Push the shutdown sentinel behind every event already queued.
    ///
    /// Unlike [`enqueue`](Self::enqueue) this waits for free capacity, but
    /// never longer than `timeout`. Returns false if the sentinel could not be
    /// delivered in time or the sink is already gone.
    pub async fn close(&self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.tx.send(QueueItem::Shutdown)).await,
            Ok(Ok(()))
        )
    }
}
