//! Bounded, non-blocking log event pipeline.
//!
//! Producers (request handlers, deferred tasks, the `tracing` layer) push
//! [`LogEvent`]s onto an [`EventQueue`]; a single [`EventSink`] drains the
//! queue and persists one row per event in its own unit of work.
//!
//! Delivery is at-most-once: a full queue drops the event, a failed insert
//! drops the event, and nothing is ever retried.

mod event;
mod layer;
mod queue;
mod sink;

/// Target prefix of everything logged from inside this module. The tracing
/// layer ignores these events so the sink never feeds itself.
pub(crate) const PIPELINE_TARGET: &str = "helpdesk_core::events";

pub use event::{LogEvent, LogLevel};
pub use layer::EventQueueLayer;
pub use queue::EventQueue;
pub use sink::{create_event_pipeline, create_event_pipeline_with_gauge, EventSink, SinkReport};
