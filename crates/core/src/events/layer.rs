use std::fmt;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::{EventQueue, LogEvent, LogLevel, PIPELINE_TARGET};

/// `tracing` layer that forwards events at or above `min_level` to an
/// [`EventQueue`].
///
/// The `ticket_id` and `event_type` fields are lifted onto the event; every
/// other field lands in `details` next to the source location.
pub struct EventQueueLayer {
    queue: EventQueue,
    min_level: LogLevel,
}

impl EventQueueLayer {
    pub fn new(queue: EventQueue, min_level: LogLevel) -> Self {
        Self { queue, min_level }
    }
}

impl<S: Subscriber> Layer<S> for EventQueueLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if LogLevel::from(meta.level()) < self.min_level {
            return;
        }
        if meta.target().starts_with(PIPELINE_TARGET) {
            return;
        }

        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        collector.insert("target", meta.target());
        if let Some(module) = meta.module_path() {
            collector.insert("module", module);
        }
        if let Some(file) = meta.file() {
            collector.insert("file", file);
        }
        if let Some(line) = meta.line() {
            collector.insert("line", line);
        }

        let mut log = LogEvent::new(LogLevel::from(meta.level()), collector.message);
        log.details = Some(collector.details);
        log.ticket_id = collector.ticket_id;
        log.event_type = collector.event_type;

        self.queue.enqueue(log);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    ticket_id: Option<i64>,
    event_type: Option<String>,
    details: Map<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.details.insert(key.to_string(), value.into());
    }
}

impl Visit for FieldCollector {
    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "ticket_id" => self.ticket_id = Some(value),
            name => self.insert(name, value),
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "ticket_id" => self.ticket_id = i64::try_from(value).ok(),
            name => self.insert(name, value),
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field.name(), value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "event_type" => self.event_type = Some(value.to_string()),
            name => self.insert(name, value),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "event_type" => self.event_type = Some(format!("{:?}", value)),
            name => self.insert(name, format!("{:?}", value)),
        }
    }
}
