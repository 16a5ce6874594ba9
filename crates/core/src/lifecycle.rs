//! Process lifecycle: wiring at startup, draining at shutdown.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::classifier::{create_classifier, ClassifierError, ClassifierService};
use crate::config::{validate_config, Config, ConfigError};
use crate::drafter::{create_drafter, DraftError, DraftingService};
use crate::events::{create_event_pipeline, EventQueue, EventQueueLayer, EventSink, SinkReport};
use crate::storage::{SessionFactory, SqliteStore, StoreError};
use crate::workflow::{DeferredTasks, TicketWorkflow};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("Classifier setup failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Drafter setup failed: {0}")]
    Drafter(#[from] DraftError),
}

/// What happened during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The sink saw the sentinel and stopped within the timeout.
    pub sink_drained: bool,
    /// Deferred tasks still running when the scheduler closed.
    pub abandoned_tasks: usize,
    /// Events the sink persisted over its lifetime (0 when not drained).
    pub events_persisted: u64,
}

/// Owns every long-lived component of the process.
///
/// Build it with [`Lifecycle::new`], install [`event_layer`](Self::event_layer)
/// in the tracing subscriber, call [`start`](Self::start), and finish with
/// [`shutdown`](Self::shutdown).
pub struct Lifecycle {
    config: Config,
    sessions: Arc<dyn SessionFactory>,
    queue: EventQueue,
    sink: Option<EventSink>,
    sink_handle: Option<JoinHandle<SinkReport>>,
    classifier: Arc<ClassifierService>,
    workflow: TicketWorkflow,
}

impl Lifecycle {
    /// Build the store and the configured capabilities. Nothing is spawned yet.
    pub fn new(config: Config) -> Result<Self, LifecycleError> {
        validate_config(&config)?;
        let sessions: Arc<dyn SessionFactory> = Arc::new(SqliteStore::new(&config.database.path)?);
        let classifier = create_classifier(&config.classifier)?;
        let drafter = create_drafter(&config.drafter)?;
        Self::with_components(config, sessions, classifier, drafter)
    }

    /// Assemble a lifecycle from already-built parts.
    ///
    /// The config is validated here too; a zero queue capacity is rejected
    /// before any channel is created.
    pub fn with_components(
        config: Config,
        sessions: Arc<dyn SessionFactory>,
        classifier: ClassifierService,
        drafter: DraftingService,
    ) -> Result<Self, LifecycleError> {
        validate_config(&config)?;
        let (queue, sink) = create_event_pipeline(sessions.clone(), config.events.queue_capacity);
        let classifier = Arc::new(classifier);
        let workflow = TicketWorkflow::new(
            sessions.clone(),
            classifier.clone(),
            Arc::new(drafter),
            DeferredTasks::new(),
        );

        Ok(Self {
            config,
            sessions,
            queue,
            sink: Some(sink),
            sink_handle: None,
            classifier,
            workflow,
        })
    }

    /// A tracing layer feeding this lifecycle's event queue.
    pub fn event_layer(&self) -> EventQueueLayer {
        EventQueueLayer::new(self.queue.clone(), self.config.events.min_level)
    }

    /// Spawn the event sink and warm up the classifier.
    pub async fn start(&mut self) {
        if let Some(sink) = self.sink.take() {
            self.sink_handle = Some(tokio::spawn(sink.run()));
        }
        self.classifier.warm_up().await;
        tracing::info!(
            backend = %self.classifier.backend_info().backend,
            queue_capacity = self.config.events.queue_capacity,
            "Lifecycle started"
        );
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workflow(&self) -> &TicketWorkflow {
        &self.workflow
    }

    pub fn sessions(&self) -> Arc<dyn SessionFactory> {
        self.sessions.clone()
    }

    pub fn event_queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Stop the process's background work.
    ///
    /// Closes the scheduler (running drafts are abandoned, not cancelled),
    /// pushes the sentinel behind every queued event, and waits for the sink
    /// up to `events.shutdown_timeout_secs`. Never blocks longer than that.
    pub async fn shutdown(self) -> ShutdownReport {
        let abandoned_tasks = self.workflow.tasks().close();
        if abandoned_tasks > 0 {
            tracing::warn!(abandoned_tasks, "Abandoning in-flight deferred tasks");
        }

        let timeout = self.config.events.shutdown_timeout();
        let started = Instant::now();

        let Some(handle) = self.sink_handle else {
            return ShutdownReport {
                sink_drained: false,
                abandoned_tasks,
                events_persisted: 0,
            };
        };

        if !self.queue.close(timeout).await {
            tracing::warn!(
                depth = self.queue.depth(),
                "Could not enqueue shutdown sentinel before timeout"
            );
            return ShutdownReport {
                sink_drained: false,
                abandoned_tasks,
                events_persisted: 0,
            };
        }

        let remaining = timeout.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, handle).await {
            Ok(Ok(report)) => ShutdownReport {
                sink_drained: true,
                abandoned_tasks,
                events_persisted: report.persisted,
            },
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Event sink task failed");
                ShutdownReport {
                    sink_drained: false,
                    abandoned_tasks,
                    events_persisted: 0,
                }
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Event sink did not drain before timeout"
                );
                ShutdownReport {
                    sink_drained: false,
                    abandoned_tasks,
                    events_persisted: 0,
                }
            }
        }
    }
}
