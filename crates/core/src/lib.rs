pub mod classifier;
pub mod config;
pub mod drafter;
pub mod events;
pub mod lifecycle;
pub mod llm;
pub mod metrics;
pub mod storage;
pub mod testing;
pub mod workflow;

pub use classifier::{
    create_classifier, BackendInfo, Classifier, ClassifierError, ClassifierService,
    KeywordClassifier, LlmClassifier,
};
pub use config::{
    load_config, load_config_from_str, validate_config, ClassifierBackend, Config, ConfigError,
    DrafterMode, LlmProvider, SanitizedConfig,
};
pub use drafter::{create_drafter, DraftError, Drafter, DraftingService, FallbackDrafter, LlmDrafter};
pub use events::{EventQueue, EventQueueLayer, EventSink, LogEvent, LogLevel};
pub use lifecycle::{Lifecycle, LifecycleError, ShutdownReport};
pub use llm::{create_llm_client, LlmClient, LlmError};
pub use storage::{
    Category, LogFilter, LogRecord, NewTicket, Response, ResponseStatus, Session, SessionFactory,
    SqliteStore, StoreError, Ticket,
};
pub use workflow::{DeferredTasks, DraftOutcome, TicketWorkflow, WorkflowError, WorkflowState};
