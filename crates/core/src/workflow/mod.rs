//! Per-ticket processing: intake, classification and deferred drafting.
//!
//! ```text
//! Created -> Classifying -> Classified -> Drafting -> Completed | Failed
//! ```
//!
//! The first three states run inside the request that created the ticket.
//! Drafting runs as a detached task on [`DeferredTasks`] with its own storage
//! session; its result is an appended [`Response`] row, never an update.

mod state;
mod tasks;
mod ticket;

use thiserror::Error;

use crate::storage::{Response, StoreError};

pub use state::WorkflowState;
pub use tasks::DeferredTasks;
pub use ticket::TicketWorkflow;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Ticket not found: {0}")]
    TicketNotFound(i64),

    #[error("Scheduler is shutting down")]
    SchedulerClosed,
}

/// Result of one drafting attempt.
#[derive(Debug, Clone)]
pub enum DraftOutcome {
    /// A `completed` response row was appended.
    Completed { response: Response },
    /// A `failed` response row carrying the failure text was appended.
    Failed { response: Response },
    /// The ticket no longer exists; nothing was written.
    TicketMissing,
    /// The response row itself could not be stored.
    PersistFailed { reason: String },
}

impl DraftOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            DraftOutcome::Completed { response } | DraftOutcome::Failed { response } => {
                Some(response)
            }
            DraftOutcome::TicketMissing | DraftOutcome::PersistFailed { .. } => None,
        }
    }
}
