use std::sync::Arc;

use tracing::{field, info_span, Instrument, Span};

use super::state::record_transition;
use super::{DeferredTasks, DraftOutcome, WorkflowError, WorkflowState};
use crate::classifier::{BackendInfo, ClassifierService};
use crate::drafter::DraftingService;
use crate::metrics::{DRAFTS_TOTAL, RECOVERED_FAILURES, TICKETS_INTAKEN};
use crate::storage::{
    Category, NewResponse, NewTicket, Response, ResponseStatus, SessionFactory, StoreError, Ticket,
};

/// Drives tickets through classification and drafting.
///
/// Cheap to clone; every clone shares the same capabilities and scheduler.
/// Each storage access opens its own session, so nothing here is shared
/// between the request path and a deferred task.
#[derive(Clone)]
pub struct TicketWorkflow {
    sessions: Arc<dyn SessionFactory>,
    classifier: Arc<ClassifierService>,
    drafter: Arc<DraftingService>,
    tasks: DeferredTasks,
}

impl TicketWorkflow {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        classifier: Arc<ClassifierService>,
        drafter: Arc<DraftingService>,
        tasks: DeferredTasks,
    ) -> Self {
        Self {
            sessions,
            classifier,
            drafter,
            tasks,
        }
    }

    pub fn classifier_info(&self) -> &BackendInfo {
        self.classifier.backend_info()
    }

    pub fn tasks(&self) -> &DeferredTasks {
        &self.tasks
    }

    /// Persist a new ticket, classify it, and schedule drafting.
    ///
    /// Only a failure to store the ticket fails intake. The returned ticket
    /// carries its category when it could be stored.
    pub async fn intake(&self, new_ticket: NewTicket) -> Result<Ticket, WorkflowError> {
        let span = info_span!("tickets.create", ticket_id = field::Empty);

        async move {
            let mut ticket = self.persist_ticket(&new_ticket)?;
            Span::current().record("ticket_id", ticket.id);
            TICKETS_INTAKEN.inc();

            record_transition(ticket.id, WorkflowState::Created, WorkflowState::Classifying);
            ticket.category = self.classify_and_store(&ticket).await;
            record_transition(ticket.id, WorkflowState::Classifying, WorkflowState::Classified);

            if let Err(e) = self.schedule_drafting(ticket.id) {
                tracing::warn!(
                    ticket_id = ticket.id,
                    error = %e,
                    event_type = "drafting_not_scheduled",
                    "Drafting was not scheduled"
                );
            }

            Ok(ticket)
        }
        .instrument(span)
        .await
    }

    /// Schedule a fresh drafting run for an existing ticket.
    ///
    /// Every run appends a new response; earlier attempts are kept.
    pub fn request_redraft(&self, ticket_id: i64) -> Result<(), WorkflowError> {
        self.require_ticket(ticket_id)?;
        self.schedule_drafting(ticket_id)
    }

    /// Schedule a deferred re-classification of an existing ticket.
    ///
    /// The category it stores replaces whatever is there (last write wins).
    pub fn request_reclassification(&self, ticket_id: i64) -> Result<(), WorkflowError> {
        self.require_ticket(ticket_id)?;

        let workflow = self.clone();
        self.tasks.spawn("reclassify", async move {
            if let Err(e) = workflow.reclassify(ticket_id).await {
                tracing::error!(
                    ticket_id,
                    error = %e,
                    event_type = "reclassification_failed",
                    "Re-classification failed"
                );
            }
        })
    }

    /// Classify a stored ticket again and store the new category.
    ///
    /// Returns `Ok(None)` when the ticket has disappeared.
    pub async fn reclassify(&self, ticket_id: i64) -> Result<Option<Category>, WorkflowError> {
        let Some(ticket) = self.load_ticket(ticket_id)? else {
            tracing::warn!(ticket_id, "Ticket not found for re-classification");
            return Ok(None);
        };

        let category = self.classifier.classify(&ticket.subject, &ticket.body).await;
        self.store_category(ticket_id, category)?;
        tracing::info!(ticket_id, category = %category, "Ticket re-classified");
        Ok(Some(category))
    }

    fn schedule_drafting(&self, ticket_id: i64) -> Result<(), WorkflowError> {
        let workflow = self.clone();
        self.tasks.spawn("draft_response", async move {
            workflow.draft_response(ticket_id).await;
        })
    }

    /// Run one drafting attempt and append its response.
    ///
    /// This is the body of the deferred drafting task. It never fails:
    /// every problem ends up as a `failed` response row or, when even that
    /// cannot be written, as [`DraftOutcome::PersistFailed`].
    pub async fn draft_response(&self, ticket_id: i64) -> DraftOutcome {
        let loaded = match self.load_ticket(ticket_id) {
            Ok(Some(ticket)) => Ok(ticket),
            Ok(None) => {
                tracing::debug!(ticket_id, "Ticket gone before drafting, nothing to do");
                return DraftOutcome::TicketMissing;
            }
            Err(e) => Err(e),
        };

        record_transition(ticket_id, WorkflowState::Classified, WorkflowState::Drafting);

        let drafted = match loaded {
            Ok(ticket) => {
                let category = ticket.category.unwrap_or(Category::Other);
                self.drafter
                    .draft(&ticket.subject, &ticket.body, category)
                    .await
                    .map_err(|e| format!("Error: {}", e))
            }
            Err(e) => Err(format!(
                "Response generation failed due to an unexpected error: {}",
                e
            )),
        };

        let new_response = match drafted {
            Ok(text) => NewResponse::completed(ticket_id, text),
            Err(reason) => {
                tracing::error!(
                    ticket_id,
                    error = %reason,
                    event_type = "drafting_failed",
                    "Drafting failed"
                );
                NewResponse::failed(ticket_id, reason)
            }
        };

        match self.store_response(&new_response) {
            Ok(response) => {
                let outcome = match response.status {
                    Some(ResponseStatus::Completed) => {
                        record_transition(ticket_id, WorkflowState::Drafting, WorkflowState::Completed);
                        DraftOutcome::Completed { response }
                    }
                    _ => {
                        record_transition(ticket_id, WorkflowState::Drafting, WorkflowState::Failed);
                        DraftOutcome::Failed { response }
                    }
                };
                DRAFTS_TOTAL
                    .with_label_values(&[new_response.status.as_str()])
                    .inc();
                outcome
            }
            Err(e) => {
                record_transition(ticket_id, WorkflowState::Drafting, WorkflowState::Failed);
                RECOVERED_FAILURES.with_label_values(&["response_persist"]).inc();
                tracing::error!(
                    ticket_id,
                    error = %e,
                    event_type = "response_persist_failed",
                    "Could not store drafted response"
                );
                DraftOutcome::PersistFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn classify_and_store(&self, ticket: &Ticket) -> Option<Category> {
        let category = self.classifier.classify(&ticket.subject, &ticket.body).await;

        match self.store_category(ticket.id, category) {
            Ok(()) => Some(category),
            Err(e) => {
                RECOVERED_FAILURES.with_label_values(&["store_category"]).inc();
                tracing::warn!(
                    ticket_id = ticket.id,
                    error = %e,
                    event_type = "category_update_failed",
                    "Could not store category, leaving it unset"
                );
                None
            }
        }
    }

    /// Insert the ticket, creating the schema and retrying once if the
    /// tables are missing.
    fn persist_ticket(&self, new_ticket: &NewTicket) -> Result<Ticket, StoreError> {
        match self.insert_ticket(new_ticket) {
            Err(StoreError::MissingSchema(reason)) => {
                RECOVERED_FAILURES.with_label_values(&["intake_schema"]).inc();
                tracing::warn!(
                    error = %reason,
                    event_type = "schema_missing",
                    "Tickets table missing, creating schema and retrying"
                );
                self.sessions.ensure_schema()?;
                self.insert_ticket(new_ticket)
            }
            other => other,
        }
    }

    fn insert_ticket(&self, new_ticket: &NewTicket) -> Result<Ticket, StoreError> {
        let mut session = self.sessions.open()?;
        let ticket = session.add_ticket(new_ticket)?;
        session.commit()?;
        Ok(ticket)
    }

    fn store_category(&self, ticket_id: i64, category: Category) -> Result<(), StoreError> {
        let mut session = self.sessions.open()?;
        session.set_category(ticket_id, category)?;
        session.commit()
    }

    fn store_response(&self, response: &NewResponse) -> Result<Response, StoreError> {
        let mut session = self.sessions.open()?;
        let stored = session.add_response(response)?;
        session.commit()?;
        Ok(stored)
    }

    fn load_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>, StoreError> {
        self.sessions.open()?.get_ticket(ticket_id)
    }

    fn require_ticket(&self, ticket_id: i64) -> Result<Ticket, WorkflowError> {
        self.load_ticket(ticket_id)?
            .ok_or(WorkflowError::TicketNotFound(ticket_id))
    }
}
