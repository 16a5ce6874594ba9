use thiserror::Error;

use super::{LogFilter, LogRecord, NewResponse, NewTicket, Response, Ticket};
use crate::events::LogEvent;
use crate::storage::Category;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    /// A table the operation needs does not exist yet.
    #[error("Schema missing: {0}")]
    MissingSchema(String),

    #[error("Ticket not found: {0}")]
    NotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub(crate) fn from_db(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if message.contains("no such table") {
            StoreError::MissingSchema(message)
        } else {
            StoreError::Database(message)
        }
    }
}

/// One unit of work against storage.
///
/// Reads see committed data. Writes are buffered in a transaction that is
/// only published by [`commit`](Session::commit); a session dropped without
/// committing discards its writes.
///
/// Sessions are synchronous and must not be held across an `.await`.
pub trait Session: Send {
    fn get_ticket(&mut self, id: i64) -> Result<Option<Ticket>, StoreError>;

    /// Insert a ticket, returns it with the assigned id.
    fn add_ticket(&mut self, ticket: &NewTicket) -> Result<Ticket, StoreError>;

    /// Set the category of an existing ticket. Last write wins.
    fn set_category(&mut self, id: i64, category: Category) -> Result<(), StoreError>;

    fn add_response(&mut self, response: &NewResponse) -> Result<Response, StoreError>;

    fn add_log(&mut self, event: &LogEvent) -> Result<i64, StoreError>;

    /// Tickets by descending id.
    fn list_tickets(&mut self, limit: i64, offset: i64) -> Result<Vec<Ticket>, StoreError>;

    /// Responses of one ticket, newest first.
    fn list_responses(&mut self, ticket_id: i64) -> Result<Vec<Response>, StoreError>;

    /// Log events matching the filter, newest first.
    fn list_logs(&mut self, filter: &LogFilter) -> Result<Vec<LogRecord>, StoreError>;

    fn count_logs(&mut self, filter: &LogFilter) -> Result<i64, StoreError>;

    /// Cheap round trip used by health checks.
    fn ping(&mut self) -> Result<(), StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Hands out independent sessions.
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn Session>, StoreError>;

    /// Create any missing tables. Idempotent.
    fn ensure_schema(&self) -> Result<(), StoreError>;
}
