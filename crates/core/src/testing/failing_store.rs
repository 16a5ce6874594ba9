//! Storage double that is always down.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::storage::{Session, SessionFactory, StoreError};

/// A session factory whose every `open()` fails.
#[derive(Debug, Default)]
pub struct FailingSessionFactory {
    attempts: AtomicUsize,
}

impl FailingSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions that were requested.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SessionFactory for FailingSessionFactory {
    fn open(&self) -> Result<Box<dyn Session>, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Database("database is unavailable".to_string()))
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        Err(StoreError::Database("database is unavailable".to_string()))
    }
}
