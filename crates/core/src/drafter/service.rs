use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use super::{DraftError, Drafter};
use crate::metrics::LLM_API_LATENCY;
use crate::storage::Category;

/// Front for the configured drafter: records latency and turns blank text
/// and panics into [`DraftError`]s.
pub struct DraftingService {
    drafter: Arc<dyn Drafter>,
}

impl DraftingService {
    pub fn new(drafter: Arc<dyn Drafter>) -> Self {
        Self { drafter }
    }

    pub fn name(&self) -> &str {
        self.drafter.name()
    }

    pub async fn draft(
        &self,
        subject: &str,
        body: &str,
        category: Category,
    ) -> Result<String, DraftError> {
        let started = Instant::now();
        let result = AssertUnwindSafe(self.drafter.draft(subject, body, category))
            .catch_unwind()
            .await;

        LLM_API_LATENCY
            .with_label_values(&[self.drafter.name()])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(text)) if text.trim().is_empty() => Err(DraftError::EmptyResponse),
            Ok(outcome) => outcome,
            Err(_) => Err(DraftError::Unavailable("drafter panicked".to_string())),
        }
    }
}
