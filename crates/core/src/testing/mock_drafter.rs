//! Mock drafter for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::drafter::{DraftError, Drafter};
use crate::storage::Category;

/// A recorded draft request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedDraft {
    pub subject: String,
    pub category: Category,
}

#[derive(Debug, Clone)]
enum Behavior {
    Fixed(String),
    Fail(String),
    Panic,
}

/// Mock implementation of the Drafter trait.
///
/// Provides controllable behavior for testing:
/// - Fixed text, a fixed failure reason, or a panic
/// - Optional delay before answering
/// - Records every request
#[derive(Debug, Clone)]
pub struct MockDrafter {
    behavior: Behavior,
    delay: Option<Duration>,
    drafts: Arc<RwLock<Vec<RecordedDraft>>>,
}

impl MockDrafter {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            drafts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Always answer with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fixed(text.into()))
    }

    /// Always fail; `reason` ends up in the failure text.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(reason.into()))
    }

    pub fn panicking() -> Self {
        Self::with_behavior(Behavior::Panic)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all recorded draft requests.
    pub async fn recorded_drafts(&self) -> Vec<RecordedDraft> {
        self.drafts.read().await.clone()
    }
}

#[async_trait]
impl Drafter for MockDrafter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn draft(
        &self,
        subject: &str,
        _body: &str,
        category: Category,
    ) -> Result<String, DraftError> {
        self.drafts.write().await.push(RecordedDraft {
            subject: subject.to_string(),
            category,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Fixed(text) => Ok(text.clone()),
            Behavior::Fail(reason) => Err(DraftError::Unavailable(reason.clone())),
            Behavior::Panic => panic!("mock drafter panicked"),
        }
    }
}
