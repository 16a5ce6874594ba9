//! Mock classifier for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::classifier::{BackendInfo, Classifier, ClassifierError};
use crate::storage::Category;

#[derive(Debug, Clone)]
enum Behavior {
    Fixed(Category),
    Fail(String),
    Panic,
}

/// Mock implementation of the Classifier trait.
///
/// Always answers the same way, optionally after a delay, and counts calls.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    behavior: Behavior,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockClassifier {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always classify as `category`.
    pub fn fixed(category: Category) -> Self {
        Self::with_behavior(Behavior::Fixed(category))
    }

    /// Always fail with `reason`.
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

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            backend: "mock".to_string(),
            model: "mock-classifier".to_string(),
            device: "cpu".to_string(),
        }
    }

    async fn classify(&self, _subject: &str, _body: &str) -> Result<Category, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Fixed(category) => Ok(*category),
            Behavior::Fail(reason) => Err(ClassifierError::Unavailable(reason.clone())),
            Behavior::Panic => panic!("mock classifier panicked"),
        }
    }
}
