use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{field, info_span, Instrument};

use super::{BackendInfo, Classifier};
use crate::metrics::{CLASSIFY_ERRORS, CLASSIFY_LATENCY, CLASSIFY_REQUESTS, RECOVERED_FAILURES};
use crate::storage::Category;

/// Infallible front for the active classifier backend.
///
/// Built once at startup and shared by the workflow; the backend is never
/// swapped afterwards.
pub struct ClassifierService {
    backend: Arc<dyn Classifier>,
    info: BackendInfo,
    timeout: Duration,
}

impl ClassifierService {
    pub fn new(backend: Arc<dyn Classifier>, timeout: Duration) -> Self {
        let info = backend.info();
        Self {
            backend,
            info,
            timeout,
        }
    }

    pub fn backend_info(&self) -> &BackendInfo {
        &self.info
    }

    /// Prepare the backend. A failure is logged and left for the first
    /// request to hit, which will then fall back to `Other`.
    pub async fn warm_up(&self) {
        let started = Instant::now();
        match self.backend.warm_up().await {
            Ok(()) => tracing::info!(
                backend = %self.info.backend,
                model = %self.info.model,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Classifier ready"
            ),
            Err(e) => tracing::warn!(
                backend = %self.info.backend,
                error = %e,
                event_type = "classifier_warmup_failed",
                "Classifier warm-up failed"
            ),
        }
    }

    /// Classify a ticket. Never fails: errors, panics and timeouts all
    /// resolve to [`Category::Other`].
    pub async fn classify(&self, subject: &str, body: &str) -> Category {
        let span = info_span!(
            "classifier.classify",
            classifier.backend = %self.info.backend,
            classifier.model = %self.info.model,
            classifier.device = %self.info.device,
            latency_ms = field::Empty,
            label = field::Empty,
        );

        let backend = self.info.backend.as_str();
        let started = Instant::now();
        let call = AssertUnwindSafe(self.backend.classify(subject, body)).catch_unwind();
        let outcome = tokio::time::timeout(self.timeout, call)
            .instrument(span.clone())
            .await;

        let label = match outcome {
            Ok(Ok(Ok(category))) => category,
            Ok(Ok(Err(e))) => self.recover(backend, "error", &e.to_string()),
            Ok(Err(_)) => self.recover(backend, "panic", "classifier panicked"),
            Err(_) => self.recover(
                backend,
                "timeout",
                &format!("no answer after {:?}", self.timeout),
            ),
        };

        let elapsed = started.elapsed();
        span.record("latency_ms", elapsed.as_millis() as u64);
        span.record("label", label.as_str());

        CLASSIFY_LATENCY
            .with_label_values(&[backend])
            .observe(elapsed.as_secs_f64());
        CLASSIFY_REQUESTS
            .with_label_values(&[backend, label.as_str()])
            .inc();

        label
    }

    fn recover(&self, backend: &str, reason: &str, detail: &str) -> Category {
        CLASSIFY_ERRORS.with_label_values(&[backend, reason]).inc();
        RECOVERED_FAILURES.with_label_values(&["classify"]).inc();
        tracing::warn!(
            backend,
            reason,
            error = detail,
            event_type = "classification_failed",
            "Classification failed, using Other"
        );
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::testing::MockClassifier;

    fn service(backend: impl Classifier + 'static) -> ClassifierService {
        ClassifierService::new(Arc::new(backend), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_successful_classification() {
        let service = service(KeywordClassifier::new());
        assert_eq!(
            service.classify("Refund please", "charged twice").await,
            Category::Refund
        );
    }

    #[tokio::test]
    async fn test_backend_error_maps_to_other() {
        let service = service(MockClassifier::failing("model unavailable"));
        assert_eq!(service.classify("Refund", "refund").await, Category::Other);
    }

    #[tokio::test]
    async fn test_slow_backend_maps_to_other() {
        let service = service(
            MockClassifier::fixed(Category::Billing).with_delay(Duration::from_secs(5)),
        );
        let started = Instant::now();
        assert_eq!(service.classify("s", "b").await, Category::Other);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_panicking_backend_maps_to_other() {
        let service = service(MockClassifier::panicking());
        assert_eq!(service.classify("s", "b").await, Category::Other);
    }

    #[tokio::test]
    async fn test_backend_info_is_captured() {
        let service = service(KeywordClassifier::new());
        assert_eq!(service.backend_info().backend, "keyword");
        assert_eq!(service.backend_info().device, "cpu");
        service.warm_up().await;
    }
}
