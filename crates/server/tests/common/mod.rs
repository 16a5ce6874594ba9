//! Common test utilities for in-process HTTP testing with mocks.
//!
//! The fixture wires a real SQLite store in a temp dir, controllable
//! classifier/drafter doubles, a started `Lifecycle` (so the event sink is
//! running) and the production router.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;

use helpdesk_core::testing::{MockClassifier, MockDrafter};
use helpdesk_core::{
    Category, ClassifierService, Config, DraftingService, Lifecycle, LogLevel, ShutdownReport,
    SqliteStore,
};
use helpdesk_server::{create_router, AppState};

pub const TEST_SECRET: &str = "test-shared-secret";

/// Test fixture with mock capabilities and a live event pipeline.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub classifier: MockClassifier,
    pub drafter: MockDrafter,
    lifecycle: Option<Lifecycle>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
    _log_guard: tracing::subscriber::DefaultGuard,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub classifier: MockClassifier,
    pub drafter: MockDrafter,
    /// `None` leaves the inbound webhook unconfigured.
    pub inbound_secret: Option<String>,
    pub min_level: LogLevel,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            classifier: MockClassifier::fixed(Category::Billing),
            drafter: MockDrafter::fixed("Thanks, we are on it."),
            inbound_secret: Some(TEST_SECRET.to_string()),
            min_level: LogLevel::Info,
        }
    }
}

impl TestConfig {
    pub fn with_drafter(mut self, drafter: MockDrafter) -> Self {
        self.drafter = drafter;
        self
    }

    pub fn with_classifier(mut self, classifier: MockClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn without_inbound_secret(mut self) -> Self {
        self.inbound_secret = None;
        self
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("test.db");
        config.events.min_level = test_config.min_level;
        config.events.shutdown_timeout_secs = 2;
        config.inbound.shared_secret = test_config.inbound_secret.clone();

        let store = Arc::new(
            SqliteStore::new(&config.database.path).expect("Failed to create store"),
        );

        let mut lifecycle = Lifecycle::with_components(
            config.clone(),
            store.clone(),
            ClassifierService::new(
                Arc::new(test_config.classifier.clone()),
                Duration::from_secs(2),
            ),
            DraftingService::new(Arc::new(test_config.drafter.clone())),
        )
        .expect("Failed to build lifecycle");

        let subscriber = tracing_subscriber::registry().with(lifecycle.event_layer());
        let log_guard = tracing::subscriber::set_default(subscriber);

        lifecycle.start().await;

        let state = Arc::new(AppState::new(
            config,
            lifecycle.workflow().clone(),
            store,
        ));
        let router = create_router(state);

        Self {
            router,
            classifier: test_config.classifier,
            drafter: test_config.drafter,
            lifecycle: Some(lifecycle),
            temp_dir,
            _log_guard: log_guard,
        }
    }

    /// Wait until every deferred drafting/classification task has finished.
    pub async fn settle(&self) {
        if let Some(lifecycle) = &self.lifecycle {
            assert!(
                lifecycle
                    .workflow()
                    .tasks()
                    .wait_idle(Duration::from_secs(5))
                    .await,
                "Deferred tasks did not finish in time"
            );
        }
    }

    /// Stop the lifecycle, draining the event sink.
    pub async fn shutdown(&mut self) -> Option<ShutdownReport> {
        match self.lifecycle.take() {
            Some(lifecycle) => Some(lifecycle.shutdown().await),
            None => None,
        }
    }

    /// Poll `path` until `check` accepts the response or attempts run out.
    pub async fn eventually<F>(&self, path: &str, check: F) -> TestResponse
    where
        F: Fn(&TestResponse) -> bool,
    {
        let mut response = self.get(path).await;
        for _ in 0..100 {
            if check(&response) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            response = self.get(path).await;
        }
        response
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST with a raw body and extra headers.
    pub async fn post_raw(&self, path: &str, body: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Hex HMAC-SHA256 of `body`, as the mail worker would send it.
pub fn sign(secret: &str, body: &str) -> String {
    use hmac::{Hmac, Mac};

    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
