//! End-to-end ticket flows through the HTTP surface.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{sign, TestConfig, TestFixture, TEST_SECRET};
use helpdesk_core::testing::{MockClassifier, MockDrafter};

fn email_payload(subject: &str, text: &str) -> String {
    json!({
        "to": "support@example.com",
        "from": "customer@example.com",
        "subject": subject,
        "date": "Mon, 1 Jan 2024 10:00:00 +0000",
        "text": text,
        "attachments": []
    })
    .to_string()
}

// ============================================================================
// Health and config
// ============================================================================

#[tokio::test]
async fn test_health_reports_db_up() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["db"], "up");
}

#[tokio::test]
async fn test_health_ml_reports_backend() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/health/ml").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["backend"], "mock");
    assert_eq!(response.body["model"], "mock-classifier");
    assert_eq!(response.body["device"], "cpu");
    assert_eq!(response.body["gpu_available"], false);
    assert_eq!(response.body["gpu_count"], 0);
}

#[tokio::test]
async fn test_config_hides_inbound_secret() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["inbound"]["shared_secret_configured"], true);
    assert!(!response.text.contains(TEST_SECRET));
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_http_and_pipeline_metrics() {
    let fixture = TestFixture::new().await;

    fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    fixture.settle().await;

    let response = fixture.get("/metrics").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.text.contains("helpdesk_http_requests_total"));
    assert!(response.text.contains("helpdesk_tickets_intaken_total"));
    assert!(response.text.contains("helpdesk_drafts_total"));
}

// ============================================================================
// Intake and drafting
// ============================================================================

#[tokio::test]
async fn test_create_ticket_returns_classified_ticket() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/tickets",
            json!({"subject": "Invoice question", "body": "I was billed twice"}),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert!(response.body["id"].as_i64().unwrap() > 0);
    assert_eq!(response.body["subject"], "Invoice question");
    assert_eq!(response.body["body"], "I was billed twice");
    assert_eq!(response.body["category"], "Billing");
}

#[tokio::test]
async fn test_drafting_appends_completed_response() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    let id = created.body["id"].as_i64().unwrap();

    fixture.settle().await;

    let response = fixture.get(&format!("/tickets/{}/responses", id)).await;
    assert_status!(response, StatusCode::OK);

    let responses = response.body.as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["ticket_id"], id);
    assert_eq!(responses[0]["status"], "completed");
    assert_eq!(responses[0]["generated_response"], "Thanks, we are on it.");
    assert_eq!(responses[0]["reviewed"], false);
    assert_eq!(responses[0]["sent"], false);

    let drafts = fixture.drafter.recorded_drafts().await;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].subject, "Invoice");
}

#[tokio::test]
async fn test_drafting_failure_is_recorded_as_failed_response() {
    let fixture = TestFixture::with_config(
        TestConfig::default().with_drafter(MockDrafter::failing("quota exceeded")),
    )
    .await;

    let created = fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    assert_status!(created, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();

    fixture.settle().await;

    let response = fixture.get(&format!("/tickets/{}/responses", id)).await;
    let responses = response.body.as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["status"], "failed");
    let text = responses[0]["generated_response"].as_str().unwrap();
    assert!(text.starts_with("Error:"), "unexpected text: {}", text);
    assert!(text.contains("quota exceeded"));
}

#[tokio::test]
async fn test_classifier_failure_falls_back_to_other() {
    let fixture = TestFixture::with_config(
        TestConfig::default().with_classifier(MockClassifier::failing("model not loaded")),
    )
    .await;

    let response = fixture
        .post("/tickets", json!({"subject": "Hello", "body": "Anyone there?"}))
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.body["category"], "Other");
}

#[tokio::test]
async fn test_redraft_appends_without_replacing() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    let id = created.body["id"].as_i64().unwrap();
    fixture.settle().await;

    for _ in 0..2 {
        let response = fixture.post_empty(&format!("/tickets/{}/respond", id)).await;
        assert_status!(response, StatusCode::ACCEPTED);
        assert!(response.body["message"].as_str().unwrap().contains("re-initiated"));
        fixture.settle().await;
    }

    let response = fixture.get(&format!("/tickets/{}/responses", id)).await;
    let responses = response.body.as_array().unwrap();
    assert_eq!(responses.len(), 3);

    let ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted, "responses should be newest first");
}

#[tokio::test]
async fn test_manual_reclassification_runs_classifier_again() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    let id = created.body["id"].as_i64().unwrap();
    fixture.settle().await;
    assert_eq!(fixture.classifier.call_count(), 1);

    let response = fixture.post_empty(&format!("/tickets/{}/classify", id)).await;
    assert_status!(response, StatusCode::ACCEPTED);
    fixture.settle().await;

    assert_eq!(fixture.classifier.call_count(), 2);
    let ticket = fixture.get(&format!("/tickets/{}", id)).await;
    assert_eq!(ticket.body["category"], "Billing");
}

// ============================================================================
// Lookups
// ============================================================================

#[tokio::test]
async fn test_unknown_ticket_is_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/tickets/999").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Ticket not found");

    let response = fixture.post_empty("/tickets/999/respond").await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.post_empty("/tickets/999/classify").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_responses_of_unknown_ticket_are_empty() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/tickets/999/responses").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_list_tickets_newest_first_with_paging() {
    let fixture = TestFixture::new().await;

    for i in 0..3 {
        fixture
            .post(
                "/tickets",
                json!({"subject": format!("Ticket {}", i), "body": "body"}),
            )
            .await;
    }
    fixture.settle().await;

    let response = fixture.get("/tickets?limit=2").await;
    assert_status!(response, StatusCode::OK);
    let tickets = response.body.as_array().unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0]["subject"], "Ticket 2");
    assert_eq!(tickets[1]["subject"], "Ticket 1");

    let response = fixture.get("/tickets?limit=2&offset=2").await;
    let tickets = response.body.as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["subject"], "Ticket 0");
}

// ============================================================================
// Inbound email webhook
// ============================================================================

#[tokio::test]
async fn test_inbound_with_valid_signature_creates_ticket() {
    let fixture = TestFixture::new().await;

    let body = email_payload("Cannot log in", "My password stopped working");
    let signature = sign(TEST_SECRET, &body);

    let response = fixture
        .post_raw("/inbound", &body, &[("X-Signature", &signature)])
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.body["subject"], "Cannot log in");
    assert_eq!(response.body["body"], "My password stopped working");
    assert_eq!(response.body["category"], "Billing");

    let id = response.body["id"].as_i64().unwrap();
    fixture.settle().await;
    let responses = fixture.get(&format!("/tickets/{}/responses", id)).await;
    assert_eq!(responses.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_inbound_with_wrong_signature_is_401() {
    let fixture = TestFixture::new().await;

    let body = email_payload("Hello", "World");
    let signature = sign("some-other-secret", &body);

    let response = fixture
        .post_raw("/inbound", &body, &[("X-Signature", &signature)])
        .await;
    assert_status!(response, StatusCode::UNAUTHORIZED);

    let response = fixture.post_raw("/inbound", &body, &[]).await;
    assert_status!(response, StatusCode::UNAUTHORIZED);

    let tickets = fixture.get("/tickets").await;
    assert_eq!(tickets.body, json!([]));
}

#[tokio::test]
async fn test_inbound_without_secret_is_500() {
    let fixture = TestFixture::with_config(TestConfig::default().without_inbound_secret()).await;

    let body = email_payload("Hello", "World");
    let signature = sign(TEST_SECRET, &body);

    let response = fixture
        .post_raw("/inbound", &body, &[("X-Signature", &signature)])
        .await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_inbound_signed_but_malformed_is_422() {
    let fixture = TestFixture::new().await;

    let body = r#"{"subject": "missing everything else"}"#;
    let signature = sign(TEST_SECRET, body);

    let response = fixture
        .post_raw("/inbound", body, &[("X-Signature", &signature)])
        .await;
    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Persisted logs
// ============================================================================

#[tokio::test]
async fn test_drafting_failure_is_queryable_in_logs() {
    let fixture = TestFixture::with_config(
        TestConfig::default().with_drafter(MockDrafter::failing("upstream 503")),
    )
    .await;

    let created = fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    let id = created.body["id"].as_i64().unwrap();
    fixture.settle().await;

    let path = format!("/logs?ticket_id={}&event_type=drafting_failed", id);
    let response = fixture
        .eventually(&path, |r| r.body["total"].as_i64() == Some(1))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    let event = &response.body["events"][0];
    assert_eq!(event["ticket_id"], id);
    assert_eq!(event["level"], "ERROR");
    assert!(event["details"]["error"]
        .as_str()
        .unwrap()
        .contains("upstream 503"));
}

#[tokio::test]
async fn test_state_changes_are_logged_per_ticket() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    let id = created.body["id"].as_i64().unwrap();
    fixture.settle().await;

    // created -> classifying -> classified -> drafting -> completed
    let path = format!("/logs?ticket_id={}&event_type=state_changed&level=info", id);
    let response = fixture
        .eventually(&path, |r| r.body["total"].as_i64() == Some(4))
        .await;
    assert_eq!(response.body["total"], 4);
}

#[tokio::test]
async fn test_logs_reject_unknown_level() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/logs?level=loud").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shutdown_drains_event_sink() {
    let mut fixture = TestFixture::with_config(
        TestConfig::default().with_drafter(MockDrafter::failing("boom")),
    )
    .await;

    fixture
        .post("/tickets", json!({"subject": "Invoice", "body": "Wrong amount"}))
        .await;
    fixture.settle().await;

    let report = fixture.shutdown().await.unwrap();
    assert!(report.sink_drained);
    assert_eq!(report.abandoned_tasks, 0);
    assert!(report.events_persisted >= 1);

    let response = fixture.get("/logs?event_type=drafting_failed").await;
    assert_eq!(response.body["total"], 1);
}
