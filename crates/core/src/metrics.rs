//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Classification and drafting capabilities
//! - The ticket workflow state machine
//! - The log event pipeline

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Capabilities
// =============================================================================

/// Classification requests by backend and resolved label.
pub static CLASSIFY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_classify_requests_total",
            "Total classification requests",
        ),
        &["backend", "label"],
    )
    .unwrap()
});

/// Classification errors and timeouts that fell back to the catch-all label.
pub static CLASSIFY_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_classify_errors_total",
            "Classification failures mapped to the catch-all label",
        ),
        &["backend", "reason"], // "error", "timeout", "panic"
    )
    .unwrap()
});

pub static CLASSIFY_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "helpdesk_classify_latency_seconds",
            "Duration of a classification call",
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["backend"],
    )
    .unwrap()
});

/// Drafting attempts by outcome.
pub static DRAFTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("helpdesk_drafts_total", "Total drafting attempts"),
        &["status"], // "completed", "failed"
    )
    .unwrap()
});

/// Wall time spent waiting on the drafter.
pub static LLM_API_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "helpdesk_llm_api_latency_seconds",
            "Duration of response drafting calls",
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["drafter"],
    )
    .unwrap()
});

// =============================================================================
// Workflow
// =============================================================================

pub static TICKETS_INTAKEN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("helpdesk_tickets_intaken_total", "Total tickets persisted on intake")
        .unwrap()
});

pub static WORKFLOW_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_workflow_transitions_total",
            "Ticket workflow state transitions",
        ),
        &["from_state", "to_state"],
    )
    .unwrap()
});

/// Failures that were absorbed instead of propagated, by call site.
pub static RECOVERED_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_recovered_failures_total",
            "Failures swallowed at a recovery point",
        ),
        &["site"],
    )
    .unwrap()
});

// =============================================================================
// Event pipeline
// =============================================================================

/// Events currently waiting for the sink.
pub static LOG_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("helpdesk_log_queue_depth", "Log events waiting to be persisted").unwrap()
});

pub static LOG_EVENTS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_log_events_dropped_total",
            "Log events that were never persisted",
        ),
        &["reason"], // "queue_full", "closed", "persist_failed"
    )
    .unwrap()
});

pub static LOG_EVENTS_PERSISTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "helpdesk_log_events_persisted_total",
        "Log events written to storage",
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Capabilities
        Box::new(CLASSIFY_REQUESTS.clone()),
        Box::new(CLASSIFY_ERRORS.clone()),
        Box::new(CLASSIFY_LATENCY.clone()),
        Box::new(DRAFTS_TOTAL.clone()),
        Box::new(LLM_API_LATENCY.clone()),
        // Workflow
        Box::new(TICKETS_INTAKEN.clone()),
        Box::new(WORKFLOW_TRANSITIONS.clone()),
        Box::new(RECOVERED_FAILURES.clone()),
        // Event pipeline
        Box::new(LOG_QUEUE_DEPTH.clone()),
        Box::new(LOG_EVENTS_DROPPED.clone()),
        Box::new(LOG_EVENTS_PERSISTED.clone()),
    ]
}
