//! # Consensus Metrics
//!
//! Prometheus metrics for the plugin and the request handler.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! ocr3-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `ocr3_requests_expired_total` - Requests answered with a timeout
//! - `ocr3_responses_cached_total` - Responses that arrived before their request
//! - `ocr3_outcomes_pruned_total` - Workflow outcomes pruned for inactivity
//! - `ocr3_reports_total` - Reports emitted, by whether a body was encoded

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref REQUESTS_EXPIRED: IntCounter = register_int_counter!(
        "ocr3_requests_expired_total",
        "Total number of requests answered with a timeout"
    )
    .expect("Failed to create REQUESTS_EXPIRED metric");

    pub static ref RESPONSES_CACHED: IntCounter = register_int_counter!(
        "ocr3_responses_cached_total",
        "Total number of responses cached without a matching request"
    )
    .expect("Failed to create RESPONSES_CACHED metric");

    pub static ref OUTCOMES_PRUNED: IntCounter = register_int_counter!(
        "ocr3_outcomes_pruned_total",
        "Total number of workflow outcomes pruned"
    )
    .expect("Failed to create OUTCOMES_PRUNED metric");

    /// Reports emitted, labeled by `should_report`
    pub static ref REPORTS: IntCounterVec = register_int_counter_vec!(
        "ocr3_reports_total",
        "Total number of reports emitted",
        &["should_report"]
    )
    .expect("Failed to create REPORTS metric");
}

#[cfg(feature = "metrics")]
pub fn record_request_expired() {
    REQUESTS_EXPIRED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_response_cached() {
    RESPONSES_CACHED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_outcome_pruned() {
    OUTCOMES_PRUNED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_report(should_report: bool) {
    REPORTS
        .with_label_values(&[if should_report { "true" } else { "false" }])
        .inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_request_expired() {}

#[cfg(not(feature = "metrics"))]
pub fn record_response_cached() {}

#[cfg(not(feature = "metrics"))]
pub fn record_outcome_pruned() {}

#[cfg(not(feature = "metrics"))]
pub fn record_report(_should_report: bool) {}
