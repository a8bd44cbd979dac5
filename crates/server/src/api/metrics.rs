//! Prometheus metrics recording.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records one rate-limit decision outcome.
pub fn record_decision(endpoint: &str, strategy: &str, allowed: bool) {
    counter!(
        "limitd_decisions_total",
        "endpoint" => endpoint.to_string(),
        "strategy" => strategy.to_string(),
        "outcome" => if allowed { "allowed" } else { "denied" }
    )
    .increment(1);
}

/// Records a failed store round-trip on the decision path.
pub fn record_store_error() {
    counter!("limitd_store_errors_total").increment(1);
}

/// Updates the `limitd_store_up` gauge from the periodic health probe.
pub fn update_store_health(connected: bool) {
    gauge!("limitd_store_up").set(if connected { 1.0 } else { 0.0 });
}
