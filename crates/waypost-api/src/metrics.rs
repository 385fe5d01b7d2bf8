//! Metrics middleware and Prometheus exposition.
//!
//! Request durations and counts are labelled by matched route, method
//! and status class. The telemetry emitter contributes its own
//! counters (`telemetry_events_*`) through the same recorder.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Request duration histogram.
pub const REQUEST_DURATION: &str = "waypost_request_duration_seconds";

/// Request counter.
pub const REQUEST_TOTAL: &str = "waypost_request_total";

const UNMATCHED_ENDPOINT: &str = "unmatched";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder.
///
/// Safe to call multiple times; subsequent calls are no-ops.
///
/// # Panics
///
/// Panics when the recorder cannot be installed: the server should not
/// start without its metrics.
#[allow(clippy::panic)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|e| panic!("failed to install prometheus recorder: {e}"));

            describe_histogram!(REQUEST_DURATION, "Duration of API requests in seconds");
            describe_counter!(REQUEST_TOTAL, "Total number of API requests");

            tracing::info!("prometheus metrics recorder initialized");
            handle
        })
        .clone()
}

/// Returns the global Prometheus handle, if initialized.
#[must_use]
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Middleware that records per-request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = request.extensions().get::<MatchedPath>().map_or_else(
        || UNMATCHED_ENDPOINT.to_string(),
        |path| path.as_str().to_string(),
    );
    let method = request.method().to_string();

    let response = next.run(request).await;

    let labels = [
        ("endpoint", endpoint),
        ("method", method),
        ("status_class", status_class(response.status()).to_string()),
    ];
    histogram!(REQUEST_DURATION, &labels).record(start.elapsed().as_secs_f64());
    counter!(REQUEST_TOTAL, &labels).increment(1);

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(status_class(StatusCode::OK), "2xx");
        assert_eq!(status_class(StatusCode::NOT_FOUND), "4xx");
        assert_eq!(status_class(StatusCode::INTERNAL_SERVER_ERROR), "5xx");
    }
}
