//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^/]*[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("geo_travel_engine_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Outcome of one cache lookup; `tier` is `miss` when no tier held the key
pub fn record_cache_lookup(namespace: &str, tier: &str) {
    counter!(
        "geo_cache_lookups_total",
        "namespace" => namespace.to_string(),
        "tier" => tier.to_string()
    )
    .increment(1);
}

/// A tier failure swallowed by the cache
pub fn record_cache_tier_error(tier: &str, operation: &'static str) {
    counter!(
        "geo_cache_tier_errors_total",
        "tier" => tier.to_string(),
        "operation" => operation
    )
    .increment(1);
}

/// One call to the mapping provider, including retries
pub fn record_upstream_request(operation: &'static str, outcome: &str, duration: Duration) {
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", outcome.to_string()),
    ];

    counter!("geo_upstream_requests_total", &labels).increment(1);
    histogram!("geo_upstream_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Circuit breaker state as a gauge: 0 closed, 1 half-open, 2 open
pub fn record_circuit_state(value: f64) {
    gauge!("geo_upstream_circuit_state").set(value);
}

/// Result of one item of a recalculation run
pub fn record_recalculation_item(outcome: &'static str) {
    counter!("travel_recalculation_items_total", "outcome" => outcome).increment(1);
}

/// A finished recalculation run
pub fn record_recalculation_run(trigger: &'static str, state: &str, duration: Duration) {
    let labels = [("trigger", trigger.to_string()), ("state", state.to_string())];

    counter!("travel_recalculation_runs_total", &labels).increment(1);
    histogram!("travel_recalculation_run_duration_seconds", &labels)
        .record(duration.as_secs_f64());
}

/// Record an HTTP request metric on the operations surface
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Replace ids in a path to keep label cardinality bounded.
///
/// Route templates such as `/recalculations/{run_id}` pass through unchanged.
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");
    path.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_run_id() {
        let path = "/recalculations/recalc-550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(sanitize_path(path), "/recalculations/{id}");
    }

    #[test]
    fn test_sanitize_path_numeric_ids() {
        let path = "/travel/123/professionals/42";
        assert_eq!(sanitize_path(path), "/travel/{id}/professionals/{id}");
        assert_eq!(sanitize_path("/travel/123/professionals/p42"), "/travel/{id}/professionals/p42");
    }

    #[test]
    fn test_route_templates_stay_distinct() {
        let templates = [
            "/recalculations/professionals/{professional_id}",
            "/recalculations/requests/{request_id}",
            "/recalculations/{run_id}",
            "/travel/{request_id}/professionals/{professional_id}",
        ];

        for template in templates {
            assert_eq!(sanitize_path(template), template);
        }
    }

    #[test]
    fn test_sanitize_path_no_id() {
        assert_eq!(sanitize_path("/cache/stats"), "/cache/stats");
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_lookup("geocode", "memory");
        record_upstream_request("distance", "ok", Duration::from_millis(20));
        record_recalculation_item("succeeded");
    }
}
