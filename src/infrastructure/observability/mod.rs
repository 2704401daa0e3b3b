//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    create_metrics_router, init_metrics, record_cache_lookup, record_cache_tier_error,
    record_circuit_state, record_http_request, record_recalculation_item,
    record_recalculation_run, record_upstream_request, PrometheusMetrics,
};
