use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::ops;
use super::state::AppState;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Builds the operations router; `/metrics` is mounted when a recorder is installed
pub fn create_router(
    state: AppState,
    metrics: Option<PrometheusMetrics>,
    metrics_path: &str,
) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .merge(ops::create_ops_router())
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http());

    if let Some(m) = metrics {
        router = router.merge(create_metrics_router(m, metrics_path));
    }

    router
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::geo::MockGeoLookupClient;
    use crate::domain::{
        AddressFields, CacheTier, Clock, ProfessionalRecord, RequestStatus, ServiceRequestRecord,
        SystemClock,
    };
    use crate::engine::{EngineParts, GeoEngine};
    use crate::infrastructure::cache::{CacheTtls, InMemoryTier, MultiTierCache};
    use crate::infrastructure::travel::InMemoryTravelRepository;

    fn engine() -> GeoEngine {
        let repository = InMemoryTravelRepository::new()
            .with_professional(ProfessionalRecord::new(
                "p1",
                AddressFields::coordinates(45.07, 7.68),
            ))
            .with_request(
                ServiceRequestRecord::new(
                    "r1",
                    RequestStatus::InProgress,
                    AddressFields::coordinates(45.46, 9.19),
                )
                .assigned_to("p1"),
            )
            .with_request(ServiceRequestRecord::new(
                "r-empty",
                RequestStatus::Assigned,
                AddressFields::default(),
            ));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(MultiTierCache::new(
            vec![Arc::new(InMemoryTier::new()) as Arc<dyn CacheTier>],
            clock.clone(),
            CacheTtls::default(),
        ));

        GeoEngine::assemble(
            &AppConfig::default(),
            EngineParts {
                client: Arc::new(MockGeoLookupClient::new().with_default_distance(35_000)),
                repository: Arc::new(repository),
                cache,
                clock,
                pool: None,
            },
        )
    }

    fn app(engine: &GeoEngine) -> Router {
        create_router(AppState::from_engine(engine), None, "/metrics")
    }

    async fn send(router: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let engine = engine();
        let (status, body) = send(app(&engine), "GET", "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_single_tier_as_degraded() {
        let engine = engine();
        let (status, body) = send(app(&engine), "GET", "/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn test_compute_travel() {
        let engine = engine();
        let (status, body) = send(app(&engine), "POST", "/travel/r1/professionals/p1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["distance_meters"], 35_000);
        assert_eq!(body["cost"], 40.0);
    }

    #[tokio::test]
    async fn test_compute_travel_errors() {
        let engine = engine();

        let (status, body) = send(app(&engine), "POST", "/travel/r1/professionals/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found_error");

        let (status, body) =
            send(app(&engine), "POST", "/travel/r-empty/professionals/p1").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "missing_address");
    }

    #[tokio::test]
    async fn test_recalculation_accepted_and_tracked() {
        let engine = engine();
        let (status, body) =
            send(app(&engine), "POST", "/recalculations/professionals/p1").await;

        assert_eq!(status, StatusCode::ACCEPTED);
        let run_id = body["run_id"].as_str().unwrap().to_string();

        engine.orchestrator().wait_for_runs().await;

        let (status, body) =
            send(app(&engine), "GET", &format!("/recalculations/{}", run_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "completed");
        assert_eq!(body["report"]["succeeded"], 1);
    }

    #[tokio::test]
    async fn test_request_trigger_accepted() {
        let engine = engine();
        let (status, body) = send(app(&engine), "POST", "/recalculations/requests/r1").await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "accepted");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_run_ids() {
        let engine = engine();

        let (status, _) = send(
            app(&engine),
            "GET",
            "/recalculations/recalc-550e8400-e29b-41d4-a716-446655440000",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app(&engine), "GET", "/recalculations/not-a-run").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cache_stats_and_cleanup() {
        let engine = engine();
        send(app(&engine), "POST", "/travel/r1/professionals/p1").await;
        send(app(&engine), "POST", "/travel/r1/professionals/p1").await;

        let (status, body) = send(app(&engine), "GET", "/cache/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["misses"], 1);
        assert_eq!(body["total_operations"], 2);

        let (status, body) = send(app(&engine), "POST", "/cache/cleanup").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items_removed"], 0);
    }
}
