use crate::infra::{AppState, Engine};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use benefits_engine::benefits::benefit_router;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_engine_routes(engine: Arc<Engine>) -> axum::Router {
    benefit_router(engine)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and field definitions have loaded, so
/// masking is in force for every response.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let bound = state.readiness.load(Ordering::Relaxed);
    let fields = state.fields.status();
    let ready = bound && state.fields.is_loaded();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing", "fields": fields })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::load_engine;
    use crate::infra::tests::{scratch_dir, write_config};
    use axum::body::Body;
    use axum::http::Request;
    use benefits_engine::config::EngineConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    async fn fixture() -> (Arc<Engine>, AppState) {
        let dir = scratch_dir("routes");
        write_config(&dir);
        let engine = Arc::new(
            load_engine(&EngineConfig { config_dir: dir })
                .await
                .expect("engine loads"),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            fields: engine.fields().clone(),
        };
        (engine, state)
    }

    async fn read_json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_waits_for_listener_and_fields() {
        let (engine, state) = fixture().await;

        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            read_json_body(response).await,
            json!({ "status": "initializing", "fields": "unloaded" })
        );

        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        engine.fields().load_fields().await;
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn router_serves_operational_and_engine_routes() {
        let (engine, state) = fixture().await;
        let app = with_engine_routes(engine).layer(Extension(state));

        let health = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(health.status(), StatusCode::OK);

        let metrics = app
            .clone()
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(
            metrics.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some("text/plain; version=0.0.4".as_bytes())
        );

        let documents = app
            .oneshot(
                Request::post("/api/v1/documents/view")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "user": {} }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(documents.status(), StatusCode::OK);
        let rows = read_json_body(documents).await;
        assert_eq!(rows[0]["subtype"], json!("incomeCertificate"));
        assert_eq!(rows[0]["availability"], json!("incomplete"));
    }
}
