use crate::cli::ServeArgs;
use crate::infra::{load_engine, AppState};
use crate::routes::with_engine_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use benefits_engine::config::AppConfig;
use benefits_engine::error::AppError;
use benefits_engine::fields::LoadStatus;
use benefits_engine::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let engine = Arc::new(load_engine(&config.engine).await?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        fields: engine.fields().clone(),
    };

    let app = with_engine_routes(engine.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    // Requests are served while definitions load; masking applies once loaded.
    tokio::spawn(async move {
        if engine.fields().load_fields().await != LoadStatus::Loaded {
            warn!("field definitions failed to load; retry via POST /api/v1/fields/load");
        }
    });

    info!(?config.environment, %addr, "benefits engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
