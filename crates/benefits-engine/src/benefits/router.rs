use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::BenefitEngine;
use crate::catalog::{CatalogItem, UserRecord};
use crate::documents::parse_timestamp;
use crate::error::AppError;
use crate::fields::{FieldSource, LoadStatus};

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub item: CatalogItem,
    pub user: UserRecord,
    /// Evaluation instant; defaults to the current time.
    #[serde(default)]
    pub now: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user: UserRecord,
    #[serde(default)]
    pub now: Option<String>,
}

/// HTTP endpoints over one engine instance.
pub fn benefit_router<S>(engine: Arc<BenefitEngine<S>>) -> Router
where
    S: FieldSource + 'static,
{
    Router::new()
        .route("/api/v1/benefits/evaluate", post(evaluate_handler::<S>))
        .route("/api/v1/profile/view", post(profile_handler::<S>))
        .route("/api/v1/documents/view", post(documents_handler::<S>))
        .route("/api/v1/fields/load", post(load_fields_handler::<S>))
        .with_state(engine)
}

/// Parse an optional caller-supplied instant, defaulting to now.
pub fn resolve_now(raw: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => parse_timestamp(raw)
            .ok_or_else(|| AppError::InvalidInput(format!("unrecognised timestamp {raw:?}"))),
    }
}

async fn evaluate_handler<S>(
    State(engine): State<Arc<BenefitEngine<S>>>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    S: FieldSource + 'static,
{
    match resolve_now(request.now.as_deref()) {
        Ok(now) => {
            let report = engine.evaluate_benefit(&request.item, &request.user, now);
            (StatusCode::OK, axum::Json(report)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn profile_handler<S>(
    State(engine): State<Arc<BenefitEngine<S>>>,
    axum::Json(request): axum::Json<UserRequest>,
) -> Response
where
    S: FieldSource + 'static,
{
    let rows = engine.profile_view(&request.user);
    (StatusCode::OK, axum::Json(rows)).into_response()
}

async fn documents_handler<S>(
    State(engine): State<Arc<BenefitEngine<S>>>,
    axum::Json(request): axum::Json<UserRequest>,
) -> Response
where
    S: FieldSource + 'static,
{
    match resolve_now(request.now.as_deref()) {
        Ok(now) => {
            let rows = engine.document_view(&request.user, now);
            (StatusCode::OK, axum::Json(rows)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn load_fields_handler<S>(State(engine): State<Arc<BenefitEngine<S>>>) -> Response
where
    S: FieldSource + 'static,
{
    let status = engine.fields().load_fields().await;
    let payload = json!({
        "status": status,
        "fields": engine.fields().snapshot().len(),
    });
    let code = match status {
        LoadStatus::Loaded => StatusCode::OK,
        LoadStatus::Unloaded | LoadStatus::Failed => StatusCode::SERVICE_UNAVAILABLE,
    };

    (code, axum::Json(payload)).into_response()
}
