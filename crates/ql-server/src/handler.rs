use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use ql_core::core::{RefineError, SelectionError, Style, VersionId};
use ql_feedback::FeedbackMetadata;

use crate::service::{FeedbackParams, RefineParams, RefinementService, ServiceError};

// ---------------------------------------------------------------------------
// AppState — shared state for all handlers
// ---------------------------------------------------------------------------

pub struct AppState {
    pub service: RefinementService,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/refine", post(handle_refine))
        .route("/v1/variants", post(handle_variants))
        .route("/v1/feedback", post(handle_feedback))
        .route("/v1/statistics", get(handle_statistics))
        .route("/v1/best-parameters", get(handle_best_parameters))
        .route("/health", get(handle_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RefineBody {
    pub content: String,
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub human_feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VariantsBody {
    pub content: String,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub version_id: VersionId,
    pub rating: f64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<FeedbackMetadata>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn handle_refine(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let body: RefineBody = match parse_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let params = RefineParams {
        content: body.content,
        style: body.style,
        max_iterations: body.max_iterations,
        human_feedback: body.human_feedback,
    };

    match state.service.refine(params).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn handle_variants(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let body: VariantsBody = match parse_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match state.service.variants(&body.content, body.count).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn handle_feedback(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let body: FeedbackBody = match parse_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let params = FeedbackParams {
        version_id: body.version_id,
        rating: body.rating,
        comment: body.comment,
        content: body.content,
        metadata: body.metadata,
    };

    match state.service.record_feedback(params).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn handle_statistics(State(state): State<Arc<AppState>>) -> Response {
    match state.service.statistics().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn handle_best_parameters(State(state): State<Arc<AppState>>) -> Response {
    match state.service.best_parameters().await {
        Ok(best) => (StatusCode::OK, Json(best)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    let tracked_versions = state.service.versions().tracked_count().await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "tracked_versions": tracked_versions,
        })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            format!("invalid request body: {e}"),
        )
    })
}

fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    let body = serde_json::json!({
        "error": {
            "message": message,
            "type": error_type,
            "code": status.as_u16(),
        }
    });

    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Error → Response conversion
// ---------------------------------------------------------------------------

pub fn service_error_to_response(err: ServiceError) -> Response {
    let (status, error_type) = match &err {
        ServiceError::Refine(RefineError::EmptySource | RefineError::InvalidPolicy(_))
        | ServiceError::Selection(
            SelectionError::NoVariantsRequested | SelectionError::NoCandidates,
        )
        | ServiceError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        ServiceError::Refine(RefineError::Generation { .. })
        | ServiceError::Selection(SelectionError::Generation(_)) => {
            (StatusCode::BAD_GATEWAY, "backend_error")
        }
        ServiceError::UnknownVersion(_) => (StatusCode::NOT_FOUND, "not_found_error"),
        ServiceError::Ledger(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
        ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
    };

    if status.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
    }

    error_response(status, error_type, err.to_string())
}
