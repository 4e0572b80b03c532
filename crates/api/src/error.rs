//! API error type with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline::PipelineError;

/// API-level error that maps pipeline failures to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client (malformed ids, missing fields).
    BadRequest(String),
    /// Failure raised by the pipeline services.
    Pipeline(PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Pipeline(err) => pipeline_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn pipeline_error_to_response(err: PipelineError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        PipelineError::InvalidInput(_)
        | PipelineError::InvalidState(_)
        | PipelineError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::AlreadyProcessed(_) => StatusCode::CONFLICT,
        PipelineError::PaymentRejected { .. } => StatusCode::PAYMENT_REQUIRED,
        PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "internal server error");
    }

    // Stock shortfalls carry every offending line so the client can
    // fix the whole cart in one pass.
    let body = match &err {
        PipelineError::InsufficientStock(lines) => serde_json::json!({
            "error": err.to_string(),
            "insufficient_stock_items": lines,
        }),
        _ => serde_json::json!({ "error": err.to_string() }),
    };

    (status, body)
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}
