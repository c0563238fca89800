use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockforge_ai::AdvisorError;
use stockforge_core::DomainError;
use stockforge_infra::{ReconcileError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Business-rule rejections map to client errors; none of these are retried.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match &err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        DomainError::InvalidKind(_) => json_error(StatusCode::BAD_REQUEST, "invalid_kind", err.to_string()),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", err.to_string()),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock", err.to_string())
        }
        DomainError::NegativeStock { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "negative_stock", err.to_string())
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match &err {
        StoreError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Backend(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

pub fn reconcile_error_to_response(err: ReconcileError) -> axum::response::Response {
    match err {
        ReconcileError::Domain(e) => domain_error_to_response(e),
        ReconcileError::Store(e) => store_error_to_response(e),
    }
}

pub fn advisor_error_to_response(err: AdvisorError) -> axum::response::Response {
    match &err {
        AdvisorError::InvalidInput(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_advisor_input", err.to_string())
        }
        AdvisorError::Unavailable(_) | AdvisorError::InvalidResponse(_) => {
            json_error(StatusCode::BAD_GATEWAY, "advisor_error", err.to_string())
        }
    }
}
