use std::sync::Arc;

use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};

use crate::app::{errors, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/reports", get(reports))
}

async fn dashboard(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store.dashboard_summary().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn reports(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store.inventory_report().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
