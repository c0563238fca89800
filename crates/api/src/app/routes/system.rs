use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}
