use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};

use stockforge_ai::ProductActivity;
use stockforge_core::ProductId;
use stockforge_inventory::Product;

use crate::app::{dto, errors, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/reorder-suggestion", get(reorder_suggestion))
}

fn parse_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
    })
}

async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ProductRequest>,
) -> axum::response::Response {
    let fields = body.into_fields();
    if let Err(e) = fields.validate() {
        return errors::domain_error_to_response(e);
    }

    let now = Utc::now();
    let product = Product {
        id: ProductId::new(),
        name: fields.name,
        sku: fields.sku,
        stock_quantity: fields.stock_quantity,
        unit_price: fields.unit_price,
        supplier_id: fields.supplier_id,
        created_at: now,
        updated_at: now,
    };
    let id = product.id;

    match services.store.insert_product(product).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({"id": id.to_string()})),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.list_products().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.store.get_product(id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ProductRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let fields = body.into_fields();
    if let Err(e) = fields.validate() {
        return errors::domain_error_to_response(e);
    }
    match services.store.update_product(id, fields).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"id": id.to_string()}))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.store.delete_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Ask the configured advisor for a reorder quantity based on the product's
/// trailing 30 days of movement. Advisor trouble is the caller's to see; it
/// never touches stock.
async fn reorder_suggestion(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    let product = match services.store.get_product(id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found")
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    let Some(advisor) = services.advisor.as_ref() else {
        return errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "advisor_disabled",
            "reorder advisor is not configured",
        );
    };

    let since = Utc::now().date_naive() - Duration::days(30);
    let totals = match services.store.movement_totals(id, since).await {
        Ok(t) => t,
        Err(e) => return errors::store_error_to_response(e),
    };

    let activity = ProductActivity {
        product_id: product.id,
        name: product.name,
        sku: product.sku,
        stock_quantity: product.stock_quantity,
        sold_30d: totals.sold,
        purchased_30d: totals.purchased,
    };

    match advisor.suggest(&activity).await {
        Ok(suggestion) => (StatusCode::OK, Json(suggestion)).into_response(),
        Err(e) => errors::advisor_error_to_response(e),
    }
}
