//! Application wiring: shared services and the router.

use std::sync::Arc;

use axum::{extract::Extension, Router};
use tower::ServiceBuilder;

use stockforge_ai::ReorderAdvisor;
use stockforge_infra::{InventoryStore, StockReconciler};

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared per-process services handed to every handler.
pub struct AppServices {
    pub store: Arc<dyn InventoryStore>,
    pub reconciler: StockReconciler,
    /// Absent when no advisor is configured; the suggestion route degrades to
    /// a user-visible error.
    pub advisor: Option<Arc<dyn ReorderAdvisor>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn InventoryStore>, advisor: Option<Arc<dyn ReorderAdvisor>>) -> Self {
        let reconciler = StockReconciler::new(store.clone());
        Self {
            store,
            reconciler,
            advisor,
        }
    }
}

/// Build the full application router.
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .merge(routes::system::router())
        .nest("/products", routes::products::router())
        .nest("/suppliers", routes::suppliers::router())
        .nest("/transactions", routes::transactions::router())
        .merge(routes::reports::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
