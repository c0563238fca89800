use std::sync::Arc;
use std::time::Duration;

use stockforge_ai::{HttpReorderAdvisor, HttpReorderAdvisorConfig, ReorderAdvisor};
use stockforge_api::app::{build_app, AppServices};
use stockforge_infra::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REORDER_API_URL: &str = "https://api.together.xyz/v1/chat/completions";
const DEFAULT_REORDER_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free";

#[tokio::main]
async fn main() {
    stockforge_observability::init();

    let store: Arc<dyn InventoryStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PostgresInventoryStore::connect(&url)
                .await
                .expect("failed to connect to DATABASE_URL");
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            Arc::new(InMemoryInventoryStore::new())
        }
    };

    let advisor: Option<Arc<dyn ReorderAdvisor>> = match std::env::var("REORDER_API_KEY") {
        Ok(api_key) => {
            let api_url = std::env::var("REORDER_API_URL")
                .unwrap_or_else(|_| DEFAULT_REORDER_API_URL.to_string());
            let model = std::env::var("REORDER_MODEL")
                .unwrap_or_else(|_| DEFAULT_REORDER_MODEL.to_string());
            let config = HttpReorderAdvisorConfig::new(api_url, api_key, model)
                .with_timeout(Duration::from_secs(20));
            let advisor =
                HttpReorderAdvisor::new(config).expect("failed to build reorder advisor client");
            Some(Arc::new(advisor) as Arc<dyn ReorderAdvisor>)
        }
        Err(_) => {
            tracing::warn!("REORDER_API_KEY not set; reorder suggestions disabled");
            None
        }
    };

    let services = Arc::new(AppServices::new(store, advisor));
    let app = build_app(services);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
