use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use stockforge_api::app::{build_app, AppServices};
use stockforge_infra::InMemoryInventoryStore;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, backed by the in-memory store, no advisor.
        let services = Arc::new(AppServices::new(Arc::new(InMemoryInventoryStore::new()), None));
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_product(
    client: &reqwest::Client,
    base_url: &str,
    sku: &str,
    stock: i64,
) -> String {
    let res = client
        .post(format!("{base_url}/products"))
        .json(&json!({
            "name": format!("Product {sku}"),
            "sku": sku,
            "stock_quantity": stock,
            "unit_price": 10.0,
            "supplier_id": null,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn product_stock(client: &reqwest::Client, base_url: &str, id: &str) -> i64 {
    let res = client
        .get(format!("{base_url}/products/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json::<serde_json::Value>().await.unwrap()["stock_quantity"]
        .as_i64()
        .unwrap()
}

fn transaction_body(product_id: &str, kind: &str, quantity: i64, date: &str) -> serde_json::Value {
    json!({
        "product_id": product_id,
        "quantity": quantity,
        "kind": kind,
        "date": date,
        "unit_price": 4.0,
    })
}

#[tokio::test]
async fn health_answers_ok() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn transaction_lifecycle_moves_stock() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let pid = create_product(&client, &server.base_url, "SKU-001", 50).await;

    // Purchase 20 -> 70.
    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "purchase", 20, "2026-08-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let purchase_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(product_stock(&client, &server.base_url, &pid).await, 70);

    // Sale 30 -> 40.
    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "sale", 30, "2026-08-02"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let sale_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(product_stock(&client, &server.base_url, &pid).await, 40);

    // Edit the sale to 50: reversal makes the baseline 70, so it fits -> 20.
    let res = client
        .put(format!("{}/transactions/{}", server.base_url, sale_id))
        .json(&transaction_body(&pid, "sale", 50, "2026-08-02"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(product_stock(&client, &server.base_url, &pid).await, 20);

    // Delete the purchase -> 0.
    let res = client
        .delete(format!("{}/transactions/{}", server.base_url, purchase_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(product_stock(&client, &server.base_url, &pid).await, 0);
}

#[tokio::test]
async fn oversell_returns_unprocessable_and_changes_nothing() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let pid = create_product(&client, &server.base_url, "SKU-002", 5).await;

    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "sale", 10, "2026-08-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = res.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    assert_eq!(product_stock(&client, &server.base_url, &pid).await, 5);
    let res = client
        .get(format!("{}/transactions", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(res.json::<serde_json::Value>().await.unwrap()["items"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn deleting_consumed_purchase_is_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let pid = create_product(&client, &server.base_url, "SKU-003", 0).await;

    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "purchase", 10, "2026-08-01"))
        .send()
        .await
        .unwrap();
    let purchase_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "sale", 8, "2026-08-02"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .delete(format!("{}/transactions/{}", server.base_url, purchase_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = res.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "negative_stock");
    assert_eq!(product_stock(&client, &server.base_url, &pid).await, 2);
}

#[tokio::test]
async fn validation_and_id_errors_are_bad_requests() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let pid = create_product(&client, &server.base_url, "SKU-004", 5).await;

    // Unknown kind.
    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "refund", 1, "2026-08-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<serde_json::Value>().await.unwrap()["error"],
        "invalid_kind"
    );

    // Non-positive quantity.
    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "sale", 0, "2026-08-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Malformed date.
    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "sale", 1, "01/08/2026"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Malformed product id in path.
    let res = client
        .get(format!("{}/products/not-a-uuid", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Missing product.
    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(
            "00000000-0000-7000-8000-000000000000",
            "sale",
            1,
            "2026-08-01",
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn supplier_and_product_guards() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/suppliers", server.base_url))
        .json(&json!({"name": "Acme Supply", "contact_email": "sales@acme.test"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let sid = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Duplicate supplier name conflicts.
    let res = client
        .post(format!("{}/suppliers", server.base_url))
        .json(&json!({"name": "Acme Supply"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // A product referencing the supplier blocks its deletion.
    let res = client
        .post(format!("{}/products", server.base_url))
        .json(&json!({
            "name": "Widget",
            "sku": "SKU-005",
            "stock_quantity": 3,
            "unit_price": 2.5,
            "supplier_id": sid,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let pid = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .delete(format!("{}/suppliers/{}", server.base_url, sid))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // A transaction blocks product deletion.
    let res = client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "sale", 1, "2026-08-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = client
        .delete(format!("{}/products/{}", server.base_url, pid))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Supplier name shows up on the product listing.
    let res = client
        .get(format!("{}/products", server.base_url))
        .send()
        .await
        .unwrap();
    let items = res.json::<serde_json::Value>().await.unwrap();
    assert_eq!(items["items"][0]["supplier_name"], "Acme Supply");
}

#[tokio::test]
async fn dashboard_and_reports_aggregate() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let pid = create_product(&client, &server.base_url, "SKU-006", 50).await;

    client
        .post(format!("{}/transactions", server.base_url))
        .json(&transaction_body(&pid, "sale", 20, "2026-08-02"))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{}/dashboard", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let summary = res.json::<serde_json::Value>().await.unwrap();
    assert_eq!(summary["total_products"], 1);
    assert_eq!(summary["total_transactions"], 1);
    assert_eq!(summary["total_stock_value"], 300.0);

    let res = client
        .get(format!("{}/reports", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report = res.json::<serde_json::Value>().await.unwrap();
    assert_eq!(report["sale_count"], 1);
    assert_eq!(report["monthly_units_sold"][0]["month"], "2026-08");
    assert_eq!(report["monthly_units_sold"][0]["units"], 20);
}

#[tokio::test]
async fn reorder_suggestion_degrades_without_advisor() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let pid = create_product(&client, &server.base_url, "SKU-007", 5).await;

    let res = client
        .get(format!(
            "{}/products/{}/reorder-suggestion",
            server.base_url, pid
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        res.json::<serde_json::Value>().await.unwrap()["error"],
        "advisor_disabled"
    );
}
