use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use stockforge_core::{ProductId, SupplierId, TransactionId};
use stockforge_inventory::{NewProduct, Product, ReconcilePlan, StockTransaction, Supplier};

/// Products with fewer units than this show up on the dashboard low-stock list.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Storage-level error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or referential constraint was violated, or a delete is
    /// blocked by dependent rows.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound,

    /// The backing store failed (connection, query, lock).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A product joined with its supplier's name for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub supplier_name: Option<String>,
}

/// A supplier joined with the number of products it supplies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierView {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub product_count: i64,
}

/// A transaction joined with its product's name and SKU for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: StockTransaction,
    pub product_name: String,
    pub product_sku: String,
}

/// Headline metrics for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_products: i64,
    /// Sum of `stock_quantity * unit_price` across all products.
    pub total_stock_value: f64,
    pub low_stock_products: Vec<ProductView>,
    pub low_stock_count: i64,
    pub total_transactions: i64,
}

/// Units moved in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyUnits {
    /// `YYYY-MM`.
    pub month: String,
    pub units: i64,
}

/// A monetary figure for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAmount {
    /// `YYYY-MM`.
    pub month: String,
    pub amount: f64,
}

/// A product ranked by units sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub name: String,
    pub units_sold: i64,
}

/// Aggregated report payload: valuation, low stock, six months of sales
/// figures, top sellers, and movement counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReport {
    pub total_stock_value: f64,
    pub low_stock_products: Vec<ProductView>,
    pub low_stock_count: i64,
    pub supplier_count: i64,
    pub monthly_units_sold: Vec<MonthlyUnits>,
    pub monthly_sales_value: Vec<MonthlyAmount>,
    pub monthly_net_profit: Vec<MonthlyAmount>,
    pub top_products: Vec<TopProduct>,
    pub purchase_count: i64,
    pub sale_count: i64,
}

/// Per-product purchase/sale totals over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MovementTotals {
    pub sold: i64,
    pub purchased: i64,
}

/// The persistence surface of the application.
///
/// Reconciliation writes go through [`InventoryStore::apply`], which must
/// commit a whole [`ReconcilePlan`] or none of it. Everything else is
/// single-row CRUD and read-only aggregation.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    // -- products --

    /// Insert a product. Duplicate SKU or a dangling supplier reference is a
    /// [`StoreError::Conflict`].
    async fn insert_product(&self, product: Product) -> Result<(), StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products with supplier names, ordered by name.
    async fn list_products(&self) -> Result<Vec<ProductView>, StoreError>;

    /// Overwrite a product's editable fields and refresh `updated_at`.
    async fn update_product(&self, id: ProductId, fields: NewProduct) -> Result<(), StoreError>;

    /// Delete a product. Blocked with a [`StoreError::Conflict`] while
    /// transactions reference it.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    // -- suppliers --

    /// Insert a supplier. Duplicate name is a [`StoreError::Conflict`].
    async fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError>;

    /// All suppliers with product counts, ordered by name.
    async fn list_suppliers(&self) -> Result<Vec<SupplierView>, StoreError>;

    /// Delete a supplier. Blocked with a [`StoreError::Conflict`] while
    /// products reference it.
    async fn delete_supplier(&self, id: SupplierId) -> Result<(), StoreError>;

    // -- transactions --

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<StockTransaction>, StoreError>;

    /// All transactions with product details, newest first.
    async fn list_transactions(&self) -> Result<Vec<TransactionView>, StoreError>;

    /// Apply one reconciliation plan atomically: every stock write plus the
    /// row action commit together, or the store is left untouched.
    async fn apply(&self, plan: ReconcilePlan) -> Result<(), StoreError>;

    // -- aggregation --

    async fn dashboard_summary(&self) -> Result<DashboardSummary, StoreError>;

    async fn inventory_report(&self) -> Result<InventoryReport, StoreError>;

    /// Purchase/sale totals for one product on or after `since`.
    async fn movement_totals(
        &self,
        product_id: ProductId,
        since: NaiveDate,
    ) -> Result<MovementTotals, StoreError>;
}
