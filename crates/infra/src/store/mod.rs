//! Inventory storage: trait plus Postgres and in-memory implementations.

pub mod in_memory;
pub mod postgres;
mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use r#trait::{
    DashboardSummary, InventoryReport, InventoryStore, MonthlyAmount, MonthlyUnits,
    MovementTotals, ProductView, StoreError, SupplierView, TopProduct, TransactionView,
    LOW_STOCK_THRESHOLD,
};
