//! Infrastructure layer: storage adapters and the reconciliation service.

pub mod reconciler;
pub mod store;


pub use reconciler::{ReconcileError, StockReconciler};
pub use store::{
    DashboardSummary, InMemoryInventoryStore, InventoryReport, InventoryStore, MonthlyAmount,
    MonthlyUnits, MovementTotals, PostgresInventoryStore, ProductView, StoreError, SupplierView,
    TopProduct, TransactionView, LOW_STOCK_THRESHOLD,
};
