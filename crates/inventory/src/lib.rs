//! `stockforge-inventory` — inventory domain model and the stock
//! reconciliation planner.
//!
//! Everything here is **pure**: records in, plans out, no I/O. Persistence and
//! atomicity belong to the infra layer, which loads current state, asks this
//! crate for a [`ReconcilePlan`], and applies the plan as one unit.

pub mod kind;
pub mod product;
pub mod reconcile;
pub mod supplier;
pub mod transaction;

pub use kind::TransactionKind;
pub use product::{NewProduct, Product};
pub use reconcile::{plan_create, plan_delete, plan_update, ReconcilePlan, RowAction, StockWrite};
pub use supplier::{NewSupplier, Supplier};
pub use transaction::{NewTransaction, StockTransaction};
