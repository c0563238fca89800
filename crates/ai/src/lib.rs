//! `stockforge-ai`
//!
//! **Responsibility:** Optional reorder-suggestion subsystem boundary.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not depend on the inventory store or mutate domain state.
//! - It consumes a snapshot of product activity provided by callers.
//! - Its failures surface to the user and never affect stock reconciliation.

pub mod advisor;
pub mod http;

pub use advisor::{AdvisorError, ProductActivity, ReorderAdvisor, ReorderSuggestion};
pub use http::{HttpReorderAdvisor, HttpReorderAdvisorConfig};
