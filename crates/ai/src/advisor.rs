use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockforge_core::ProductId;

/// Snapshot of one product's recent movement, the advisor's only input.
///
/// Callers (infra/API) assemble this from the store; the advisor itself stays
/// storage-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductActivity {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    /// Units sold over the trailing 30 days.
    pub sold_30d: i64,
    /// Units purchased over the trailing 30 days.
    pub purchased_30d: i64,
}

/// A reorder suggestion produced by an advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub reorder_quantity: u32,
    pub reasoning: String,
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The snapshot was unusable (e.g. inconsistent totals).
    #[error("invalid advisor input: {0}")]
    InvalidInput(String),

    /// The external service could not be reached or timed out.
    #[error("advisor unavailable: {0}")]
    Unavailable(String),

    /// The external service answered with something other than a well-formed
    /// suggestion.
    #[error("invalid advisor response: {0}")]
    InvalidResponse(String),
}

/// Produces reorder suggestions from product activity snapshots.
#[async_trait]
pub trait ReorderAdvisor: Send + Sync + 'static {
    async fn suggest(&self, activity: &ProductActivity) -> Result<ReorderSuggestion, AdvisorError>;
}
