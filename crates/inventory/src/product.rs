use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockforge_core::{DomainError, DomainResult, ProductId, SupplierId};

/// A product and its current stock level.
///
/// The product exclusively owns `stock_quantity`; transaction records are the
/// audit trail whose net effect, replayed in order, reproduces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub unit_price: f64,
    pub supplier_id: Option<SupplierId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating or editing a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub unit_price: f64,
    pub supplier_id: Option<SupplierId>,
}

impl NewProduct {
    /// Validate before any persistence: price strictly positive, stock
    /// non-negative, name and SKU non-empty.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if self.stock_quantity < 0 {
            return Err(DomainError::validation("stock quantity cannot be negative"));
        }
        if !(self.unit_price.is_finite() && self.unit_price > 0.0) {
            return Err(DomainError::validation("unit price must be positive"));
        }
        Ok(())
    }
}
