use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockforge_core::{DomainError, DomainResult, ProductId, TransactionId};

use crate::kind::TransactionKind;

/// A committed stock movement.
///
/// Immutable history record except through the explicit edit/delete flows in
/// [`crate::reconcile`], which also reconcile the owning product's stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub unit_price: f64,
}

/// The intent behind a create or edit of a stock transaction.
///
/// Date handling stays at the boundary: callers parse into a calendar date
/// before building the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub product_id: ProductId,
    pub quantity: i64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub unit_price: f64,
}

impl NewTransaction {
    /// Validate before any mutation, so a rejected intent leaves the store
    /// untouched.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if !(self.unit_price.is_finite() && self.unit_price > 0.0) {
            return Err(DomainError::validation("unit price must be positive"));
        }
        Ok(())
    }

    /// Materialize the draft into a record with the given identity.
    pub fn into_record(self, id: TransactionId) -> StockTransaction {
        StockTransaction {
            id,
            product_id: self.product_id,
            quantity: self.quantity,
            kind: self.kind,
            date: self.date,
            unit_price: self.unit_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(quantity: i64, unit_price: f64) -> NewTransaction {
        NewTransaction {
            product_id: ProductId::new(),
            quantity,
            kind: TransactionKind::Purchase,
            date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            unit_price,
        }
    }

    #[test]
    fn rejects_zero_quantity() {
        assert!(draft(0, 1.0).validate().is_err());
    }

    #[test]
    fn rejects_negative_quantity() {
        assert!(draft(-5, 1.0).validate().is_err());
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(draft(1, 0.0).validate().is_err());
        assert!(draft(1, -3.5).validate().is_err());
    }

    #[test]
    fn accepts_positive_quantity_and_price() {
        assert!(draft(10, 2.5).validate().is_ok());
    }
}
