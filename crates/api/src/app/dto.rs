//! Request DTOs and their mapping into domain types.
//!
//! Responses serialize the store's view types directly; only requests need
//! mapping (kind strings and calendar dates parse here, at the boundary).

use chrono::NaiveDate;
use serde::Deserialize;

use stockforge_core::{DomainError, ProductId, SupplierId};
use stockforge_inventory::{NewProduct, NewSupplier, NewTransaction};

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub unit_price: f64,
    pub supplier_id: Option<SupplierId>,
}

impl ProductRequest {
    pub fn into_fields(self) -> NewProduct {
        NewProduct {
            name: self.name,
            sku: self.sku,
            stock_quantity: self.stock_quantity,
            unit_price: self.unit_price,
            supplier_id: self.supplier_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SupplierRequest {
    pub name: String,
    pub contact_email: Option<String>,
}

impl SupplierRequest {
    pub fn into_fields(self) -> NewSupplier {
        NewSupplier {
            name: self.name,
            contact_email: self.contact_email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    /// `purchase` or `sale`.
    pub kind: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub unit_price: f64,
}

impl TransactionRequest {
    pub fn into_draft(self) -> Result<NewTransaction, DomainError> {
        let kind = self.kind.parse()?;
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|_| {
            DomainError::validation(format!(
                "invalid date '{}', expected YYYY-MM-DD",
                self.date
            ))
        })?;
        Ok(NewTransaction {
            product_id: self.product_id,
            quantity: self.quantity,
            kind,
            date,
            unit_price: self.unit_price,
        })
    }
}
