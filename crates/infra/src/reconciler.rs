//! Stock reconciliation service.
//!
//! Loads current state from the store, asks the domain planner for a
//! [`ReconcilePlan`](stockforge_inventory::ReconcilePlan), and applies it via
//! [`InventoryStore::apply`], which commits everything or nothing.
//!
//! Reads happen before the apply transaction, so two concurrent sales against
//! the same product can both observe the pre-decrement stock and both commit.
//! This mirrors the per-request model the store contract assumes; callers
//! wanting stricter guarantees need optimistic versioning or row locks.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use stockforge_core::{DomainError, TransactionId};
use stockforge_inventory::{plan_create, plan_delete, plan_update, NewTransaction};

use crate::store::{InventoryStore, StoreError};

/// Failure of one reconciliation operation.
///
/// Domain variants are business-rule rejections: callers surface them to the
/// user and must not retry.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The reconciliation engine's entry points.
#[derive(Clone)]
pub struct StockReconciler {
    store: Arc<dyn InventoryStore>,
}

impl StockReconciler {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Record a new transaction and move the product's stock accordingly.
    #[instrument(skip(self, draft), fields(product_id = %draft.product_id, kind = %draft.kind))]
    pub async fn create(&self, draft: NewTransaction) -> Result<TransactionId, ReconcileError> {
        let product = self
            .store
            .get_product(draft.product_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let id = TransactionId::new();
        let plan = plan_create(id, &product, draft)?;
        self.store.apply(plan).await?;
        Ok(id)
    }

    /// Edit a transaction, reconciling stock on the original and (possibly
    /// different) target product.
    #[instrument(skip(self, draft), fields(transaction_id = %id))]
    pub async fn update(
        &self,
        id: TransactionId,
        draft: NewTransaction,
    ) -> Result<(), ReconcileError> {
        let original = self
            .store
            .get_transaction(id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let original_product = self
            .store
            .get_product(original.product_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let target_product = if draft.product_id == original.product_id {
            original_product.clone()
        } else {
            self.store
                .get_product(draft.product_id)
                .await?
                .ok_or(DomainError::NotFound)?
        };

        let plan = plan_update(&original, &original_product, &target_product, draft)?;
        self.store.apply(plan).await?;
        Ok(())
    }

    /// Delete a transaction, reverting its effect on the owning product.
    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn delete(&self, id: TransactionId) -> Result<(), ReconcileError> {
        let transaction = self
            .store
            .get_transaction(id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let product = self
            .store
            .get_product(transaction.product_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let plan = plan_delete(&transaction, &product)?;
        self.store.apply(plan).await?;
        Ok(())
    }
}
