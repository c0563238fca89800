//! Stock reconciliation planner.
//!
//! Keeps `Product.stock_quantity` consistent with the net effect of the
//! transactions attached to it, across create, update, and delete of a stock
//! transaction. Each function validates first, then computes the full set of
//! product writes plus the single row action; a returned error means nothing
//! may be persisted. The store applies a plan as one atomic unit.

use stockforge_core::{DomainError, DomainResult, ProductId, TransactionId};

use crate::kind::TransactionKind;
use crate::product::Product;
use crate::transaction::{NewTransaction, StockTransaction};

/// A pending stock-level write for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockWrite {
    pub product_id: ProductId,
    pub new_stock: i64,
}

/// The transaction-row side of a reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum RowAction {
    Insert(StockTransaction),
    Update(StockTransaction),
    Delete(TransactionId),
}

/// The grouped writes of one reconciliation operation.
///
/// `writes` holds one product stock write, or two during a cross-product
/// update. All writes and the row action commit together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub writes: Vec<StockWrite>,
    pub action: RowAction,
}

impl ReconcilePlan {
    /// The stock write targeting `product_id`, if the plan has one.
    pub fn write_for(&self, product_id: ProductId) -> Option<&StockWrite> {
        self.writes.iter().find(|w| w.product_id == product_id)
    }
}

/// Apply a transaction's effect to a stock level.
///
/// Sales must not take stock below zero; purchases are unbounded above.
fn apply_effect(stock: i64, kind: TransactionKind, quantity: i64) -> DomainResult<i64> {
    match kind {
        TransactionKind::Purchase => Ok(stock + quantity),
        TransactionKind::Sale => {
            if stock < quantity {
                return Err(DomainError::insufficient_stock(stock, quantity));
            }
            Ok(stock - quantity)
        }
    }
}

/// Undo a transaction's effect on a stock level.
///
/// The result may be transiently negative during an update; it is only ever
/// persisted as part of a full plan.
fn reverse_effect(stock: i64, kind: TransactionKind, quantity: i64) -> i64 {
    match kind {
        TransactionKind::Purchase => stock - quantity,
        TransactionKind::Sale => stock + quantity,
    }
}

/// Plan recording a new transaction against `product`.
///
/// Fails without a plan on invalid quantity/price, or when a sale exceeds the
/// product's current stock.
pub fn plan_create(
    id: TransactionId,
    product: &Product,
    draft: NewTransaction,
) -> DomainResult<ReconcilePlan> {
    draft.validate()?;
    if draft.product_id != product.id {
        return Err(DomainError::not_found());
    }

    let new_stock = apply_effect(product.stock_quantity, draft.kind, draft.quantity)?;

    Ok(ReconcilePlan {
        writes: vec![StockWrite {
            product_id: product.id,
            new_stock,
        }],
        action: RowAction::Insert(draft.into_record(id)),
    })
}

/// Plan editing an existing transaction, possibly moving it to another product.
///
/// Two-phase reconciliation: the original effect is reversed against the
/// original product's current stock, then the new effect is applied. When the
/// product changes, the reversed stock becomes a write against the original
/// product and the target product's own stock is the baseline; otherwise the
/// reversed value itself is the baseline. A sale exceeding the baseline aborts
/// the whole edit, reversal included.
pub fn plan_update(
    original: &StockTransaction,
    original_product: &Product,
    target_product: &Product,
    draft: NewTransaction,
) -> DomainResult<ReconcilePlan> {
    draft.validate()?;
    if original.product_id != original_product.id || draft.product_id != target_product.id {
        return Err(DomainError::not_found());
    }

    let reversed = reverse_effect(
        original_product.stock_quantity,
        original.kind,
        original.quantity,
    );

    let mut writes = Vec::with_capacity(2);
    let baseline = if original.product_id == draft.product_id {
        reversed
    } else {
        writes.push(StockWrite {
            product_id: original.product_id,
            new_stock: reversed,
        });
        target_product.stock_quantity
    };

    let new_target_stock = apply_effect(baseline, draft.kind, draft.quantity)?;
    writes.push(StockWrite {
        product_id: draft.product_id,
        new_stock: new_target_stock,
    });

    Ok(ReconcilePlan {
        writes,
        action: RowAction::Update(draft.into_record(original.id)),
    })
}

/// Plan deleting a transaction, reverting its effect on the owning product.
///
/// Deleting a purchase whose stock addition has since been consumed would
/// leave the product negative; that delete is rejected and nothing changes.
pub fn plan_delete(
    transaction: &StockTransaction,
    product: &Product,
) -> DomainResult<ReconcilePlan> {
    if transaction.product_id != product.id {
        return Err(DomainError::not_found());
    }

    let new_stock = match transaction.kind {
        TransactionKind::Sale => product.stock_quantity + transaction.quantity,
        TransactionKind::Purchase => {
            if product.stock_quantity - transaction.quantity < 0 {
                return Err(DomainError::negative_stock(
                    product.stock_quantity,
                    transaction.quantity,
                ));
            }
            product.stock_quantity - transaction.quantity
        }
    };

    Ok(ReconcilePlan {
        writes: vec![StockWrite {
            product_id: product.id,
            new_stock,
        }],
        action: RowAction::Delete(transaction.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn product(stock: i64) -> Product {
        Product {
            id: ProductId::new(),
            name: "Widget".to_string(),
            sku: "SKU-001".to_string(),
            stock_quantity: stock,
            unit_price: 10.0,
            supplier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    fn draft(product_id: ProductId, kind: TransactionKind, quantity: i64) -> NewTransaction {
        NewTransaction {
            product_id,
            quantity,
            kind,
            date: date(),
            unit_price: 5.0,
        }
    }

    #[test]
    fn purchase_adds_to_stock() {
        let p = product(50);
        let plan = plan_create(
            TransactionId::new(),
            &p,
            draft(p.id, TransactionKind::Purchase, 20),
        )
        .unwrap();
        assert_eq!(plan.write_for(p.id).unwrap().new_stock, 70);
        assert!(matches!(plan.action, RowAction::Insert(_)));
    }

    #[test]
    fn sale_subtracts_from_stock() {
        let p = product(50);
        let plan = plan_create(
            TransactionId::new(),
            &p,
            draft(p.id, TransactionKind::Sale, 30),
        )
        .unwrap();
        assert_eq!(plan.write_for(p.id).unwrap().new_stock, 20);
    }

    #[test]
    fn oversell_is_rejected_with_no_plan() {
        let p = product(5);
        let err = plan_create(
            TransactionId::new(),
            &p,
            draft(p.id, TransactionKind::Sale, 10),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 5,
                requested: 10
            }
        );
    }

    #[test]
    fn sale_of_exact_stock_drains_to_zero() {
        let p = product(10);
        let plan = plan_create(
            TransactionId::new(),
            &p,
            draft(p.id, TransactionKind::Sale, 10),
        )
        .unwrap();
        assert_eq!(plan.write_for(p.id).unwrap().new_stock, 0);
    }

    #[test]
    fn create_rejects_invalid_quantity_before_stock_check() {
        let p = product(0);
        let err = plan_create(
            TransactionId::new(),
            &p,
            draft(p.id, TransactionKind::Sale, 0),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn same_product_update_uses_reversed_stock_as_baseline() {
        // Stock 40 with a committed sale of 30; editing that sale to 50 must
        // succeed against the reversed baseline of 70.
        let p = product(40);
        let original = draft(p.id, TransactionKind::Sale, 30).into_record(TransactionId::new());
        let plan =
            plan_update(&original, &p, &p, draft(p.id, TransactionKind::Sale, 50)).unwrap();

        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.write_for(p.id).unwrap().new_stock, 20);
        match &plan.action {
            RowAction::Update(t) => {
                assert_eq!(t.id, original.id);
                assert_eq!(t.quantity, 50);
            }
            _ => panic!("expected Update row action"),
        }
    }

    #[test]
    fn same_product_update_rejects_sale_beyond_baseline() {
        let p = product(40);
        let original = draft(p.id, TransactionKind::Sale, 30).into_record(TransactionId::new());
        let err = plan_update(&original, &p, &p, draft(p.id, TransactionKind::Sale, 71))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 70,
                requested: 71
            }
        );
    }

    #[test]
    fn cross_product_update_reverses_origin_and_applies_to_target() {
        let a = product(40); // 40 after a sale of 30
        let b = product(15);
        let original = draft(a.id, TransactionKind::Sale, 30).into_record(TransactionId::new());

        let plan =
            plan_update(&original, &a, &b, draft(b.id, TransactionKind::Sale, 10)).unwrap();

        assert_eq!(plan.writes.len(), 2);
        assert_eq!(plan.write_for(a.id).unwrap().new_stock, 70);
        assert_eq!(plan.write_for(b.id).unwrap().new_stock, 5);
    }

    #[test]
    fn cross_product_update_aborts_whole_plan_on_insufficient_target_stock() {
        let a = product(40);
        let b = product(15);
        let original = draft(a.id, TransactionKind::Sale, 30).into_record(TransactionId::new());

        // Target baseline is B's own stock (15), not A's reversed 70.
        let err = plan_update(&original, &a, &b, draft(b.id, TransactionKind::Sale, 16))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 15,
                requested: 16
            }
        );
    }

    #[test]
    fn update_changing_kind_reverses_then_applies() {
        // Purchase of 20 at stock 70; editing it into a sale of 20 lands at 30.
        let p = product(70);
        let original =
            draft(p.id, TransactionKind::Purchase, 20).into_record(TransactionId::new());
        let plan =
            plan_update(&original, &p, &p, draft(p.id, TransactionKind::Sale, 20)).unwrap();
        assert_eq!(plan.write_for(p.id).unwrap().new_stock, 30);
    }

    #[test]
    fn delete_sale_restores_stock() {
        let p = product(20);
        let t = draft(p.id, TransactionKind::Sale, 30).into_record(TransactionId::new());
        let plan = plan_delete(&t, &p).unwrap();
        assert_eq!(plan.write_for(p.id).unwrap().new_stock, 50);
        assert_eq!(plan.action, RowAction::Delete(t.id));
    }

    #[test]
    fn delete_purchase_removes_its_stock() {
        let p = product(20);
        let t = draft(p.id, TransactionKind::Purchase, 20).into_record(TransactionId::new());
        let plan = plan_delete(&t, &p).unwrap();
        assert_eq!(plan.write_for(p.id).unwrap().new_stock, 0);
    }

    #[test]
    fn delete_purchase_rejected_when_stock_already_consumed() {
        let p = product(5);
        let t = draft(p.id, TransactionKind::Purchase, 20).into_record(TransactionId::new());
        let err = plan_delete(&t, &p).unwrap_err();
        assert_eq!(
            err,
            DomainError::NegativeStock {
                stock: 5,
                quantity: 20
            }
        );
    }

    /// Walks the documented lifecycle: 50 → +20 purchase → 70 → -30 sale → 40
    /// → edit the sale to 50 → 20 → delete the purchase → 0.
    #[test]
    fn full_lifecycle_scenario() {
        let mut p = product(50);

        let purchase_id = TransactionId::new();
        let plan = plan_create(purchase_id, &p, draft(p.id, TransactionKind::Purchase, 20)).unwrap();
        p.stock_quantity = plan.write_for(p.id).unwrap().new_stock;
        assert_eq!(p.stock_quantity, 70);
        let purchase = match plan.action {
            RowAction::Insert(t) => t,
            _ => unreachable!(),
        };

        let sale_id = TransactionId::new();
        let plan = plan_create(sale_id, &p, draft(p.id, TransactionKind::Sale, 30)).unwrap();
        p.stock_quantity = plan.write_for(p.id).unwrap().new_stock;
        assert_eq!(p.stock_quantity, 40);
        let sale = match plan.action {
            RowAction::Insert(t) => t,
            _ => unreachable!(),
        };

        // Edit the sale up to 50: baseline after reversal is 70, so it fits.
        let plan = plan_update(&sale, &p, &p, draft(p.id, TransactionKind::Sale, 50)).unwrap();
        p.stock_quantity = plan.write_for(p.id).unwrap().new_stock;
        assert_eq!(p.stock_quantity, 20);

        // Deleting the purchase of 20 drains stock to exactly zero.
        let plan = plan_delete(&purchase, &p).unwrap();
        p.stock_quantity = plan.write_for(p.id).unwrap().new_stock;
        assert_eq!(p.stock_quantity, 0);
    }

    // ---- replay invariant ----

    #[derive(Debug, Clone)]
    enum Op {
        Create { product: usize, kind: TransactionKind, quantity: i64 },
        Delete { nth: usize },
        Edit { nth: usize, product: usize, kind: TransactionKind, quantity: i64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let kind = prop_oneof![Just(TransactionKind::Purchase), Just(TransactionKind::Sale)];
        prop_oneof![
            (0usize..3, kind.clone(), 1i64..60).prop_map(|(product, kind, quantity)| Op::Create {
                product,
                kind,
                quantity
            }),
            (0usize..16).prop_map(|nth| Op::Delete { nth }),
            (0usize..16, 0usize..3, kind, 1i64..60).prop_map(
                |(nth, product, kind, quantity)| Op::Edit {
                    nth,
                    product,
                    kind,
                    quantity
                }
            ),
        ]
    }

    fn apply_plan(
        stocks: &mut HashMap<ProductId, i64>,
        ledger: &mut Vec<StockTransaction>,
        plan: ReconcilePlan,
    ) {
        for w in &plan.writes {
            stocks.insert(w.product_id, w.new_stock);
        }
        match plan.action {
            RowAction::Insert(t) => ledger.push(t),
            RowAction::Update(t) => {
                let slot = ledger.iter_mut().find(|x| x.id == t.id).unwrap();
                *slot = t;
            }
            RowAction::Delete(id) => ledger.retain(|t| t.id != id),
        }
    }

    fn loaded(p: &Product, stocks: &HashMap<ProductId, i64>) -> Product {
        let mut p = p.clone();
        p.stock_quantity = stocks[&p.id];
        p
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of committed operations, each product's
        /// stock equals its initial stock plus purchases minus sales of the
        /// transactions currently attached to it. Rejected operations change
        /// nothing.
        #[test]
        fn replay_invariant_holds(
            initial in prop::collection::vec(0i64..100, 3),
            ops in prop::collection::vec(op_strategy(), 1..40)
        ) {
            let products: Vec<Product> = initial.iter().map(|s| product(*s)).collect();
            let mut stocks: HashMap<ProductId, i64> =
                products.iter().map(|p| (p.id, p.stock_quantity)).collect();
            let mut ledger: Vec<StockTransaction> = Vec::new();

            for op in ops {
                let result = match op {
                    Op::Create { product: pi, kind, quantity } => {
                        let p = loaded(&products[pi], &stocks);
                        plan_create(TransactionId::new(), &p, draft(p.id, kind, quantity))
                    }
                    Op::Delete { nth } => {
                        if ledger.is_empty() { continue; }
                        let t = ledger[nth % ledger.len()].clone();
                        let p = products.iter().find(|p| p.id == t.product_id).unwrap();
                        plan_delete(&t, &loaded(p, &stocks))
                    }
                    Op::Edit { nth, product: pi, kind, quantity } => {
                        if ledger.is_empty() { continue; }
                        let t = ledger[nth % ledger.len()].clone();
                        let original = products.iter().find(|p| p.id == t.product_id).unwrap();
                        let target = &products[pi];
                        plan_update(
                            &t,
                            &loaded(original, &stocks),
                            &loaded(target, &stocks),
                            draft(target.id, kind, quantity),
                        )
                    }
                };

                let before = stocks.clone();
                match result {
                    Ok(plan) => apply_plan(&mut stocks, &mut ledger, plan),
                    // Rejected operations must leave state byte-for-byte unchanged.
                    Err(_) => prop_assert_eq!(&before, &stocks),
                }
            }

            for (p, initial_stock) in products.iter().zip(initial.iter()) {
                let net: i64 = ledger
                    .iter()
                    .filter(|t| t.product_id == p.id)
                    .map(|t| match t.kind {
                        TransactionKind::Purchase => t.quantity,
                        TransactionKind::Sale => -t.quantity,
                    })
                    .sum();
                prop_assert_eq!(stocks[&p.id], initial_stock + net);
            }
        }
    }
}
