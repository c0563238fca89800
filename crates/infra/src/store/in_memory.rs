use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};

use stockforge_core::{ProductId, SupplierId, TransactionId};
use stockforge_inventory::{
    NewProduct, Product, ReconcilePlan, RowAction, StockTransaction, Supplier, TransactionKind,
};

use super::r#trait::{
    DashboardSummary, InventoryReport, InventoryStore, MonthlyAmount, MonthlyUnits,
    MovementTotals, ProductView, StoreError, SupplierView, TopProduct, TransactionView,
    LOW_STOCK_THRESHOLD,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    suppliers: HashMap<SupplierId, Supplier>,
    transactions: HashMap<TransactionId, StockTransaction>,
}

/// In-memory inventory store.
///
/// Intended for tests/dev. A single write lock per operation gives the same
/// all-or-nothing behavior as the SQL transaction in the Postgres store.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    inner: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Keep the six most recent months, ascending.
fn last_six<V>(by_month: BTreeMap<String, V>) -> Vec<(String, V)> {
    let skip = by_month.len().saturating_sub(6);
    by_month.into_iter().skip(skip).collect()
}

impl State {
    fn product_view(&self, product: &Product) -> ProductView {
        let supplier_name = product
            .supplier_id
            .and_then(|id| self.suppliers.get(&id))
            .map(|s| s.name.clone());
        ProductView {
            product: product.clone(),
            supplier_name,
        }
    }

    fn low_stock(&self) -> Vec<ProductView> {
        let mut low: Vec<ProductView> = self
            .products
            .values()
            .filter(|p| p.stock_quantity < LOW_STOCK_THRESHOLD)
            .map(|p| self.product_view(p))
            .collect();
        low.sort_by_key(|v| v.product.stock_quantity);
        low
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::conflict(format!(
                "product with sku '{}' already exists",
                product.sku
            )));
        }
        if let Some(supplier_id) = product.supplier_id {
            if !state.suppliers.contains_key(&supplier_id) {
                return Err(StoreError::conflict("supplier does not exist"));
            }
        }
        state.products.insert(product.id, product);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<ProductView>, StoreError> {
        let state = self.read()?;
        let mut views: Vec<ProductView> = state
            .products
            .values()
            .map(|p| state.product_view(p))
            .collect();
        views.sort_by(|a, b| a.product.name.cmp(&b.product.name));
        Ok(views)
    }

    async fn update_product(&self, id: ProductId, fields: NewProduct) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state
            .products
            .values()
            .any(|p| p.id != id && p.sku == fields.sku)
        {
            return Err(StoreError::conflict(format!(
                "product with sku '{}' already exists",
                fields.sku
            )));
        }
        if let Some(supplier_id) = fields.supplier_id {
            if !state.suppliers.contains_key(&supplier_id) {
                return Err(StoreError::conflict("supplier does not exist"));
            }
        }
        let product = state.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        product.name = fields.name;
        product.sku = fields.sku;
        product.stock_quantity = fields.stock_quantity;
        product.unit_price = fields.unit_price;
        product.supplier_id = fields.supplier_id;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.transactions.values().any(|t| t.product_id == id) {
            return Err(StoreError::conflict(
                "product has associated transactions",
            ));
        }
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.suppliers.values().any(|s| s.name == supplier.name) {
            return Err(StoreError::conflict(format!(
                "supplier with name '{}' already exists",
                supplier.name
            )));
        }
        state.suppliers.insert(supplier.id, supplier);
        Ok(())
    }

    async fn list_suppliers(&self) -> Result<Vec<SupplierView>, StoreError> {
        let state = self.read()?;
        let mut views: Vec<SupplierView> = state
            .suppliers
            .values()
            .map(|s| SupplierView {
                supplier: s.clone(),
                product_count: state
                    .products
                    .values()
                    .filter(|p| p.supplier_id == Some(s.id))
                    .count() as i64,
            })
            .collect();
        views.sort_by(|a, b| a.supplier.name.cmp(&b.supplier.name));
        Ok(views)
    }

    async fn delete_supplier(&self, id: SupplierId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.products.values().any(|p| p.supplier_id == Some(id)) {
            return Err(StoreError::conflict("products are associated with this supplier"));
        }
        state
            .suppliers
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<StockTransaction>, StoreError> {
        Ok(self.read()?.transactions.get(&id).cloned())
    }

    async fn list_transactions(&self) -> Result<Vec<TransactionView>, StoreError> {
        let state = self.read()?;
        let mut views: Vec<TransactionView> = state
            .transactions
            .values()
            .filter_map(|t| {
                state.products.get(&t.product_id).map(|p| TransactionView {
                    transaction: t.clone(),
                    product_name: p.name.clone(),
                    product_sku: p.sku.clone(),
                })
            })
            .collect();
        // Newest first; UUIDv7 ids break same-day ties in creation order.
        views.sort_by(|a, b| {
            b.transaction
                .date
                .cmp(&a.transaction.date)
                .then_with(|| b.transaction.id.as_uuid().cmp(a.transaction.id.as_uuid()))
        });
        Ok(views)
    }

    async fn apply(&self, plan: ReconcilePlan) -> Result<(), StoreError> {
        let mut state = self.write()?;

        // Validate everything before mutating anything; the single lock scope
        // then commits the whole plan at once.
        for write in &plan.writes {
            if !state.products.contains_key(&write.product_id) {
                return Err(StoreError::NotFound);
            }
        }
        match &plan.action {
            RowAction::Insert(t) => {
                if state.transactions.contains_key(&t.id) {
                    return Err(StoreError::conflict("transaction id already exists"));
                }
                if !state.products.contains_key(&t.product_id) {
                    return Err(StoreError::NotFound);
                }
            }
            RowAction::Update(t) => {
                if !state.transactions.contains_key(&t.id) {
                    return Err(StoreError::NotFound);
                }
                if !state.products.contains_key(&t.product_id) {
                    return Err(StoreError::NotFound);
                }
            }
            RowAction::Delete(id) => {
                if !state.transactions.contains_key(id) {
                    return Err(StoreError::NotFound);
                }
            }
        }

        let now = Utc::now();
        for write in &plan.writes {
            let product = state
                .products
                .get_mut(&write.product_id)
                .expect("validated above");
            product.stock_quantity = write.new_stock;
            product.updated_at = now;
        }
        match plan.action {
            RowAction::Insert(t) | RowAction::Update(t) => {
                state.transactions.insert(t.id, t);
            }
            RowAction::Delete(id) => {
                state.transactions.remove(&id);
            }
        }
        Ok(())
    }

    async fn dashboard_summary(&self) -> Result<DashboardSummary, StoreError> {
        let state = self.read()?;
        let total_stock_value = round2(
            state
                .products
                .values()
                .map(|p| p.stock_quantity as f64 * p.unit_price)
                .sum(),
        );
        let low_stock_products = state.low_stock();
        Ok(DashboardSummary {
            total_products: state.products.len() as i64,
            total_stock_value,
            low_stock_count: low_stock_products.len() as i64,
            low_stock_products,
            total_transactions: state.transactions.len() as i64,
        })
    }

    async fn inventory_report(&self) -> Result<InventoryReport, StoreError> {
        let state = self.read()?;

        let mut units_by_month: BTreeMap<String, i64> = BTreeMap::new();
        let mut value_by_month: BTreeMap<String, f64> = BTreeMap::new();
        let mut profit_by_month: BTreeMap<String, f64> = BTreeMap::new();
        let mut sold_by_product: HashMap<ProductId, i64> = HashMap::new();
        let mut purchase_count = 0i64;
        let mut sale_count = 0i64;

        for t in state.transactions.values() {
            let month = month_key(t.date);
            let amount = t.quantity as f64 * t.unit_price;
            match t.kind {
                TransactionKind::Sale => {
                    sale_count += 1;
                    *units_by_month.entry(month.clone()).or_default() += t.quantity;
                    *value_by_month.entry(month.clone()).or_default() += amount;
                    *profit_by_month.entry(month).or_default() += amount;
                    *sold_by_product.entry(t.product_id).or_default() += t.quantity;
                }
                TransactionKind::Purchase => {
                    purchase_count += 1;
                    *profit_by_month.entry(month).or_default() -= amount;
                }
            }
        }

        let mut top_products: Vec<TopProduct> = sold_by_product
            .into_iter()
            .filter_map(|(id, units_sold)| {
                state.products.get(&id).map(|p| TopProduct {
                    name: p.name.clone(),
                    units_sold,
                })
            })
            .collect();
        top_products.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then_with(|| a.name.cmp(&b.name)));
        top_products.truncate(5);

        let total_stock_value = round2(
            state
                .products
                .values()
                .map(|p| p.stock_quantity as f64 * p.unit_price)
                .sum(),
        );
        let low_stock_products = state.low_stock();

        Ok(InventoryReport {
            total_stock_value,
            low_stock_count: low_stock_products.len() as i64,
            low_stock_products,
            supplier_count: state.suppliers.len() as i64,
            monthly_units_sold: last_six(units_by_month)
                .into_iter()
                .map(|(month, units)| MonthlyUnits { month, units })
                .collect(),
            monthly_sales_value: last_six(value_by_month)
                .into_iter()
                .map(|(month, amount)| MonthlyAmount {
                    month,
                    amount: round2(amount),
                })
                .collect(),
            monthly_net_profit: last_six(profit_by_month)
                .into_iter()
                .map(|(month, amount)| MonthlyAmount {
                    month,
                    amount: round2(amount),
                })
                .collect(),
            top_products,
            purchase_count,
            sale_count,
        })
    }

    async fn movement_totals(
        &self,
        product_id: ProductId,
        since: NaiveDate,
    ) -> Result<MovementTotals, StoreError> {
        let state = self.read()?;
        let mut totals = MovementTotals {
            sold: 0,
            purchased: 0,
        };
        for t in state
            .transactions
            .values()
            .filter(|t| t.product_id == product_id && t.date >= since)
        {
            match t.kind {
                TransactionKind::Sale => totals.sold += t.quantity,
                TransactionKind::Purchase => totals.purchased += t.quantity,
            }
        }
        Ok(totals)
    }
}
