//! Postgres-backed inventory store.
//!
//! ## Error mapping
//!
//! SQLx errors are mapped to [`StoreError`] as follows: unique violations
//! (`23505`) and foreign-key violations (`23503`) become `Conflict`;
//! `RowNotFound` becomes `NotFound`; everything else (connection failures,
//! decode errors, closed pool) becomes `Backend`.
//!
//! ## Atomicity
//!
//! [`InventoryStore::apply`] runs inside a single SQL transaction: every stock
//! write plus the transaction-row action commit together. Any failure drops
//! the transaction, which rolls everything back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;

use stockforge_core::{ProductId, SupplierId, TransactionId};
use stockforge_inventory::{
    NewProduct, Product, ReconcilePlan, RowAction, StockTransaction, Supplier, TransactionKind,
};

use super::r#trait::{
    DashboardSummary, InventoryReport, InventoryStore, MonthlyAmount, MonthlyUnits,
    MovementTotals, ProductView, StoreError, SupplierView, TopProduct, TransactionView,
    LOW_STOCK_THRESHOLD,
};

/// Embedded schema migrations (`migrations/` in this crate).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `url` and run pending migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::backend(format!("migrate: {e}")))?;
        Ok(Self::new(pool))
    }
}

fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") | Some("23503") => StoreError::conflict(db.message().to_string()),
            _ => StoreError::backend(format!("{op}: {e}")),
        },
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::backend(format!("{op}: {e}")),
    }
}

fn decode_err(e: impl core::fmt::Display) -> StoreError {
    StoreError::backend(format!("row decode: {e}"))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        sku: row.try_get("sku").map_err(decode_err)?,
        stock_quantity: row.try_get("stock_quantity").map_err(decode_err)?,
        unit_price: row.try_get("unit_price").map_err(decode_err)?,
        supplier_id: row
            .try_get::<Option<uuid::Uuid>, _>("supplier_id")
            .map_err(decode_err)?
            .map(SupplierId::from_uuid),
        created_at: row.try_get("created_at").map_err(decode_err)?,
        updated_at: row.try_get("updated_at").map_err(decode_err)?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<StockTransaction, StoreError> {
    let kind: String = row.try_get("kind").map_err(decode_err)?;
    Ok(StockTransaction {
        id: TransactionId::from_uuid(row.try_get("id").map_err(decode_err)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode_err)?),
        quantity: row.try_get("quantity").map_err(decode_err)?,
        kind: kind
            .parse::<TransactionKind>()
            .map_err(|e| StoreError::backend(format!("row decode: {e}")))?,
        date: row.try_get("date").map_err(decode_err)?,
        unit_price: row.try_get("unit_price").map_err(decode_err)?,
    })
}

fn supplier_from_row(row: &PgRow) -> Result<Supplier, StoreError> {
    Ok(Supplier {
        id: SupplierId::from_uuid(row.try_get("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        contact_email: row.try_get("contact_email").map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
        updated_at: row.try_get("updated_at").map_err(decode_err)?,
    })
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, sku, stock_quantity, unit_price, supplier_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.stock_quantity)
        .bind(product.unit_price)
        .bind(product.supplier_id.map(|s| *s.as_uuid()))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<ProductView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.*, s.name AS supplier_name
            FROM products p
            LEFT JOIN suppliers s ON p.supplier_id = s.id
            ORDER BY p.name
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(|row| {
                Ok(ProductView {
                    product: product_from_row(row)?,
                    supplier_name: row.try_get("supplier_name").map_err(decode_err)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, fields), fields(product_id = %id))]
    async fn update_product(&self, id: ProductId, fields: NewProduct) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, sku = $3, stock_quantity = $4, unit_price = $5, supplier_id = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&fields.name)
        .bind(&fields.sku)
        .bind(fields.stock_quantity)
        .bind(fields.unit_price)
        .bind(fields.supplier_id.map(|s| *s.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE product_id = $1")
                .bind(id.as_uuid())
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete_product", e))?;
        if count > 0 {
            return Err(StoreError::conflict("product has associated transactions"));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, supplier), fields(supplier_id = %supplier.id))]
    async fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact_email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(supplier.id.as_uuid())
        .bind(&supplier.name)
        .bind(&supplier.contact_email)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_supplier", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_suppliers(&self) -> Result<Vec<SupplierView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT s.*, COUNT(p.id) AS product_count
            FROM suppliers s
            LEFT JOIN products p ON s.id = p.supplier_id
            GROUP BY s.id
            ORDER BY s.name
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_suppliers", e))?;

        rows.iter()
            .map(|row| {
                Ok(SupplierView {
                    supplier: supplier_from_row(row)?,
                    product_count: row.try_get("product_count").map_err(decode_err)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(supplier_id = %id))]
    async fn delete_supplier(&self, id: SupplierId) -> Result<(), StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE supplier_id = $1")
                .bind(id.as_uuid())
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete_supplier", e))?;
        if count > 0 {
            return Err(StoreError::conflict(
                "products are associated with this supplier",
            ));
        }

        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_supplier", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(transaction_id = %id))]
    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<StockTransaction>, StoreError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_transaction", e))?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_transactions(&self) -> Result<Vec<TransactionView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.*, p.name AS product_name, p.sku AS product_sku
            FROM transactions t
            JOIN products p ON t.product_id = p.id
            ORDER BY t.date DESC, t.id DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;

        rows.iter()
            .map(|row| {
                Ok(TransactionView {
                    transaction: transaction_from_row(row)?,
                    product_name: row.try_get("product_name").map_err(decode_err)?,
                    product_sku: row.try_get("product_sku").map_err(decode_err)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, plan))]
    async fn apply(&self, plan: ReconcilePlan) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("apply.begin", e))?;

        for write in &plan.writes {
            let result = sqlx::query(
                "UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(write.product_id.as_uuid())
            .bind(write.new_stock)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply.stock_write", e))?;
            // Dropping `tx` on the error path rolls back everything so far.
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
        }

        match &plan.action {
            RowAction::Insert(t) => {
                sqlx::query(
                    r#"
                    INSERT INTO transactions (id, product_id, quantity, kind, date, unit_price)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(t.id.as_uuid())
                .bind(t.product_id.as_uuid())
                .bind(t.quantity)
                .bind(t.kind.as_str())
                .bind(t.date)
                .bind(t.unit_price)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("apply.insert", e))?;
            }
            RowAction::Update(t) => {
                let result = sqlx::query(
                    r#"
                    UPDATE transactions
                    SET product_id = $2, quantity = $3, kind = $4, date = $5, unit_price = $6
                    WHERE id = $1
                    "#,
                )
                .bind(t.id.as_uuid())
                .bind(t.product_id.as_uuid())
                .bind(t.quantity)
                .bind(t.kind.as_str())
                .bind(t.date)
                .bind(t.unit_price)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("apply.update", e))?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound);
                }
            }
            RowAction::Delete(id) => {
                let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("apply.delete", e))?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound);
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("apply.commit", e))
    }

    #[instrument(skip(self))]
    async fn dashboard_summary(&self) -> Result<DashboardSummary, StoreError> {
        let total_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("dashboard_summary", e))?;

        let total_stock_value: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(stock_quantity * unit_price) FROM products",
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_summary", e))?;

        let low_stock_products = self.low_stock_products().await?;

        let total_transactions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("dashboard_summary", e))?;

        Ok(DashboardSummary {
            total_products,
            total_stock_value: round2(total_stock_value.unwrap_or(0.0)),
            low_stock_count: low_stock_products.len() as i64,
            low_stock_products,
            total_transactions,
        })
    }

    #[instrument(skip(self))]
    async fn inventory_report(&self) -> Result<InventoryReport, StoreError> {
        let total_stock_value: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(stock_quantity * unit_price) FROM products",
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inventory_report", e))?;

        let low_stock_products = self.low_stock_products().await?;

        let supplier_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("inventory_report", e))?;

        let units_rows = sqlx::query(
            r#"
            SELECT to_char(date, 'YYYY-MM') AS month, SUM(quantity)::BIGINT AS units
            FROM transactions
            WHERE kind = 'sale'
            GROUP BY month
            ORDER BY month DESC
            LIMIT 6
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inventory_report", e))?;
        let monthly_units_sold = units_rows
            .iter()
            .rev()
            .map(|row| {
                Ok(MonthlyUnits {
                    month: row.try_get("month").map_err(decode_err)?,
                    units: row.try_get("units").map_err(decode_err)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let value_rows = sqlx::query(
            r#"
            SELECT to_char(date, 'YYYY-MM') AS month, SUM(quantity * unit_price) AS amount
            FROM transactions
            WHERE kind = 'sale'
            GROUP BY month
            ORDER BY month DESC
            LIMIT 6
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inventory_report", e))?;
        let monthly_sales_value = value_rows
            .iter()
            .rev()
            .map(|row| {
                Ok(MonthlyAmount {
                    month: row.try_get("month").map_err(decode_err)?,
                    amount: round2(row.try_get("amount").map_err(decode_err)?),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let profit_rows = sqlx::query(
            r#"
            SELECT
                to_char(date, 'YYYY-MM') AS month,
                SUM(CASE WHEN kind = 'sale' THEN quantity * unit_price ELSE 0 END) -
                SUM(CASE WHEN kind = 'purchase' THEN quantity * unit_price ELSE 0 END) AS amount
            FROM transactions
            GROUP BY month
            ORDER BY month DESC
            LIMIT 6
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inventory_report", e))?;
        let monthly_net_profit = profit_rows
            .iter()
            .rev()
            .map(|row| {
                Ok(MonthlyAmount {
                    month: row.try_get("month").map_err(decode_err)?,
                    amount: round2(row.try_get("amount").map_err(decode_err)?),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let top_rows = sqlx::query(
            r#"
            SELECT p.name, SUM(t.quantity)::BIGINT AS units_sold
            FROM transactions t
            JOIN products p ON t.product_id = p.id
            WHERE t.kind = 'sale'
            GROUP BY p.name
            ORDER BY units_sold DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inventory_report", e))?;
        let top_products = top_rows
            .iter()
            .map(|row| {
                Ok(TopProduct {
                    name: row.try_get("name").map_err(decode_err)?,
                    units_sold: row.try_get("units_sold").map_err(decode_err)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let purchase_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE kind = 'purchase'")
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("inventory_report", e))?;
        let sale_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE kind = 'sale'")
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("inventory_report", e))?;

        Ok(InventoryReport {
            total_stock_value: round2(total_stock_value.unwrap_or(0.0)),
            low_stock_count: low_stock_products.len() as i64,
            low_stock_products,
            supplier_count,
            monthly_units_sold,
            monthly_sales_value,
            monthly_net_profit,
            top_products,
            purchase_count,
            sale_count,
        })
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn movement_totals(
        &self,
        product_id: ProductId,
        since: NaiveDate,
    ) -> Result<MovementTotals, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT kind, SUM(quantity)::BIGINT AS total
            FROM transactions
            WHERE product_id = $1 AND date >= $2
            GROUP BY kind
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(since)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_totals", e))?;

        let mut totals = MovementTotals {
            sold: 0,
            purchased: 0,
        };
        for row in rows {
            let kind: String = row.try_get("kind").map_err(decode_err)?;
            let total: i64 = row.try_get("total").map_err(decode_err)?;
            match kind.parse::<TransactionKind>() {
                Ok(TransactionKind::Sale) => totals.sold = total,
                Ok(TransactionKind::Purchase) => totals.purchased = total,
                Err(e) => return Err(StoreError::backend(format!("row decode: {e}"))),
            }
        }
        Ok(totals)
    }
}

impl PostgresInventoryStore {
    async fn low_stock_products(&self) -> Result<Vec<ProductView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.*, s.name AS supplier_name
            FROM products p
            LEFT JOIN suppliers s ON p.supplier_id = s.id
            WHERE p.stock_quantity < $1
            ORDER BY p.stock_quantity ASC
            "#,
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock_products", e))?;

        rows.iter()
            .map(|row| {
                Ok(ProductView {
                    product: product_from_row(row)?,
                    supplier_name: row.try_get("supplier_name").map_err(decode_err)?,
                })
            })
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
