use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};

use crate::{
    BuyerId, Money, NewOrder, NewProduct, Order, OrderId, OrderStatus, Product, ProductId, Result,
    StoreError,
    store::{CatalogStore, LedgerStore, Store, StoreTransaction},
};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, created_at";
const ORDER_COLUMNS: &str =
    "id, buyer_id, product_id, quantity, unit_price, total, status, created_at";

/// PostgreSQL-backed store.
///
/// Transactions lock the product row (`SELECT ... FOR UPDATE`) before reading
/// stock, so writers touching the same product are serialised while writers on
/// different products run in parallel.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn to_u32(value: i64, column: &str, id: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::CorruptRow(format!("{column} = {value} out of range in row {id}")))
}

fn row_to_product(row: PgRow) -> Result<Product> {
    let id: i64 = row.try_get("id")?;
    Ok(Product {
        id: ProductId::new(id),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        unit_price: Money::from_cents(row.try_get("price")?),
        stock: to_u32(row.try_get("stock")?, "stock", id)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let id: i64 = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::new(id),
        buyer_id: BuyerId::new(row.try_get("buyer_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity", id)?,
        unit_price: Money::from_cents(row.try_get("unit_price")?),
        total: Money::from_cents(row.try_get("total")?),
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::CorruptRow(format!("{e} in order {id}")))?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_product).transpose()
    }

    async fn product_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(to_count(count))
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_order).transpose()
    }

    async fn list_orders_by_buyer(&self, buyer: BuyerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(buyer.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn count_orders_for_product(&self, product_id: ProductId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE product_id = $1")
            .bind(product_id.as_i64())
            .fetch_one(&self.pool)
            .await?;
        Ok(to_count(count))
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        Ok(PostgresTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

/// Transaction over a [`PostgresStore`]; rolled back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_product).transpose()
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn count_products(&mut self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(to_count(count))
    }

    async fn count_orders_for_product(&mut self, product_id: ProductId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE product_id = $1")
            .bind(product_id.as_i64())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(to_count(count))
    }

    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, description, price, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price.cents())
        .bind(i64::from(product.stock))
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_product(row)
    }

    async fn remove_product(&mut self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: i64) -> Result<Product> {
        let product = self
            .lock_product(id)
            .await?
            .ok_or(StoreError::ProductNotFound(id))?;
        let stock = product.stock_after(delta)?;

        let row = sqlx::query(&format!(
            "UPDATE products SET stock = $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(i64::from(stock))
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_product(row)
    }

    async fn set_price(&mut self, id: ProductId, unit_price: Money) -> Result<Product> {
        let row = sqlx::query(&format!(
            "UPDATE products SET price = $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(unit_price.cents())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::ProductNotFound(id))?;

        row_to_product(row)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let total = order.total()?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (buyer_id, product_id, quantity, unit_price, total, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.buyer_id.as_i64())
        .bind(order.product_id.as_i64())
        .bind(i64::from(order.quantity))
        .bind(order.unit_price.cents())
        .bind(total.cents())
        .bind(OrderStatus::Pending.as_str())
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::ProductNotFound(order.product_id);
            }
            StoreError::Database(e)
        })?;

        row_to_order(row)
    }

    async fn set_status(&mut self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(status.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order)
            .transpose()?
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn delete_orders(
        &mut self,
        buyer: BuyerId,
        product: ProductId,
        date: NaiveDate,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            DELETE FROM orders
            WHERE buyer_id = $1
              AND product_id = $2
              AND (created_at AT TIME ZONE 'UTC')::date = $3
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(buyer.as_i64())
        .bind(product.as_i64())
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
