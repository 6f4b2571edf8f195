use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    BuyerId, Money, NewOrder, NewProduct, Order, OrderId, OrderStatus, Product, ProductId, Result,
    StoreError, seed,
};

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns every product, ordered by id ascending.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Looks up a single product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Returns the number of products in the catalog.
    async fn product_count(&self) -> Result<u64>;
}

/// Read access to the order ledger.
///
/// Listings are newest first; orders created in the same instant are ordered
/// by id descending.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Looks up a single order.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns the orders of one buyer, newest first.
    async fn list_orders_by_buyer(&self, buyer: BuyerId) -> Result<Vec<Order>>;

    /// Returns every order, newest first.
    async fn list_all_orders(&self) -> Result<Vec<Order>>;

    /// Returns the number of orders referencing a product.
    async fn count_orders_for_product(&self, product_id: ProductId) -> Result<u64>;
}

/// A backend serving both the catalog and the ledger.
///
/// All writes go through a [`StoreTransaction`] so that stock and order
/// changes made for one logical action become visible together or not at all.
#[async_trait]
pub trait Store: CatalogStore + LedgerStore {
    type Transaction: StoreTransaction;

    /// Starts a transaction.
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// A unit of work over the catalog and the ledger.
///
/// Dropping a transaction without calling [`StoreTransaction::commit`]
/// discards every change made through it.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a product and holds it against concurrent writers until the
    /// transaction ends.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Reads an order and holds it against concurrent writers until the
    /// transaction ends.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    async fn count_products(&mut self) -> Result<u64>;

    async fn count_orders_for_product(&mut self, product_id: ProductId) -> Result<u64>;

    async fn insert_product(&mut self, product: NewProduct) -> Result<Product>;

    /// Removes a product row. Does not check for referencing orders.
    async fn remove_product(&mut self, id: ProductId) -> Result<()>;

    /// Applies `stock += delta`, failing with `InsufficientStock` if the
    /// result would be negative.
    async fn adjust_stock(&mut self, id: ProductId, delta: i64) -> Result<Product>;

    /// Changes the catalog price. Existing orders keep their own unit price.
    async fn set_price(&mut self, id: ProductId, unit_price: Money) -> Result<Product>;

    /// Inserts an order with status `Pending` and `total = quantity * unit_price`.
    ///
    /// Fails with `ProductNotFound` if the product does not exist.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    /// Overwrites the status of an order.
    async fn set_status(&mut self, id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Removes the orders of `buyer` for `product` created on `date` (UTC),
    /// returning the removed records.
    async fn delete_orders(
        &mut self,
        buyer: BuyerId,
        product: ProductId,
        date: NaiveDate,
    ) -> Result<Vec<Order>>;

    /// Makes every change of this transaction visible.
    async fn commit(self) -> Result<()>;
}

/// Single-step catalog writes, each run in its own transaction.
#[async_trait]
pub trait CatalogStoreExt: Store {
    /// Inserts a product and returns it with its assigned id.
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut tx = self.begin().await?;
        let created = tx.insert_product(product).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Deletes a product that no order references.
    ///
    /// The reference count is taken while the product is locked, so an order
    /// cannot be inserted for it between the check and the delete.
    async fn delete_product(&self, id: ProductId) -> Result<Product> {
        let mut tx = self.begin().await?;
        let product = tx
            .lock_product(id)
            .await?
            .ok_or(StoreError::ProductNotFound(id))?;

        let order_count = tx.count_orders_for_product(id).await?;
        if order_count > 0 {
            return Err(StoreError::ReferencedByOrders {
                product_id: id,
                order_count,
            });
        }

        tx.remove_product(id).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Applies `stock += delta` to one product.
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product> {
        let mut tx = self.begin().await?;
        let product = tx.adjust_stock(id, delta).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn set_price(&self, id: ProductId, unit_price: Money) -> Result<Product> {
        let mut tx = self.begin().await?;
        let product = tx.set_price(id, unit_price).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Inserts the starter catalog if no product exists yet.
    ///
    /// Returns the inserted products; empty when the catalog was already
    /// populated.
    async fn seed_if_empty(&self) -> Result<Vec<Product>> {
        let mut tx = self.begin().await?;
        if tx.count_products().await? > 0 {
            return Ok(Vec::new());
        }

        let mut inserted = Vec::new();
        for product in seed::starter_products() {
            inserted.push(tx.insert_product(product).await?);
        }
        tx.commit().await?;

        tracing::info!(count = inserted.len(), "seeded starter catalog");
        Ok(inserted)
    }
}

impl<T: Store> CatalogStoreExt for T {}

/// Single-step ledger writes, each run in its own transaction.
///
/// These do not touch stock; use them for fixtures and maintenance. Purchases
/// and cancellations go through the order coordinator.
#[async_trait]
pub trait LedgerStoreExt: Store {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.begin().await?;
        let created = tx.insert_order(order).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut tx = self.begin().await?;
        let updated = tx.set_status(id, status).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_orders(
        &self,
        buyer: BuyerId,
        product: ProductId,
        date: NaiveDate,
    ) -> Result<Vec<Order>> {
        let mut tx = self.begin().await?;
        let removed = tx.delete_orders(buyer, product, date).await?;
        tx.commit().await?;
        Ok(removed)
    }
}

impl<T: Store> LedgerStoreExt for T {}
