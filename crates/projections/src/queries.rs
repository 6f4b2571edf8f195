//! Query façade over the catalog and the ledger.

use std::collections::HashMap;

use common::{BuyerId, ProductId};
use ledger_store::{CatalogStore, LedgerStore, Order, Product};

use crate::error::{QueryError, Result};
use crate::views::{OrderSummary, StockReport};

/// Read-only access to products and order histories.
///
/// Every call reads committed state only; an in-flight purchase is either
/// fully visible or not at all.
#[derive(Clone)]
pub struct ShopQueries<S> {
    store: S,
}

impl<S> ShopQueries<S>
where
    S: CatalogStore + LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the catalog ordered by id.
    #[tracing::instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or(QueryError::ProductNotFound(id))
    }

    /// Returns the product with its availability bucket.
    #[tracing::instrument(skip(self))]
    pub async fn stock(&self, id: ProductId) -> Result<StockReport> {
        self.product(id).await.map(StockReport::from)
    }

    /// Returns the buyer's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn buyer_orders(&self, buyer: BuyerId) -> Result<Vec<OrderSummary>> {
        let orders = self.store.list_orders_by_buyer(buyer).await?;
        self.summarise(orders).await
    }

    /// Returns every order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn all_orders(&self) -> Result<Vec<OrderSummary>> {
        let orders = self.store.list_all_orders().await?;
        self.summarise(orders).await
    }

    async fn summarise(&self, orders: Vec<Order>) -> Result<Vec<OrderSummary>> {
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut summaries = Vec::with_capacity(orders.len());

        for order in orders {
            if !products.contains_key(&order.product_id) {
                let product = self.product(order.product_id).await.inspect_err(|_| {
                    tracing::warn!(
                        order_id = %order.id,
                        product_id = %order.product_id,
                        "order references a missing product"
                    );
                })?;
                products.insert(order.product_id, product);
            }
            let product = &products[&order.product_id];
            summaries.push(OrderSummary::new(order, product));
        }

        tracing::debug!(count = summaries.len(), "orders summarised");
        Ok(summaries)
    }
}
