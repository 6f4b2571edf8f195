use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    BuyerId, Money, NewOrder, NewProduct, Order, OrderId, OrderStatus, Product, ProductId, Result,
    StoreError,
    store::{CatalogStore, LedgerStore, Store, StoreTransaction},
};

/// Committed state plus the indexes that keep lookups off full scans.
#[derive(Debug, Default)]
struct LedgerState {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    by_product: BTreeMap<ProductId, BTreeSet<OrderId>>,
    by_buyer_product: BTreeMap<(BuyerId, ProductId), BTreeSet<OrderId>>,
    last_product_id: i64,
    last_order_id: i64,
}

impl LedgerState {
    fn put_order(&mut self, order: Order) {
        self.by_product
            .entry(order.product_id)
            .or_default()
            .insert(order.id);
        self.by_buyer_product
            .entry((order.buyer_id, order.product_id))
            .or_default()
            .insert(order.id);
        self.orders.insert(order.id, order);
    }

    fn remove_order(&mut self, id: OrderId) {
        let Some(order) = self.orders.remove(&id) else {
            return;
        };
        if let Some(ids) = self.by_product.get_mut(&order.product_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_product.remove(&order.product_id);
            }
        }
        let key = (order.buyer_id, order.product_id);
        if let Some(ids) = self.by_buyer_product.get_mut(&key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_buyer_product.remove(&key);
            }
        }
    }

    fn order_ids_for_product(&self, product_id: ProductId) -> Vec<OrderId> {
        self.by_product
            .get(&product_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn order_ids_for(&self, buyer: BuyerId, product_id: ProductId) -> Vec<OrderId> {
        self.by_buyer_product
            .get(&(buyer, product_id))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn orders_of_buyer(&self, buyer: BuyerId) -> Vec<Order> {
        let from = (buyer, ProductId::new(i64::MIN));
        let to = (buyer, ProductId::new(i64::MAX));
        self.by_buyer_product
            .range(from..=to)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.orders.get(id).cloned())
            .collect()
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

/// In-memory store for tests and single-process deployments.
///
/// Writers are serialised: a transaction holds the writer lock from `begin`
/// until it is committed or dropped, and records only the products and
/// orders it touches. Commit applies those records to the shared state.
/// Readers only ever see committed state and never wait for an open
/// transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<LedgerState>>,
    writer: Arc<Mutex<()>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all products and orders. Ids keep increasing.
    pub async fn clear(&self) {
        let _writer = self.writer.lock().await;
        let mut state = self.state.write().await;
        *state = LedgerState {
            last_product_id: state.last_product_id,
            last_order_id: state.last_order_id,
            ..LedgerState::default()
        };
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn product_count(&self) -> Result<u64> {
        Ok(self.state.read().await.products.len() as u64)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn list_orders_by_buyer(&self, buyer: BuyerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(newest_first(state.orders_of_buyer(buyer)))
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(newest_first(state.orders.values().cloned().collect()))
    }

    async fn count_orders_for_product(&self, product_id: ProductId) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .by_product
            .get(&product_id)
            .map_or(0, |ids| ids.len() as u64))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let writer = self.writer.clone().lock_owned().await;
        let (last_product_id, last_order_id) = {
            let state = self.state.read().await;
            (state.last_product_id, state.last_order_id)
        };
        Ok(InMemoryTransaction {
            _writer: writer,
            published: self.state.clone(),
            products: BTreeMap::new(),
            orders: BTreeMap::new(),
            last_product_id,
            last_order_id,
        })
    }
}

/// Transaction over an [`InMemoryStore`].
///
/// `products` and `orders` hold the records written so far; `None` marks a
/// removal. Everything else is read through to the committed state, which
/// cannot change while the writer lock is held.
pub struct InMemoryTransaction {
    _writer: OwnedMutexGuard<()>,
    published: Arc<RwLock<LedgerState>>,
    products: BTreeMap<ProductId, Option<Product>>,
    orders: BTreeMap<OrderId, Option<Order>>,
    last_product_id: i64,
    last_order_id: i64,
}

impl InMemoryTransaction {
    async fn product(&self, id: ProductId) -> Option<Product> {
        match self.products.get(&id) {
            Some(staged) => staged.clone(),
            None => self.published.read().await.products.get(&id).cloned(),
        }
    }

    async fn order(&self, id: OrderId) -> Option<Order> {
        match self.orders.get(&id) {
            Some(staged) => staged.clone(),
            None => self.published.read().await.orders.get(&id).cloned(),
        }
    }

    async fn product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        if !self.products.contains_key(&id) {
            let current = self.published.read().await.products.get(&id).cloned();
            self.products.insert(id, current);
        }
        self.products
            .get_mut(&id)
            .and_then(Option::as_mut)
            .ok_or(StoreError::ProductNotFound(id))
    }

    async fn order_mut(&mut self, id: OrderId) -> Result<&mut Order> {
        if !self.orders.contains_key(&id) {
            let current = self.published.read().await.orders.get(&id).cloned();
            self.orders.insert(id, current);
        }
        self.orders
            .get_mut(&id)
            .and_then(Option::as_mut)
            .ok_or(StoreError::OrderNotFound(id))
    }

    /// Merges committed orders named by `committed_ids` with the staged
    /// ones, as this transaction sees them, and keeps those passing `keep`.
    fn visible_orders(
        &self,
        state: &LedgerState,
        committed_ids: Vec<OrderId>,
        keep: impl Fn(&Order) -> bool,
    ) -> Vec<Order> {
        let mut ids: BTreeSet<OrderId> = committed_ids.into_iter().collect();
        ids.extend(self.orders.keys().copied());
        ids.into_iter()
            .filter_map(|id| match self.orders.get(&id) {
                Some(staged) => staged.clone(),
                None => state.orders.get(&id).cloned(),
            })
            .filter(|o| keep(o))
            .collect()
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.product(id).await)
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.order(id).await)
    }

    async fn count_products(&mut self) -> Result<u64> {
        let state = self.published.read().await;
        let mut count = state.products.len() as u64;
        for (id, staged) in &self.products {
            match (state.products.contains_key(id), staged.is_some()) {
                (false, true) => count += 1,
                (true, false) => count -= 1,
                _ => {}
            }
        }
        Ok(count)
    }

    async fn count_orders_for_product(&mut self, product_id: ProductId) -> Result<u64> {
        let published = Arc::clone(&self.published);
        let state = published.read().await;
        let ids = state.order_ids_for_product(product_id);
        let count = self
            .visible_orders(&state, ids, |o| o.product_id == product_id)
            .len();
        Ok(count as u64)
    }

    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        self.last_product_id += 1;
        let id = ProductId::new(self.last_product_id);
        let record = Product {
            id,
            name: product.name,
            description: product.description,
            unit_price: product.unit_price,
            stock: product.stock,
            created_at: Utc::now(),
        };
        self.products.insert(id, Some(record.clone()));
        Ok(record)
    }

    async fn remove_product(&mut self, id: ProductId) -> Result<()> {
        if self.product(id).await.is_none() {
            return Err(StoreError::ProductNotFound(id));
        }
        self.products.insert(id, None);
        Ok(())
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: i64) -> Result<Product> {
        let product = self.product_mut(id).await?;
        product.stock = product.stock_after(delta)?;
        Ok(product.clone())
    }

    async fn set_price(&mut self, id: ProductId, unit_price: Money) -> Result<Product> {
        let product = self.product_mut(id).await?;
        product.unit_price = unit_price;
        Ok(product.clone())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        if self.product(order.product_id).await.is_none() {
            return Err(StoreError::ProductNotFound(order.product_id));
        }
        let total = order.total()?;

        self.last_order_id += 1;
        let id = OrderId::new(self.last_order_id);
        let record = Order {
            id,
            buyer_id: order.buyer_id,
            product_id: order.product_id,
            quantity: order.quantity,
            unit_price: order.unit_price,
            total,
            status: OrderStatus::Pending,
            created_at: order.created_at,
        };
        self.orders.insert(id, Some(record.clone()));
        Ok(record)
    }

    async fn set_status(&mut self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let order = self.order_mut(id).await?;
        order.status = status;
        Ok(order.clone())
    }

    async fn delete_orders(
        &mut self,
        buyer: BuyerId,
        product: ProductId,
        date: NaiveDate,
    ) -> Result<Vec<Order>> {
        let published = Arc::clone(&self.published);
        let removed = {
            let state = published.read().await;
            let ids = state.order_ids_for(buyer, product);
            self.visible_orders(&state, ids, |o| o.matches(buyer, product, date))
        };

        for order in &removed {
            self.orders.insert(order.id, None);
        }
        Ok(removed)
    }

    async fn commit(self) -> Result<()> {
        let mut state = self.published.write().await;
        for (id, staged) in self.products {
            match staged {
                Some(product) => {
                    state.products.insert(id, product);
                }
                None => {
                    state.products.remove(&id);
                }
            }
        }
        for (id, staged) in self.orders {
            match staged {
                Some(order) => state.put_order(order),
                None => state.remove_order(id),
            }
        }
        state.last_product_id = self.last_product_id;
        state.last_order_id = self.last_order_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{CatalogStoreExt, LedgerStoreExt};

    fn mug() -> NewProduct {
        NewProduct::new(
            "Mug Bessans",
            "Mug en céramique avec vue sur les montagnes",
            Money::from_euros(12),
            25,
        )
    }

    #[tokio::test]
    async fn create_and_get_product() {
        let store = InMemoryStore::new();
        let created = store.create_product(mug()).await.unwrap();
        assert_eq!(created.id, ProductId::new(1));

        let fetched = store.get_product(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get_product(ProductId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_products_in_id_order() {
        let store = InMemoryStore::new();
        store.seed_if_empty().await.unwrap();

        let products = store.list_products().await.unwrap();
        let ids: Vec<i64> = products.iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn seed_only_once() {
        let store = InMemoryStore::new();
        assert_eq!(store.seed_if_empty().await.unwrap().len(), 5);
        assert!(store.seed_if_empty().await.unwrap().is_empty());
        assert_eq!(store.product_count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn adjust_stock_rejects_negative_and_keeps_stock() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();

        let result = store.adjust_stock(product.id, -26).await;
        assert!(matches!(result, Err(StoreError::InsufficientStock { .. })));
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 25);

        let updated = store.adjust_stock(product.id, -25).await.unwrap();
        assert_eq!(updated.stock, 0);
    }

    #[tokio::test]
    async fn adjust_stock_unknown_product() {
        let store = InMemoryStore::new();
        let result = store.adjust_stock(ProductId::new(3), 1).await;
        assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn set_price_keeps_existing_order_prices() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();
        let order = store
            .create_order(NewOrder::new(BuyerId::new(7), product.id, 2, product.unit_price))
            .await
            .unwrap();

        let repriced = store
            .set_price(product.id, Money::from_euros(20))
            .await
            .unwrap();
        assert_eq!(repriced.unit_price, Money::from_euros(20));

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.unit_price, Money::from_euros(12));
        assert_eq!(stored.total, Money::from_euros(24));
    }

    #[tokio::test]
    async fn create_order_computes_total() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();

        let order = store
            .create_order(NewOrder::new(BuyerId::new(42), product.id, 3, product.unit_price))
            .await
            .unwrap();
        assert_eq!(order.total, Money::from_euros(36));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn create_order_requires_existing_product() {
        let store = InMemoryStore::new();
        let result = store
            .create_order(NewOrder::new(
                BuyerId::new(42),
                ProductId::new(1),
                1,
                Money::from_euros(1),
            ))
            .await;
        assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn orders_listed_newest_first() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();
        let now = Utc::now();

        for (buyer, age) in [(1, 3), (2, 1), (1, 2)] {
            store
                .create_order(
                    NewOrder::new(BuyerId::new(buyer), product.id, 1, product.unit_price)
                        .created_at(now - Duration::minutes(age)),
                )
                .await
                .unwrap();
        }

        let all = store.list_all_orders().await.unwrap();
        let ids: Vec<i64> = all.iter().map(|o| o.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let buyer_one = store.list_orders_by_buyer(BuyerId::new(1)).await.unwrap();
        let ids: Vec<i64> = buyer_one.iter().map(|o| o.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn delete_product_blocked_by_orders() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();
        store
            .create_order(NewOrder::new(BuyerId::new(1), product.id, 1, product.unit_price))
            .await
            .unwrap();

        let result = store.delete_product(product.id).await;
        assert!(matches!(
            result,
            Err(StoreError::ReferencedByOrders { order_count: 1, .. })
        ));
        assert!(store.get_product(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_unreferenced_product() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();

        store.delete_product(product.id).await.unwrap();
        assert!(store.get_product(product.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_product(product.id).await,
            Err(StoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn set_status_overwrites() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();
        let order = store
            .create_order(NewOrder::new(BuyerId::new(1), product.id, 1, product.unit_price))
            .await
            .unwrap();

        let updated = store.set_status(order.id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Shipped);
        assert!(matches!(
            store.set_status(OrderId::new(77), OrderStatus::Paid).await,
            Err(StoreError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_orders_matches_calendar_date() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();
        let now = Utc::now();
        let buyer = BuyerId::new(42);

        store
            .create_order(NewOrder::new(buyer, product.id, 1, product.unit_price).created_at(now))
            .await
            .unwrap();
        store
            .create_order(
                NewOrder::new(buyer, product.id, 2, product.unit_price)
                    .created_at(now - Duration::days(2)),
            )
            .await
            .unwrap();

        let removed = store
            .delete_orders(buyer, product.id, now.date_naive())
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].quantity, 1);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.adjust_stock(product.id, -5).await.unwrap();
            tx.insert_order(NewOrder::new(BuyerId::new(1), product.id, 5, product.unit_price))
                .await
                .unwrap();
        }

        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 25);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn readers_see_committed_state_during_transaction() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.adjust_stock(product.id, -10).await.unwrap();
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 25);

        tx.commit().await.unwrap();
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 15);
    }

    #[tokio::test]
    async fn transaction_reads_its_own_writes() {
        let store = InMemoryStore::new();
        let product = store.create_product(mug()).await.unwrap();
        let today = Utc::now().date_naive();

        let mut tx = store.begin().await.unwrap();
        let extra = tx.insert_product(mug()).await.unwrap();
        assert_eq!(tx.count_products().await.unwrap(), 2);

        let order = tx
            .insert_order(NewOrder::new(BuyerId::new(3), product.id, 2, product.unit_price))
            .await
            .unwrap();
        assert_eq!(tx.count_orders_for_product(product.id).await.unwrap(), 1);
        assert_eq!(
            tx.lock_order(order.id).await.unwrap().unwrap().status,
            OrderStatus::Pending
        );

        let removed = tx
            .delete_orders(BuyerId::new(3), product.id, today)
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(tx.count_orders_for_product(product.id).await.unwrap(), 0);
        assert!(tx.lock_order(order.id).await.unwrap().is_none());

        tx.remove_product(extra.id).await.unwrap();
        assert_eq!(tx.count_products().await.unwrap(), 1);
        tx.commit().await.unwrap();

        assert_eq!(store.product_count().await.unwrap(), 1);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn commit_keeps_untouched_records_and_indexes() {
        let store = InMemoryStore::new();
        let mug = store.create_product(mug()).await.unwrap();
        let buyer = BuyerId::new(8);
        for _ in 0..50 {
            store
                .create_order(NewOrder::new(buyer, mug.id, 1, mug.unit_price))
                .await
                .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let first = OrderId::new(1);
        tx.set_status(first, OrderStatus::Paid).await.unwrap();
        tx.adjust_stock(mug.id, -1).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.order_count().await, 50);
        assert_eq!(store.count_orders_for_product(mug.id).await.unwrap(), 50);
        assert_eq!(store.list_orders_by_buyer(buyer).await.unwrap().len(), 50);
        assert_eq!(
            store.get_order(first).await.unwrap().unwrap().status,
            OrderStatus::Paid
        );
        assert_eq!(store.get_product(mug.id).await.unwrap().unwrap().stock, 24);

        let removed = store
            .delete_orders(buyer, mug.id, Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(removed.len(), 50);
        assert_eq!(store.count_orders_for_product(mug.id).await.unwrap(), 0);
        assert!(store.list_orders_by_buyer(buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_keeps_ids_increasing() {
        let store = InMemoryStore::new();
        store.create_product(mug()).await.unwrap();
        store.clear().await;

        let next = store.create_product(mug()).await.unwrap();
        assert_eq!(next.id, ProductId::new(2));
        assert_eq!(store.product_count().await.unwrap(), 1);
    }
}
