//! The only writer of stock and orders.

use std::time::Instant;

use common::{BuyerId, Money, OrderId, OrderStatus, ProductId};
use ledger_store::{CatalogStoreExt, NewOrder, Order, Product, Store, StoreTransaction};
use serde::Serialize;

use crate::date::OrderDate;
use crate::error::{ShopError, ValidationError};
use crate::payment::{PaymentLinkProvider, PaymentRequest};
use crate::policy::StatusPolicy;
use crate::product::ProductDraft;

/// Outcome of a successful purchase.
#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub order: Order,
    /// Product as it stands after the stock decrement.
    pub product: Product,
    pub payment_link: String,
}

/// Outcome of a successful cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct Cancellation {
    pub removed: Vec<Order>,
    /// Units credited back to stock.
    pub restocked: u64,
    pub product: Product,
}

/// Coordinates every write that touches stock or orders.
///
/// Each operation runs as one store transaction: the product row is locked
/// first, checks are made against the locked state, and all changes commit
/// together. On any error the transaction is dropped and nothing changes.
pub struct OrderCoordinator<S, P>
where
    S: Store,
    P: PaymentLinkProvider,
{
    store: S,
    payments: P,
    policy: StatusPolicy,
}

impl<S, P> OrderCoordinator<S, P>
where
    S: Store,
    P: PaymentLinkProvider,
{
    /// Creates a coordinator with the strict status lifecycle.
    pub fn new(store: S, payments: P) -> Self {
        Self {
            store,
            payments,
            policy: StatusPolicy::default(),
        }
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.policy
    }

    /// Adds a product to the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn create_product(
        &self,
        draft: ProductDraft,
        privileged: bool,
    ) -> Result<Product, ShopError> {
        require_privilege(privileged, "create_product")?;
        let product = self.store.create_product(draft.validate()?).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Removes a product that no order references.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(
        &self,
        product_id: ProductId,
        privileged: bool,
    ) -> Result<Product, ShopError> {
        require_privilege(privileged, "delete_product")?;
        let product = self.store.delete_product(product_id).await?;
        tracing::info!(%product_id, "product deleted");
        Ok(product)
    }

    /// Changes a product's catalog price.
    ///
    /// Orders already placed keep the unit price they were bought at.
    #[tracing::instrument(skip(self))]
    pub async fn reprice_product(
        &self,
        product_id: ProductId,
        unit_price: Money,
        privileged: bool,
    ) -> Result<Product, ShopError> {
        require_privilege(privileged, "reprice_product")?;
        if !unit_price.is_positive() {
            return Err(ValidationError::NonPositivePrice {
                cents: unit_price.cents(),
            }
            .into());
        }

        let mut tx = self.store.begin().await?;
        tx.lock_product(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound(product_id))?;
        let product = tx.set_price(product_id, unit_price).await?;
        tx.commit().await?;

        tracing::info!(%product_id, price = %product.unit_price, "product repriced");
        Ok(product)
    }

    /// Buys `quantity` units of a product.
    ///
    /// The stock check, the decrement and the order insert happen under the
    /// product's lock, so concurrent buyers cannot both take the last unit.
    /// The order's unit price is the product price read under that lock.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Purchase, ShopError> {
        let started = Instant::now();
        let result = self.try_place_order(buyer_id, product_id, quantity).await;
        metrics::histogram!("place_order_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(purchase) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %purchase.order.id,
                    total = %purchase.order.total,
                    stock_left = purchase.product.stock,
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "kind" => e.kind().as_str())
                    .increment(1);
                tracing::warn!(error = %e, "order rejected");
            }
        }
        result
    }

    async fn try_place_order(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Purchase, ShopError> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound(product_id))?;

        if quantity <= 0 {
            return Err(ValidationError::InvalidQuantity { quantity }.into());
        }
        let insufficient = || ShopError::InsufficientStock {
            product_id,
            requested: quantity.unsigned_abs(),
            available: product.stock,
        };
        let quantity = u32::try_from(quantity).map_err(|_| insufficient())?;
        if product.stock < quantity {
            return Err(insufficient());
        }

        let product = tx.adjust_stock(product_id, -i64::from(quantity)).await?;
        let order = tx
            .insert_order(NewOrder::new(
                buyer_id,
                product_id,
                quantity,
                product.unit_price,
            ))
            .await?;
        tx.commit().await?;

        let payment_link = self.payments.payment_link(&PaymentRequest {
            product_name: &product.name,
            quantity: order.quantity,
            total: order.total,
        });

        Ok(Purchase {
            order,
            product,
            payment_link,
        })
    }

    /// Removes the buyer's orders for a product placed on `date`
    /// (`DD/MM/YYYY`) and returns their units to stock.
    ///
    /// `authorized` is the caller's decision on whether this caller may cancel
    /// these orders. Orders already in `Cancelled` status returned their stock
    /// when they were cancelled and are removed without a second credit.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        date: &str,
        authorized: bool,
    ) -> Result<Cancellation, ShopError> {
        require_privilege(authorized, "cancel_order")?;
        let date = OrderDate::parse(date)?;

        let mut tx = self.store.begin().await?;
        let mut product = tx
            .lock_product(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound(product_id))?;

        let removed = tx
            .delete_orders(buyer_id, product_id, date.as_naive())
            .await?;
        if removed.is_empty() {
            return Err(ShopError::NoMatchingOrders {
                buyer_id,
                product_id,
                date: date.as_naive(),
            });
        }

        let restocked: u64 = removed
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(|o| u64::from(o.quantity))
            .sum();
        if restocked > 0 {
            let delta = i64::try_from(restocked).map_err(|_| ValidationError::AmountOverflow)?;
            product = tx.adjust_stock(product_id, delta).await?;
        }
        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(removed.len() as u64);
        tracing::info!(
            removed = removed.len(),
            restocked,
            stock = product.stock,
            "orders cancelled"
        );

        Ok(Cancellation {
            removed,
            restocked,
            product,
        })
    }

    /// Moves an order to `status` under the configured [`StatusPolicy`].
    ///
    /// Entering `Cancelled` credits the order's units back to stock; leaving
    /// it (permissive policy only) takes them again and fails with
    /// `InsufficientStock` if they are gone.
    #[tracing::instrument(skip(self))]
    pub async fn advance_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        privileged: bool,
    ) -> Result<Order, ShopError> {
        require_privilege(privileged, "advance_status")?;

        // Product before order, the same lock order as cancellations.
        let product_id = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound(order_id))?
            .product_id;

        let mut tx = self.store.begin().await?;
        tx.lock_product(product_id).await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound(order_id))?;

        self.policy.check(order.status, status)?;

        let was_cancelled = order.status == OrderStatus::Cancelled;
        let now_cancelled = status == OrderStatus::Cancelled;
        if now_cancelled && !was_cancelled {
            tx.adjust_stock(product_id, i64::from(order.quantity))
                .await?;
        } else if was_cancelled && !now_cancelled {
            tx.adjust_stock(product_id, -i64::from(order.quantity))
                .await?;
        }

        let updated = tx.set_status(order_id, status).await?;
        tx.commit().await?;

        metrics::counter!("order_status_changes_total", "status" => status.as_str())
            .increment(1);
        tracing::info!(from = %order.status, to = %status, "order status changed");
        Ok(updated)
    }
}

fn require_privilege(privileged: bool, operation: &'static str) -> Result<(), ShopError> {
    if privileged {
        Ok(())
    } else {
        Err(ShopError::Forbidden { operation })
    }
}

#[cfg(test)]
mod tests {
    use ledger_store::{CatalogStore, InMemoryStore, LedgerStore, LedgerStoreExt};

    use super::*;
    use crate::error::ErrorKind;
    use crate::payment::PayPalMeLink;

    async fn seeded() -> OrderCoordinator<InMemoryStore, PayPalMeLink> {
        let store = InMemoryStore::new();
        store.seed_if_empty().await.unwrap();
        OrderCoordinator::new(store, PayPalMeLink::new("toncompte"))
    }

    fn placed_on(order: &Order) -> String {
        OrderDate::from(order.created_at.date_naive()).to_string()
    }

    async fn stock_of(coordinator: &OrderCoordinator<InMemoryStore, PayPalMeLink>, id: i64) -> u32 {
        coordinator
            .store()
            .get_product(ProductId::new(id))
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn test_place_order_snapshots_price() {
        let coordinator = seeded().await;

        let purchase = coordinator
            .place_order(BuyerId::new(42), ProductId::new(1), 2)
            .await
            .unwrap();

        assert_eq!(purchase.order.quantity, 2);
        assert_eq!(purchase.order.unit_price, Money::from_euros(25));
        assert_eq!(purchase.order.total, Money::from_euros(50));
        assert_eq!(purchase.order.status, OrderStatus::Pending);
        assert_eq!(purchase.product.stock, 48);
        assert!(purchase.payment_link.contains("/50.00?"));
        assert_eq!(stock_of(&coordinator, 1).await, 48);
    }

    #[tokio::test]
    async fn test_place_order_unknown_product() {
        let coordinator = seeded().await;
        let err = coordinator
            .place_order(BuyerId::new(42), ProductId::new(99), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_place_order_rejects_non_positive_quantity() {
        let coordinator = seeded().await;
        for quantity in [0, -3] {
            let err = coordinator
                .place_order(BuyerId::new(42), ProductId::new(1), quantity)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(stock_of(&coordinator, 1).await, 50);
    }

    #[tokio::test]
    async fn test_place_order_insufficient_stock_changes_nothing() {
        let coordinator = seeded().await;
        let err = coordinator
            .place_order(BuyerId::new(42), ProductId::new(3), 26)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShopError::InsufficientStock {
                requested: 26,
                available: 25,
                ..
            }
        ));
        assert_eq!(stock_of(&coordinator, 3).await, 25);
        assert_eq!(coordinator.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_place_order_huge_quantity_is_insufficient_stock() {
        let coordinator = seeded().await;
        let err = coordinator
            .place_order(BuyerId::new(42), ProductId::new(1), i64::MAX)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let coordinator = seeded().await;
        let buyer = BuyerId::new(42);
        let order = coordinator
            .place_order(buyer, ProductId::new(1), 3)
            .await
            .unwrap()
            .order;

        let cancellation = coordinator
            .cancel_order(buyer, ProductId::new(1), &placed_on(&order), true)
            .await
            .unwrap();

        assert_eq!(cancellation.removed.len(), 1);
        assert_eq!(cancellation.restocked, 3);
        assert_eq!(cancellation.product.stock, 50);
        assert_eq!(stock_of(&coordinator, 1).await, 50);
    }

    #[tokio::test]
    async fn test_cancel_requires_authorization() {
        let coordinator = seeded().await;
        let err = coordinator
            .cancel_order(BuyerId::new(42), ProductId::new(1), "01/08/2025", false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_cancel_rejects_malformed_date() {
        let coordinator = seeded().await;
        let err = coordinator
            .cancel_order(BuyerId::new(42), ProductId::new(1), "2025-08-01", true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::Validation(ValidationError::InvalidDate { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_without_match_is_not_found() {
        let coordinator = seeded().await;
        let order = coordinator
            .place_order(BuyerId::new(1), ProductId::new(1), 1)
            .await
            .unwrap()
            .order;

        let err = coordinator
            .cancel_order(BuyerId::new(2), ProductId::new(1), &placed_on(&order), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NoMatchingOrders { .. }));
        assert_eq!(stock_of(&coordinator, 1).await, 49);
        assert_eq!(coordinator.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn test_advance_status_follows_lifecycle() {
        let coordinator = seeded().await;
        let order = coordinator
            .place_order(BuyerId::new(42), ProductId::new(2), 1)
            .await
            .unwrap()
            .order;

        let paid = coordinator
            .advance_status(order.id, OrderStatus::Paid, true)
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);

        let shipped = coordinator
            .advance_status(order.id, OrderStatus::Shipped, true)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let err = coordinator
            .advance_status(order.id, OrderStatus::Pending, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::Validation(ValidationError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_advance_status_requires_privilege() {
        let coordinator = seeded().await;
        let order = coordinator
            .place_order(BuyerId::new(42), ProductId::new(2), 1)
            .await
            .unwrap()
            .order;

        let err = coordinator
            .advance_status(order.id, OrderStatus::Paid, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_advance_status_unknown_order() {
        let coordinator = seeded().await;
        let err = coordinator
            .advance_status(OrderId::new(404), OrderStatus::Paid, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancelled_status_returns_stock_once() {
        let coordinator = seeded().await;
        let buyer = BuyerId::new(42);
        let order = coordinator
            .place_order(buyer, ProductId::new(2), 4)
            .await
            .unwrap()
            .order;
        assert_eq!(stock_of(&coordinator, 2).await, 26);

        coordinator
            .advance_status(order.id, OrderStatus::Cancelled, true)
            .await
            .unwrap();
        assert_eq!(stock_of(&coordinator, 2).await, 30);

        let cancellation = coordinator
            .cancel_order(buyer, ProductId::new(2), &placed_on(&order), true)
            .await
            .unwrap();
        assert_eq!(cancellation.restocked, 0);
        assert_eq!(stock_of(&coordinator, 2).await, 30);
    }

    #[tokio::test]
    async fn test_permissive_policy_reopening_takes_stock_again() {
        let coordinator = seeded()
            .await
            .with_status_policy(StatusPolicy::Permissive);
        let order = coordinator
            .place_order(BuyerId::new(42), ProductId::new(5), 10)
            .await
            .unwrap()
            .order;

        coordinator
            .advance_status(order.id, OrderStatus::Cancelled, true)
            .await
            .unwrap();
        assert_eq!(stock_of(&coordinator, 5).await, 100);

        let reopened = coordinator
            .advance_status(order.id, OrderStatus::Pending, true)
            .await
            .unwrap();
        assert_eq!(reopened.status, OrderStatus::Pending);
        assert_eq!(stock_of(&coordinator, 5).await, 90);
    }

    #[tokio::test]
    async fn test_reprice_leaves_placed_orders_alone() {
        let coordinator = seeded().await;
        let order = coordinator
            .place_order(BuyerId::new(42), ProductId::new(1), 2)
            .await
            .unwrap()
            .order;

        let product = coordinator
            .reprice_product(ProductId::new(1), Money::from_euros(30), true)
            .await
            .unwrap();
        assert_eq!(product.unit_price, Money::from_euros(30));

        let stored = coordinator.store().get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.unit_price, Money::from_euros(25));
        assert_eq!(stored.total, Money::from_euros(50));

        let next = coordinator
            .place_order(BuyerId::new(42), ProductId::new(1), 1)
            .await
            .unwrap()
            .order;
        assert_eq!(next.unit_price, Money::from_euros(30));
    }

    #[tokio::test]
    async fn test_reprice_rejects_non_positive_price() {
        let coordinator = seeded().await;
        let err = coordinator
            .reprice_product(ProductId::new(1), Money::zero(), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::Validation(ValidationError::NonPositivePrice { cents: 0 })
        ));
    }

    #[tokio::test]
    async fn test_create_and_delete_product() {
        let coordinator = seeded().await;
        let draft = ProductDraft::new(
            "Gourde Alpine",
            "Gourde isotherme de 750 ml",
            Money::from_euros(18),
            12,
        );

        assert_eq!(
            coordinator
                .create_product(draft.clone(), false)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Forbidden
        );

        let product = coordinator.create_product(draft, true).await.unwrap();
        assert_eq!(product.id, ProductId::new(6));

        coordinator.delete_product(product.id, true).await.unwrap();
        assert!(
            coordinator
                .store()
                .get_product(product.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_product_with_orders_is_blocked() {
        let coordinator = seeded().await;
        coordinator
            .store()
            .create_order(NewOrder::new(
                BuyerId::new(1),
                ProductId::new(4),
                1,
                Money::from_euros(8),
            ))
            .await
            .unwrap();

        let err = coordinator
            .delete_product(ProductId::new(4), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferencedByOrders);
    }
}
