//! Order joined with the name of the product it bought.

use chrono::{DateTime, Utc};
use common::{BuyerId, Money, OrderId, OrderStatus, ProductId};
use ledger_store::{Order, Product};
use serde::Serialize;

/// One line of an order history.
///
/// `product_name` is the product's current name; `unit_price` and `total`
/// are the values recorded at purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderSummary {
    pub fn new(order: Order, product: &Product) -> Self {
        Self {
            id: order.id,
            buyer_id: order.buyer_id,
            product_id: order.product_id,
            product_name: product.name.clone(),
            quantity: order.quantity,
            unit_price: order.unit_price,
            total: order.total,
            status: order.status,
            created_at: order.created_at,
        }
    }
}
