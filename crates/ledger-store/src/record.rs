//! Records persisted by the catalog and the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{BuyerId, Money, OrderId, OrderStatus, ProductId, Result, StoreError};

/// A catalog item with its current price and available stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Computes the stock left after applying `delta`.
    ///
    /// Fails with `InsufficientStock` when the result would be negative.
    pub fn stock_after(&self, delta: i64) -> Result<u32> {
        let next = i64::from(self.stock) + delta;
        if next < 0 {
            return Err(StoreError::InsufficientStock {
                product_id: self.id,
                requested: delta.unsigned_abs(),
                available: self.stock,
            });
        }
        u32::try_from(next).map_err(|_| StoreError::StockOverflow(self.id))
    }
}

/// A product about to be inserted into the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    pub stock: u32,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit_price: Money,
        stock: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit_price,
            stock,
        }
    }
}

/// A recorded purchase of one product.
///
/// `unit_price` is the price captured when the order was placed; `total` is
/// always `unit_price * quantity` and never follows later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// UTC calendar date on which the order was created.
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Returns true if this order was placed by `buyer` for `product` on `date`.
    pub fn matches(&self, buyer: BuyerId, product: ProductId, date: NaiveDate) -> bool {
        self.buyer_id == buyer && self.product_id == product && self.created_on() == date
    }
}

/// An order about to be inserted into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Creates an order stamped with the current time.
    pub fn new(buyer_id: BuyerId, product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        Self {
            buyer_id,
            product_id,
            quantity,
            unit_price,
            created_at: Utc::now(),
        }
    }

    /// Overrides the creation timestamp.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Computes `quantity * unit_price`.
    pub fn total(&self) -> Result<Money> {
        self.unit_price
            .checked_multiply(self.quantity)
            .ok_or(StoreError::TotalOverflow {
                quantity: self.quantity,
                unit_price: self.unit_price,
            })
    }
}
