use thiserror::Error;

use crate::{Money, OrderId, ProductId};

/// Errors that can occur when reading or writing the ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No product with this id exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// No order with this id exists.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stock decrement would take the product below zero.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    /// A stock increment would exceed the representable range.
    #[error("Stock overflow for product {0}")]
    StockOverflow(ProductId),

    /// `quantity * unit_price` does not fit in the money representation.
    #[error("Order total overflow: {quantity} x {unit_price}")]
    TotalOverflow { quantity: u32, unit_price: Money },

    /// The product cannot be deleted while orders reference it.
    #[error("Product {product_id} is referenced by {order_count} order(s)")]
    ReferencedByOrders {
        product_id: ProductId,
        order_count: u64,
    },

    /// A persisted row violates a ledger invariant.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true for failures of the storage layer itself, which a caller
    /// may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
