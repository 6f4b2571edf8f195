//! Domain error types.

use chrono::NaiveDate;
use common::{BuyerId, OrderId, OrderStatus, ProductId};
use ledger_store::StoreError;
use thiserror::Error;

/// Malformed input rejected before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Product name must have at least {min} characters (got {actual})")]
    NameTooShort { min: usize, actual: usize },

    #[error("Product description must have at least {min} characters (got {actual})")]
    DescriptionTooShort { min: usize, actual: usize },

    #[error("Price must be positive (got {cents} cents)")]
    NonPositivePrice { cents: i64 },

    #[error("Stock cannot be negative (got {stock})")]
    NegativeStock { stock: i64 },

    #[error("Stock is too large (got {stock})")]
    StockTooLarge { stock: i64 },

    #[error("Quantity must be positive (got {quantity})")]
    InvalidQuantity { quantity: i64 },

    #[error("Invalid date '{input}', expected DD/MM/YYYY")]
    InvalidDate { input: String },

    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Amount out of range")]
    AmountOverflow,
}

/// Coarse classification of [`ShopError`], for callers that render messages
/// or decide on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    ReferencedByOrders,
    Forbidden,
    InternalStorage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::ReferencedByOrders => "referenced_by_orders",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InternalStorage => "internal_storage_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by every coordinator operation.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A cancellation matched no order.
    #[error("No order of buyer {buyer_id} for product {product_id} on {date}")]
    NoMatchingOrders {
        buyer_id: BuyerId,
        product_id: ProductId,
        date: NaiveDate,
    },

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    #[error("Product {product_id} is referenced by {order_count} order(s)")]
    ReferencedByOrders {
        product_id: ProductId,
        order_count: u64,
    },

    /// The caller did not present the privilege the operation requires.
    #[error("Operation '{operation}' requires privileged access")]
    Forbidden { operation: &'static str },

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl ShopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShopError::Validation(_) => ErrorKind::Validation,
            ShopError::ProductNotFound(_)
            | ShopError::OrderNotFound(_)
            | ShopError::NoMatchingOrders { .. } => ErrorKind::NotFound,
            ShopError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ShopError::ReferencedByOrders { .. } => ErrorKind::ReferencedByOrders,
            ShopError::Forbidden { .. } => ErrorKind::Forbidden,
            ShopError::Storage(_) => ErrorKind::InternalStorage,
        }
    }

    /// Only storage failures may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, ShopError::Storage(e) if e.is_transient())
    }
}

impl From<StoreError> for ShopError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProductNotFound(id) => ShopError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => ShopError::OrderNotFound(id),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => ShopError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::ReferencedByOrders {
                product_id,
                order_count,
            } => ShopError::ReferencedByOrders {
                product_id,
                order_count,
            },
            StoreError::StockOverflow(_) | StoreError::TotalOverflow { .. } => {
                ShopError::Validation(ValidationError::AmountOverflow)
            }
            other => ShopError::Storage(other),
        }
    }
}
