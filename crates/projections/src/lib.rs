//! Read side of the shop.
//!
//! [`ShopQueries`] answers catalog and order-history questions straight from
//! the ledger store. It never writes.

pub mod error;
pub mod queries;
pub mod views;

pub use error::{QueryError, Result};
pub use queries::ShopQueries;
pub use views::{LOW_STOCK_THRESHOLD, OrderSummary, StockLevel, StockReport};
