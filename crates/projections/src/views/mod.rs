//! Shapes returned by [`ShopQueries`](crate::ShopQueries).

pub mod order_summary;
pub mod stock;

pub use order_summary::OrderSummary;
pub use stock::{LOW_STOCK_THRESHOLD, StockLevel, StockReport};
