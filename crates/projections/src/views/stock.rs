//! Stock availability of one product.

use ledger_store::Product;
use serde::Serialize;

/// Stock at or below this count is reported as low.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// Coarse availability bucket for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    Low,
    InStock,
}

impl StockLevel {
    pub fn for_stock(stock: u32) -> Self {
        match stock {
            0 => StockLevel::OutOfStock,
            s if s <= LOW_STOCK_THRESHOLD => StockLevel::Low,
            _ => StockLevel::InStock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReport {
    pub product: Product,
    pub level: StockLevel,
}

impl From<Product> for StockReport {
    fn from(product: Product) -> Self {
        let level = StockLevel::for_stock(product.stock);
        Self { product, level }
    }
}
