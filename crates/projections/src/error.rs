//! Query error types.

use common::ProductId;
use ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur while answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The product does not exist, either requested directly or referenced
    /// by an order being summarised.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn is_transient(&self) -> bool {
        match self {
            QueryError::Store(e) => e.is_transient(),
            QueryError::ProductNotFound(_) => false,
        }
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
