//! Shared identifiers and value types for the shop ledger.
//!
//! Everything here is plain data: the stores persist it, the coordinator
//! enforces rules over it, and the read side renders it.

mod ids;
mod money;
mod status;

pub use ids::{BuyerId, OrderId, ProductId};
pub use money::Money;
pub use status::{OrderStatus, UnknownStatus};
