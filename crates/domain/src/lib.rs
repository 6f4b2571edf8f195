//! Shop rules over the ledger store.
//!
//! [`OrderCoordinator`] owns every write that touches stock or orders:
//! - purchases, which snapshot the price and decrement stock atomically
//! - cancellations, which delete a buyer's orders for one day and restock
//! - status changes, checked against a [`StatusPolicy`]
//! - catalog maintenance, gated by a privilege flag

pub mod coordinator;
pub mod date;
pub mod error;
pub mod payment;
pub mod policy;
pub mod product;

pub use common::{BuyerId, Money, OrderId, OrderStatus, ProductId};
pub use coordinator::{Cancellation, OrderCoordinator, Purchase};
pub use date::{ORDER_DATE_FORMAT, OrderDate};
pub use error::{ErrorKind, ShopError, ValidationError};
pub use payment::{PayPalMeLink, PaymentLinkProvider, PaymentRequest};
pub use policy::StatusPolicy;
pub use product::{MIN_DESCRIPTION_LEN, MIN_NAME_LEN, ProductDraft};
