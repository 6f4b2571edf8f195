//! Storage for the shop ledger.
//!
//! Two logical stores live here: the catalog (products and their stock) and
//! the ledger (orders). Both are served by one backend so that a single
//! [`StoreTransaction`] can change stock and orders together.
//!
//! - [`InMemoryStore`] serialises writers and publishes staged state on commit
//! - [`PostgresStore`] maps transactions onto database transactions with
//!   row locks on the affected product

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod seed;
pub mod store;

pub use common::{BuyerId, Money, OrderId, OrderStatus, ProductId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use record::{NewOrder, NewProduct, Order, Product};
pub use store::{CatalogStore, CatalogStoreExt, LedgerStore, LedgerStoreExt, Store, StoreTransaction};
