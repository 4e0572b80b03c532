//! Storage layer for the shop backend.
//!
//! Defines the async traits the pipeline depends on (catalog, cart,
//! checkout, order, and user stores) together with two
//! implementations: an in-memory one for tests and local runs, and a
//! PostgreSQL one (document-style rows with key columns extracted for
//! indexing).
//!
//! Two correctness anchors live at this layer, not in the pipeline:
//! - `CatalogStore::decrement_stock` is an atomic conditional
//!   decrement; concurrent order materializations can never drive a
//!   product's stock negative.
//! - `OrderStore::insert` enforces a unique authority, which is the
//!   exactly-once guarantee against duplicate payment callbacks.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{
    InMemoryCartStore, InMemoryCatalogStore, InMemoryCheckoutStore, InMemoryOrderStore,
    InMemoryUserStore,
};
pub use postgres::PostgresStore;
pub use store::{CartStore, CatalogStore, CheckoutStore, OrderStore, UserStore};
