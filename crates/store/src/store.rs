//! Storage traits the pipeline is written against.

use async_trait::async_trait;
use common::{CheckoutId, ProductId, UserId};
use domain::{Authority, Cart, Checkout, Order, Product, Rial, User};

use crate::error::Result;

/// Product catalog: the single source of truth for stock and price.
///
/// `decrement_stock` is the only way the pipeline takes stock and must
/// be atomic and conditional: it either removes exactly `quantity`
/// units or fails with `InsufficientStock`, never leaving stock
/// negative under concurrent callers.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn insert_product(&self, product: Product) -> Result<()>;

    /// Updates the catalog price of record.
    async fn set_price(&self, id: ProductId, price: Rial) -> Result<()>;

    /// Atomically decrements stock if at least `quantity` units are
    /// available; fails with `InsufficientStock` otherwise.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<()>;

    /// Returns stock taken by a failed materialization.
    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<()>;
}

/// Cart persistence, keyed by owner (at most one cart per user).
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_by_owner(&self, owner: UserId) -> Result<Option<Cart>>;

    /// Creates or replaces the owner's cart.
    async fn upsert(&self, cart: &Cart) -> Result<()>;

    /// Deletes the owner's cart; a no-op if none exists.
    async fn delete(&self, owner: UserId) -> Result<()>;
}

/// Checkout persistence with passive TTL expiry.
///
/// Implementations treat a checkout past its `expires_at` as absent on
/// every read and delete it on sight, so callers never observe an
/// expired checkout. `sweep_expired` is the explicit background
/// variant of the same rule.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn insert(&self, checkout: &Checkout) -> Result<()>;

    /// Replaces a stored checkout (used to persist the authority).
    async fn update(&self, checkout: &Checkout) -> Result<()>;

    async fn find_by_id(&self, id: CheckoutId) -> Result<Option<Checkout>>;

    async fn find_by_authority(&self, authority: &Authority) -> Result<Option<Checkout>>;

    /// Deletes a checkout; a no-op if already gone.
    async fn delete(&self, id: CheckoutId) -> Result<()>;

    /// Removes every expired checkout, returning how many were swept.
    async fn sweep_expired(&self) -> Result<u64>;
}

/// Order persistence. `insert` enforces at most one order per payment
/// authority and fails with `DuplicateAuthority` on conflict.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;

    async fn find_by_id(&self, id: common::OrderId) -> Result<Option<Order>>;

    async fn find_by_authority(&self, authority: &Authority) -> Result<Option<Order>>;

    /// Lists an owner's orders, newest first.
    async fn list_for_owner(&self, owner: UserId, offset: u64, limit: u64) -> Result<Vec<Order>>;

    async fn count_for_owner(&self, owner: UserId) -> Result<u64>;

    /// Replaces a stored order (administrative status/tracking
    /// updates).
    async fn update(&self, order: &Order) -> Result<()>;
}

/// User/address reads consumed by the pipeline.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    async fn insert_user(&self, user: &User) -> Result<()>;
}
