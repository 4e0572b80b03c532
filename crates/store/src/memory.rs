//! In-memory store implementations.
//!
//! These back the test suites and local runs, and provide the same
//! interface and guarantees as the PostgreSQL implementations. Each
//! store is a cloneable handle over shared state; the conditional
//! stock decrement runs inside a single write-lock section, which
//! makes it atomic with respect to concurrent callers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CheckoutId, OrderId, ProductId, UserId};
use domain::{Authority, Cart, Checkout, Order, Product, Rial, User};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{CartStore, CatalogStore, CheckoutStore, OrderStore, UserStore};

/// In-memory product catalog.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current stock of a product (test helper).
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.products.read().await.get(&id).map(|p| p.stock)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        self.products.write().await.insert(product.id, product);
        Ok(())
    }

    async fn set_price(&self, id: ProductId, price: Rial) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(StoreError::ProductNotFound(id))?;
        product.price = price;
        Ok(())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        // Check and write under one lock: this is the atomicity the
        // pipeline relies on.
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(StoreError::ProductNotFound(id))?;

        if product.stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(())
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(StoreError::ProductNotFound(id))?;
        product.stock += quantity;
        Ok(())
    }
}

/// In-memory cart store, keyed by owner.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored carts (test helper).
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn find_by_owner(&self, owner: UserId) -> Result<Option<Cart>> {
        Ok(self.carts.read().await.get(&owner).cloned())
    }

    async fn upsert(&self, cart: &Cart) -> Result<()> {
        self.carts.write().await.insert(cart.owner(), cart.clone());
        Ok(())
    }

    async fn delete(&self, owner: UserId) -> Result<()> {
        self.carts.write().await.remove(&owner);
        Ok(())
    }
}

/// In-memory checkout store with passive TTL expiry.
#[derive(Clone, Default)]
pub struct InMemoryCheckoutStore {
    checkouts: Arc<RwLock<HashMap<CheckoutId, Checkout>>>,
}

impl InMemoryCheckoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (unexpired or unswept) rows.
    pub async fn checkout_count(&self) -> usize {
        self.checkouts.read().await.len()
    }
}

#[async_trait]
impl CheckoutStore for InMemoryCheckoutStore {
    async fn insert(&self, checkout: &Checkout) -> Result<()> {
        self.checkouts
            .write()
            .await
            .insert(checkout.id(), checkout.clone());
        Ok(())
    }

    async fn update(&self, checkout: &Checkout) -> Result<()> {
        self.checkouts
            .write()
            .await
            .insert(checkout.id(), checkout.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CheckoutId) -> Result<Option<Checkout>> {
        let mut checkouts = self.checkouts.write().await;
        match checkouts.get(&id) {
            Some(c) if c.is_expired(Utc::now()) => {
                checkouts.remove(&id);
                Ok(None)
            }
            other => Ok(other.cloned()),
        }
    }

    async fn find_by_authority(&self, authority: &Authority) -> Result<Option<Checkout>> {
        let mut checkouts = self.checkouts.write().await;
        let found = checkouts
            .values()
            .find(|c| c.authority() == Some(authority))
            .cloned();

        match found {
            Some(c) if c.is_expired(Utc::now()) => {
                checkouts.remove(&c.id());
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, id: CheckoutId) -> Result<()> {
        self.checkouts.write().await.remove(&id);
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<u64> {
        let mut checkouts = self.checkouts.write().await;
        let now = Utc::now();
        let before = checkouts.len();
        checkouts.retain(|_, c| !c.is_expired(now));
        Ok((before - checkouts.len()) as u64)
    }
}

/// In-memory order store with a simulated unique-authority constraint.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders (test helper).
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;

        // Unique constraint simulation, mirroring the Postgres schema.
        if orders
            .values()
            .any(|o| o.authority() == order.authority())
        {
            return Err(StoreError::DuplicateAuthority(
                order.authority().as_str().to_string(),
            ));
        }

        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_authority(&self, authority: &Authority) -> Result<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.authority() == authority)
            .cloned())
    }

    async fn list_for_owner(&self, owner: UserId, offset: u64, limit: u64) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.owner() == owner)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_for_owner(&self, owner: UserId) -> Result<u64> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|o| o.owner() == owner).count() as u64)
    }

    async fn update(&self, order: &Order) -> Result<()> {
        self.orders.write().await.insert(order.id(), order.clone());
        Ok(())
    }
}

/// In-memory user store.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::AddressId;
    use domain::LineItem;

    fn product(stock: u32, price: i64) -> Product {
        Product::new(ProductId::new(), "Widget", stock, Rial::new(price))
    }

    fn checkout_with_ttl(ttl_secs: i64) -> Checkout {
        Checkout::new(
            UserId::new(),
            vec![LineItem::new(ProductId::new(), 1, Rial::new(1000))],
            AddressId::new(),
            Duration::seconds(ttl_secs),
        )
    }

    #[tokio::test]
    async fn decrement_takes_stock() {
        let catalog = InMemoryCatalogStore::new();
        let p = product(5, 1000);
        let id = p.id;
        catalog.insert_product(p).await.unwrap();

        catalog.decrement_stock(id, 3).await.unwrap();
        assert_eq!(catalog.stock_of(id).await, Some(2));
    }

    #[tokio::test]
    async fn decrement_below_available_fails_and_preserves_stock() {
        let catalog = InMemoryCatalogStore::new();
        let p = product(2, 1000);
        let id = p.id;
        catalog.insert_product(p).await.unwrap();

        let result = catalog.decrement_stock(id, 3).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock { available: 2, .. })
        ));
        assert_eq!(catalog.stock_of(id).await, Some(2));
    }

    #[tokio::test]
    async fn decrement_missing_product_fails() {
        let catalog = InMemoryCatalogStore::new();
        let result = catalog.decrement_stock(ProductId::new(), 1).await;
        assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_decrements_never_go_negative() {
        let catalog = InMemoryCatalogStore::new();
        let p = product(10, 1000);
        let id = p.id;
        catalog.insert_product(p).await.unwrap();

        // 8 tasks each try to take 3 units from a stock of 10: at most
        // 3 can succeed.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(
                async move { catalog.decrement_stock(id, 3).await },
            ));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(catalog.stock_of(id).await, Some(1));
    }

    #[tokio::test]
    async fn cart_upsert_and_delete() {
        let carts = InMemoryCartStore::new();
        let owner = UserId::new();
        let mut cart = Cart::new(owner);
        cart.upsert_line(ProductId::new(), 2, Rial::new(500)).unwrap();

        carts.upsert(&cart).await.unwrap();
        assert_eq!(carts.cart_count().await, 1);
        assert_eq!(
            carts.find_by_owner(owner).await.unwrap().unwrap().line_count(),
            1
        );

        carts.delete(owner).await.unwrap();
        assert!(carts.find_by_owner(owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_checkout_reads_as_absent_and_is_removed() {
        let checkouts = InMemoryCheckoutStore::new();
        let expired = checkout_with_ttl(-1);
        let id = expired.id();
        checkouts.insert(&expired).await.unwrap();

        assert!(checkouts.find_by_id(id).await.unwrap().is_none());
        assert_eq!(checkouts.checkout_count().await, 0);
    }

    #[tokio::test]
    async fn find_by_authority_matches_and_expires() {
        let checkouts = InMemoryCheckoutStore::new();

        let mut live = checkout_with_ttl(600);
        live.set_authority(Authority::new("A-1"));
        checkouts.insert(&live).await.unwrap();

        let mut expired = checkout_with_ttl(-1);
        expired.set_authority(Authority::new("A-2"));
        checkouts.insert(&expired).await.unwrap();

        assert!(
            checkouts
                .find_by_authority(&Authority::new("A-1"))
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            checkouts
                .find_by_authority(&Authority::new("A-2"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            checkouts
                .find_by_authority(&Authority::new("A-3"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let checkouts = InMemoryCheckoutStore::new();
        checkouts.insert(&checkout_with_ttl(600)).await.unwrap();
        checkouts.insert(&checkout_with_ttl(-5)).await.unwrap();
        checkouts.insert(&checkout_with_ttl(-10)).await.unwrap();

        let swept = checkouts.sweep_expired().await.unwrap();
        assert_eq!(swept, 2);
        assert_eq!(checkouts.checkout_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_authority_insert_rejected() {
        let orders = InMemoryOrderStore::new();
        let checkout = checkout_with_ttl(600);

        let first = Order::from_checkout(&checkout, Authority::new("A-7"));
        let second = Order::from_checkout(&checkout, Authority::new("A-7"));

        orders.insert(&first).await.unwrap();
        let result = orders.insert(&second).await;

        assert!(matches!(result, Err(StoreError::DuplicateAuthority(_))));
        assert_eq!(orders.order_count().await, 1);
    }

    #[tokio::test]
    async fn list_for_owner_pages_newest_first() {
        let orders = InMemoryOrderStore::new();
        let owner = UserId::new();

        for i in 0..3 {
            let checkout = Checkout::new(
                owner,
                vec![LineItem::new(ProductId::new(), 1, Rial::new(100))],
                AddressId::new(),
                Duration::seconds(600),
            );
            let order = Order::from_checkout(&checkout, Authority::new(format!("A-{i}")));
            orders.insert(&order).await.unwrap();
            // Distinct creation timestamps.
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let page = orders.list_for_owner(owner, 0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at() >= page[1].created_at());

        let rest = orders.list_for_owner(owner, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);

        assert_eq!(orders.count_for_owner(owner).await.unwrap(), 3);
        assert_eq!(orders.count_for_owner(UserId::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn user_roundtrip() {
        let users = InMemoryUserStore::new();
        let user = User::new("+989121234567", vec![]);
        let id = user.id;

        users.insert_user(&user).await.unwrap();
        assert_eq!(users.find_user(id).await.unwrap().unwrap().phone, user.phone);
        assert!(users.find_user(UserId::new()).await.unwrap().is_none());
    }
}
