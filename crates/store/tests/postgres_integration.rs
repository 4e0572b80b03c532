//! PostgreSQL integration tests.
//!
//! These tests use a shared PostgreSQL container and require a running
//! Docker daemon, so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Duration;
use common::{AddressId, ProductId, UserId};
use domain::{Authority, Cart, Checkout, LineItem, Order, Product, Rial, User};
use sqlx::PgPool;
use store::{CartStore, CatalogStore, CheckoutStore, OrderStore, PostgresStore, StoreError, UserStore};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_shop_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn store() -> PostgresStore {
    let info = get_container_info().await;
    let pool = PgPool::connect(&info.connection_string).await.unwrap();
    PostgresStore::new(pool)
}

fn sample_checkout(owner: UserId, ttl_secs: i64) -> Checkout {
    Checkout::new(
        owner,
        vec![LineItem::new(ProductId::new(), 2, Rial::new(1000))],
        AddressId::new(),
        Duration::seconds(ttl_secs),
    )
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn product_roundtrip_and_price_update() {
    let store = store().await;
    let product = Product::new(ProductId::new(), "Widget", 10, Rial::new(1000));
    let id = product.id;

    store.insert_product(product).await.unwrap();
    store.set_price(id, Rial::new(1200)).await.unwrap();

    let found = store.find_product(id).await.unwrap().unwrap();
    assert_eq!(found.price, Rial::new(1200));
    assert_eq!(found.stock, 10);
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn conditional_decrement_enforced_in_sql() {
    let store = store().await;
    let product = Product::new(ProductId::new(), "Widget", 5, Rial::new(1000));
    let id = product.id;
    store.insert_product(product).await.unwrap();

    store.decrement_stock(id, 3).await.unwrap();

    let result = store.decrement_stock(id, 3).await;
    assert!(matches!(
        result,
        Err(StoreError::InsufficientStock { available: 2, .. })
    ));

    store.increment_stock(id, 1).await.unwrap();
    assert_eq!(store.find_product(id).await.unwrap().unwrap().stock, 3);
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn cart_document_roundtrip() {
    let store = store().await;
    let owner = UserId::new();
    let mut cart = Cart::new(owner);
    cart.upsert_line(ProductId::new(), 2, Rial::new(500)).unwrap();

    store.upsert(&cart).await.unwrap();
    let found = CartStore::find_by_owner(&store, owner).await.unwrap().unwrap();
    assert_eq!(found, cart);

    CartStore::delete(&store, owner).await.unwrap();
    assert!(CartStore::find_by_owner(&store, owner).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn expired_checkout_reads_as_absent() {
    let store = store().await;
    let expired = sample_checkout(UserId::new(), -5);
    let id = expired.id();

    CheckoutStore::insert(&store, &expired).await.unwrap();
    assert!(CheckoutStore::find_by_id(&store, id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn checkout_authority_lookup() {
    let store = store().await;
    let mut checkout = sample_checkout(UserId::new(), 600);
    checkout.set_authority(Authority::new(format!("A-{}", checkout.id())));
    let authority = checkout.authority().unwrap().clone();

    CheckoutStore::insert(&store, &checkout).await.unwrap();
    let found = CheckoutStore::find_by_authority(&store, &authority)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), checkout.id());

    CheckoutStore::delete(&store, checkout.id()).await.unwrap();
    assert!(
        CheckoutStore::find_by_authority(&store, &authority)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn duplicate_authority_maps_constraint() {
    let store = store().await;
    let owner = UserId::new();
    let checkout = sample_checkout(owner, 600);
    let authority = Authority::new(format!("A-{}", checkout.id()));

    let first = Order::from_checkout(&checkout, authority.clone());
    let second = Order::from_checkout(&checkout, authority);

    OrderStore::insert(&store, &first).await.unwrap();
    let result = OrderStore::insert(&store, &second).await;
    assert!(matches!(result, Err(StoreError::DuplicateAuthority(_))));
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn order_listing_pages_newest_first() {
    let store = store().await;
    let owner = UserId::new();

    for i in 0..3 {
        let checkout = sample_checkout(owner, 600);
        let order = Order::from_checkout(&checkout, Authority::new(format!("A-{}-{i}", owner)));
        OrderStore::insert(&store, &order).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let page = store.list_for_owner(owner, 0, 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(page[0].created_at() >= page[1].created_at());
    assert_eq!(store.count_for_owner(owner).await.unwrap(), 3);
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn user_document_roundtrip() {
    let store = store().await;
    let user = User::new("+989121234567", vec![]);
    let id = user.id;

    store.insert_user(&user).await.unwrap();
    let found = store.find_user(id).await.unwrap().unwrap();
    assert_eq!(found, user);
}
