//! PostgreSQL-backed store implementations.
//!
//! Records are kept document-style: the full serialized record in a
//! `doc` JSONB column, with the columns the queries key on (owner,
//! authority, expiry) extracted beside it. Stock lives in a plain
//! integer column so the conditional decrement can happen in SQL.

use async_trait::async_trait;
use chrono::Utc;
use common::{CheckoutId, OrderId, ProductId, UserId};
use domain::{Authority, Cart, Checkout, Order, Product, Rial, User};
use sqlx::{PgPool, Row};

use crate::error::{Result, StoreError};
use crate::store::{CartStore, CatalogStore, CheckoutStore, OrderStore, UserStore};

/// One handle implementing every store trait over a shared pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT name, stock, price FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            Product::new(
                id,
                row.get::<String, _>("name"),
                row.get::<i32, _>("stock") as u32,
                Rial::new(row.get::<i64, _>("price")),
            )
        }))
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, stock, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, stock = EXCLUDED.stock, price = EXCLUDED.price
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.stock as i32)
        .bind(product.price.amount())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_price(&self, id: ProductId, price: Rial) -> Result<()> {
        let result = sqlx::query("UPDATE products SET price = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(price.amount())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        // The WHERE clause makes the decrement conditional and atomic;
        // a concurrent decrement can never push stock negative.
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(id.as_uuid())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Distinguish a missing product from insufficient stock.
        let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            Some(stock) => Err(StoreError::InsufficientStock {
                product_id: id,
                available: stock as u32,
            }),
            None => Err(StoreError::ProductNotFound(id)),
        }
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(quantity as i32)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_by_owner(&self, owner: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT doc FROM carts WHERE owner = $1")
            .bind(owner.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Ok(serde_json::from_value(row.get("doc"))?))
            .transpose()
    }

    async fn upsert(&self, cart: &Cart) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (owner, doc, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner) DO UPDATE
            SET doc = EXCLUDED.doc, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(cart.owner().as_uuid())
        .bind(serde_json::to_value(cart)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, owner: UserId) -> Result<()> {
        sqlx::query("DELETE FROM carts WHERE owner = $1")
            .bind(owner.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CheckoutStore for PostgresStore {
    async fn insert(&self, checkout: &Checkout) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checkouts (id, authority, expires_at, doc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(checkout.id().as_uuid())
        .bind(checkout.authority().map(|a| a.as_str().to_string()))
        .bind(checkout.expires_at())
        .bind(serde_json::to_value(checkout)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, checkout: &Checkout) -> Result<()> {
        sqlx::query("UPDATE checkouts SET authority = $2, doc = $3 WHERE id = $1")
            .bind(checkout.id().as_uuid())
            .bind(checkout.authority().map(|a| a.as_str().to_string()))
            .bind(serde_json::to_value(checkout)?)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: CheckoutId) -> Result<Option<Checkout>> {
        let row = sqlx::query("SELECT doc FROM checkouts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let checkout: Checkout = serde_json::from_value(row.get("doc"))?;

        // Passive expiry: an expired row reads as absent.
        if checkout.is_expired(Utc::now()) {
            tracing::debug!(checkout_id = %checkout.id(), "deleting expired checkout on read");
            CheckoutStore::delete(self, checkout.id()).await?;
            return Ok(None);
        }
        Ok(Some(checkout))
    }

    async fn find_by_authority(&self, authority: &Authority) -> Result<Option<Checkout>> {
        let row = sqlx::query("SELECT doc FROM checkouts WHERE authority = $1")
            .bind(authority.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let checkout: Checkout = serde_json::from_value(row.get("doc"))?;

        if checkout.is_expired(Utc::now()) {
            CheckoutStore::delete(self, checkout.id()).await?;
            return Ok(None);
        }
        Ok(Some(checkout))
    }

    async fn delete(&self, id: CheckoutId) -> Result<()> {
        sqlx::query("DELETE FROM checkouts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM checkouts WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(swept = result.rows_affected(), "swept expired checkouts");
        }
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, owner, authority, created_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.owner().as_uuid())
        .bind(order.authority().as_str())
        .bind(order.created_at())
        .bind(serde_json::to_value(order)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The unique constraint on authority is the exactly-once
            // guarantee; surface it as its own error.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_order_authority")
            {
                return StoreError::DuplicateAuthority(order.authority().as_str().to_string());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Ok(serde_json::from_value(row.get("doc"))?))
            .transpose()
    }

    async fn find_by_authority(&self, authority: &Authority) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT doc FROM orders WHERE authority = $1")
            .bind(authority.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Ok(serde_json::from_value(row.get("doc"))?))
            .transpose()
    }

    async fn list_for_owner(&self, owner: UserId, offset: u64, limit: u64) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM orders
            WHERE owner = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(owner.as_uuid())
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row.get("doc"))?))
            .collect()
    }

    async fn count_for_owner(&self, owner: UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE owner = $1")
            .bind(owner.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn update(&self, order: &Order) -> Result<()> {
        sqlx::query("UPDATE orders SET doc = $2 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(serde_json::to_value(order)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Ok(serde_json::from_value(row.get("doc"))?))
            .transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, doc)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(serde_json::to_value(user)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
