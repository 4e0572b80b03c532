//! Storage error types.

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A conditional stock decrement found fewer units than requested.
    #[error("Insufficient stock for {product_id}: {available} available")]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
    },

    /// An order already exists for this payment authority.
    #[error("An order already exists for authority {0}")]
    DuplicateAuthority(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
