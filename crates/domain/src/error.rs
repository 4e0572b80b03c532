//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by cart line-item operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity is zero or otherwise out of range.
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})")]
    InvalidQuantity { quantity: u32, max: u32 },

    /// Merging or setting a line would exceed the per-line ceiling.
    #[error("Quantity {quantity} exceeds maximum limit of {max} per line")]
    QuantityAboveLimit { quantity: u32, max: u32 },

    /// The cart has no line for the given product.
    #[error("Item not found in cart: {0}")]
    LineNotFound(ProductId),
}

/// Errors raised by order record operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Status may only advance forward.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Postal tracking codes have a fixed length.
    #[error("Invalid tracking code: expected {expected} characters, got {actual}")]
    InvalidTrackingCode { expected: usize, actual: usize },
}
