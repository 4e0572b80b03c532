//! Pipeline error taxonomy.

use common::ProductId;
use domain::{Authority, CartError, OrderError};
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// One cart or checkout line that cannot be covered by current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub name: String,
    pub requested: u32,
    pub available: u32,
}

/// Errors surfaced by the cart, checkout, and order services.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request itself is malformed (quantity out of range, unknown
    /// shipping address, total over the ceiling).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// One or more lines exceed available stock. Carries every
    /// offending line, not just the first.
    #[error("Insufficient stock for {} item(s)", .0.len())]
    InsufficientStock(Vec<StockShortfall>),

    /// The operation is valid but not in the record's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An order for this payment authority already exists.
    #[error("An order already exists for authority {0}")]
    AlreadyProcessed(Authority),

    /// The gateway refused to confirm the payment.
    #[error("Payment rejected by gateway (code {code})")]
    PaymentRejected { code: i32 },

    /// The gateway could not be reached or answered garbage.
    #[error("Payment gateway error: {0}")]
    Upstream(#[from] GatewayError),

    /// Storage failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<CartError> for PipelineError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::LineNotFound(_) => PipelineError::NotFound("cart item"),
            other => PipelineError::InvalidInput(other.to_string()),
        }
    }
}

impl From<OrderError> for PipelineError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidStatusTransition { .. } => {
                PipelineError::InvalidState(e.to_string())
            }
            OrderError::InvalidTrackingCode { .. } => PipelineError::InvalidInput(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
