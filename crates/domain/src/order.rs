//! The permanent order record and its status state machine.

use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::checkout::{Authority, Checkout};
use crate::error::OrderError;
use crate::item::LineItem;
use crate::money::Rial;

/// Length of an Iran Post tracking code.
pub const POSTAL_TRACKING_CODE_LEN: usize = 24;

/// Fulfillment status of an order.
///
/// Transitions only move forward:
/// ```text
/// Processing ──► Shipped ──► Delivered
///      │
///      └──► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Payment confirmed, order is being prepared.
    #[default]
    Processing,

    /// Handed to the postal carrier.
    Shipped,

    /// Received by the customer (terminal).
    Delivered,

    /// Administratively canceled (terminal).
    Canceled,
}

impl OrderStatus {
    /// Returns true if the status may advance to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Processing, OrderStatus::Canceled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELED" => Ok(OrderStatus::Canceled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A materialized order.
///
/// Created exactly once per authority by the verification flow; the
/// lines, shipping address, and authority are copied verbatim from the
/// checkout and never change afterwards. Only status and tracking code
/// are mutable, through the checked setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    owner: UserId,
    authority: Authority,
    lines: Vec<LineItem>,
    shipping_address: AddressId,
    post_tracking_code: Option<String>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Materializes an order from a checkout and its verified
    /// authority.
    pub fn from_checkout(checkout: &Checkout, authority: Authority) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            owner: checkout.owner(),
            authority,
            lines: checkout.lines().to_vec(),
            shipping_address: checkout.shipping_address(),
            post_tracking_code: None,
            status: OrderStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn shipping_address(&self) -> AddressId {
        self.shipping_address
    }

    pub fn post_tracking_code(&self) -> Option<&str> {
        self.post_tracking_code.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the sum of line totals.
    pub fn total_price(&self) -> Rial {
        self.lines.iter().map(LineItem::total_price).sum()
    }

    /// Advances the status, rejecting backward or skipping moves.
    pub fn set_status(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the postal tracking code.
    pub fn set_tracking_code(&mut self, code: impl Into<String>) -> Result<(), OrderError> {
        let code = code.into();
        if code.len() != POSTAL_TRACKING_CODE_LEN {
            return Err(OrderError::InvalidTrackingCode {
                expected: POSTAL_TRACKING_CODE_LEN,
                actual: code.len(),
            });
        }
        self.post_tracking_code = Some(code);
        self.updated_at = Utc::now();
        Ok(())
    }
}
