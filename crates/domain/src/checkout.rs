//! Immutable, time-bounded checkout snapshots.

use chrono::{DateTime, Duration, Utc};
use common::{AddressId, CheckoutId, UserId};
use serde::{Deserialize, Serialize};

use crate::item::LineItem;
use crate::money::Rial;

/// Hard ceiling on a single checkout's total price.
pub const CHECKOUT_TOTAL_CEILING: Rial = Rial::new(2_000_000_000);

/// How long a checkout stays payable before it expires.
pub const DEFAULT_CHECKOUT_TTL_SECS: i64 = 600;

/// Opaque token issued by the payment gateway for one authorization
/// attempt. Doubles as the idempotency key for order creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Authority {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Authority {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A frozen snapshot of a cart, created to initiate payment.
///
/// Lines and prices never change after construction. The authority is
/// absent until the gateway responds to the authorization request.
/// Checkouts past `expires_at` are treated as gone by the stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    id: CheckoutId,
    owner: UserId,
    lines: Vec<LineItem>,
    shipping_address: AddressId,
    authority: Option<Authority>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Checkout {
    /// Freezes the given lines into a new checkout with the given TTL.
    pub fn new(
        owner: UserId,
        lines: Vec<LineItem>,
        shipping_address: AddressId,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CheckoutId::new(),
            owner,
            lines,
            shipping_address,
            authority: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn id(&self) -> CheckoutId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn shipping_address(&self) -> AddressId {
        self.shipping_address
    }

    pub fn authority(&self) -> Option<&Authority> {
        self.authority.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the frozen total (sum of line totals).
    pub fn total_price(&self) -> Rial {
        self.lines.iter().map(LineItem::total_price).sum()
    }

    /// Returns true if the checkout is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Records the authority returned by the gateway.
    pub fn set_authority(&mut self, authority: Authority) {
        self.authority = Some(authority);
    }
}
