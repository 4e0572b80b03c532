//! Shared identifier types used across the shop backend crates.

mod types;

pub use types::{AddressId, CheckoutId, OrderId, ProductId, UserId};
