//! Domain layer for the shop backend.
//!
//! This crate provides the records the pipeline moves data through:
//! - `Cart` — the mutable, price-cached shopping cart
//! - `Checkout` — an immutable, time-bounded snapshot of a cart
//! - `Order` — the permanent record materialized after payment, with
//!   its monotonic status state machine
//! - `Rial` money and `LineItem` value objects shared by all three

pub mod cart;
pub mod checkout;
pub mod error;
pub mod item;
pub mod money;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, MAX_LINE_QUANTITY};
pub use checkout::{Authority, CHECKOUT_TOTAL_CEILING, Checkout, DEFAULT_CHECKOUT_TTL_SECS};
pub use error::{CartError, OrderError};
pub use item::LineItem;
pub use money::Rial;
pub use order::{Order, OrderStatus, POSTAL_TRACKING_CODE_LEN};
pub use product::{MAX_PRODUCT_STOCK, Product};
pub use user::{Address, User};
