//! The cart-to-order pipeline.
//!
//! Three services cover the purchase flow:
//! 1. [`CartService`] mutates carts and reconciles cached prices
//!    against the catalog.
//! 2. [`CheckoutService`] freezes a cart into a time-bounded snapshot
//!    and opens the payment with the gateway.
//! 3. [`OrderService`] verifies the gateway callback and materializes
//!    the order exactly once, taking stock through the conditional
//!    decrement and compensating on failure.

pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod order;

pub use cart::{CartService, reconcile_prices};
pub use checkout::{CheckoutService, CreatedCheckout};
pub use error::{PipelineError, StockShortfall};
pub use gateway::{
    AuthorizeRequest, Authorization, CODE_ALREADY_VERIFIED, CODE_VERIFIED, GatewayError,
    InMemoryPaymentGateway, PaymentGateway, Verification,
};
pub use order::{OrderPage, OrderService, VerifiedOrder};
