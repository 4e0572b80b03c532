pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;
