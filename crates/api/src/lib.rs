//! HTTP API server for the shop backend.
//!
//! Thin glue over the pipeline services: cart management, checkout
//! creation, the payment gateway callback, and order administration,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chrono::Duration;
use metrics_exporter_prometheus::PrometheusHandle;
use pipeline::{CartService, CheckoutService, InMemoryPaymentGateway, OrderService};
use store::{
    InMemoryCartStore, InMemoryCatalogStore, InMemoryCheckoutStore, InMemoryOrderStore,
    InMemoryUserStore,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;

pub type SharedCartService = CartService<InMemoryCartStore, InMemoryCatalogStore>;
pub type SharedCheckoutService = CheckoutService<
    InMemoryCartStore,
    InMemoryCatalogStore,
    InMemoryCheckoutStore,
    InMemoryUserStore,
    InMemoryPaymentGateway,
>;
pub type SharedOrderService = OrderService<
    InMemoryCheckoutStore,
    InMemoryOrderStore,
    InMemoryCartStore,
    InMemoryCatalogStore,
    InMemoryUserStore,
    InMemoryPaymentGateway,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub cart_service: SharedCartService,
    pub checkout_service: SharedCheckoutService,
    pub order_service: SharedOrderService,
    pub catalog: InMemoryCatalogStore,
    pub users: InMemoryUserStore,
    pub gateway: InMemoryPaymentGateway,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart/{user_id}", get(routes::cart::get))
        .route("/cart/{user_id}/items", post(routes::cart::add_item))
        .route(
            "/cart/{user_id}/items/{product_id}",
            axum::routing::patch(routes::cart::update_item).delete(routes::cart::remove_item),
        )
        .route("/checkout/{user_id}", post(routes::checkout::create))
        .route("/payment/callback", get(routes::orders::callback))
        .route("/orders/{user_id}", get(routes::orders::list))
        .route(
            "/orders/by-id/{order_id}",
            get(routes::orders::get).patch(routes::orders::update),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over shared in-memory stores
/// and the in-memory payment gateway.
pub fn create_default_state(config: &Config) -> Arc<AppState> {
    let carts = InMemoryCartStore::new();
    let catalog = InMemoryCatalogStore::new();
    let checkouts = InMemoryCheckoutStore::new();
    let orders = InMemoryOrderStore::new();
    let users = InMemoryUserStore::new();
    let gateway = InMemoryPaymentGateway::new();

    let cart_service = CartService::new(carts.clone(), catalog.clone());
    let checkout_service = CheckoutService::new(
        carts.clone(),
        catalog.clone(),
        checkouts.clone(),
        users.clone(),
        gateway.clone(),
    )
    .with_ttl(Duration::seconds(config.checkout_ttl_secs));
    let order_service = OrderService::new(
        checkouts,
        orders,
        carts,
        catalog.clone(),
        users.clone(),
        gateway.clone(),
    );

    Arc::new(AppState {
        cart_service,
        checkout_service,
        order_service,
        catalog,
        users,
        gateway,
    })
}
