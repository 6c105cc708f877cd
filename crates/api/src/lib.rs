//! HTTP API server with observability for the storefront backend.
//!
//! Provides REST endpoints for carts, orders, products and gateway
//! payments, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use services::{
    CartService, CatalogService, InventoryReconciler, OrderService, PaymentGateway, PaymentService,
    VnpayConfig, VnpayGateway,
};
use store::{Cache, Store};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::JwtKeys;
use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub carts: CartService<S>,
    pub catalog: CatalogService<S>,
    pub orders: OrderService<S>,
    pub payments: PaymentService<S>,
    pub jwt: JwtKeys,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::products::list::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", put(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::delete::<S>))
        .route("/carts", get(routes::carts::get::<S>))
        .route("/carts", delete(routes::carts::clear::<S>))
        .route("/carts/items", post(routes::carts::add_item::<S>))
        .route("/carts/items/{product_id}", put(routes::carts::update_item::<S>))
        .route("/carts/items/{product_id}", delete(routes::carts::remove_item::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", patch(routes::orders::set_status::<S>))
        .route(
            "/vnpay/create-payment",
            post(routes::payments::create_payment::<S>),
        )
        .route("/vnpay/return", get(routes::payments::handle_return::<S>))
        .route("/vnpay/status/{txn_ref}", get(routes::payments::status::<S>))
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

/// Creates the application state over an explicitly constructed store,
/// cache and payment gateway.
pub fn create_state<S: Store + 'static>(
    store: Arc<S>,
    cache: Arc<dyn Cache>,
    gateway: Arc<dyn PaymentGateway>,
    config: &Config,
) -> Arc<AppState<S>> {
    let reconciler = InventoryReconciler::new(store.clone(), cache.clone());

    Arc::new(AppState {
        carts: CartService::new(store.clone(), cache.clone()),
        catalog: CatalogService::new(store.clone(), cache),
        orders: OrderService::new(store.clone(), reconciler.clone()),
        payments: PaymentService::new(
            store,
            gateway,
            reconciler,
            config.payment_failure_policy,
            config.frontend_url.clone(),
        ),
        jwt: JwtKeys::from_secret(&config.jwt_secret),
    })
}

/// Builds the VNPay gateway from configuration.
pub fn vnpay_gateway(config: &Config) -> Arc<dyn PaymentGateway> {
    Arc::new(VnpayGateway::new(VnpayConfig {
        tmn_code: config.vnp_tmn_code.clone(),
        secure_secret: config.vnp_secure_secret.clone(),
        host: config.vnp_host.clone(),
    }))
}
