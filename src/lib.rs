pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod openapi;
pub mod services;

use std::{sync::Arc, time::Duration};

use axum::{
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub use handlers::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/products/:id/reviews",
            post(handlers::products::create_review),
        )
        .route(
            "/products/:id/stock",
            post(handlers::products::adjust_stock),
        )
        .route(
            "/categories",
            get(handlers::products::list_categories).post(handlers::products::create_category),
        )
        .route("/categories/:id", delete(handlers::products::delete_category))
        .route("/countries", get(handlers::products::list_countries))
        // Orders
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/items", get(handlers::orders::get_order_items))
        // Checkout
        .route(
            "/checkout/sessions",
            post(handlers::checkout::create_checkout_session),
        )
        .route("/checkout/cod", post(handlers::checkout::create_cod_order))
        // Gateway webhook (HMAC-authenticated, no bearer token)
        .route(
            "/payments/webhook",
            post(handlers::payment_webhooks::payment_webhook),
        )
        // Notifications & newsletter
        .route(
            "/emails/order-notifications",
            post(handlers::emails::send_order_notifications),
        )
        .route(
            "/newsletter/subscriptions",
            post(handlers::newsletter::subscribe),
        )
}

/// Full application router: health probes, the v1 API, Swagger UI, and the
/// request tracing/compression layers. CORS is applied by the binary since
/// it is configuration-dependent.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .route("/health", get(handlers::health::health_check))
        .route("/status", get(handlers::health::status_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
