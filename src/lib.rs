pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::product::Product;
use crate::health::DependencyChecker;
use crate::services::CheckoutService;

#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub product: Product,
    /// Absolute URL the hosted checkout redirects the shopper back to.
    pub return_url: String,
    pub health_checkers: Vec<Arc<dyn DependencyChecker>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(checkout: CheckoutService, return_url: String) -> Self {
        Self {
            checkout,
            product: Product::premium_widget(),
            return_url,
            health_checkers: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn with_health_checker(mut self, checker: Arc<dyn DependencyChecker>) -> Self {
        self.health_checkers.push(checker);
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "Single-product storefront backed by a hosted payment checkout"
    ),
    paths(
        handlers::health,
        handlers::product::get_product,
        handlers::sessions::create_session,
        handlers::confirmation::confirm_order,
        handlers::failure::order_failed,
        handlers::orders::get_order,
    ),
    components(schemas(
        health::HealthResponse,
        health::DependencyStatus,
        handlers::product::Product,
        handlers::sessions::SessionResponse,
        handlers::confirmation::ConfirmationResponse,
        handlers::failure::FailureResponse,
        handlers::orders::OrderView,
    )),
    tags(
        (name = "Storefront", description = "Product, checkout and payment result pages"),
        (name = "Orders", description = "Order lookup"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/product", get(handlers::product::get_product))
        .route("/api/sessions", post(handlers::sessions::create_session))
        .route(
            "/order/confirmation",
            get(handlers::confirmation::confirm_order),
        )
        .route("/order/failed", get(handlers::failure::order_failed))
        .route("/orders/:reference", get(handlers::orders::get_order))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(
            middleware::request_logger_middleware,
        ))
        .layer(CorsLayer::permissive())
}
