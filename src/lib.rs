pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use database::Database;
use services::StockService;

/// Shared by every handler. Built once per process.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub stock: StockService,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let stock = StockService::new(db.clone(), config.movement_types);
        Self {
            db,
            config: Arc::new(config),
            stock,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Public routes (no authentication required)
        .route("/api/health", get(handlers::health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))

        // Protected routes (authentication required)
        .route("/api/auth/me", get(handlers::auth::me))

        // Products
        .route(
            "/api/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/api/products/barcode/:barcode",
            get(handlers::products::get_product_by_barcode),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/api/products/:id/ledger", get(handlers::products::product_ledger))
        .route("/api/products/:id/reconcile", post(handlers::products::reconcile_product))

        // Movements
        .route(
            "/api/movements",
            get(handlers::movements::list_movements).post(handlers::movements::create_movement),
        )
        .route(
            "/api/movements/:product_id",
            get(handlers::movements::list_product_movements),
        )

        .route("/api/generate-barcode/:format", get(handlers::barcode::generate_barcode))
        .route("/api/dashboard", get(handlers::dashboard))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
