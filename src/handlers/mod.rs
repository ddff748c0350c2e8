pub mod auth;
pub mod barcode;
pub mod dashboard;
pub mod movements;
pub mod products;

use axum::response::Json;
use serde_json::{json, Value};

pub use dashboard::dashboard;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "Inventory Management API" }))
}
