//! Shared harness: the full router over an in-memory store.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use stockroom::{
    config::{AuthMode, Config},
    create_router,
    database::{Database, MemoryStore},
    AppState,
};

pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn legacy() -> Self {
        Self::with_config(|config| config.auth_mode = AuthMode::Legacy)
    }

    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), adjust)
    }

    pub fn with_store(db: Database, adjust: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::with_secret("test-secret");
        config.bcrypt_cost = 4;
        adjust(&mut config);

        let router = create_router(AppState::new(db.clone(), config));
        Self { router, db }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, Some(token)).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), Some(token)).await
    }

    pub async fn register(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": password,
                "full_name": username.to_uppercase(),
            })),
            None,
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": username, "password": password })),
            None,
        )
        .await
    }

    /// Registers a fresh user and returns a bearer token for it.
    pub async fn token_for(&self, username: &str) -> String {
        let (status, _) = self.register(username, "s3cret-pass").await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = self.login(username, "s3cret-pass").await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_product(&self, token: &str, body: Value) -> Value {
        let (status, product) = self.post("/api/products", body, token).await;
        assert_eq!(status, StatusCode::OK, "{}", product);
        product
    }

    pub async fn move_stock(
        &self,
        token: &str,
        product_id: &str,
        movement_type: &str,
        pieces: u64,
    ) -> (StatusCode, Value) {
        self.post(
            "/api/movements",
            json!({
                "product_id": product_id,
                "movement_type": movement_type,
                "quantity_pieces": pieces,
                "quantity_pallets": 0,
            }),
            token,
        )
        .await
    }
}
