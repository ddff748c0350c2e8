mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;
use stockroom::database::{Collection, Filter};

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new();

    let (status, user) = app.register("lucia", "s3cret-pass").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "lucia");
    assert!(user.get("password_hash").is_none());

    let (status, login) = app.login("lucia", "s3cret-pass").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["token_type"], "bearer");
    assert_eq!(login["expires_in"], 24 * 3600);
    let token = login["access_token"].as_str().unwrap();

    let (status, me) = app.get("/api/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "lucia");
    assert_eq!(me["email"], "lucia@example.com");
    assert!(me["last_login"].is_string());
}

#[tokio::test]
async fn duplicate_username_or_email_conflicts() {
    let app = TestApp::new();
    assert_eq!(app.register("pablo", "s3cret-pass").await.0, StatusCode::CREATED);

    let (status, _) = app.register("pablo", "other-pass").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": "pablo2",
                "email": "PABLO@example.com",
                "password": "s3cret-pass",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_registration_is_a_validation_failure() {
    let app = TestApp::new();
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({ "username": "x", "email": "nope", "password": "s3cret-pass" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_unauthorized() {
    let app = TestApp::new();
    app.register("rosa", "s3cret-pass").await;

    assert_eq!(app.login("rosa", "wrong-pass").await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("nadie", "s3cret-pass").await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_account_is_locked_out() {
    let app = TestApp::new();
    let token = app.token_for("tomas").await;

    let filter = Filter::all().eq("username", "tomas");
    let mut doc = app.db.find_one(Collection::Users, &filter).await.unwrap().unwrap();
    doc.insert("is_active".to_string(), json!(false));
    app.db.replace_one(Collection::Users, &filter, doc).await.unwrap();

    assert_eq!(app.get("/api/auth/me", &token).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("tomas", "s3cret-pass").await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let app = TestApp::new();

    let (status, _) = app.request(Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/dashboard", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/products", json!({ "name": "Arena" }), "not-a-jwt")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.db.count(Collection::Products, &Filter::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn token_from_another_secret_is_rejected() {
    let other = TestApp::with_config(|config| config.jwt_secret = "other-secret".to_string());
    let foreign = other.token_for("eva").await;

    let app = TestApp::new();
    app.register("eva", "s3cret-pass").await;
    assert_eq!(app.get("/api/auth/me", &foreign).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn legacy_mode_lets_anonymous_requests_act_as_system() {
    let app = TestApp::legacy();

    let (status, product) = app
        .request(
            Method::POST,
            "/api/products",
            Some(json!({ "name": "Varilla", "stock_pieces": 10 })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(product["created_by"].is_null());

    let (status, movement) = app
        .request(
            Method::POST,
            "/api/movements",
            Some(json!({
                "product_id": product["id"],
                "movement_type": "exit",
                "quantity_pieces": 3,
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movement["user"], "Sistema");
    assert!(movement["user_id"].is_null());

    // A credential that is present must still be valid.
    let (status, _) = app.get("/api/products", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
