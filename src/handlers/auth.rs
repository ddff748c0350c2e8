use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    database::{from_document, to_document, Collection, Database, Filter},
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{now, LoginRequest, RegisterRequest, TokenResponse, User, UserResponse},
    utils::{create_token, hash_password, verify_password},
    AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

fn validate_registration(form: &RegisterRequest) -> AppResult<()> {
    if form.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    let email = form.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    validate_registration(&form)?;

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_lowercase();

    let taken = |field: &str, value: &str| Filter::all().eq(field, value);
    if state.db.count(Collection::Users, &taken("username", &username)).await? > 0 {
        return Err(AppError::Conflict("Username already registered".to_string()));
    }
    if state.db.count(Collection::Users, &taken("email", &email)).await? > 0 {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&form.password, state.config.bcrypt_cost)?;

    let user = User {
        id: Uuid::new_v4(),
        username,
        email,
        full_name: form.full_name.trim().to_string(),
        password_hash,
        is_active: true,
        created_at: now(),
        last_login: None,
    };
    state.db.insert_one(Collection::Users, to_document(&user)?).await?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let mut user = authenticate_user(&state.db, form.username.trim(), &form.password).await?;

    let token = create_token(
        user.id,
        user.username.clone(),
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {}", e)))?;

    // Update last login
    user.last_login = Some(now());
    if let Err(e) = state
        .db
        .replace_one(Collection::Users, &Filter::by_id(user.id), to_document(&user)?)
        .await
    {
        log::warn!("Could not record last login for {}: {}", user.username, e);
    }

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        expires_in: state.config.token_ttl_hours * 3600,
        user: UserResponse::from(user),
    }))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

async fn authenticate_user(db: &Database, username: &str, password: &str) -> AppResult<User> {
    let rejected = || AppError::Unauthorized("Invalid username or password".to_string());

    let Some(doc) = db
        .find_one(Collection::Users, &Filter::all().eq("username", username))
        .await?
    else {
        log::warn!("Login attempt for unknown user {:?}", username);
        return Err(rejected());
    };
    let user: User = from_document(doc)?;

    if !verify_password(password, &user.password_hash).unwrap_or(false) {
        log::warn!("Wrong password for user {:?}", username);
        return Err(rejected());
    }
    if !user.is_active {
        log::warn!("Login attempt for disabled user {:?}", username);
        return Err(AppError::Unauthorized("Account is disabled".to_string()));
    }
    Ok(user)
}
