use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    config::{AuthMode, Config},
    database::{from_document, Collection, Database, Filter},
    error::{AppError, AppResult},
    models::{Actor, User},
    utils::verify_token,
    AppState,
};

/// A caller whose bearer token checked out and whose account is active.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The identity a request acts as. A verified user, or the system user when
/// legacy auth mode lets a request through without credentials.
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

/// `Ok(None)` when no `Authorization` header was sent at all.
async fn bearer_token(parts: &mut Parts, state: &AppState) -> AppResult<Option<String>> {
    match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
        Ok(TypedHeader(Authorization(bearer))) => Ok(Some(bearer.token().to_string())),
        Err(rejection) if rejection.is_missing() => Ok(None),
        Err(_) => Err(AppError::Unauthorized(
            "Malformed Authorization header".to_string(),
        )),
    }
}

pub async fn get_current_user(db: &Database, config: &Config, token: &str) -> AppResult<User> {
    let claims = verify_token(token, &config.jwt_secret)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

    let doc = db
        .find_one(Collection::Users, &Filter::by_id(user_id))
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;
    let user: User = from_document(doc)?;

    if !user.is_active {
        return Err(AppError::Unauthorized("Account is disabled".to_string()));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
        let user = get_current_user(&state.db, &state.config, &token).await?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts, state).await? {
            Some(token) => {
                let user = get_current_user(&state.db, &state.config, &token).await?;
                Ok(Caller(Actor::user(user.id, user.username)))
            }
            None => match state.config.auth_mode {
                AuthMode::Legacy => Ok(Caller(Actor::system())),
                AuthMode::Required => Err(AppError::Unauthorized(
                    "Missing bearer token".to_string(),
                )),
            },
        }
    }
}
