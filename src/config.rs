use std::{env, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Who a request acts as when it carries no credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Every protected endpoint needs a valid bearer token.
    Required,
    /// Requests without an `Authorization` header act as the system user.
    Legacy,
}

/// How movement type tags outside `entry`/`exit` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementTypePolicy {
    /// Unknown tags are a validation failure.
    Strict,
    /// Unknown tags are applied as exits.
    Legacy,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub auth_mode: AuthMode,
    pub movement_types: MovementTypePolicy,
    pub low_stock_display_limit: usize,
}

impl Config {
    /// Reads configuration from the process environment. `.env` is expected to
    /// have been loaded by the caller.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let auth_mode = match optional("AUTH_MODE").as_deref() {
            None | Some("required") => AuthMode::Required,
            Some("legacy") => AuthMode::Legacy,
            Some(other) => return Err(invalid("AUTH_MODE", other)),
        };

        let movement_types = match optional("MOVEMENT_TYPES").as_deref() {
            None | Some("strict") => MovementTypePolicy::Strict,
            Some("legacy") => MovementTypePolicy::Legacy,
            Some(other) => return Err(invalid("MOVEMENT_TYPES", other)),
        };

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 8001)?,
            jwt_secret,
            token_ttl_hours: parsed("TOKEN_TTL_HOURS", 24)?,
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            auth_mode,
            movement_types,
            low_stock_display_limit: parsed("LOW_STOCK_DISPLAY_LIMIT", 5)?,
        })
    }

    /// Defaults for everything but the token secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".to_string(),
            port: 8001,
            jwt_secret: jwt_secret.into(),
            token_ttl_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            auth_mode: AuthMode::Required,
            movement_types: MovementTypePolicy::Strict,
            low_stock_display_limit: 5,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(name, &raw)),
        None => Ok(default),
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}
