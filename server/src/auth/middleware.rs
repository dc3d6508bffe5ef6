//! Authentication middleware.
//!
//! Bearer token extraction. When `AUTH_SECRET` is configured every request
//! must carry it as `Authorization: Bearer <secret>`; otherwise requests are
//! accepted anonymously.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Authenticated caller extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    /// Presented the configured secret
    Token,
    /// No secret configured and none presented
    Anonymous,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        authorize(auth_header, state.config.auth_secret.as_deref())
    }
}

fn authorize(auth_header: Option<&str>, secret: Option<&str>) -> Result<AuthUser, AppError> {
    match auth_header {
        Some(header) => {
            let Some(token) = header.strip_prefix("Bearer ") else {
                return Err(AppError::Unauthorized("Invalid authorization header format"));
            };
            if token.is_empty() {
                return Err(AppError::Unauthorized("Empty bearer token"));
            }
            match secret {
                Some(secret) if token != secret => Err(AppError::Unauthorized("Invalid token")),
                _ => Ok(AuthUser::Token),
            }
        }
        None if secret.is_none() => Ok(AuthUser::Anonymous),
        None => Err(AppError::Unauthorized("Missing authorization header")),
    }
}
