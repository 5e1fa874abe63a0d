// src/utils/jwt.rs

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Issues bearer tokens for users and resolves them back to user ids.
pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: i64) -> Result<String, AppError>;

    /// Fails with `AppError::AuthError` for malformed, forged or expired tokens.
    fn resolve(&self, token: &str) -> Result<i64, AppError>;
}

/// HS256 tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtTokens {
    secret: String,
    expiration_seconds: u64,
}

impl JwtTokens {
    pub fn new(secret: impl Into<String>, expiration_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            expiration_seconds,
        }
    }
}

impl TokenService for JwtTokens {
    fn issue(&self, user_id: i64) -> Result<String, AppError> {
        sign_jwt(user_id, &self.secret, self.expiration_seconds)
    }

    fn resolve(&self, token: &str) -> Result<i64, AppError> {
        let claims = verify_jwt(token, &self.secret)?;
        claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Could not validate credentials".to_string()))
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(id: i64, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs();
    let expiration = now
        .checked_add(expiration_seconds)
        .and_then(|exp| usize::try_from(exp).ok())
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "token expiration overflows: {expiration_seconds}s"
            ))
        })?;

    let claims = Claims {
        sub: id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Could not validate credentials".to_string()))?;

    Ok(token_data.claims)
}

/// The caller identified by a valid `Authorization: Bearer <token>` header.
///
/// Taking this as a handler argument makes the route require authentication;
/// the request is rejected with 401 before the handler body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<dyn TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.trim(),
            None => return Err(AppError::AuthError("Not authenticated".to_string())),
        };

        let tokens = Arc::<dyn TokenService>::from_ref(state);
        let id = tokens.resolve(token)?;

        Ok(Self { id })
    }
}
