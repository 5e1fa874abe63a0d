// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    models::user::{LoginRequest, TokenResponse},
    services::UserService,
    utils::{jwt::TokenService, validate::ValidatedJson},
};

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a token carrying the user's ID.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "OK", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Invalid request")
    )
)]
pub async fn login(
    State(users): State<UserService>,
    State(tokens): State<Arc<dyn TokenService>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = users.authenticate(&payload.email, &payload.password).await?;
    let token = tokens.issue(user.id)?;

    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(TokenResponse::bearer(token)))
}
