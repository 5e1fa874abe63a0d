use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::user::{CreateUserRequest, UserOut},
    services::UserService,
    utils::validate::ValidatedJson,
};

/// Registers a new user.
///
/// Hashes the password before storing it.
/// Returns 201 Created and the user object (excluding password).
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserOut),
        (status = 409, description = "Conflict"),
        (status = 422, description = "Invalid request")
    )
)]
pub async fn create_user(
    State(users): State<UserService>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = users.create(&payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(UserOut::from(user))))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "OK", body = UserOut),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(users): State<UserService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = users.get(id).await?;
    Ok(Json(UserOut::from(user)))
}
