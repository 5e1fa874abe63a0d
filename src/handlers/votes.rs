use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    models::vote::{VoteDirection, VoteRequest, VoteResponse},
    services::VoteService,
    utils::{jwt::CurrentUser, validate::ValidatedJson},
};

/// Add (`dir: 1`) or remove (`dir: 0`) the caller's vote on a post.
#[utoipa::path(
    post,
    path = "/vote",
    tag = "Vote",
    request_body = VoteRequest,
    responses(
        (status = 201, description = "Created", body = VoteResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Conflict"),
        (status = 422, description = "Invalid request")
    ),
    security(("bearer" = []))
)]
pub async fn vote(
    user: CurrentUser,
    State(votes): State<VoteService>,
    ValidatedJson(payload): ValidatedJson<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let direction = VoteDirection::try_from(payload.dir)
        .map_err(|dir| AppError::Validation(format!("dir: {dir} is not 0 or 1")))?;

    votes.cast(payload.post_id, user.id, direction).await?;

    let message = match direction {
        VoteDirection::Add => "Successfully added vote",
        VoteDirection::Remove => "Successfully deleted vote",
    };
    Ok((
        StatusCode::CREATED,
        Json(VoteResponse {
            message: message.to_string(),
        }),
    ))
}
