use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::post::{Post, PostDraft, PostFilter, PostListParams, PostOut, PostRequest},
    services::PostService,
    utils::{
        jwt::CurrentUser,
        validate::{ValidatedJson, ValidatedQuery},
    },
};

/// List posts with their vote counts.
/// Filters by title substring; paginated by `skip`/`limit`.
#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    params(PostListParams),
    responses((status = 200, description = "OK", body = [PostOut]))
)]
pub async fn list_posts(
    State(posts): State<PostService>,
    ValidatedQuery(params): ValidatedQuery<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = PostFilter::from(params);
    Ok(Json(posts.list(&filter).await?))
}

/// Get a single post by ID.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "OK", body = PostOut),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_post(
    State(posts): State<PostService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(posts.get(id).await?))
}

/// Create a new post owned by the caller.
#[utoipa::path(
    post,
    path = "/posts",
    tag = "Posts",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 422, description = "Invalid request")
    ),
    security(("bearer" = []))
)]
pub async fn create_post(
    user: CurrentUser,
    State(posts): State<PostService>,
    ValidatedJson(payload): ValidatedJson<PostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = posts.create(user.id, &PostDraft::from(payload)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Replace a post's title, content and published flag.
/// Requires: Login + Author.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = i64, Path, description = "Post id")),
    request_body = PostRequest,
    responses(
        (status = 200, description = "OK", body = Post),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Caller does not own the post"),
        (status = 404, description = "Not found"),
        (status = 422, description = "Invalid request")
    ),
    security(("bearer" = []))
)]
pub async fn update_post(
    user: CurrentUser,
    State(posts): State<PostService>,
    Path(id): Path<i64>,
    payload: Result<ValidatedJson<PostRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    // Ownership is decided before the body, so a stranger always gets 403.
    posts.ensure_owner(id, user.id).await?;
    let ValidatedJson(payload) = payload?;

    let post = posts.update(id, user.id, &PostDraft::from(payload)).await?;
    Ok(Json(post))
}

/// Delete a post.
/// Requires: Login + Author.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "No Content"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Caller does not own the post"),
        (status = 404, description = "Not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_post(
    user: CurrentUser,
    State(posts): State<PostService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    posts.delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
