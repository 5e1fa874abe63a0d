use axum::Json;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    handlers::{auth, posts, users, votes},
    models::{
        post::{Post, PostOut, PostRequest},
        user::{CreateUserRequest, LoginRequest, TokenResponse, UserOut},
        vote::{VoteRequest, VoteResponse},
    },
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        posts::list_posts,
        posts::get_post,
        posts::create_post,
        posts::update_post,
        posts::delete_post,
        users::create_user,
        users::get_user,
        auth::login,
        votes::vote,
    ),
    components(schemas(
        Post,
        PostOut,
        PostRequest,
        UserOut,
        CreateUserRequest,
        LoginRequest,
        TokenResponse,
        VoteRequest,
        VoteResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Posts"),
        (name = "Users"),
        (name = "Authentication"),
        (name = "Vote")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
