use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::user::UserOut;

/// A post together with its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner: UserOut,
}

/// A post with its upvote count, computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PostOut {
    #[serde(flatten)]
    pub post: Post,
    pub votes: i64,
}

/// Validated title/content/published triple used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub published: bool,
}

fn default_published() -> bool {
    true
}

/// Postgres text columns cannot hold NUL, so it is rejected up front for
/// every backend alike.
fn no_nul(value: &str) -> Result<(), validator::ValidationError> {
    if value.contains('\0') {
        return Err(validator::ValidationError::new("nul_byte")
            .with_message("must not contain NUL characters".into()));
    }
    Ok(())
}

/// DTO for creating or replacing a post.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PostRequest {
    #[validate(
        length(min = 1, message = "Title must not be empty"),
        custom(function = no_nul)
    )]
    pub title: String,

    #[validate(
        length(min = 1, message = "Content must not be empty"),
        custom(function = no_nul)
    )]
    pub content: String,

    #[serde(default = "default_published")]
    pub published: bool,
}

impl From<PostRequest> for PostDraft {
    fn from(request: PostRequest) -> Self {
        Self {
            title: request.title,
            content: request.content,
            published: request.published,
        }
    }
}

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListParams {
    /// Page size (default: 10).
    #[validate(range(min = 0, message = "limit must not be negative"))]
    pub limit: Option<i64>,

    /// Number of posts to skip (default: 0).
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub skip: Option<i64>,

    /// Case-sensitive substring the title must contain.
    #[validate(custom(function = no_nul))]
    pub search: Option<String>,
}

/// Resolved listing filter handed to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub limit: i64,
    pub skip: i64,
    pub search: String,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            limit: 10,
            skip: 0,
            search: String::new(),
        }
    }
}

impl From<PostListParams> for PostFilter {
    fn from(params: PostListParams) -> Self {
        let defaults = PostFilter::default();
        Self {
            limit: params.limit.unwrap_or(defaults.limit),
            skip: params.skip.unwrap_or(defaults.skip),
            search: params.search.unwrap_or(defaults.search),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_defaults_to_true() {
        let request: PostRequest =
            serde_json::from_str(r#"{"title":"Hello","content":"World"}"#).unwrap();
        assert!(request.published);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn empty_title_is_rejected() {
        let request: PostRequest =
            serde_json::from_str(r#"{"title":"","content":"World"}"#).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn nul_characters_are_rejected() {
        let request: PostRequest =
            serde_json::from_str(r#"{"title":"Hel\u0000lo","content":"World"}"#).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let params = PostListParams {
            search: Some("a\0b".into()),
            ..Default::default()
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("search"));

        let plain = PostListParams {
            search: Some("Hel".into()),
            ..Default::default()
        };
        assert!(plain.validate().is_ok());
    }

    #[test]
    fn list_params_fall_back_to_defaults() {
        let filter = PostFilter::from(PostListParams {
            limit: None,
            skip: Some(5),
            search: None,
        });
        assert_eq!(filter.limit, 10);
        assert_eq!(filter.skip, 5);
        assert_eq!(filter.search, "");
    }

    #[test]
    fn post_out_flattens_post_fields() {
        let owner = UserOut {
            id: 1,
            email: "a@x.com".into(),
            created_at: Utc::now(),
        };
        let out = PostOut {
            post: Post {
                id: 7,
                title: "Hello".into(),
                content: "World".into(),
                published: true,
                created_at: Utc::now(),
                owner_id: 1,
                owner,
            },
            votes: 3,
        };

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["owner"]["email"], "a@x.com");
        assert_eq!(json["votes"], 3);
    }
}
