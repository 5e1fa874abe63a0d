use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Whether a vote is being added or withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Remove,
    Add,
}

impl TryFrom<i16> for VoteDirection {
    type Error = i16;

    fn try_from(dir: i16) -> Result<Self, Self::Error> {
        match dir {
            0 => Ok(VoteDirection::Remove),
            1 => Ok(VoteDirection::Add),
            other => Err(other),
        }
    }
}

/// DTO for casting or removing a vote.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VoteRequest {
    pub post_id: i64,

    /// 1 adds an upvote, 0 removes it.
    #[validate(range(min = 0, max = 1, message = "dir must be 0 or 1"))]
    pub dir: i16,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    pub message: String,
}
