//! Storage ports for users, posts and votes.
//!
//! Each backend implements all three traits; services only see the traits.

use std::fmt;

use async_trait::async_trait;

use crate::models::{
    post::{Post, PostDraft, PostFilter, PostOut},
    user::{NewUser, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    UniqueViolation(String),
    /// A referenced row does not exist.
    ForeignKeyViolation(String),
    /// Connection loss, malformed rows, anything else.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueViolation(msg) => write!(f, "unique constraint violated: {msg}"),
            StoreError::ForeignKeyViolation(msg) => {
                write!(f, "foreign key constraint violated: {msg}")
            }
            StoreError::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Outcome of a write that is only allowed for the post's owner.
///
/// The ownership check and the write happen atomically inside the store.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedWrite<T> {
    Applied(T),
    Missing,
    NotOwner,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Posts whose title contains `filter.search`, in insertion order,
    /// each with its vote count.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostOut>, StoreError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostOut>, StoreError>;

    async fn find_post_owner(&self, id: i64) -> Result<Option<i64>, StoreError>;

    async fn insert_post(&self, owner_id: i64, draft: &PostDraft) -> Result<Post, StoreError>;

    async fn update_post(
        &self,
        id: i64,
        owner_id: i64,
        draft: &PostDraft,
    ) -> Result<OwnedWrite<Post>, StoreError>;

    async fn delete_post(&self, id: i64, owner_id: i64) -> Result<OwnedWrite<()>, StoreError>;
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Fails with `UniqueViolation` when the user already voted on the post.
    async fn insert_vote(&self, post_id: i64, user_id: i64) -> Result<(), StoreError>;

    /// Returns whether a vote row was removed.
    async fn delete_vote(&self, post_id: i64, user_id: i64) -> Result<bool, StoreError>;
}
