//! In-memory backend with the same constraints as the relational schema.
//!
//! Used by the test suites and for running without a database.
//! Note: Data is lost on process restart.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{OwnedWrite, PostStore, StoreError, UserStore, VoteStore};
use crate::models::{
    post::{Post, PostDraft, PostFilter, PostOut},
    user::{NewUser, User, UserOut},
};

#[derive(Debug, Clone)]
struct PostRecord {
    id: i64,
    title: String,
    content: String,
    published: bool,
    created_at: DateTime<Utc>,
    owner_id: i64,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, PostRecord>,
    /// (post_id, user_id)
    votes: BTreeSet<(i64, i64)>,
    last_user_id: i64,
    last_post_id: i64,
}

impl Tables {
    fn owner_of(&self, record: &PostRecord) -> Result<UserOut, StoreError> {
        self.users
            .get(&record.owner_id)
            .cloned()
            .map(UserOut::from)
            .ok_or_else(|| {
                StoreError::Backend(format!("post {} references missing user", record.id))
            })
    }

    fn to_post(&self, record: &PostRecord) -> Result<Post, StoreError> {
        Ok(Post {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            published: record.published,
            created_at: record.created_at,
            owner_id: record.owner_id,
            owner: self.owner_of(record)?,
        })
    }

    fn vote_count(&self, post_id: i64) -> i64 {
        self.votes.range((post_id, i64::MIN)..=(post_id, i64::MAX)).count() as i64
    }

    fn to_post_out(&self, record: &PostRecord) -> Result<PostOut, StoreError> {
        Ok(PostOut {
            post: self.to_post(record)?,
            votes: self.vote_count(record.id),
        })
    }

    fn check_owner(&self, id: i64, owner_id: i64) -> Option<OwnedWrite<()>> {
        match self.posts.get(&id) {
            None => Some(OwnedWrite::Missing),
            Some(record) if record.owner_id != owner_id => Some(OwnedWrite::NotOwner),
            Some(_) => None,
        }
    }
}

/// Process-local tables behind an async RwLock; each call takes the lock
/// once, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate key value violates unique constraint on users.email: {}",
                user.email
            )));
        }

        tables.last_user_id += 1;
        let created = User {
            id: tables.last_user_id,
            email: user.email,
            password: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostOut>, StoreError> {
        let tables = self.tables.read().await;
        let skip = usize::try_from(filter.skip).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);

        tables
            .posts
            .values()
            .filter(|record| record.title.contains(filter.search.as_str()))
            .skip(skip)
            .take(limit)
            .map(|record| tables.to_post_out(record))
            .collect()
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostOut>, StoreError> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&id)
            .map(|record| tables.to_post_out(record))
            .transpose()
    }

    async fn find_post_owner(&self, id: i64) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).map(|record| record.owner_id))
    }

    async fn insert_post(&self, owner_id: i64, draft: &PostDraft) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&owner_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "user {owner_id} does not exist"
            )));
        }

        tables.last_post_id += 1;
        let record = PostRecord {
            id: tables.last_post_id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            published: draft.published,
            created_at: Utc::now(),
            owner_id,
        };
        let post = tables.to_post(&record)?;
        tables.posts.insert(record.id, record);
        Ok(post)
    }

    async fn update_post(
        &self,
        id: i64,
        owner_id: i64,
        draft: &PostDraft,
    ) -> Result<OwnedWrite<Post>, StoreError> {
        let mut tables = self.tables.write().await;

        match tables.check_owner(id, owner_id) {
            Some(OwnedWrite::Missing) => return Ok(OwnedWrite::Missing),
            Some(_) => return Ok(OwnedWrite::NotOwner),
            None => {}
        }

        let record = match tables.posts.get_mut(&id) {
            Some(record) => {
                record.title = draft.title.clone();
                record.content = draft.content.clone();
                record.published = draft.published;
                record.clone()
            }
            None => return Ok(OwnedWrite::Missing),
        };

        tables.to_post(&record).map(OwnedWrite::Applied)
    }

    async fn delete_post(&self, id: i64, owner_id: i64) -> Result<OwnedWrite<()>, StoreError> {
        let mut tables = self.tables.write().await;

        if let Some(outcome) = tables.check_owner(id, owner_id) {
            return Ok(outcome);
        }

        tables.posts.remove(&id);
        tables.votes.retain(|(post_id, _)| *post_id != id);
        Ok(OwnedWrite::Applied(()))
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn insert_vote(&self, post_id: i64, user_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        if !tables.posts.contains_key(&post_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "post {post_id} does not exist"
            )));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "user {user_id} does not exist"
            )));
        }
        if !tables.votes.insert((post_id, user_id)) {
            return Err(StoreError::UniqueViolation(format!(
                "vote ({post_id}, {user_id}) already exists"
            )));
        }
        Ok(())
    }

    async fn delete_vote(&self, post_id: i64, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.votes.remove(&(post_id, user_id)))
    }
}
