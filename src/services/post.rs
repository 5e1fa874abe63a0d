use std::sync::Arc;

use crate::{
    error::AppError,
    models::post::{Post, PostDraft, PostFilter, PostOut},
    storage::{OwnedWrite, PostStore, StoreError},
};

/// CRUD over posts. Anyone may read; only the owner may write.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("post with id: {id} was not found"))
}

fn not_owner() -> AppError {
    AppError::Forbidden("Not authorized to perform requested action".to_string())
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &PostFilter) -> Result<Vec<PostOut>, AppError> {
        Ok(self.store.list_posts(filter).await?)
    }

    pub async fn get(&self, id: i64) -> Result<PostOut, AppError> {
        self.store.find_post(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, owner_id: i64, draft: &PostDraft) -> Result<Post, AppError> {
        let post = self
            .store
            .insert_post(owner_id, draft)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation(_) => {
                    AppError::NotFound(format!("user with id: {owner_id} does not exist"))
                }
                other => other.into(),
            })?;

        tracing::info!(post_id = post.id, owner_id, "post created");
        Ok(post)
    }

    /// Fails with NotFound or Forbidden unless `owner_id` owns the post.
    ///
    /// Lets a handler reject a non-owner before looking at the request body.
    pub async fn ensure_owner(&self, id: i64, owner_id: i64) -> Result<(), AppError> {
        match self.store.find_post_owner(id).await? {
            None => Err(not_found(id)),
            Some(owner) if owner != owner_id => Err(not_owner()),
            Some(_) => Ok(()),
        }
    }

    pub async fn update(&self, id: i64, owner_id: i64, draft: &PostDraft) -> Result<Post, AppError> {
        match self.store.update_post(id, owner_id, draft).await? {
            OwnedWrite::Applied(post) => {
                tracing::info!(post_id = id, owner_id, "post updated");
                Ok(post)
            }
            OwnedWrite::Missing => Err(not_found(id)),
            OwnedWrite::NotOwner => Err(not_owner()),
        }
    }

    pub async fn delete(&self, id: i64, owner_id: i64) -> Result<(), AppError> {
        match self.store.delete_post(id, owner_id).await? {
            OwnedWrite::Applied(()) => {
                tracing::info!(post_id = id, owner_id, "post deleted");
                Ok(())
            }
            OwnedWrite::Missing => Err(not_found(id)),
            OwnedWrite::NotOwner => Err(not_owner()),
        }
    }
}
