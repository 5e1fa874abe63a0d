use std::sync::Arc;

use crate::{
    error::AppError,
    models::vote::VoteDirection,
    storage::{PostStore, StoreError, VoteStore},
};

/// Records and withdraws upvotes. A second upvote is rejected rather than
/// toggled; callers withdraw first.
#[derive(Clone)]
pub struct VoteService {
    votes: Arc<dyn VoteStore>,
    posts: Arc<dyn PostStore>,
}

impl VoteService {
    pub fn new(votes: Arc<dyn VoteStore>, posts: Arc<dyn PostStore>) -> Self {
        Self { votes, posts }
    }

    pub async fn cast(
        &self,
        post_id: i64,
        user_id: i64,
        direction: VoteDirection,
    ) -> Result<(), AppError> {
        let missing_post =
            || AppError::NotFound(format!("Post with id: {post_id} does not exist"));

        if self.posts.find_post_owner(post_id).await?.is_none() {
            return Err(missing_post());
        }

        match direction {
            VoteDirection::Add => {
                match self.votes.insert_vote(post_id, user_id).await {
                    Ok(()) => {}
                    Err(StoreError::UniqueViolation(_)) => {
                        return Err(AppError::Conflict(format!(
                            "user {user_id} has already voted on post {post_id}"
                        )));
                    }
                    // Either the post vanished since the check above, or the
                    // token names a user that no longer exists.
                    Err(StoreError::ForeignKeyViolation(_)) => {
                        if self.posts.find_post_owner(post_id).await?.is_none() {
                            return Err(missing_post());
                        }
                        return Err(AppError::NotFound(format!(
                            "User with id: {user_id} does not exist"
                        )));
                    }
                    Err(other) => return Err(other.into()),
                }
                tracing::info!(post_id, user_id, "vote added");
            }
            VoteDirection::Remove => {
                if !self.votes.delete_vote(post_id, user_id).await? {
                    return Err(AppError::NotFound("Vote does not exist".to_string()));
                }
                tracing::info!(post_id, user_id, "vote removed");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{post::PostDraft, user::NewUser},
        storage::{MemoryStore, UserStore},
    };

    async fn setup() -> (VoteService, Arc<MemoryStore>, i64, i64) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                email: "a@x.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let post = store
            .insert_post(
                user.id,
                &PostDraft {
                    title: "Hello".into(),
                    content: "World".into(),
                    published: true,
                },
            )
            .await
            .unwrap();
        let service = VoteService::new(store.clone(), store.clone());
        (service, store, post.id, user.id)
    }

    #[tokio::test]
    async fn upvote_counts_and_double_upvote_conflicts() {
        let (votes, store, post_id, user_id) = setup().await;

        votes.cast(post_id, user_id, VoteDirection::Add).await.unwrap();
        assert_eq!(store.find_post(post_id).await.unwrap().unwrap().votes, 1);

        let again = votes.cast(post_id, user_id, VoteDirection::Add).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(store.find_post(post_id).await.unwrap().unwrap().votes, 1);
    }

    #[tokio::test]
    async fn removing_requires_an_existing_vote() {
        let (votes, store, post_id, user_id) = setup().await;

        let missing = votes.cast(post_id, user_id, VoteDirection::Remove).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        votes.cast(post_id, user_id, VoteDirection::Add).await.unwrap();
        votes.cast(post_id, user_id, VoteDirection::Remove).await.unwrap();
        assert_eq!(store.find_post(post_id).await.unwrap().unwrap().votes, 0);
    }

    #[tokio::test]
    async fn voting_as_a_missing_user_names_the_user() {
        let (votes, _, post_id, _) = setup().await;

        let result = votes.cast(post_id, 99, VoteDirection::Add).await;
        match result {
            Err(AppError::NotFound(msg)) => assert!(msg.starts_with("User with id: 99")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn voting_on_a_missing_post_is_not_found() {
        let (votes, _, _, user_id) = setup().await;
        for direction in [VoteDirection::Add, VoteDirection::Remove] {
            let result = votes.cast(404, user_id, direction).await;
            assert!(matches!(result, Err(AppError::NotFound(_))));
        }
    }
}
