use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    services::{PostService, UserService, VoteService},
    storage::{PostStore, UserStore, VoteStore},
    utils::{hash::CredentialService, jwt::TokenService},
};

/// Everything a handler can reach, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub users: UserService,
    pub votes: VoteService,
    pub tokens: Arc<dyn TokenService>,
}

impl AppState {
    /// Wires the services over a backend that implements every store.
    pub fn new<S>(
        store: Arc<S>,
        tokens: Arc<dyn TokenService>,
        credentials: Arc<dyn CredentialService>,
    ) -> Self
    where
        S: UserStore + PostStore + VoteStore + 'static,
    {
        let posts: Arc<dyn PostStore> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();
        let votes: Arc<dyn VoteStore> = store;

        Self {
            posts: PostService::new(posts.clone()),
            users: UserService::new(users, credentials),
            votes: VoteService::new(votes, posts),
            tokens,
        }
    }
}

impl FromRef<AppState> for PostService {
    fn from_ref(state: &AppState) -> Self {
        state.posts.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for VoteService {
    fn from_ref(state: &AppState) -> Self {
        state.votes.clone()
    }
}

impl FromRef<AppState> for Arc<dyn TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
