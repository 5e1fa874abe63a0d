use std::sync::Arc;

use crate::{
    error::AppError,
    models::user::{NewUser, User},
    storage::{StoreError, UserStore},
    utils::hash::CredentialService,
};

/// Registration, lookup and password authentication.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    credentials: Arc<dyn CredentialService>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, credentials: Arc<dyn CredentialService>) -> Self {
        Self { store, credentials }
    }

    /// Hashes the password and persists the user. Fails with Conflict when
    /// the email is already registered.
    pub async fn create(&self, email: &str, password: &str) -> Result<User, AppError> {
        let password_hash = self.credentials.hash(password)?;

        let user = self
            .store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    AppError::Conflict(format!("User with email: {email} already exists"))
                }
                other => other.into(),
            })?;

        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User, AppError> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id: {id} does not exist")))
    }

    /// Resolves an email/password pair to its user.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let invalid = || AppError::AuthError("Invalid credentials".to_string());

        let user = self.store.find_user_by_email(email).await?.ok_or_else(invalid)?;

        if !self.credentials.verify(password, &user.password)? {
            tracing::debug!(user_id = user.id, "password mismatch");
            return Err(invalid());
        }

        Ok(user)
    }
}
