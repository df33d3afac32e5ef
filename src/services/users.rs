use std::sync::Arc;

use chrono::Utc;

use crate::auth::{AuthenticatedUser, PasswordHasher};
use crate::error::AppError;
use crate::models::{ChangePasswordRequest, UpdateProfileRequest, User, UserResponse};
use crate::repository::UserRepository;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    async fn load(&self, user: &AuthenticatedUser) -> Result<User, AppError> {
        self.users
            .find_by_id(user.id())
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    pub async fn profile(&self, user: &AuthenticatedUser) -> Result<UserResponse, AppError> {
        Ok(self.load(user).await?.into())
    }

    pub async fn update_profile(
        &self,
        user: &AuthenticatedUser,
        input: UpdateProfileRequest,
    ) -> Result<UserResponse, AppError> {
        let mut stored = self.load(user).await?;
        if let Some(email) = input.email {
            stored.email = email;
        }
        if let Some(avatar_url) = input.avatar_url {
            stored.avatar_url = Some(avatar_url);
        }
        stored.updated_at = Utc::now();

        Ok(self.users.update(&stored).await?.into())
    }

    /// A wrong current password is a validation failure, not an authentication one:
    /// the caller already holds a valid token.
    pub async fn change_password(
        &self,
        user: &AuthenticatedUser,
        input: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let mut stored = self.load(user).await?;

        let valid = self
            .hasher
            .verify_blocking(input.old_password, stored.password_hash.clone())
            .await?;
        if !valid {
            return Err(AppError::Validation("old password is incorrect".into()));
        }

        stored.password_hash = self.hasher.hash_blocking(input.new_password).await?;
        stored.updated_at = Utc::now();
        self.users.update(&stored).await?;

        log::info!("user {} changed password", stored.id);
        Ok(())
    }
}
