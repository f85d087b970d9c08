use crate::models::user::{Level, Role, User};
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::account_service::normalize_email;
use crate::services::password::verify_password;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Student {0} has no student record")]
    MissingRoleRecord(i64),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user whose credentials checked out, with the level students carry in
/// their session.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub level: Option<Level>,
}

pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    pub async fn authenticate(
        &self,
        request: LoginRequest,
    ) -> Result<AuthenticatedUser, AuthServiceError> {
        let user = self
            .user_repository
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash) {
            return Err(AuthServiceError::InvalidCredentials);
        }

        let level = match user.role {
            Role::Student => Some(
                self.user_repository
                    .find_student_level(user.id)
                    .await?
                    .ok_or(AuthServiceError::MissingRoleRecord(user.id))?,
            ),
            Role::Admin => None,
        };

        Ok(AuthenticatedUser { user, level })
    }
}
