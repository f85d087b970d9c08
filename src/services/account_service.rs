use crate::models::user::{
    AccountChanges, AdminProfile, Level, NewAccount, Role, StudentProfile, User,
};
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::password::{hash_password, HashingError};
use crate::services::upload_store::UploadStore;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 8 characters")]
    WeakPassword,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Student not found")]
    StudentNotFound,
    #[error("Admin not found")]
    AdminNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Admin signup is disabled")]
    AdminSignupDisabled,
    #[error("Password hashing failed: {0}")]
    HashingError(String),
    #[error("Repository error: {0}")]
    RepositoryError(RepositoryError),
}

impl From<RepositoryError> for AccountServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::AlreadyExists => AccountServiceError::EmailTaken,
            other => AccountServiceError::RepositoryError(other),
        }
    }
}

impl From<HashingError> for AccountServiceError {
    fn from(err: HashingError) -> Self {
        AccountServiceError::HashingError(err.0)
    }
}

/// Profile fields submitted when creating or editing a student or admin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_num: Option<String>,
    pub email: String,
    pub password: Option<String>,
    pub gender: Option<String>,
    pub level: Option<Level>,
    pub image: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 255 && EMAIL_PATTERN.is_match(email)
}

pub fn validate_password(password: &str) -> Result<(), AccountServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountServiceError::WeakPassword);
    }
    Ok(())
}

fn not_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn role_not_found(role: Role) -> AccountServiceError {
    match role {
        Role::Student => AccountServiceError::StudentNotFound,
        Role::Admin => AccountServiceError::AdminNotFound,
    }
}

/// Validated, normalized form of an `AccountRequest`.
struct CleanAccount {
    first_name: String,
    last_name: String,
    phone_num: Option<String>,
    email: String,
    password: Option<String>,
    gender: Option<String>,
    level: Option<Level>,
}

fn clean(role: Role, request: AccountRequest) -> Result<CleanAccount, AccountServiceError> {
    let first_name = request.first_name.trim().to_string();
    if first_name.is_empty() {
        return Err(AccountServiceError::MissingField("First name"));
    }
    let last_name = request.last_name.trim().to_string();
    if last_name.is_empty() {
        return Err(AccountServiceError::MissingField("Last name"));
    }

    let email = normalize_email(&request.email);
    if email.is_empty() {
        return Err(AccountServiceError::MissingField("Email"));
    }
    if !is_valid_email(&email) {
        return Err(AccountServiceError::InvalidEmail);
    }

    let password = request.password.filter(|p| !p.is_empty());
    if let Some(ref password) = password {
        validate_password(password)?;
    }

    let level = match role {
        Role::Student => Some(request.level.ok_or(AccountServiceError::MissingField("Level"))?),
        Role::Admin => None,
    };

    Ok(CleanAccount {
        first_name,
        last_name,
        phone_num: not_blank(request.phone_num),
        email,
        password,
        gender: not_blank(request.gender),
        level,
    })
}

pub struct AccountService {
    repository: Arc<dyn UserRepository>,
    uploads: Arc<UploadStore>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn UserRepository>, uploads: Arc<UploadStore>) -> Self {
        Self {
            repository,
            uploads,
        }
    }

    /// Self-service registration. Admin accounts are only accepted when the
    /// deployment allows it.
    pub async fn signup(
        &self,
        role: Role,
        request: AccountRequest,
        allow_admin: bool,
    ) -> Result<User, AccountServiceError> {
        if role == Role::Admin && !allow_admin {
            return Err(AccountServiceError::AdminSignupDisabled);
        }
        self.create_account(role, request).await
    }

    pub async fn create_account(
        &self,
        role: Role,
        request: AccountRequest,
    ) -> Result<User, AccountServiceError> {
        let image = request.image.clone();
        let account = clean(role, request)?;
        let password = account
            .password
            .ok_or(AccountServiceError::MissingField("Password"))?;
        let password_hash = hash_password(&password)?;

        let user = self
            .repository
            .create_account(NewAccount {
                first_name: account.first_name,
                last_name: account.last_name,
                phone_num: account.phone_num,
                email: account.email,
                password_hash,
                gender: account.gender,
                role,
                level: account.level,
                image,
            })
            .await?;

        tracing::info!("Created {} account {} ({})", role, user.id, user.email);
        Ok(user)
    }

    /// Updates profile fields. The password is only rotated when one is
    /// supplied and the image only when a new upload is attached.
    pub async fn update_account(
        &self,
        role: Role,
        user_id: i64,
        request: AccountRequest,
    ) -> Result<(), AccountServiceError> {
        let new_image = request.image.clone();
        let account = clean(role, request)?;

        let previous_image = match self.repository.find_by_id(user_id).await? {
            Some(user) if user.role == role => user.image,
            _ => return Err(role_not_found(role)),
        };

        let password_hash = match account.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        self.repository
            .update_account(
                user_id,
                role,
                AccountChanges {
                    first_name: account.first_name,
                    last_name: account.last_name,
                    phone_num: account.phone_num,
                    email: account.email,
                    gender: account.gender,
                    level: account.level,
                    password_hash,
                    image: new_image.clone(),
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => role_not_found(role),
                other => other.into(),
            })?;

        if let (Some(_), Some(old)) = (new_image, previous_image) {
            self.uploads.remove(&old).await;
        }

        Ok(())
    }

    pub async fn delete_account(&self, role: Role, user_id: i64) -> Result<(), AccountServiceError> {
        let removed = self
            .repository
            .delete_account(user_id, role)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => role_not_found(role),
                other => other.into(),
            })?;

        if let Some(image) = removed.image {
            self.uploads.remove(&image).await;
        }

        tracing::info!("Deleted {} account {} ({})", role, removed.id, removed.email);
        Ok(())
    }

    pub async fn list_students(&self) -> Result<Vec<StudentProfile>, AccountServiceError> {
        Ok(self.repository.list_students().await?)
    }

    pub async fn get_student(&self, user_id: i64) -> Result<StudentProfile, AccountServiceError> {
        self.repository
            .find_student(user_id)
            .await?
            .ok_or(AccountServiceError::StudentNotFound)
    }

    pub async fn list_admins(&self) -> Result<Vec<AdminProfile>, AccountServiceError> {
        Ok(self.repository.list_admins().await?)
    }

    pub async fn get_admin(&self, user_id: i64) -> Result<AdminProfile, AccountServiceError> {
        self.repository
            .find_admin(user_id)
            .await?
            .ok_or(AccountServiceError::AdminNotFound)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccountServiceError> {
        Ok(self.repository.find_by_email(&normalize_email(email)).await?)
    }

    pub async fn set_password(&self, user_id: i64, password: &str) -> Result<(), AccountServiceError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.repository
            .update_password(user_id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AccountServiceError::UserNotFound,
                other => other.into(),
            })
    }
}
