use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::repositories::RepositoryError;
use crate::services::{
    account_service::AccountServiceError, auth_service::AuthServiceError,
    course_service::CourseServiceError, email_service::EmailError, import_service::ImportError,
    notification_service::NotificationError, upload_store::UploadError,
};

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced to HTTP clients.
///
/// Every variant maps onto one entry of the portal's error taxonomy and is
/// rendered as a `{ "success": false, "message": ... }` envelope. Internal
/// causes are logged but never echoed back to the client.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => AppError::Database(e),
            RepositoryError::NotFound => AppError::NotFound("Record not found".to_string()),
            RepositoryError::AlreadyExists => {
                AppError::Validation("Record already exists".to_string())
            }
        }
    }
}

impl From<AuthServiceError> for AppError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::InvalidCredentials => AppError::InvalidCredentials,
            AuthServiceError::MissingRoleRecord(_) => AppError::Internal(err.to_string()),
            AuthServiceError::RepositoryError(e) => e.into(),
        }
    }
}

impl From<AccountServiceError> for AppError {
    fn from(err: AccountServiceError) -> Self {
        match err {
            AccountServiceError::StudentNotFound => AppError::NotFound("Student not found".into()),
            AccountServiceError::AdminNotFound => AppError::NotFound("Admin not found".into()),
            AccountServiceError::UserNotFound => AppError::NotFound("User not found".into()),
            AccountServiceError::AdminSignupDisabled => AppError::Forbidden,
            AccountServiceError::HashingError(msg) => AppError::Internal(msg),
            AccountServiceError::RepositoryError(e) => e.into(),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<CourseServiceError> for AppError {
    fn from(err: CourseServiceError) -> Self {
        match err {
            CourseServiceError::CourseNotFound => AppError::NotFound(err.to_string()),
            CourseServiceError::RepositoryError(e) => e.into(),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::HashingError(msg) => AppError::Internal(msg),
            ImportError::RepositoryError(RepositoryError::Database(e)) => AppError::Database(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::RecipientNotFound
            | NotificationError::ProfileNotFound
            | NotificationError::NotificationNotFound => AppError::NotFound(err.to_string()),
            NotificationError::DeliveryFailed(_) | NotificationError::Email(_) => {
                AppError::Internal(err.to_string())
            }
            NotificationError::RepositoryError(e) => e.into(),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidFileType => AppError::Validation(err.to_string()),
            UploadError::Io(e) => AppError::Internal(format!("Upload storage failed: {}", e)),
        }
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(format!("Malformed form data: {}", err.body_text()))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::Internal(format!("Session error: {}", err))
    }
}
