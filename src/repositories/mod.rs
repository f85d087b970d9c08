pub mod course_repository;
pub mod notification_repository;
pub mod user_repository;

pub use course_repository::{CourseRepository, SqliteCourseRepository};
pub use notification_repository::{NotificationRepository, SqliteNotificationRepository};
pub use user_repository::{SqliteUserRepository, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Record already exists")]
    AlreadyExists,
}

impl RepositoryError {
    /// Classifies a failed write, turning unique-constraint violations into
    /// `AlreadyExists`.
    pub fn from_write(err: sqlx::Error) -> Self {
        let is_unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if is_unique {
            RepositoryError::AlreadyExists
        } else {
            RepositoryError::Database(err)
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// A batch insert that was rolled back. `row` is the zero-based position of
/// the row that failed, or `None` when the transaction itself failed.
#[derive(Debug, thiserror::Error)]
#[error("Batch insert failed: {error}")]
pub struct BatchFailure {
    pub row: Option<usize>,
    pub error: RepositoryError,
}

impl BatchFailure {
    pub fn at(row: usize, error: RepositoryError) -> Self {
        Self {
            row: Some(row),
            error,
        }
    }
}

impl From<sqlx::Error> for BatchFailure {
    fn from(err: sqlx::Error) -> Self {
        BatchFailure {
            row: None,
            error: RepositoryError::Database(err),
        }
    }
}

/// Escapes `LIKE` wildcards so user input is matched literally.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
