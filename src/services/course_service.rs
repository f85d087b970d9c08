use crate::models::course::{Course, CourseInput};
use crate::models::user::Level;
use crate::repositories::{CourseRepository, RepositoryError};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CourseServiceError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Level must be between 1 and 4")]
    InvalidLevel,
    #[error("Credit cannot be negative")]
    InvalidCredit,
    #[error("Course code already exists")]
    DuplicateCode,
    #[error("Course not found")]
    CourseNotFound,
    #[error("Repository error: {0}")]
    RepositoryError(RepositoryError),
}

impl From<RepositoryError> for CourseServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::AlreadyExists => CourseServiceError::DuplicateCode,
            RepositoryError::NotFound => CourseServiceError::CourseNotFound,
            other => CourseServiceError::RepositoryError(other),
        }
    }
}

/// JSON body for creating or replacing a course.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub credit: Option<i64>,
    #[serde(default)]
    pub level: Option<i64>,
}

impl CourseRequest {
    pub fn validate(self) -> Result<CourseInput, CourseServiceError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CourseServiceError::MissingField("Course name"));
        }
        let code = self.code.trim().to_string();
        if code.is_empty() {
            return Err(CourseServiceError::MissingField("Course code"));
        }

        let credit = self.credit.unwrap_or(0);
        if credit < 0 {
            return Err(CourseServiceError::InvalidCredit);
        }

        let level = self
            .level
            .ok_or(CourseServiceError::MissingField("Level"))
            .and_then(|value| {
                Level::try_from(value).map_err(|_| CourseServiceError::InvalidLevel)
            })?;

        Ok(CourseInput {
            name,
            code,
            description: self.description.unwrap_or_default().trim().to_string(),
            credit,
            level,
        })
    }
}

pub struct CourseService {
    repository: Arc<dyn CourseRepository>,
}

impl CourseService {
    pub fn new(repository: Arc<dyn CourseRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, request: CourseRequest) -> Result<Course, CourseServiceError> {
        let input = request.validate()?;
        let course = self.repository.create(input).await?;
        tracing::info!("Created course {} ({})", course.id, course.code);
        Ok(course)
    }

    pub async fn get(&self, id: i64) -> Result<Course, CourseServiceError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(CourseServiceError::CourseNotFound)
    }

    pub async fn list(&self) -> Result<Vec<Course>, CourseServiceError> {
        Ok(self.repository.list().await?)
    }

    pub async fn list_by_level(&self, level: Level) -> Result<Vec<Course>, CourseServiceError> {
        Ok(self.repository.list_by_level(level).await?)
    }

    /// Case-insensitive substring match on the course name.
    pub async fn search(&self, fragment: &str) -> Result<Vec<Course>, CourseServiceError> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return self.list().await;
        }
        Ok(self.repository.search_by_name(fragment).await?)
    }

    pub async fn update(
        &self,
        id: i64,
        request: CourseRequest,
    ) -> Result<Course, CourseServiceError> {
        let input = request.validate()?;
        let course = self.repository.update(id, input).await?;
        tracing::info!("Updated course {} ({})", course.id, course.code);
        Ok(course)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CourseServiceError> {
        self.repository.delete(id).await?;
        tracing::info!("Deleted course {}", id);
        Ok(())
    }
}
