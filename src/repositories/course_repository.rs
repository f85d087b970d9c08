use crate::models::course::{Course, CourseInput};
use crate::models::user::Level;
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use super::{like_pattern, BatchFailure, RepositoryError, RepositoryResult};

const COURSE_COLUMNS: &str = "SELECT id, name, code, description, credit, level FROM courses";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, input: CourseInput) -> RepositoryResult<Course>;
    /// Inserts every course in one transaction; nothing is kept on failure.
    async fn create_batch(&self, inputs: Vec<CourseInput>) -> Result<usize, BatchFailure>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Course>>;
    async fn list(&self) -> RepositoryResult<Vec<Course>>;
    async fn list_by_level(&self, level: Level) -> RepositoryResult<Vec<Course>>;
    async fn search_by_name(&self, fragment: &str) -> RepositoryResult<Vec<Course>>;
    async fn update(&self, id: i64, input: CourseInput) -> RepositoryResult<Course>;
    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}

pub struct SqliteCourseRepository {
    pool: SqlitePool,
}

impl SqliteCourseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn insert_course(conn: &mut SqliteConnection, input: &CourseInput) -> RepositoryResult<i64> {
    let result = sqlx::query(
        "INSERT INTO courses (name, code, description, credit, level) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.name)
    .bind(&input.code)
    .bind(&input.description)
    .bind(input.credit)
    .bind(input.level.as_i64())
    .execute(&mut *conn)
    .await
    .map_err(RepositoryError::from_write)?;

    Ok(result.last_insert_rowid())
}

#[async_trait]
impl CourseRepository for SqliteCourseRepository {
    async fn create(&self, input: CourseInput) -> RepositoryResult<Course> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_course(&mut *conn, &input).await?;
        drop(conn);

        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn create_batch(&self, inputs: Vec<CourseInput>) -> Result<usize, BatchFailure> {
        let mut tx = self.pool.begin().await?;

        for (row, input) in inputs.iter().enumerate() {
            if let Err(error) = insert_course(&mut *tx, input).await {
                return Err(BatchFailure::at(row, error));
            }
        }

        tx.commit().await?;
        Ok(inputs.len())
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!("{COURSE_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(course)
    }

    async fn list(&self) -> RepositoryResult<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(&format!("{COURSE_COLUMNS} ORDER BY level, code"))
            .fetch_all(&self.pool)
            .await?;
        Ok(courses)
    }

    async fn list_by_level(&self, level: Level) -> RepositoryResult<Vec<Course>> {
        let courses =
            sqlx::query_as::<_, Course>(&format!("{COURSE_COLUMNS} WHERE level = ? ORDER BY code"))
                .bind(level.as_i64())
                .fetch_all(&self.pool)
                .await?;
        Ok(courses)
    }

    async fn search_by_name(&self, fragment: &str) -> RepositoryResult<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(&format!(
            "{COURSE_COLUMNS} WHERE name LIKE ? ESCAPE '\\' ORDER BY name"
        ))
        .bind(like_pattern(fragment))
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn update(&self, id: i64, input: CourseInput) -> RepositoryResult<Course> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET name = ?, code = ?, description = ?, credit = ?, level = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.credit)
        .bind(input.level.as_i64())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
