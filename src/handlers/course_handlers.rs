use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::middleware::SessionUser;
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::models::user::Level;
use crate::services::course_service::CourseRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub course_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LevelQuery {
    pub level: Option<String>,
}

pub async fn list_courses_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let courses = state.course_service.list().await?;
    Ok(Json(json!({ "success": true, "courses": courses })))
}

pub async fn create_course_handler(
    State(state): State<AppState>,
    AppJson(request): AppJson<CourseRequest>,
) -> Result<impl IntoResponse> {
    let course = state.course_service.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Course added successfully",
            "course": course,
        })),
    ))
}

pub async fn search_courses_handler(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<impl IntoResponse> {
    let courses = state
        .course_service
        .search(query.course_name.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "success": true, "courses": courses })))
}

pub async fn get_course_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let course = state.course_service.get(id).await?;
    Ok(Json(json!({ "success": true, "course": course })))
}

pub async fn update_course_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<CourseRequest>,
) -> Result<impl IntoResponse> {
    let course = state.course_service.update(id, request).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Course updated successfully",
        "course": course,
    })))
}

pub async fn delete_course_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    state.course_service.delete(id).await?;
    Ok(Json(json!({ "success": true, "message": "Course deleted successfully" })))
}

/// Courses for the signed-in student. Without `?level=` the level stored in
/// the session is used.
pub async fn student_courses_handler(
    State(state): State<AppState>,
    user: SessionUser,
    AppQuery(query): AppQuery<LevelQuery>,
) -> Result<impl IntoResponse> {
    let requested = query
        .level
        .as_deref()
        .map(str::trim)
        .filter(|level| !level.is_empty());

    let level = match requested {
        Some(level) => level
            .parse::<Level>()
            .map_err(|_| AppError::Validation("Level must be between 1 and 4".to_string()))?,
        None => user
            .level
            .ok_or_else(|| AppError::Validation("Level is required".to_string()))?,
    };

    let courses = state.course_service.list_by_level(level).await?;
    Ok(Json(json!({ "success": true, "level": level, "courses": courses })))
}

pub async fn student_course_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let course = state.course_service.get(id).await?;
    Ok(Json(json!({ "success": true, "course": course })))
}
