use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::error::Result;
use crate::extract::AppJson;
use crate::services::import_service::ImportRow;
use crate::AppState;

pub async fn import_students_handler(
    State(state): State<AppState>,
    AppJson(rows): AppJson<Vec<ImportRow>>,
) -> Result<impl IntoResponse> {
    let summary = state.import_service.import_students(rows).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} students added successfully", summary.inserted),
        "inserted": summary.inserted,
    })))
}

pub async fn import_courses_handler(
    State(state): State<AppState>,
    AppJson(rows): AppJson<Vec<ImportRow>>,
) -> Result<impl IntoResponse> {
    let summary = state.import_service.import_courses(rows).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} courses added successfully", summary.inserted),
        "inserted": summary.inserted,
    })))
}
