use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::auth::middleware::SessionUser;
use crate::error::Result;
use crate::extract::{AppMultipart, AppPath};
use crate::handlers::forms::{read_account_form, submit_account_form};
use crate::models::user::Role;
use crate::AppState;

// Students

pub async fn list_students_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let students = state.account_service.list_students().await?;
    Ok(Json(json!({ "success": true, "students": students })))
}

pub async fn get_student_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let student = state.account_service.get_student(id).await?;
    Ok(Json(json!({ "success": true, "student": student })))
}

pub async fn add_student_handler(
    State(state): State<AppState>,
    AppMultipart(multipart): AppMultipart,
) -> Result<impl IntoResponse> {
    let form = read_account_form(multipart).await?;
    let user = submit_account_form(&state.uploads, form, |request| {
        state.account_service.create_account(Role::Student, request)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Student added successfully",
            "userId": user.id,
        })),
    ))
}

pub async fn edit_student_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppMultipart(multipart): AppMultipart,
) -> Result<impl IntoResponse> {
    let form = read_account_form(multipart).await?;
    submit_account_form(&state.uploads, form, |request| {
        state.account_service.update_account(Role::Student, id, request)
    })
    .await?;

    Ok(Json(json!({ "success": true, "message": "Student updated successfully" })))
}

pub async fn delete_student_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    state.account_service.delete_account(Role::Student, id).await?;
    Ok(Json(json!({ "success": true, "message": "Student deleted successfully" })))
}

// Admins

pub async fn list_admins_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let admins = state.account_service.list_admins().await?;
    Ok(Json(json!({ "success": true, "admins": admins })))
}

pub async fn get_admin_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let admin = state.account_service.get_admin(id).await?;
    Ok(Json(json!({ "success": true, "admin": admin })))
}

pub async fn add_admin_handler(
    State(state): State<AppState>,
    AppMultipart(multipart): AppMultipart,
) -> Result<impl IntoResponse> {
    let form = read_account_form(multipart).await?;
    let user = submit_account_form(&state.uploads, form, |request| {
        state.account_service.create_account(Role::Admin, request)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Admin added successfully",
            "userId": user.id,
        })),
    ))
}

pub async fn edit_admin_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppMultipart(multipart): AppMultipart,
) -> Result<impl IntoResponse> {
    let form = read_account_form(multipart).await?;
    submit_account_form(&state.uploads, form, |request| {
        state.account_service.update_account(Role::Admin, id, request)
    })
    .await?;

    Ok(Json(json!({ "success": true, "message": "Admin updated successfully" })))
}

pub async fn delete_admin_handler(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    state.account_service.delete_account(Role::Admin, id).await?;
    Ok(Json(json!({ "success": true, "message": "Admin deleted successfully" })))
}

// Own profiles

pub async fn admin_profile_handler(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<impl IntoResponse> {
    let admin = state.account_service.get_admin(user.user_id).await?;
    Ok(Json(json!({ "success": true, "admin": admin })))
}

pub async fn student_profile_handler(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<impl IntoResponse> {
    let student = state.account_service.get_student(user.user_id).await?;
    Ok(Json(json!({ "success": true, "student": student })))
}
