use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use time::OffsetDateTime;
use tower_sessions::{Expiry, Session};

use crate::auth::middleware::{current_user, SessionUser, SESSION_USER_KEY};
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppMultipart};
use crate::handlers::forms::{read_account_form, submit_account_form};
use crate::models::user::Role;
use crate::services::auth_service::LoginRequest;
use crate::AppState;

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let authenticated = state.auth_service.authenticate(request).await?;
    let session_user = SessionUser {
        user_id: authenticated.user.id,
        role: authenticated.user.role,
        level: authenticated.level,
    };

    // New id on every login so a pre-login cookie cannot be reused
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, session_user).await?;
    session.set_expiry(Some(Expiry::AtDateTime(
        OffsetDateTime::now_utc() + state.config.session.ttl,
    )));

    tracing::info!(
        "User {} logged in as {}",
        session_user.user_id,
        session_user.role
    );

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "role": session_user.role,
        "level": session_user.level,
    })))
}

pub async fn signup_handler(
    State(state): State<AppState>,
    AppMultipart(multipart): AppMultipart,
) -> Result<impl IntoResponse> {
    let form = read_account_form(multipart).await?;
    let role = match form.role.as_deref().map(str::trim) {
        None | Some("") => Role::Student,
        Some(role) => role
            .parse::<Role>()
            .map_err(|e| AppError::Validation(e.to_string()))?,
    };

    let allow_admin = state.config.allow_admin_signup;
    let user = submit_account_form(&state.uploads, form, |request| {
        state.account_service.signup(role, request, allow_admin)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Signup successful",
            "userId": user.id,
            "role": user.role,
        })),
    ))
}

pub async fn logout_handler(session: Session) -> Result<impl IntoResponse> {
    if let Some(user) = current_user(&session).await? {
        tracing::info!("User {} logged out", user.user_id);
    }
    session.flush().await?;
    Ok(Json(json!({ "success": true, "message": "Logged out" })))
}

/// 200 for admins, 403 for any other signed-in user.
pub async fn is_admin_handler(user: SessionUser) -> Response {
    if user.role == Role::Admin {
        Json(json!({ "success": true, "isAdmin": true })).into_response()
    } else {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "success": false, "isAdmin": false })),
        )
            .into_response()
    }
}
