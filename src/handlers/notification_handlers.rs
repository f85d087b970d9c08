use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::middleware::SessionUser;
use crate::error::Result;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::services::notification_service::{DispatchRequest, MessageRequest};
use crate::AppState;

const DEFAULT_SENT_LIMIT: i64 = 100;
const MAX_SENT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct SentQuery {
    pub limit: Option<i64>,
}

pub async fn send_message_handler(
    State(state): State<AppState>,
    user: SessionUser,
    AppJson(request): AppJson<DispatchRequest>,
) -> Result<impl IntoResponse> {
    let report = state
        .notification_service
        .dispatch_from_admin(user.user_id, request)
        .await?;

    let message = if report.is_complete() {
        "Message sent successfully".to_string()
    } else {
        format!(
            "Message sent to {} of {} students",
            report.delivered, report.recipients
        )
    };

    Ok(Json(json!({
        "success": report.is_complete(),
        "message": message,
        "recipients": report.recipients,
        "delivered": report.delivered,
        "failed": report.failed,
    })))
}

pub async fn sent_notifications_handler(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SentQuery>,
) -> Result<impl IntoResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SENT_LIMIT)
        .clamp(1, MAX_SENT_LIMIT);
    let notifications = state.notification_service.sent_log(limit).await?;
    Ok(Json(json!({ "success": true, "notifications": notifications })))
}

pub async fn student_send_message_handler(
    State(state): State<AppState>,
    user: SessionUser,
    AppJson(request): AppJson<MessageRequest>,
) -> Result<impl IntoResponse> {
    state
        .notification_service
        .message_admin(user.user_id, request)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Message sent successfully" })))
}

pub async fn receive_notifications_handler(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<impl IntoResponse> {
    let notifications = state.notification_service.inbox(user.user_id).await?;
    Ok(Json(json!({ "success": true, "notifications": notifications })))
}

pub async fn mark_notification_read_handler(
    State(state): State<AppState>,
    user: SessionUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    state
        .notification_service
        .mark_read(user.user_id, id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Notification marked as read" })))
}
