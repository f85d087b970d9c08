use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::user::{Level, Role};

pub const SESSION_USER_KEY: &str = "user";

/// What a login stores in the session: who the user is, their role and,
/// for students, their level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub role: Role,
    pub level: Option<Level>,
}

pub async fn current_user(session: &Session) -> Result<Option<SessionUser>, AppError> {
    Ok(session.get::<SessionUser>(SESSION_USER_KEY).await?)
}

/// The single access policy: a session is required, and its role must match.
pub fn authorize(user: Option<&SessionUser>, required: Role) -> Result<&SessionUser, AppError> {
    match user {
        None => Err(AppError::Unauthorized),
        Some(user) if user.role != required => Err(AppError::Forbidden),
        Some(user) => Ok(user),
    }
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        current_user(&session).await?.ok_or(AppError::Unauthorized)
    }
}

pub async fn require_auth(session: Session, request: Request, next: Next) -> Response {
    match current_user(&session).await {
        Ok(Some(_)) => next.run(request).await,
        Ok(None) => AppError::Unauthorized.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Route layer gate, parameterized by the role the routes require:
/// `middleware::from_fn_with_state(Role::Admin, require_role)`.
pub async fn require_role(
    State(required): State<Role>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let user = match current_user(&session).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    match authorize(user.as_ref(), required) {
        Ok(_) => next.run(request).await,
        Err(e) => {
            if let Some(user) = user {
                tracing::debug!(
                    "User {} ({}) denied access to {} route {}",
                    user.user_id,
                    user.role,
                    required,
                    request.uri().path()
                );
            }
            e.into_response()
        }
    }
}
