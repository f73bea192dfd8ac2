//! # Notification handlers
//!
//! ## Endpoints
//!
//! - `GET /api/notifications` - recent feed with unread counter
//! - `POST /api/notifications/read-all`
//! - `POST /api/notifications/{notification_id}/read`
//! - `DELETE /api/notifications/{notification_id}`

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::notification::{Notification, NotificationId};
use declarant_shared::ApiResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::{auth::CurrentUser, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct NotificationDto {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub link: Option<String>,
    pub created_at: String,
}

impl From<&Notification> for NotificationDto {
    fn from(notification: &Notification) -> Self {
        Self {
            id: *notification.id().as_uuid(),
            title: notification.title().to_string(),
            message: notification.message().to_string(),
            kind: notification.kind().to_string(),
            is_read: notification.is_read(),
            link: notification.link().map(str::to_string),
            created_at: notification.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationFeedDto {
    pub notifications: Vec<NotificationDto>,
    pub unread_count:  u64,
}

#[tracing::instrument(skip_all)]
pub async fn feed(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let (notifications, unread_count) = state.notifications.feed(&actor).await?;
    let feed = NotificationFeedDto {
        notifications: notifications.iter().map(NotificationDto::from).collect(),
        unread_count,
    };
    Ok((StatusCode::OK, Json(ApiResponse::new(feed))))
}

#[tracing::instrument(skip_all)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .notifications
        .mark_read(&actor, NotificationId::from_uuid(notification_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.notifications.mark_all_read(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .notifications
        .delete(&actor, NotificationId::from_uuid(notification_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
