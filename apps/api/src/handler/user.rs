//! # User handlers
//!
//! Profile endpoints for the authenticated user plus member lookup.
//!
//! ## Endpoints
//!
//! - `GET /api/users/me` - current user
//! - `PATCH /api/users/me` - update full name / phone
//! - `POST /api/users/me/password` - change password
//! - `POST /api/users/me/avatar` - avatar upload (multipart)
//! - `POST /api/users/me/telegram` - link / unlink a Telegram chat
//! - `GET /api/users/{user_id}` - user in the actor's scope
//! - `GET /api/company/members` - members of the actor's company

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::user::{User, UserId};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::auth::UpdateProfileInput,
};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub activity_type: String,
    pub role: String,
    pub company_id: Option<Uuid>,
    pub is_blocked: bool,
    pub avatar_url: Option<String>,
    pub telegram_linked: bool,
    pub created_at: String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: *user.id().as_uuid(),
            email: user.email().as_str().to_string(),
            full_name: user.full_name().to_string(),
            phone: user.phone().to_string(),
            activity_type: user.activity_type().to_string(),
            role: user.role().to_string(),
            company_id: user.company_id().map(|id| *id.as_uuid()),
            is_blocked: user.is_blocked(),
            avatar_url: user.avatar_url().map(str::to_string),
            telegram_linked: user.telegram_chat_id().is_some(),
            created_at: user.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetTelegramRequest {
    pub chat_id: Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user))))
}

#[tracing::instrument(skip_all)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateMeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .auth
        .update_profile(
            user,
            UpdateProfileInput {
                full_name: req.full_name,
                phone: req.phone,
            },
        )
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&updated)))))
}

#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .change_password(user, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Multipart with a single `file` part.
#[tracing::instrument(skip_all)]
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, content) = super::document::read_file_part(multipart).await?;
    let stored = state.storage.save(&file_name, content).await?;
    let updated = state.auth.set_avatar(user, stored.url).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&updated)))))
}

#[tracing::instrument(skip_all)]
pub async fn set_telegram(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SetTelegramRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.auth.set_telegram_chat(user, req.chat_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&updated)))))
}

#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .admin
        .get_user(&actor, UserId::from_uuid(user_id))
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

#[tracing::instrument(skip_all)]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let members = state.admin.list_members(&actor).await?;
    let items: Vec<UserDto> = members.iter().map(UserDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}
