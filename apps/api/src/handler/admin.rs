//! # Member and platform administration handlers
//!
//! Member management (block, role, removal) is available to company
//! management within their rank; the company-level endpoints and the
//! broadcast are platform admin only.
//!
//! ## Endpoints
//!
//! - `POST /api/users/{user_id}/block`
//! - `POST /api/users/{user_id}/unblock`
//! - `PATCH /api/users/{user_id}/role`
//! - `DELETE /api/users/{user_id}/membership`
//! - `GET /api/admin/companies`
//! - `POST /api/admin/companies/{company_id}/block`
//! - `POST /api/admin/companies/{company_id}/unblock`
//! - `DELETE /api/admin/companies/{company_id}`
//! - `POST /api/admin/messages`

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::{
    company::{Company, CompanyId},
    user::{Role, UserId},
};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::CurrentUser, error::ApiError, state::AppState};

use super::user::UserDto;

#[derive(Debug, Serialize)]
pub struct CompanyDto {
    pub id: Uuid,
    pub name: String,
    pub inn: String,
    pub activity_type: String,
    pub is_blocked: bool,
    pub director_id: Option<Uuid>,
    pub created_at: String,
}

impl From<&Company> for CompanyDto {
    fn from(company: &Company) -> Self {
        Self {
            id: *company.id().as_uuid(),
            name: company.name().to_string(),
            inn: company.inn().as_str().to_string(),
            activity_type: company.activity_type().to_string(),
            is_blocked: company.is_blocked(),
            director_id: company.director_id().map(|id| *id.as_uuid()),
            created_at: company.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// Either `user_id` or `company_id` must be set; with `company_id` the
/// message goes to every member.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub user_id:    Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub title:      String,
    pub message:    String,
}

#[tracing::instrument(skip_all)]
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .admin
        .set_user_blocked(&actor, UserId::from_uuid(user_id), true)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

#[tracing::instrument(skip_all)]
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .admin
        .set_user_blocked(&actor, UserId::from_uuid(user_id), false)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

#[tracing::instrument(skip_all)]
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .admin
        .change_role(&actor, UserId::from_uuid(user_id), req.role)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

#[tracing::instrument(skip_all)]
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .admin
        .remove_user(&actor, UserId::from_uuid(user_id))
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

#[tracing::instrument(skip_all)]
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let companies = state.admin.list_companies(&actor).await?;
    let items: Vec<CompanyDto> = companies.iter().map(CompanyDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn block_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let company = state
        .admin
        .set_company_blocked(&actor, CompanyId::from_uuid(company_id), true)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(CompanyDto::from(&company))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn unblock_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let company = state
        .admin
        .set_company_blocked(&actor, CompanyId::from_uuid(company_id), false)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(CompanyDto::from(&company))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn delete_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admin
        .delete_company(&actor, CompanyId::from_uuid(company_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match (req.user_id, req.company_id) {
        (Some(user_id), _) => {
            state
                .admin
                .message_user(&actor, UserId::from_uuid(user_id), req.title, req.message)
                .await?;
        }
        (None, Some(company_id)) => {
            state
                .admin
                .message_company(
                    &actor,
                    CompanyId::from_uuid(company_id),
                    req.title,
                    req.message,
                )
                .await?;
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "не указан получатель сообщения".to_string(),
            ));
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
