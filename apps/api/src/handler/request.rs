//! # Request handlers
//!
//! Company registration and join requests.
//!
//! ## Endpoints
//!
//! - `POST /api/requests/company` - submit a company registration
//! - `POST /api/requests/join` - ask to join an existing company
//! - `GET /api/requests/pending` - queue for the reviewer
//! - `GET /api/requests/my` - requests submitted by the actor
//! - `POST /api/requests/{request_id}/approve`
//! - `POST /api/requests/{request_id}/reject`

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::{
    company::CompanyId,
    request::{Request, RequestId},
    value_objects::ActivityType,
};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::request::RegisterCompanyInput,
};

#[derive(Debug, Serialize)]
pub struct RequestDto {
    pub id: Uuid,
    pub request_type: String,
    pub status: String,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub target_company_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: String,
}

impl From<&Request> for RequestDto {
    fn from(request: &Request) -> Self {
        Self {
            id: *request.id().as_uuid(),
            request_type: request.request_type().to_string(),
            status: request.status().to_string(),
            user_id: *request.user_id().as_uuid(),
            company_id: *request.company_id().as_uuid(),
            target_company_id: request.target_company_id().map(|id| *id.as_uuid()),
            note: request.note().map(str::to_string),
            created_at: request.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterCompanyRequest {
    pub name:          String,
    pub inn:           String,
    pub activity_type: ActivityType,
}

#[derive(Debug, Deserialize)]
pub struct JoinCompanyRequest {
    pub company_id: Uuid,
    pub note:       Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn register_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<RegisterCompanyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .requests
        .submit_company_registration(
            actor,
            RegisterCompanyInput {
                name:          req.name,
                inn:           req.inn,
                activity_type: req.activity_type,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(RequestDto::from(&request))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn join_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<JoinCompanyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .requests
        .submit_join_request(actor, CompanyId::from_uuid(req.company_id), req.note)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(RequestDto::from(&request))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.requests.list_pending(&actor).await?;
    let items: Vec<RequestDto> = requests.iter().map(RequestDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn list_my(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.requests.list_mine(&actor).await?;
    let items: Vec<RequestDto> = requests.iter().map(RequestDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn approve(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .requests
        .approve(&actor, RequestId::from_uuid(request_id))
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(RequestDto::from(&request)))))
}

#[tracing::instrument(skip_all)]
pub async fn reject(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .requests
        .reject(&actor, RequestId::from_uuid(request_id))
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(RequestDto::from(&request)))))
}
