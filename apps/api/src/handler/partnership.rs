//! # Partnership handlers
//!
//! ## Endpoints
//!
//! - `GET /api/partnerships` - partnerships of the actor's company
//! - `POST /api/partnerships` - request a partnership
//! - `GET /api/partnerships/incoming` - pending requests addressed to the company
//! - `POST /api/partnerships/{partnership_id}/accept`
//! - `POST /api/partnerships/{partnership_id}/reject`
//! - `DELETE /api/partnerships/{partnership_id}` - sever a partnership

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::{
    company::CompanyId,
    partnership::{Partnership, PartnershipId},
};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::CurrentUser, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct PartnershipDto {
    pub id: Uuid,
    pub requesting_company_id: Uuid,
    pub target_company_id: Uuid,
    pub note: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<&Partnership> for PartnershipDto {
    fn from(partnership: &Partnership) -> Self {
        Self {
            id: *partnership.id().as_uuid(),
            requesting_company_id: *partnership.requesting_company_id().as_uuid(),
            target_company_id: *partnership.target_company_id().as_uuid(),
            note: partnership.note().map(str::to_string),
            status: partnership.status().to_string(),
            created_at: partnership.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePartnershipRequest {
    pub target_company_id: Uuid,
    pub note:              Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreatePartnershipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let partnership = state
        .partnerships
        .request(&actor, CompanyId::from_uuid(req.target_company_id), req.note)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(PartnershipDto::from(&partnership))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let partnerships = state.partnerships.list(&actor).await?;
    let items: Vec<PartnershipDto> = partnerships.iter().map(PartnershipDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn list_incoming(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let partnerships = state.partnerships.list_incoming(&actor).await?;
    let items: Vec<PartnershipDto> = partnerships.iter().map(PartnershipDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn accept(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(partnership_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let partnership = state
        .partnerships
        .accept(&actor, PartnershipId::from_uuid(partnership_id))
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(PartnershipDto::from(&partnership))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(partnership_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .partnerships
        .delete(&actor, PartnershipId::from_uuid(partnership_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn reject(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(partnership_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let partnership = state
        .partnerships
        .reject(&actor, PartnershipId::from_uuid(partnership_id))
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(PartnershipDto::from(&partnership))),
    ))
}
