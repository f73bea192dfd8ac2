//! # Declaration handlers
//!
//! ## Endpoints
//!
//! - `GET /api/declarations` - paginated list, optional group filter
//! - `POST /api/declarations`
//! - `GET /api/declarations/{declaration_id}`
//! - `PATCH /api/declarations/{declaration_id}`
//! - `DELETE /api/declarations/{declaration_id}`
//! - `POST /api/declarations/{declaration_id}/group` - move between groups
//! - `POST /api/declarations/{declaration_id}/redirect` - transfer ownership
//! - `GET /api/declaration-groups`
//! - `POST /api/declaration-groups`
//! - `DELETE /api/declaration-groups/{group_id}`

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use declarant_domain::{
    client::ClientId,
    declaration::{
        Declaration, DeclarationGroup, DeclarationGroupId, DeclarationId, DeclarationPatch,
        Vehicle, VehicleKind,
    },
    error::DomainError,
    user::UserId,
    value_objects::{DeclarationSerial, PostNumber},
};
use declarant_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::{clamp_page, declaration::CreateDeclarationInput},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleDto {
    pub number: String,
    pub kind:   VehicleKind,
}

impl From<&Vehicle> for VehicleDto {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            number: vehicle.number().to_string(),
            kind:   vehicle.kind(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeclarationDto {
    pub id: Uuid,
    pub number: String,
    pub post_number: String,
    pub date: NaiveDate,
    pub serial: String,
    pub client_id: Uuid,
    pub mode: String,
    pub note: Option<String>,
    pub group_id: Option<Uuid>,
    pub vehicles: Vec<VehicleDto>,
    pub document_ids: Vec<Uuid>,
    pub folder_ids: Vec<Uuid>,
    pub owner_id: Uuid,
    pub created_at: String,
}

impl From<&Declaration> for DeclarationDto {
    fn from(declaration: &Declaration) -> Self {
        Self {
            id: *declaration.id().as_uuid(),
            number: declaration.formatted_number(),
            post_number: declaration.post_number().as_str().to_string(),
            date: declaration.date(),
            serial: declaration.serial().as_str().to_string(),
            client_id: *declaration.client_id().as_uuid(),
            mode: declaration.mode().to_string(),
            note: declaration.note().map(str::to_string),
            group_id: declaration.group_id().map(|id| *id.as_uuid()),
            vehicles: declaration.vehicles().iter().map(VehicleDto::from).collect(),
            document_ids: declaration
                .document_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            folder_ids: declaration
                .folder_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            owner_id: *declaration.owner_id().as_uuid(),
            created_at: declaration.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeclarationGroupDto {
    pub id:         Uuid,
    pub name:       String,
    pub created_at: String,
}

impl From<&DeclarationGroup> for DeclarationGroupDto {
    fn from(group: &DeclarationGroup) -> Self {
        Self {
            id:         *group.id().as_uuid(),
            name:       group.name().to_string(),
            created_at: group.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDeclarationRequest {
    pub post_number: String,
    pub date:        NaiveDate,
    pub serial:      String,
    pub client_id:   Uuid,
    pub mode:        String,
    pub note:        Option<String>,
    #[serde(default)]
    pub vehicles:    Vec<VehicleDto>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchDeclarationRequest {
    pub post_number: Option<String>,
    pub date:        Option<NaiveDate>,
    pub serial:      Option<String>,
    pub mode:        Option<String>,
    pub note:        Option<String>,
    pub vehicles:    Option<Vec<VehicleDto>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub group_id:  Option<Uuid>,
    pub page:      Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AssignGroupRequest {
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

fn vehicles(dtos: Vec<VehicleDto>) -> Result<Vec<Vehicle>, DomainError> {
    dtos.into_iter()
        .map(|v| Vehicle::new(v.number, v.kind))
        .collect()
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreateDeclarationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let declaration = state
        .declarations
        .create(
            &actor,
            CreateDeclarationInput {
                post_number: req.post_number,
                date:        req.date,
                serial:      req.serial,
                client_id:   ClientId::from_uuid(req.client_id),
                mode:        req.mode,
                note:        req.note,
                vehicles:    vehicles(req.vehicles)?,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(DeclarationDto::from(&declaration))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(declaration_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let declaration = state
        .declarations
        .get(&actor, DeclarationId::from_uuid(declaration_id))
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DeclarationDto::from(&declaration))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = clamp_page(query.page, query.page_size);
    let group_id = query.group_id.map(DeclarationGroupId::from_uuid);
    let (declarations, total) = state
        .declarations
        .list(&actor, group_id, page, page_size)
        .await?;
    let items: Vec<DeclarationDto> = declarations.iter().map(DeclarationDto::from).collect();
    let response = PaginatedResponse::new(items, total, page, page_size);
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip_all)]
pub async fn patch(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(declaration_id): Path<Uuid>,
    Json(req): Json<PatchDeclarationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = DeclarationPatch {
        post_number: req.post_number.map(PostNumber::new).transpose()?,
        date:        req.date,
        serial:      req.serial.map(DeclarationSerial::new).transpose()?,
        mode:        req.mode,
        note:        req.note,
        vehicles:    req.vehicles.map(vehicles).transpose()?,
        ..DeclarationPatch::default()
    };
    let declaration = state
        .declarations
        .patch(&actor, DeclarationId::from_uuid(declaration_id), patch)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DeclarationDto::from(&declaration))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(declaration_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .declarations
        .delete(&actor, DeclarationId::from_uuid(declaration_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(declaration_id): Path<Uuid>,
    Json(req): Json<super::client::RedirectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let declaration = state
        .declarations
        .redirect(
            &actor,
            DeclarationId::from_uuid(declaration_id),
            UserId::from_uuid(req.new_owner_id),
        )
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DeclarationDto::from(&declaration))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn assign_group(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(declaration_id): Path<Uuid>,
    Json(req): Json<AssignGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let declaration = state
        .declarations
        .assign_to_group(
            &actor,
            DeclarationId::from_uuid(declaration_id),
            req.group_id.map(DeclarationGroupId::from_uuid),
        )
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DeclarationDto::from(&declaration))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.declarations.create_group(&actor, req.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(DeclarationGroupDto::from(&group))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .declarations
        .delete_group(&actor, DeclarationGroupId::from_uuid(group_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let groups = state.declarations.list_groups(&actor).await?;
    let items: Vec<DeclarationGroupDto> = groups.iter().map(DeclarationGroupDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}
