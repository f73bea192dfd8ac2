//! # Folder handlers
//!
//! ## Endpoints
//!
//! - `GET /api/folders` - visible folders, optional client filter
//! - `POST /api/folders`
//! - `GET /api/folders/{folder_id}`
//! - `PATCH /api/folders/{folder_id}`
//! - `DELETE /api/folders/{folder_id}` - only when empty

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::{
    client::ClientId,
    folder::{Folder, FolderId, FolderPatch},
    user::UserId,
    value_objects::AccessType,
};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::folder::CreateFolderInput,
};

#[derive(Debug, Serialize)]
pub struct FolderDto {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub access_type: String,
    pub allowed_user_ids: Vec<Uuid>,
    pub client_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub created_at: String,
}

impl From<&Folder> for FolderDto {
    fn from(folder: &Folder) -> Self {
        Self {
            id: *folder.id().as_uuid(),
            name: folder.name().to_string(),
            parent_id: folder.parent_id().map(|id| *id.as_uuid()),
            access_type: folder.access_type().to_string(),
            allowed_user_ids: folder
                .allowed_user_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            client_id: folder.client_id().map(|id| *id.as_uuid()),
            owner_id: *folder.owner_id().as_uuid(),
            created_at: folder.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name:        String,
    pub parent_id:   Option<Uuid>,
    pub access_type: AccessType,
    #[serde(default)]
    pub allowed_user_ids: Vec<Uuid>,
    pub client_id:   Option<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchFolderRequest {
    pub name:        Option<String>,
    pub parent_id:   Option<Uuid>,
    /// Moves the folder to the top level. Wins over `parent_id`.
    #[serde(default)]
    pub move_to_root: bool,
    pub access_type: Option<AccessType>,
    pub allowed_user_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct ListFoldersQuery {
    pub client_id: Option<Uuid>,
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreateFolderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let folder = state
        .folders
        .create(
            &actor,
            CreateFolderInput {
                name:        req.name,
                parent_id:   req.parent_id.map(FolderId::from_uuid),
                access_type: req.access_type,
                allowed_user_ids: req
                    .allowed_user_ids
                    .into_iter()
                    .map(UserId::from_uuid)
                    .collect(),
                client_id:   req.client_id.map(ClientId::from_uuid),
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FolderDto::from(&folder))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(folder_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let folder = state
        .folders
        .get(&actor, FolderId::from_uuid(folder_id))
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(FolderDto::from(&folder)))))
}

#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListFoldersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let folders = match query.client_id {
        Some(client_id) => {
            state
                .folders
                .list_by_client(&actor, ClientId::from_uuid(client_id))
                .await?
        }
        None => state.folders.list(&actor).await?,
    };
    let items: Vec<FolderDto> = folders.iter().map(FolderDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn patch(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(folder_id): Path<Uuid>,
    Json(req): Json<PatchFolderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let parent_id = if req.move_to_root {
        Some(None)
    } else {
        req.parent_id.map(|id| Some(FolderId::from_uuid(id)))
    };
    let patch = FolderPatch {
        name: req.name,
        parent_id,
        access_type: req.access_type,
        allowed_user_ids: req
            .allowed_user_ids
            .map(|ids| ids.into_iter().map(UserId::from_uuid).collect()),
    };
    let folder = state
        .folders
        .patch(&actor, FolderId::from_uuid(folder_id), patch)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(FolderDto::from(&folder)))))
}

#[tracing::instrument(skip_all)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(folder_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .folders
        .delete(&actor, FolderId::from_uuid(folder_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
