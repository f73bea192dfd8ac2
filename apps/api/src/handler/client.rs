//! # Client handlers
//!
//! ## Endpoints
//!
//! - `GET /api/clients` - paginated list, visibility filtered
//! - `POST /api/clients`
//! - `GET /api/clients/{client_id}`
//! - `PATCH /api/clients/{client_id}`
//! - `POST /api/clients/{client_id}/redirect` - transfer ownership
//! - `DELETE /api/clients/{client_id}`

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::{
    client::{Client, ClientId, ClientPatch},
    user::UserId,
    value_objects::AccessType,
};
use declarant_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::{clamp_page, client::CreateClientInput},
};

#[derive(Debug, Serialize)]
pub struct ClientDto {
    pub id: Uuid,
    pub company_name: String,
    pub inn: String,
    pub director_name: Option<String>,
    pub note: Option<String>,
    pub access_type: String,
    pub allowed_user_ids: Vec<Uuid>,
    pub owner_id: Uuid,
    pub created_at: String,
}

impl From<&Client> for ClientDto {
    fn from(client: &Client) -> Self {
        Self {
            id: *client.id().as_uuid(),
            company_name: client.company_name().to_string(),
            inn: client.inn().to_string(),
            director_name: client.director_name().map(str::to_string),
            note: client.note().map(str::to_string),
            access_type: client.access_type().to_string(),
            allowed_user_ids: client
                .allowed_user_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            owner_id: *client.owner_id().as_uuid(),
            created_at: client.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page:      Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub company_name:  String,
    pub inn:           String,
    pub director_name: Option<String>,
    pub note:          Option<String>,
    pub access_type:   AccessType,
    #[serde(default)]
    pub allowed_user_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchClientRequest {
    pub company_name:  Option<String>,
    pub inn:           Option<String>,
    pub director_name: Option<String>,
    pub note:          Option<String>,
    pub access_type:   Option<AccessType>,
    pub allowed_user_ids: Option<Vec<Uuid>>,
}

fn user_ids(ids: Vec<Uuid>) -> Vec<UserId> {
    ids.into_iter().map(UserId::from_uuid).collect()
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreateClientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state
        .clients
        .create(
            &actor,
            CreateClientInput {
                company_name:     req.company_name,
                inn:              req.inn,
                director_name:    req.director_name,
                note:             req.note,
                access_type:      req.access_type,
                allowed_user_ids: user_ids(req.allowed_user_ids),
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ClientDto::from(&client))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state
        .clients
        .get(&actor, ClientId::from_uuid(client_id))
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(ClientDto::from(&client)))))
}

#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = clamp_page(query.page, query.page_size);
    let (clients, total) = state.clients.list(&actor, page, page_size).await?;
    let items: Vec<ClientDto> = clients.iter().map(ClientDto::from).collect();
    let response = PaginatedResponse::new(items, total, page, page_size);
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip_all)]
pub async fn patch(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(client_id): Path<Uuid>,
    Json(req): Json<PatchClientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = ClientPatch {
        company_name:     req.company_name,
        inn:              req.inn,
        director_name:    req.director_name,
        note:             req.note,
        access_type:      req.access_type,
        allowed_user_ids: req.allowed_user_ids.map(user_ids),
    };
    let client = state
        .clients
        .patch(&actor, ClientId::from_uuid(client_id), patch)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(ClientDto::from(&client)))))
}

#[derive(Debug, Deserialize)]
pub struct RedirectRequest {
    pub new_owner_id: Uuid,
}

#[tracing::instrument(skip_all)]
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(client_id): Path<Uuid>,
    Json(req): Json<RedirectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state
        .clients
        .redirect(
            &actor,
            ClientId::from_uuid(client_id),
            UserId::from_uuid(req.new_owner_id),
        )
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(ClientDto::from(&client)))))
}

#[tracing::instrument(skip_all)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .clients
        .delete(&actor, ClientId::from_uuid(client_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
