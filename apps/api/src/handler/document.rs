//! # Document handlers
//!
//! Upload is multipart: a `file` part plus optional `folder_id` and
//! `client_id` text parts.
//!
//! ## Endpoints
//!
//! - `GET /api/documents` - listing by folder or by client
//! - `POST /api/documents` - multipart upload
//! - `PATCH /api/documents/{document_id}` - rename or move
//! - `DELETE /api/documents/{document_id}`

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::{
    client::ClientId,
    document::{Document, DocumentId},
    folder::FolderId,
};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::document::UploadDocumentInput,
};

#[derive(Debug, Serialize)]
pub struct DocumentDto {
    pub id: Uuid,
    pub name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
    pub folder_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub created_at: String,
}

impl From<&Document> for DocumentDto {
    fn from(document: &Document) -> Self {
        Self {
            id: *document.id().as_uuid(),
            name: document.name().to_string(),
            file_url: document.file_url().to_string(),
            file_type: document.file_type().to_string(),
            file_size: document.file_size(),
            folder_id: document.folder_id().map(|id| *id.as_uuid()),
            client_id: document.client_id().map(|id| *id.as_uuid()),
            owner_id: *document.owner_id().as_uuid(),
            created_at: document.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub folder_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchDocumentRequest {
    pub name:      Option<String>,
    pub folder_id: Option<Uuid>,
    /// Moves the document out of its folder. Wins over `folder_id`.
    #[serde(default)]
    pub move_to_root: bool,
}

struct UploadForm {
    file_name: String,
    content:   Bytes,
    folder_id: Option<FolderId>,
    client_id: Option<ClientId>,
}

fn bad_part(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(e.to_string())
}

/// Pulls the single `file` part out of a multipart body.
pub(super) async fn read_file_part(mut multipart: Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(bad_part)? {
        if field.name() == Some("file") {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadRequest("имя файла отсутствует".to_string()))?;
            let content = field.bytes().await.map_err(bad_part)?;
            return Ok((file_name, content));
        }
    }
    Err(ApiError::BadRequest("часть file отсутствует".to_string()))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut folder_id = None;
    let mut client_id = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_part)? {
        match field.name() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("имя файла отсутствует".to_string()))?;
                let content = field.bytes().await.map_err(bad_part)?;
                file = Some((file_name, content));
            }
            Some("folder_id") => {
                let text = field.text().await.map_err(bad_part)?;
                folder_id = Some(parse_id(&text).map(FolderId::from_uuid)?);
            }
            Some("client_id") => {
                let text = field.text().await.map_err(bad_part)?;
                client_id = Some(parse_id(&text).map(ClientId::from_uuid)?);
            }
            _ => {}
        }
    }

    let (file_name, content) =
        file.ok_or_else(|| ApiError::BadRequest("часть file отсутствует".to_string()))?;
    Ok(UploadForm {
        file_name,
        content,
        folder_id,
        client_id,
    })
}

fn parse_id(text: &str) -> Result<Uuid, ApiError> {
    text.parse()
        .map_err(|_| ApiError::BadRequest(format!("неверный идентификатор: {text}")))
}

#[tracing::instrument(skip_all)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;
    let document = state
        .documents
        .upload(
            &actor,
            UploadDocumentInput {
                file_name: form.file_name,
                content:   form.content,
                folder_id: form.folder_id,
                client_id: form.client_id,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(DocumentDto::from(&document))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = match query.client_id {
        Some(client_id) => {
            state
                .documents
                .list_by_client(&actor, ClientId::from_uuid(client_id))
                .await?
        }
        None => {
            state
                .documents
                .list_in_folder(&actor, query.folder_id.map(FolderId::from_uuid))
                .await?
        }
    };
    let items: Vec<DocumentDto> = documents.iter().map(DocumentDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn patch(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(document_id): Path<Uuid>,
    Json(req): Json<PatchDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = DocumentId::from_uuid(document_id);
    let mut document = None;
    if let Some(name) = req.name {
        document = Some(state.documents.rename(&actor, id, name).await?);
    }
    if req.move_to_root {
        document = Some(state.documents.move_to_folder(&actor, id, None).await?);
    } else if let Some(folder_id) = req.folder_id {
        document = Some(
            state
                .documents
                .move_to_folder(&actor, id, Some(FolderId::from_uuid(folder_id)))
                .await?,
        );
    }
    let document = match document {
        Some(document) => document,
        None => state.documents.get(&actor, id).await?,
    };
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DocumentDto::from(&document))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .documents
        .delete(&actor, DocumentId::from_uuid(document_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
