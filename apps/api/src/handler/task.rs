//! # Task handlers
//!
//! ## Endpoints
//!
//! - `POST /api/tasks`
//! - `GET /api/tasks/incoming` - tasks addressed to the actor's company
//! - `GET /api/tasks/outgoing` - tasks created by the actor's company
//! - `GET /api/tasks/{task_id}`
//! - `PATCH /api/tasks/{task_id}`
//! - `DELETE /api/tasks/{task_id}`
//! - `POST /api/tasks/{task_id}/status`
//! - `GET /api/tasks/{task_id}/history`

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use declarant_domain::{
    certificate::CertificateId,
    company::CompanyId,
    declaration::DeclarationId,
    document::DocumentId,
    task::{Task, TaskId, TaskPatch, TaskPriority, TaskStatus, TaskStatusChange},
    user::UserId,
};
use declarant_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::{clamp_page, task::CreateTaskInput},
};

use super::client::PageQuery;

#[derive(Debug, Serialize)]
pub struct TaskDto {
    pub id: Uuid,
    pub name: String,
    pub note: Option<String>,
    pub priority: String,
    pub status: String,
    pub deadline: Option<NaiveDate>,
    pub target_company_id: Uuid,
    pub target_employee_id: Option<Uuid>,
    pub created_by_user_id: Uuid,
    pub created_by_company_id: Uuid,
    pub document_ids: Vec<Uuid>,
    pub declaration_ids: Vec<Uuid>,
    pub certificate_ids: Vec<Uuid>,
    pub created_at: String,
}

impl From<&Task> for TaskDto {
    fn from(task: &Task) -> Self {
        Self {
            id: *task.id().as_uuid(),
            name: task.name().to_string(),
            note: task.note().map(str::to_string),
            priority: task.priority().to_string(),
            status: task.status().to_string(),
            deadline: task.deadline(),
            target_company_id: *task.target_company_id().as_uuid(),
            target_employee_id: task.target_employee_id().map(|id| *id.as_uuid()),
            created_by_user_id: *task.created_by_user_id().as_uuid(),
            created_by_company_id: *task.created_by_company_id().as_uuid(),
            document_ids: task.document_ids().iter().map(|id| *id.as_uuid()).collect(),
            declaration_ids: task
                .declaration_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            certificate_ids: task
                .certificate_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            created_at: task.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskStatusChangeDto {
    pub id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub changed_by_id: Uuid,
    pub created_at: String,
}

impl From<&TaskStatusChange> for TaskStatusChangeDto {
    fn from(change: &TaskStatusChange) -> Self {
        Self {
            id: *change.id().as_uuid(),
            from_status: change.from_status().to_string(),
            to_status: change.to_status().to_string(),
            changed_by_id: *change.changed_by_id().as_uuid(),
            created_at: change.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub note: Option<String>,
    pub priority: TaskPriority,
    pub deadline: Option<NaiveDate>,
    pub target_company_id: Uuid,
    pub target_employee_id: Option<Uuid>,
    #[serde(default)]
    pub document_ids: Vec<Uuid>,
    #[serde(default)]
    pub declaration_ids: Vec<Uuid>,
    #[serde(default)]
    pub certificate_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchTaskRequest {
    pub name: Option<String>,
    pub note: Option<String>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<NaiveDate>,
    pub document_ids: Option<Vec<Uuid>>,
    pub declaration_ids: Option<Vec<Uuid>>,
    pub certificate_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeTaskStatusRequest {
    pub status: TaskStatus,
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .tasks
        .create(
            &actor,
            CreateTaskInput {
                name: req.name,
                note: req.note,
                priority: req.priority,
                deadline: req.deadline,
                target_company_id: CompanyId::from_uuid(req.target_company_id),
                target_employee_id: req.target_employee_id.map(UserId::from_uuid),
                document_ids: req
                    .document_ids
                    .into_iter()
                    .map(DocumentId::from_uuid)
                    .collect(),
                declaration_ids: req
                    .declaration_ids
                    .into_iter()
                    .map(DeclarationId::from_uuid)
                    .collect(),
                certificate_ids: req
                    .certificate_ids
                    .into_iter()
                    .map(CertificateId::from_uuid)
                    .collect(),
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(TaskDto::from(&task))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.tasks.get(&actor, TaskId::from_uuid(task_id)).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(TaskDto::from(&task)))))
}

#[tracing::instrument(skip_all)]
pub async fn list_incoming(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = clamp_page(query.page, query.page_size);
    let (tasks, total) = state.tasks.list_incoming(&actor, page, page_size).await?;
    let items: Vec<TaskDto> = tasks.iter().map(TaskDto::from).collect();
    Ok((
        StatusCode::OK,
        Json(PaginatedResponse::new(items, total, page, page_size)),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn list_outgoing(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = clamp_page(query.page, query.page_size);
    let (tasks, total) = state.tasks.list_outgoing(&actor, page, page_size).await?;
    let items: Vec<TaskDto> = tasks.iter().map(TaskDto::from).collect();
    Ok((
        StatusCode::OK,
        Json(PaginatedResponse::new(items, total, page, page_size)),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn patch(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(req): Json<PatchTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = TaskPatch {
        name: req.name,
        note: req.note,
        priority: req.priority,
        deadline: req.deadline,
        document_ids: req
            .document_ids
            .map(|ids| ids.into_iter().map(DocumentId::from_uuid).collect()),
        declaration_ids: req
            .declaration_ids
            .map(|ids| ids.into_iter().map(DeclarationId::from_uuid).collect()),
        certificate_ids: req
            .certificate_ids
            .map(|ids| ids.into_iter().map(CertificateId::from_uuid).collect()),
        ..TaskPatch::default()
    };
    let task = state
        .tasks
        .patch(&actor, TaskId::from_uuid(task_id), patch)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(TaskDto::from(&task)))))
}

#[tracing::instrument(skip_all)]
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(req): Json<ChangeTaskStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .tasks
        .change_status(&actor, TaskId::from_uuid(task_id), req.status)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(TaskDto::from(&task)))))
}

#[tracing::instrument(skip_all)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = state
        .tasks
        .history(&actor, TaskId::from_uuid(task_id))
        .await?;
    let items: Vec<TaskStatusChangeDto> = changes.iter().map(TaskStatusChangeDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.tasks.delete(&actor, TaskId::from_uuid(task_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
