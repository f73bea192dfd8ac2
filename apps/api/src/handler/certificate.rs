//! # Certificate handlers
//!
//! ## Endpoints
//!
//! - `GET /api/certificates` - paginated list for the actor's company
//! - `POST /api/certificates`
//! - `GET /api/certificates/{certificate_id}`
//! - `PATCH /api/certificates/{certificate_id}`
//! - `GET /api/certificates/{certificate_id}/actions` - audit trail
//! - `POST /api/certificates/{certificate_id}/send` - hand off to a certifier
//! - `POST /api/certificates/{certificate_id}/status`
//! - `POST /api/certificates/{certificate_id}/number`
//! - `POST /api/certificates/{certificate_id}/payment`
//! - `POST /api/certificates/{certificate_id}/payment-files`
//! - `POST /api/certificates/{certificate_id}/review`
//! - `POST /api/certificates/{certificate_id}/assign`

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use declarant_domain::{
    certificate::{
        Certificate, CertificateAction, CertificateId, CertificatePatch, CertificateStatus,
    },
    client::ClientId,
    company::CompanyId,
    declaration::DeclarationId,
    document::DocumentId,
    folder::FolderId,
    user::UserId,
};
use declarant_shared::{ApiResponse, PaginatedResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    usecase::{clamp_page, certificate::CreateCertificateInput},
};

use super::client::PageQuery;

#[derive(Debug, Serialize)]
pub struct CertificateDto {
    pub id: Uuid,
    pub kind: String,
    pub number: Option<String>,
    pub number_to_be_filled_by_certifier: bool,
    pub deadline: Option<NaiveDate>,
    pub sent_date: Option<NaiveDate>,
    pub status: String,
    pub client_id: Uuid,
    pub note: Option<String>,
    pub owner_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub declarant_company_id: Uuid,
    pub certifier_company_id: Option<Uuid>,
    pub document_ids: Vec<Uuid>,
    pub folder_ids: Vec<Uuid>,
    pub declaration_ids: Vec<Uuid>,
    pub payment_file_ids: Vec<Uuid>,
    pub created_at: String,
}

impl From<&Certificate> for CertificateDto {
    fn from(certificate: &Certificate) -> Self {
        Self {
            id: *certificate.id().as_uuid(),
            kind: certificate.kind().to_string(),
            number: certificate.number().map(str::to_string),
            number_to_be_filled_by_certifier: certificate.number_to_be_filled_by_certifier(),
            deadline: certificate.deadline(),
            sent_date: certificate.sent_date(),
            status: certificate.status().to_string(),
            client_id: *certificate.client_id().as_uuid(),
            note: certificate.note().map(str::to_string),
            owner_id: *certificate.owner_id().as_uuid(),
            assignee_id: certificate.assigned_to_id().map(|id| *id.as_uuid()),
            declarant_company_id: *certificate.declarant_company_id().as_uuid(),
            certifier_company_id: certificate.certifier_company_id().map(|id| *id.as_uuid()),
            document_ids: uuids(certificate.document_ids()),
            folder_ids: certificate
                .folder_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            declaration_ids: certificate
                .declaration_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            payment_file_ids: uuids(certificate.payment_file_ids()),
            created_at: certificate.created_at().to_rfc3339(),
        }
    }
}

fn uuids(ids: &[DocumentId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

#[derive(Debug, Serialize)]
pub struct CertificateActionDto {
    pub id: Uuid,
    pub action: String,
    pub note: Option<String>,
    pub performed_by_id: Uuid,
    pub attached_file_ids: Vec<Uuid>,
    pub created_at: String,
}

impl From<&CertificateAction> for CertificateActionDto {
    fn from(action: &CertificateAction) -> Self {
        Self {
            id: *action.id().as_uuid(),
            action: action.action().to_string(),
            note: action.note().map(str::to_string),
            performed_by_id: *action.performed_by_id().as_uuid(),
            attached_file_ids: uuids(action.attached_file_ids()),
            created_at: action.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCertificateRequest {
    pub kind: String,
    pub number: Option<String>,
    #[serde(default)]
    pub number_to_be_filled_by_certifier: bool,
    pub deadline: Option<NaiveDate>,
    pub client_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchCertificateRequest {
    pub kind: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub sent_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub document_ids: Option<Vec<Uuid>>,
    pub folder_ids: Option<Vec<Uuid>>,
    pub declaration_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct SendCertificateRequest {
    pub certifier_company_id: Uuid,
    pub sent_date:            NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: CertificateStatus,
    pub note:   Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetNumberRequest {
    pub number: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentFilesRequest {
    #[serde(default)]
    pub payment_file_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assignee_id: Uuid,
}

fn ok_dto(certificate: &Certificate) -> (StatusCode, Json<ApiResponse<CertificateDto>>) {
    (
        StatusCode::OK,
        Json(ApiResponse::new(CertificateDto::from(certificate))),
    )
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<CreateCertificateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .create(
            &actor,
            CreateCertificateInput {
                kind: req.kind,
                number: req.number,
                number_to_be_filled_by_certifier: req.number_to_be_filled_by_certifier,
                deadline: req.deadline,
                client_id: ClientId::from_uuid(req.client_id),
                note: req.note,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CertificateDto::from(&certificate))),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .get(&actor, CertificateId::from_uuid(certificate_id))
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = clamp_page(query.page, query.page_size);
    let (certificates, total) = state.certificates.list(&actor, page, page_size).await?;
    let items: Vec<CertificateDto> = certificates.iter().map(CertificateDto::from).collect();
    let response = PaginatedResponse::new(items, total, page, page_size);
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip_all)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actions = state
        .certificates
        .history(&actor, CertificateId::from_uuid(certificate_id))
        .await?;
    let items: Vec<CertificateActionDto> =
        actions.iter().map(CertificateActionDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

#[tracing::instrument(skip_all)]
pub async fn patch(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<PatchCertificateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = CertificatePatch {
        kind: req.kind,
        deadline: req.deadline,
        sent_date: req.sent_date,
        note: req.note,
        document_ids: req
            .document_ids
            .map(|ids| ids.into_iter().map(DocumentId::from_uuid).collect()),
        folder_ids: req
            .folder_ids
            .map(|ids| ids.into_iter().map(FolderId::from_uuid).collect()),
        declaration_ids: req
            .declaration_ids
            .map(|ids| ids.into_iter().map(DeclarationId::from_uuid).collect()),
    };
    let certificate = state
        .certificates
        .patch(&actor, CertificateId::from_uuid(certificate_id), patch)
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn send(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<SendCertificateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .send_to_certifier(
            &actor,
            CertificateId::from_uuid(certificate_id),
            CompanyId::from_uuid(req.certifier_company_id),
            req.sent_date,
        )
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .change_status(
            &actor,
            CertificateId::from_uuid(certificate_id),
            req.status,
            req.note,
        )
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn set_number(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<SetNumberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .set_number(&actor, CertificateId::from_uuid(certificate_id), req.number)
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<PaymentFilesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .confirm_payment(
            &actor,
            CertificateId::from_uuid(certificate_id),
            req.payment_file_ids
                .into_iter()
                .map(DocumentId::from_uuid)
                .collect(),
        )
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn attach_payment_files(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<PaymentFilesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .attach_payment_files(
            &actor,
            CertificateId::from_uuid(certificate_id),
            req.payment_file_ids
                .into_iter()
                .map(DocumentId::from_uuid)
                .collect(),
        )
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn confirm_review(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .confirm_review(&actor, CertificateId::from_uuid(certificate_id))
        .await?;
    Ok(ok_dto(&certificate))
}

#[tracing::instrument(skip_all)]
pub async fn assign(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let certificate = state
        .certificates
        .assign(
            &actor,
            CertificateId::from_uuid(certificate_id),
            UserId::from_uuid(req.assignee_id),
        )
        .await?;
    Ok(ok_dto(&certificate))
}
