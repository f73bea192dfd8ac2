//! # CertificateRepository
//!
//! Persistence for certificates and their action history. A certificate
//! is visible to both the declarant and the certifier company; the
//! action history is append-only.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use declarant_domain::{
    certificate::{
        Certificate, CertificateAction, CertificateActionId, CertificateId, CertificateStatus,
    },
    client::ClientId,
    company::CompanyId,
    declaration::DeclarationId,
    document::DocumentId,
    folder::FolderId,
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, certificate: &Certificate)
    -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, certificate: &Certificate)
    -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &CertificateId) -> Result<Option<Certificate>, InfraError>;

    /// Lists certificates where the company is declarant or certifier,
    /// newest first. `employee: Some` limits to certificates owned by
    /// or assigned to that user.
    async fn list_for_company(
        &self,
        company_id: &CompanyId,
        employee: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Certificate>, u64), InfraError>;

    async fn insert_action(
        &self,
        tx: &mut TxContext,
        action: &CertificateAction,
    ) -> Result<(), InfraError>;

    /// Action history, oldest first.
    async fn list_actions(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Vec<CertificateAction>, InfraError>;

    async fn reassign_owner(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError>;

    async fn delete_by_company(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct CertificateRow {
    id: Uuid,
    kind: String,
    number: Option<String>,
    number_to_be_filled_by_certifier: bool,
    deadline: Option<NaiveDate>,
    sent_date: Option<NaiveDate>,
    status: String,
    client_id: Uuid,
    note: Option<String>,
    owner_id: Uuid,
    assigned_to_id: Option<Uuid>,
    declarant_company_id: Uuid,
    certifier_company_id: Option<Uuid>,
    document_ids: Vec<Uuid>,
    folder_ids: Vec<Uuid>,
    declaration_ids: Vec<Uuid>,
    payment_file_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CertificateRow {
    fn into_domain(self) -> Result<Certificate, InfraError> {
        Ok(Certificate::from_db(
            CertificateId::from_uuid(self.id),
            self.kind,
            self.number,
            self.number_to_be_filled_by_certifier,
            self.deadline,
            self.sent_date,
            self.status
                .parse::<CertificateStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            ClientId::from_uuid(self.client_id),
            self.note,
            UserId::from_uuid(self.owner_id),
            self.assigned_to_id.map(UserId::from_uuid),
            CompanyId::from_uuid(self.declarant_company_id),
            self.certifier_company_id.map(CompanyId::from_uuid),
            self.document_ids
                .into_iter()
                .map(DocumentId::from_uuid)
                .collect(),
            self.folder_ids.into_iter().map(FolderId::from_uuid).collect(),
            self.declaration_ids
                .into_iter()
                .map(DeclarationId::from_uuid)
                .collect(),
            self.payment_file_ids
                .into_iter()
                .map(DocumentId::from_uuid)
                .collect(),
            self.created_at,
            self.updated_at,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct ActionRow {
    id: Uuid,
    certificate_id: Uuid,
    action: String,
    note: Option<String>,
    performed_by_id: Uuid,
    attached_file_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl ActionRow {
    fn into_domain(self) -> CertificateAction {
        CertificateAction::from_db(
            CertificateActionId::from_uuid(self.id),
            CertificateId::from_uuid(self.certificate_id),
            self.action,
            self.note,
            UserId::from_uuid(self.performed_by_id),
            self.attached_file_ids
                .into_iter()
                .map(DocumentId::from_uuid)
                .collect(),
            self.created_at,
        )
    }
}

const SELECT_COLUMNS: &str =
    "id, kind, number, number_to_be_filled_by_certifier, deadline, sent_date, status, \
     client_id, note, owner_id, assigned_to_id, declarant_company_id, certifier_company_id, \
     document_ids, folder_ids, declaration_ids, payment_file_ids, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresCertificateRepository {
    pool: PgPool,
}

impl PostgresCertificateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificateRepository for PostgresCertificateRepository {
    async fn insert(
        &self,
        tx: &mut TxContext,
        certificate: &Certificate,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO certificates (
                id, kind, number, number_to_be_filled_by_certifier, deadline, sent_date,
                status, client_id, note, owner_id, assigned_to_id, declarant_company_id,
                certifier_company_id, document_ids, folder_ids, declaration_ids,
                payment_file_ids, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19)
            "#,
        )
        .bind(certificate.id().as_uuid())
        .bind(certificate.kind())
        .bind(certificate.number())
        .bind(certificate.number_to_be_filled_by_certifier())
        .bind(certificate.deadline())
        .bind(certificate.sent_date())
        .bind(<&str>::from(certificate.status()))
        .bind(certificate.client_id().as_uuid())
        .bind(certificate.note())
        .bind(certificate.owner_id().as_uuid())
        .bind(certificate.assigned_to_id().map(|id| *id.as_uuid()))
        .bind(certificate.declarant_company_id().as_uuid())
        .bind(certificate.certifier_company_id().map(|id| *id.as_uuid()))
        .bind(uuids(certificate.document_ids().iter().map(|id| *id.as_uuid())))
        .bind(uuids(certificate.folder_ids().iter().map(|id| *id.as_uuid())))
        .bind(uuids(certificate.declaration_ids().iter().map(|id| *id.as_uuid())))
        .bind(uuids(certificate.payment_file_ids().iter().map(|id| *id.as_uuid())))
        .bind(certificate.created_at())
        .bind(certificate.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(
        &self,
        tx: &mut TxContext,
        certificate: &Certificate,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE certificates
            SET kind = $2, number = $3, number_to_be_filled_by_certifier = $4,
                deadline = $5, sent_date = $6, status = $7, client_id = $8, note = $9,
                owner_id = $10, assigned_to_id = $11, certifier_company_id = $12,
                document_ids = $13, folder_ids = $14, declaration_ids = $15,
                payment_file_ids = $16, updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(certificate.id().as_uuid())
        .bind(certificate.kind())
        .bind(certificate.number())
        .bind(certificate.number_to_be_filled_by_certifier())
        .bind(certificate.deadline())
        .bind(certificate.sent_date())
        .bind(<&str>::from(certificate.status()))
        .bind(certificate.client_id().as_uuid())
        .bind(certificate.note())
        .bind(certificate.owner_id().as_uuid())
        .bind(certificate.assigned_to_id().map(|id| *id.as_uuid()))
        .bind(certificate.certifier_company_id().map(|id| *id.as_uuid()))
        .bind(uuids(certificate.document_ids().iter().map(|id| *id.as_uuid())))
        .bind(uuids(certificate.folder_ids().iter().map(|id| *id.as_uuid())))
        .bind(uuids(certificate.declaration_ids().iter().map(|id| *id.as_uuid())))
        .bind(uuids(certificate.payment_file_ids().iter().map(|id| *id.as_uuid())))
        .bind(certificate.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &CertificateId) -> Result<Option<Certificate>, InfraError> {
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM certificates WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CertificateRow::into_domain).transpose()
    }

    async fn list_for_company(
        &self,
        company_id: &CompanyId,
        employee: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Certificate>, u64), InfraError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        const COMPANY_PREDICATE: &str =
            "(declarant_company_id = $1 OR certifier_company_id = $1)";

        let (rows, total) = match employee {
            None => {
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM certificates WHERE {COMPANY_PREDICATE}"
                ))
                .bind(company_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, CertificateRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM certificates WHERE {COMPANY_PREDICATE} \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(company_id.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (rows, total)
            }
            Some(user) => {
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM certificates WHERE {COMPANY_PREDICATE} \
                     AND (owner_id = $2 OR assigned_to_id = $2)"
                ))
                .bind(company_id.as_uuid())
                .bind(user.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, CertificateRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM certificates WHERE {COMPANY_PREDICATE} \
                     AND (owner_id = $2 OR assigned_to_id = $2) \
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4"
                ))
                .bind(company_id.as_uuid())
                .bind(user.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (rows, total)
            }
        };

        let certificates = rows
            .into_iter()
            .map(CertificateRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((certificates, total as u64))
    }

    async fn insert_action(
        &self,
        tx: &mut TxContext,
        action: &CertificateAction,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO certificate_actions (
                id, certificate_id, action, note, performed_by_id, attached_file_ids, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(action.id().as_uuid())
        .bind(action.certificate_id().as_uuid())
        .bind(action.action())
        .bind(action.note())
        .bind(action.performed_by_id().as_uuid())
        .bind(uuids(action.attached_file_ids().iter().map(|id| *id.as_uuid())))
        .bind(action.created_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn list_actions(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Vec<CertificateAction>, InfraError> {
        let rows = sqlx::query_as::<_, ActionRow>(
            "SELECT id, certificate_id, action, note, performed_by_id, attached_file_ids, \
             created_at FROM certificate_actions WHERE certificate_id = $1 ORDER BY created_at",
        )
        .bind(certificate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ActionRow::into_domain).collect())
    }

    async fn reassign_owner(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "UPDATE certificates SET owner_id = $3, updated_at = now() \
             WHERE declarant_company_id = $1 AND owner_id = $2",
        )
        .bind(company_id.as_uuid())
        .bind(from.as_uuid())
        .bind(to.as_uuid())
        .execute(tx.conn())
        .await?;
        sqlx::query(
            "UPDATE certificates SET assigned_to_id = NULL, updated_at = now() \
             WHERE certifier_company_id = $1 AND assigned_to_id = $2",
        )
        .bind(company_id.as_uuid())
        .bind(from.as_uuid())
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    async fn delete_by_company(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "DELETE FROM certificate_actions WHERE certificate_id IN \
             (SELECT id FROM certificates WHERE declarant_company_id = $1)",
        )
        .bind(company_id.as_uuid())
        .execute(tx.conn())
        .await?;
        sqlx::query("DELETE FROM certificates WHERE declarant_company_id = $1")
            .bind(company_id.as_uuid())
            .execute(tx.conn())
            .await?;
        // A deleted certifier just disappears from the other side.
        sqlx::query(
            "UPDATE certificates SET certifier_company_id = NULL, assigned_to_id = NULL \
             WHERE certifier_company_id = $1",
        )
        .bind(company_id.as_uuid())
        .execute(tx.conn())
        .await?;
        Ok(())
    }
}

fn uuids(iter: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    iter.collect()
}
