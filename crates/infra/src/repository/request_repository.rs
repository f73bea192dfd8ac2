//! # RequestRepository
//!
//! Persistence for approval requests: company registration (decided by
//! the platform admin) and employee join (decided by the target
//! company's management).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    company::CompanyId,
    request::{Request, RequestId, RequestStatus, RequestType},
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, request: &Request) -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, request: &Request) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, InfraError>;

    /// Pending join requests addressed to the company.
    async fn list_pending_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Request>, InfraError>;

    /// Pending company registrations, for the admin queue.
    async fn list_pending_registrations(&self) -> Result<Vec<Request>, InfraError>;

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Request>, InfraError>;

    /// Whether the user already has an unresolved request of any type.
    async fn has_pending_for_user(&self, user_id: &UserId) -> Result<bool, InfraError>;
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    request_type: String,
    status: String,
    user_id: Uuid,
    company_id: Uuid,
    target_company_id: Option<Uuid>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_domain(self) -> Result<Request, InfraError> {
        Ok(Request::from_db(
            RequestId::from_uuid(self.id),
            self.request_type
                .parse::<RequestType>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.status
                .parse::<RequestStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            UserId::from_uuid(self.user_id),
            CompanyId::from_uuid(self.company_id),
            self.target_company_id.map(CompanyId::from_uuid),
            self.note,
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, request_type, status, user_id, company_id, target_company_id, \
                              note, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresRequestRepository {
    pool: PgPool,
}

impl PostgresRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestRepository for PostgresRequestRepository {
    async fn insert(&self, tx: &mut TxContext, request: &Request) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO requests (
                id, request_type, status, user_id, company_id, target_company_id,
                note, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(<&str>::from(request.request_type()))
        .bind(<&str>::from(request.status()))
        .bind(request.user_id().as_uuid())
        .bind(request.company_id().as_uuid())
        .bind(request.target_company_id().map(|id| *id.as_uuid()))
        .bind(request.note())
        .bind(request.created_at())
        .bind(request.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, request: &Request) -> Result<(), InfraError> {
        sqlx::query("UPDATE requests SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(request.id().as_uuid())
            .bind(<&str>::from(request.status()))
            .bind(request.updated_at())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, InfraError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RequestRow::into_domain).transpose()
    }

    async fn list_pending_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Request>, InfraError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM requests \
             WHERE target_company_id = $1 AND status = 'pending' \
             AND request_type = 'employee_join' \
             ORDER BY created_at DESC"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RequestRow::into_domain).collect()
    }

    async fn list_pending_registrations(&self) -> Result<Vec<Request>, InfraError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM requests \
             WHERE status = 'pending' AND request_type = 'company_registration' \
             ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RequestRow::into_domain).collect()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Request>, InfraError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM requests WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RequestRow::into_domain).collect()
    }

    async fn has_pending_for_user(&self, user_id: &UserId) -> Result<bool, InfraError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM requests WHERE user_id = $1 AND status = 'pending')",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
