//! # PartnershipRepository
//!
//! Persistence for company partnerships. The pair is unordered: a
//! unique index on `(LEAST(a, b), GREATEST(a, b))` for non-rejected
//! rows backs the lookup done in [`find_between`].
//!
//! [`find_between`]: PartnershipRepository::find_between

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    company::CompanyId,
    partnership::{Partnership, PartnershipId, PartnershipStatus},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait PartnershipRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, partnership: &Partnership)
    -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, partnership: &Partnership)
    -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &PartnershipId) -> Result<Option<Partnership>, InfraError>;

    /// The latest non-rejected partnership between the two companies,
    /// in either direction.
    async fn find_between(
        &self,
        a: &CompanyId,
        b: &CompanyId,
    ) -> Result<Option<Partnership>, InfraError>;

    /// All partnerships the company takes part in, newest first.
    async fn list_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Partnership>, InfraError>;

    /// Incoming requests awaiting the company's decision.
    async fn list_pending_for_target(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Partnership>, InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &PartnershipId) -> Result<(), InfraError>;

    async fn delete_by_company(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct PartnershipRow {
    id: Uuid,
    requesting_company_id: Uuid,
    target_company_id: Uuid,
    note: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PartnershipRow {
    fn into_domain(self) -> Result<Partnership, InfraError> {
        Ok(Partnership::from_db(
            PartnershipId::from_uuid(self.id),
            CompanyId::from_uuid(self.requesting_company_id),
            CompanyId::from_uuid(self.target_company_id),
            self.note,
            self.status
                .parse::<PartnershipStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, requesting_company_id, target_company_id, note, status, \
                              created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresPartnershipRepository {
    pool: PgPool,
}

impl PostgresPartnershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PartnershipRepository for PostgresPartnershipRepository {
    async fn insert(
        &self,
        tx: &mut TxContext,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO partnerships (
                id, requesting_company_id, target_company_id, note, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(partnership.id().as_uuid())
        .bind(partnership.requesting_company_id().as_uuid())
        .bind(partnership.target_company_id().as_uuid())
        .bind(partnership.note())
        .bind(<&str>::from(partnership.status()))
        .bind(partnership.created_at())
        .bind(partnership.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(
        &self,
        tx: &mut TxContext,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE partnerships SET note = $2, status = $3, updated_at = $4 WHERE id = $1")
            .bind(partnership.id().as_uuid())
            .bind(partnership.note())
            .bind(<&str>::from(partnership.status()))
            .bind(partnership.updated_at())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &PartnershipId) -> Result<Option<Partnership>, InfraError> {
        let row = sqlx::query_as::<_, PartnershipRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM partnerships WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PartnershipRow::into_domain).transpose()
    }

    async fn find_between(
        &self,
        a: &CompanyId,
        b: &CompanyId,
    ) -> Result<Option<Partnership>, InfraError> {
        let row = sqlx::query_as::<_, PartnershipRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM partnerships \
             WHERE status <> 'rejected' \
             AND ((requesting_company_id = $1 AND target_company_id = $2) \
              OR (requesting_company_id = $2 AND target_company_id = $1)) \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(a.as_uuid())
        .bind(b.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PartnershipRow::into_domain).transpose()
    }

    async fn list_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Partnership>, InfraError> {
        let rows = sqlx::query_as::<_, PartnershipRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM partnerships \
             WHERE requesting_company_id = $1 OR target_company_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PartnershipRow::into_domain).collect()
    }

    async fn list_pending_for_target(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Partnership>, InfraError> {
        let rows = sqlx::query_as::<_, PartnershipRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM partnerships \
             WHERE target_company_id = $1 AND status = 'pending' \
             ORDER BY created_at DESC"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PartnershipRow::into_domain).collect()
    }

    async fn delete(&self, tx: &mut TxContext, id: &PartnershipId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM partnerships WHERE id = $1")
            .bind(id.as_uuid())
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
            "DELETE FROM partnerships WHERE requesting_company_id = $1 OR target_company_id = $1",
        )
        .bind(company_id.as_uuid())
        .execute(tx.conn())
        .await?;
        Ok(())
    }
}
