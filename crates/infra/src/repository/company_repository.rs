//! # CompanyRepository
//!
//! Persistence for companies. INN uniqueness is enforced by a unique
//! index. Deleting a company cascades nothing here: the usecase layer
//! removes owned resources explicitly inside the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    company::{Company, CompanyId},
    user::UserId,
    value_objects::{ActivityType, Inn},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, company: &Company) -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, company: &Company) -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &CompanyId) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, InfraError>;

    async fn find_by_inn(&self, inn: &Inn) -> Result<Option<Company>, InfraError>;

    async fn list_all(&self) -> Result<Vec<Company>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    inn: String,
    activity_type: String,
    is_blocked: bool,
    director_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_domain(self) -> Result<Company, InfraError> {
        Ok(Company::from_db(
            CompanyId::from_uuid(self.id),
            self.name,
            Inn::new(self.inn).map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.activity_type
                .parse::<ActivityType>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.is_blocked,
            self.director_id.map(UserId::from_uuid),
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str =
    "id, name, inn, activity_type, is_blocked, director_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresCompanyRepository {
    pool: PgPool,
}

impl PostgresCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PostgresCompanyRepository {
    async fn insert(&self, tx: &mut TxContext, company: &Company) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO companies (
                id, name, inn, activity_type, is_blocked, director_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(company.id().as_uuid())
        .bind(company.name())
        .bind(company.inn().as_str())
        .bind(<&str>::from(company.activity_type()))
        .bind(company.is_blocked())
        .bind(company.director_id().map(|id| *id.as_uuid()))
        .bind(company.created_at())
        .bind(company.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, company: &Company) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE companies
            SET name = $2, inn = $3, activity_type = $4, is_blocked = $5,
                director_id = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(company.id().as_uuid())
        .bind(company.name())
        .bind(company.inn().as_str())
        .bind(<&str>::from(company.activity_type()))
        .bind(company.is_blocked())
        .bind(company.director_id().map(|id| *id.as_uuid()))
        .bind(company.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn delete(&self, tx: &mut TxContext, id: &CompanyId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, InfraError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM companies WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CompanyRow::into_domain).transpose()
    }

    async fn find_by_inn(&self, inn: &Inn) -> Result<Option<Company>, InfraError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM companies WHERE inn = $1"
        ))
        .bind(inn.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CompanyRow::into_domain).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Company>, InfraError> {
        let rows = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM companies ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CompanyRow::into_domain).collect()
    }
}
