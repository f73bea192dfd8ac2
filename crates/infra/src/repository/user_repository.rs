//! # UserRepository
//!
//! Persistence for user accounts. Email uniqueness is enforced by a
//! unique index; a violation surfaces as `InfraErrorKind::Database`
//! and is translated to a conflict at the usecase layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    company::CompanyId,
    user::{Role, User, UserId},
    value_objects::{ActivityType, Email},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, user: &User) -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, user: &User) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError>;

    /// Missing ids are skipped; the result order is unspecified.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError>;

    async fn find_by_company(&self, company_id: &CompanyId) -> Result<Vec<User>, InfraError>;

    /// The single platform administrator account, if provisioned.
    async fn find_admin(&self) -> Result<Option<User>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: String,
    phone: String,
    activity_type: String,
    role: String,
    company_id: Option<Uuid>,
    is_blocked: bool,
    avatar_url: Option<String>,
    telegram_chat_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_domain(self) -> Result<User, InfraError> {
        Ok(User::from_db(
            UserId::from_uuid(self.id),
            Email::new(self.email).map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.password_hash,
            self.full_name,
            self.phone,
            self.activity_type
                .parse::<ActivityType>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.role
                .parse::<Role>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.company_id.map(CompanyId::from_uuid),
            self.is_blocked,
            self.avatar_url,
            self.telegram_chat_id,
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, email, password_hash, full_name, phone, activity_type, role, \
                              company_id, is_blocked, avatar_url, telegram_chat_id, created_at, \
                              updated_at";

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, tx: &mut TxContext, user: &User) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name, phone, activity_type, role,
                company_id, is_blocked, avatar_url, telegram_chat_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email().as_str())
        .bind(user.password_hash())
        .bind(user.full_name())
        .bind(user.phone())
        .bind(<&str>::from(user.activity_type()))
        .bind(<&str>::from(user.role()))
        .bind(user.company_id().map(|id| *id.as_uuid()))
        .bind(user.is_blocked())
        .bind(user.avatar_url())
        .bind(user.telegram_chat_id())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, user: &User) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, full_name = $4, phone = $5,
                activity_type = $6, role = $7, company_id = $8, is_blocked = $9,
                avatar_url = $10, telegram_chat_id = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email().as_str())
        .bind(user.password_hash())
        .bind(user.full_name())
        .bind(user.phone())
        .bind(<&str>::from(user.activity_type()))
        .bind(<&str>::from(user.role()))
        .bind(user.company_id().map(|id| *id.as_uuid()))
        .bind(user.is_blocked())
        .bind(user.avatar_url())
        .bind(user.telegram_chat_id())
        .bind(user.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_domain).collect()
    }

    async fn find_by_company(&self, company_id: &CompanyId) -> Result<Vec<User>, InfraError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE company_id = $1 ORDER BY full_name"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_domain).collect()
    }

    async fn find_admin(&self) -> Result<Option<User>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE role = 'admin' LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }
}
