//! # ClientRepository
//!
//! Persistence for client records. Visibility filtering happens in SQL:
//! privileged viewers see the whole company, employees see public
//! clients, their own, and those they are explicitly allowed into.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    client::{Client, ClientId},
    company::CompanyId,
    user::UserId,
    value_objects::AccessType,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, client: &Client) -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, client: &Client) -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &ClientId) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, InfraError>;

    /// Lists the company's clients visible to `viewer`, newest first.
    ///
    /// `viewer: None` means a privileged viewer: no visibility filter.
    /// Returns the page plus the total count before paging.
    async fn list_visible(
        &self,
        company_id: &CompanyId,
        viewer: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Client>, u64), InfraError>;

    /// Moves ownership of every client owned by `from` to `to`.
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
struct ClientRow {
    id: Uuid,
    company_name: String,
    inn: String,
    director_name: Option<String>,
    note: Option<String>,
    access_type: String,
    allowed_user_ids: Vec<Uuid>,
    owner_id: Uuid,
    company_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRow {
    fn into_domain(self) -> Result<Client, InfraError> {
        Ok(Client::from_db(
            ClientId::from_uuid(self.id),
            self.company_name,
            self.inn,
            self.director_name,
            self.note,
            self.access_type
                .parse::<AccessType>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.allowed_user_ids
                .into_iter()
                .map(UserId::from_uuid)
                .collect(),
            UserId::from_uuid(self.owner_id),
            CompanyId::from_uuid(self.company_id),
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, company_name, inn, director_name, note, access_type, \
                              allowed_user_ids, owner_id, company_id, created_at, updated_at";

/// `viewer` is bound as $2.
const VISIBILITY_PREDICATE: &str = "(access_type = 'public' OR owner_id = $2 \
                                    OR (access_type = 'selected' AND $2 = ANY(allowed_user_ids)))";

#[derive(Debug, Clone)]
pub struct PostgresClientRepository {
    pool: PgPool,
}

impl PostgresClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for PostgresClientRepository {
    async fn insert(&self, tx: &mut TxContext, client: &Client) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO clients (
                id, company_name, inn, director_name, note, access_type,
                allowed_user_ids, owner_id, company_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(client.id().as_uuid())
        .bind(client.company_name())
        .bind(client.inn())
        .bind(client.director_name())
        .bind(client.note())
        .bind(<&str>::from(client.access_type()))
        .bind(
            client
                .allowed_user_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(client.owner_id().as_uuid())
        .bind(client.company_id().as_uuid())
        .bind(client.created_at())
        .bind(client.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, client: &Client) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE clients
            SET company_name = $2, inn = $3, director_name = $4, note = $5,
                access_type = $6, allowed_user_ids = $7, owner_id = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(client.id().as_uuid())
        .bind(client.company_name())
        .bind(client.inn())
        .bind(client.director_name())
        .bind(client.note())
        .bind(<&str>::from(client.access_type()))
        .bind(
            client
                .allowed_user_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(client.owner_id().as_uuid())
        .bind(client.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn delete(&self, tx: &mut TxContext, id: &ClientId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, InfraError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ClientRow::into_domain).transpose()
    }

    async fn list_visible(
        &self,
        company_id: &CompanyId,
        viewer: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Client>, u64), InfraError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);

        let (rows, total) = match viewer {
            None => {
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE company_id = $1")
                        .bind(company_id.as_uuid())
                        .fetch_one(&self.pool)
                        .await?;

                let rows = sqlx::query_as::<_, ClientRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM clients WHERE company_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(company_id.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                (rows, total)
            }
            Some(viewer) => {
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM clients WHERE company_id = $1 AND {VISIBILITY_PREDICATE}"
                ))
                .bind(company_id.as_uuid())
                .bind(viewer.as_uuid())
                .fetch_one(&self.pool)
                .await?;

                let rows = sqlx::query_as::<_, ClientRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM clients \
                     WHERE company_id = $1 AND {VISIBILITY_PREDICATE} \
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4"
                ))
                .bind(company_id.as_uuid())
                .bind(viewer.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                (rows, total)
            }
        };

        let clients = rows
            .into_iter()
            .map(ClientRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((clients, total as u64))
    }

    async fn reassign_owner(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "UPDATE clients SET owner_id = $3, updated_at = now() \
             WHERE company_id = $1 AND owner_id = $2",
        )
        .bind(company_id.as_uuid())
        .bind(from.as_uuid())
        .bind(to.as_uuid())
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    async fn delete_by_company(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM clients WHERE company_id = $1")
            .bind(company_id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }
}
