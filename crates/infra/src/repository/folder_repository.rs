//! # FolderRepository
//!
//! Persistence for folders. The parent chain walk for cycle detection
//! lives in the usecase layer; here a folder is just a row with an
//! optional parent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    client::ClientId,
    company::CompanyId,
    folder::{Folder, FolderId},
    user::UserId,
    value_objects::AccessType,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait FolderRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, folder: &Folder) -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, folder: &Folder) -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &FolderId) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &FolderId) -> Result<Option<Folder>, InfraError>;

    async fn list_for_company(&self, company_id: &CompanyId) -> Result<Vec<Folder>, InfraError>;

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Folder>, InfraError>;

    async fn count_children(&self, id: &FolderId) -> Result<u64, InfraError>;

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
struct FolderRow {
    id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    access_type: String,
    allowed_user_ids: Vec<Uuid>,
    client_id: Option<Uuid>,
    owner_id: Uuid,
    company_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FolderRow {
    fn into_domain(self) -> Result<Folder, InfraError> {
        Ok(Folder::from_db(
            FolderId::from_uuid(self.id),
            self.name,
            self.parent_id.map(FolderId::from_uuid),
            self.access_type
                .parse::<AccessType>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.allowed_user_ids
                .into_iter()
                .map(UserId::from_uuid)
                .collect(),
            self.client_id.map(ClientId::from_uuid),
            UserId::from_uuid(self.owner_id),
            CompanyId::from_uuid(self.company_id),
            self.created_at,
            self.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, name, parent_id, access_type, allowed_user_ids, client_id, \
                              owner_id, company_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresFolderRepository {
    pool: PgPool,
}

impl PostgresFolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderRepository for PostgresFolderRepository {
    async fn insert(&self, tx: &mut TxContext, folder: &Folder) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO folders (
                id, name, parent_id, access_type, allowed_user_ids, client_id,
                owner_id, company_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(folder.id().as_uuid())
        .bind(folder.name())
        .bind(folder.parent_id().map(|id| *id.as_uuid()))
        .bind(<&str>::from(folder.access_type()))
        .bind(
            folder
                .allowed_user_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(folder.client_id().map(|id| *id.as_uuid()))
        .bind(folder.owner_id().as_uuid())
        .bind(folder.company_id().as_uuid())
        .bind(folder.created_at())
        .bind(folder.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, folder: &Folder) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE folders
            SET name = $2, parent_id = $3, access_type = $4, allowed_user_ids = $5,
                owner_id = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(folder.id().as_uuid())
        .bind(folder.name())
        .bind(folder.parent_id().map(|id| *id.as_uuid()))
        .bind(<&str>::from(folder.access_type()))
        .bind(
            folder
                .allowed_user_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(folder.owner_id().as_uuid())
        .bind(folder.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn delete(&self, tx: &mut TxContext, id: &FolderId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &FolderId) -> Result<Option<Folder>, InfraError> {
        let row = sqlx::query_as::<_, FolderRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM folders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(FolderRow::into_domain).transpose()
    }

    async fn list_for_company(&self, company_id: &CompanyId) -> Result<Vec<Folder>, InfraError> {
        let rows = sqlx::query_as::<_, FolderRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM folders WHERE company_id = $1 ORDER BY name"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FolderRow::into_domain).collect()
    }

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Folder>, InfraError> {
        let rows = sqlx::query_as::<_, FolderRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM folders WHERE client_id = $1 ORDER BY name"
        ))
        .bind(client_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FolderRow::into_domain).collect()
    }

    async fn count_children(&self, id: &FolderId) -> Result<u64, InfraError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE parent_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn reassign_owner(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "UPDATE folders SET owner_id = $3, updated_at = now() \
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
        sqlx::query("DELETE FROM folders WHERE company_id = $1")
            .bind(company_id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }
}
