//! # DocumentRepository
//!
//! Persistence for document metadata. File content lives in
//! [`crate::storage`]; only the URL is stored here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    client::ClientId,
    company::CompanyId,
    document::{Document, DocumentId},
    folder::FolderId,
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &DocumentId) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, InfraError>;

    async fn find_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<Document>, InfraError>;

    /// Documents in a folder, or at the root when `folder_id` is None.
    async fn list_in_folder(
        &self,
        company_id: &CompanyId,
        folder_id: Option<&FolderId>,
    ) -> Result<Vec<Document>, InfraError>;

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Document>, InfraError>;

    async fn count_in_folder(&self, folder_id: &FolderId) -> Result<u64, InfraError>;

    async fn reassign_owner(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError>;

    /// Returns the deleted URLs so the caller can clean up storage.
    async fn delete_by_company(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<Vec<String>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    name: String,
    file_url: String,
    file_type: String,
    file_size: i64,
    folder_id: Option<Uuid>,
    client_id: Option<Uuid>,
    owner_id: Uuid,
    company_id: Uuid,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_domain(self) -> Document {
        Document::from_db(
            DocumentId::from_uuid(self.id),
            self.name,
            self.file_url,
            self.file_type,
            self.file_size,
            self.folder_id.map(FolderId::from_uuid),
            self.client_id.map(ClientId::from_uuid),
            UserId::from_uuid(self.owner_id),
            CompanyId::from_uuid(self.company_id),
            self.created_at,
        )
    }
}

const SELECT_COLUMNS: &str = "id, name, file_url, file_type, file_size, folder_id, client_id, \
                              owner_id, company_id, created_at";

#[derive(Debug, Clone)]
pub struct PostgresDocumentRepository {
    pool: PgPool,
}

impl PostgresDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    async fn insert(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO documents (
                id, name, file_url, file_type, file_size, folder_id, client_id,
                owner_id, company_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(document.id().as_uuid())
        .bind(document.name())
        .bind(document.file_url())
        .bind(document.file_type())
        .bind(document.file_size())
        .bind(document.folder_id().map(|id| *id.as_uuid()))
        .bind(document.client_id().map(|id| *id.as_uuid()))
        .bind(document.owner_id().as_uuid())
        .bind(document.company_id().as_uuid())
        .bind(document.created_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        sqlx::query("UPDATE documents SET name = $2, folder_id = $3, owner_id = $4 WHERE id = $1")
            .bind(document.id().as_uuid())
            .bind(document.name())
            .bind(document.folder_id().map(|id| *id.as_uuid()))
            .bind(document.owner_id().as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn delete(&self, tx: &mut TxContext, id: &DocumentId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, InfraError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DocumentRow::into_domain))
    }

    async fn find_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<Document>, InfraError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DocumentRow::into_domain).collect())
    }

    async fn list_in_folder(
        &self,
        company_id: &CompanyId,
        folder_id: Option<&FolderId>,
    ) -> Result<Vec<Document>, InfraError> {
        let rows = match folder_id {
            Some(folder) => {
                sqlx::query_as::<_, DocumentRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM documents \
                     WHERE company_id = $1 AND folder_id = $2 ORDER BY name"
                ))
                .bind(company_id.as_uuid())
                .bind(folder.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DocumentRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM documents \
                     WHERE company_id = $1 AND folder_id IS NULL ORDER BY name"
                ))
                .bind(company_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(DocumentRow::into_domain).collect())
    }

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Document>, InfraError> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE client_id = $1 ORDER BY name"
        ))
        .bind(client_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DocumentRow::into_domain).collect())
    }

    async fn count_in_folder(&self, folder_id: &FolderId) -> Result<u64, InfraError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE folder_id = $1")
            .bind(folder_id.as_uuid())
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
            "UPDATE documents SET owner_id = $3 WHERE company_id = $1 AND owner_id = $2",
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
    ) -> Result<Vec<String>, InfraError> {
        let urls: Vec<String> = sqlx::query_scalar(
            "DELETE FROM documents WHERE company_id = $1 RETURNING file_url",
        )
        .bind(company_id.as_uuid())
        .fetch_all(tx.conn())
        .await?;
        Ok(urls)
    }
}
