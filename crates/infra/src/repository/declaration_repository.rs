//! # DeclarationRepository
//!
//! Persistence for declarations and declaration groups. Vehicles are
//! stored inline as a jsonb array; attached documents and folders as
//! uuid arrays. List visibility follows the declaration's client: an
//! employee sees a declaration only if they can see its client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use declarant_domain::{
    client::ClientId,
    company::CompanyId,
    declaration::{
        Declaration, DeclarationGroup, DeclarationGroupId, DeclarationId, Vehicle, VehicleKind,
    },
    document::DocumentId,
    folder::FolderId,
    user::UserId,
    value_objects::{DeclarationSerial, PostNumber},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait DeclarationRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, declaration: &Declaration)
    -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, declaration: &Declaration)
    -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &DeclarationId) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &DeclarationId) -> Result<Option<Declaration>, InfraError>;

    /// Lists the company's declarations visible to `viewer`, newest
    /// first, optionally narrowed to one group.
    ///
    /// Visibility is derived from the linked client: `viewer: None`
    /// (privileged) sees everything, an employee sees declarations
    /// whose client is public, owned by them, or shared with them.
    async fn list_for_company(
        &self,
        company_id: &CompanyId,
        viewer: Option<&UserId>,
        group_id: Option<&DeclarationGroupId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Declaration>, u64), InfraError>;

    async fn insert_group(
        &self,
        tx: &mut TxContext,
        group: &DeclarationGroup,
    ) -> Result<(), InfraError>;

    /// Deletes the group; member declarations keep existing ungrouped.
    async fn delete_group(
        &self,
        tx: &mut TxContext,
        id: &DeclarationGroupId,
    ) -> Result<(), InfraError>;

    async fn find_group_by_id(
        &self,
        id: &DeclarationGroupId,
    ) -> Result<Option<DeclarationGroup>, InfraError>;

    async fn list_groups(&self, company_id: &CompanyId)
    -> Result<Vec<DeclarationGroup>, InfraError>;

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

/// Stored form of a vehicle inside the jsonb column.
#[derive(Serialize, Deserialize)]
struct VehicleRecord {
    number: String,
    kind:   String,
}

fn vehicles_to_json(vehicles: &[Vehicle]) -> Result<serde_json::Value, InfraError> {
    let records: Vec<VehicleRecord> = vehicles
        .iter()
        .map(|v| VehicleRecord {
            number: v.number().to_string(),
            kind:   v.kind().code().to_string(),
        })
        .collect();
    Ok(serde_json::to_value(records)?)
}

fn vehicles_from_json(value: serde_json::Value) -> Result<Vec<Vehicle>, InfraError> {
    let records: Vec<VehicleRecord> = serde_json::from_value(value)?;
    records
        .into_iter()
        .map(|r| {
            let kind = VehicleKind::from_code(&r.kind)
                .map_err(|e| InfraError::unexpected(e.to_string()))?;
            Vehicle::new(r.number, kind).map_err(|e| InfraError::unexpected(e.to_string()))
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct DeclarationRow {
    id: Uuid,
    post_number: String,
    date: NaiveDate,
    serial: String,
    client_id: Uuid,
    mode: String,
    note: Option<String>,
    group_id: Option<Uuid>,
    vehicles: serde_json::Value,
    document_ids: Vec<Uuid>,
    folder_ids: Vec<Uuid>,
    owner_id: Uuid,
    company_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeclarationRow {
    fn into_domain(self) -> Result<Declaration, InfraError> {
        Ok(Declaration::from_db(
            DeclarationId::from_uuid(self.id),
            PostNumber::new(self.post_number)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.date,
            DeclarationSerial::new(self.serial)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            ClientId::from_uuid(self.client_id),
            self.mode,
            self.note,
            self.group_id.map(DeclarationGroupId::from_uuid),
            vehicles_from_json(self.vehicles)?,
            self.document_ids
                .into_iter()
                .map(DocumentId::from_uuid)
                .collect(),
            self.folder_ids.into_iter().map(FolderId::from_uuid).collect(),
            UserId::from_uuid(self.owner_id),
            CompanyId::from_uuid(self.company_id),
            self.created_at,
            self.updated_at,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    company_id: Uuid,
    created_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_domain(self) -> DeclarationGroup {
        DeclarationGroup::from_db(
            DeclarationGroupId::from_uuid(self.id),
            self.name,
            CompanyId::from_uuid(self.company_id),
            self.created_at,
        )
    }
}

const SELECT_COLUMNS: &str = "d.id, d.post_number, d.date, d.serial, d.client_id, d.mode, \
                              d.note, d.group_id, d.vehicles, d.document_ids, d.folder_ids, \
                              d.owner_id, d.company_id, d.created_at, d.updated_at";

/// `viewer` is bound as $2; joined against the declaration's client.
const CLIENT_VISIBILITY_PREDICATE: &str =
    "(c.access_type = 'public' OR c.owner_id = $2 \
     OR (c.access_type = 'selected' AND $2 = ANY(c.allowed_user_ids)) OR d.owner_id = $2)";

#[derive(Debug, Clone)]
pub struct PostgresDeclarationRepository {
    pool: PgPool,
}

impl PostgresDeclarationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeclarationRepository for PostgresDeclarationRepository {
    async fn insert(
        &self,
        tx: &mut TxContext,
        declaration: &Declaration,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO declarations (
                id, post_number, date, serial, client_id, mode, note, group_id,
                vehicles, document_ids, folder_ids, owner_id, company_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(declaration.id().as_uuid())
        .bind(declaration.post_number().as_str())
        .bind(declaration.date())
        .bind(declaration.serial().as_str())
        .bind(declaration.client_id().as_uuid())
        .bind(declaration.mode())
        .bind(declaration.note())
        .bind(declaration.group_id().map(|id| *id.as_uuid()))
        .bind(vehicles_to_json(declaration.vehicles())?)
        .bind(
            declaration
                .document_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(
            declaration
                .folder_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(declaration.owner_id().as_uuid())
        .bind(declaration.company_id().as_uuid())
        .bind(declaration.created_at())
        .bind(declaration.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(
        &self,
        tx: &mut TxContext,
        declaration: &Declaration,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE declarations
            SET post_number = $2, date = $3, serial = $4, client_id = $5, mode = $6,
                note = $7, group_id = $8, vehicles = $9, document_ids = $10,
                folder_ids = $11, owner_id = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(declaration.id().as_uuid())
        .bind(declaration.post_number().as_str())
        .bind(declaration.date())
        .bind(declaration.serial().as_str())
        .bind(declaration.client_id().as_uuid())
        .bind(declaration.mode())
        .bind(declaration.note())
        .bind(declaration.group_id().map(|id| *id.as_uuid()))
        .bind(vehicles_to_json(declaration.vehicles())?)
        .bind(
            declaration
                .document_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(
            declaration
                .folder_ids()
                .iter()
                .map(|id| *id.as_uuid())
                .collect::<Vec<Uuid>>(),
        )
        .bind(declaration.owner_id().as_uuid())
        .bind(declaration.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn delete(&self, tx: &mut TxContext, id: &DeclarationId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM declarations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &DeclarationId) -> Result<Option<Declaration>, InfraError> {
        let row = sqlx::query_as::<_, DeclarationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM declarations d WHERE d.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DeclarationRow::into_domain).transpose()
    }

    async fn list_for_company(
        &self,
        company_id: &CompanyId,
        viewer: Option<&UserId>,
        group_id: Option<&DeclarationGroupId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Declaration>, u64), InfraError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);

        // Four predicate shapes; parameters are positional so each arm
        // builds its own query text.
        let (rows, total) = match (viewer, group_id) {
            (None, None) => {
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM declarations WHERE company_id = $1")
                        .bind(company_id.as_uuid())
                        .fetch_one(&self.pool)
                        .await?;
                let rows = sqlx::query_as::<_, DeclarationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM declarations d WHERE d.company_id = $1 \
                     ORDER BY d.created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(company_id.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (rows, total)
            }
            (None, Some(group)) => {
                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM declarations WHERE company_id = $1 AND group_id = $2",
                )
                .bind(company_id.as_uuid())
                .bind(group.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, DeclarationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM declarations d \
                     WHERE d.company_id = $1 AND d.group_id = $2 \
                     ORDER BY d.created_at DESC LIMIT $3 OFFSET $4"
                ))
                .bind(company_id.as_uuid())
                .bind(group.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (rows, total)
            }
            (Some(viewer), None) => {
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM declarations d \
                     JOIN clients c ON c.id = d.client_id \
                     WHERE d.company_id = $1 AND {CLIENT_VISIBILITY_PREDICATE}"
                ))
                .bind(company_id.as_uuid())
                .bind(viewer.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, DeclarationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM declarations d \
                     JOIN clients c ON c.id = d.client_id \
                     WHERE d.company_id = $1 AND {CLIENT_VISIBILITY_PREDICATE} \
                     ORDER BY d.created_at DESC LIMIT $3 OFFSET $4"
                ))
                .bind(company_id.as_uuid())
                .bind(viewer.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (rows, total)
            }
            (Some(viewer), Some(group)) => {
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM declarations d \
                     JOIN clients c ON c.id = d.client_id \
                     WHERE d.company_id = $1 AND {CLIENT_VISIBILITY_PREDICATE} \
                     AND d.group_id = $3"
                ))
                .bind(company_id.as_uuid())
                .bind(viewer.as_uuid())
                .bind(group.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, DeclarationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM declarations d \
                     JOIN clients c ON c.id = d.client_id \
                     WHERE d.company_id = $1 AND {CLIENT_VISIBILITY_PREDICATE} \
                     AND d.group_id = $3 \
                     ORDER BY d.created_at DESC LIMIT $4 OFFSET $5"
                ))
                .bind(company_id.as_uuid())
                .bind(viewer.as_uuid())
                .bind(group.as_uuid())
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                (rows, total)
            }
        };

        let declarations = rows
            .into_iter()
            .map(DeclarationRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((declarations, total as u64))
    }

    async fn insert_group(
        &self,
        tx: &mut TxContext,
        group: &DeclarationGroup,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "INSERT INTO declaration_groups (id, name, company_id, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(group.id().as_uuid())
        .bind(group.name())
        .bind(group.company_id().as_uuid())
        .bind(group.created_at())
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    async fn delete_group(
        &self,
        tx: &mut TxContext,
        id: &DeclarationGroupId,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE declarations SET group_id = NULL WHERE group_id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        sqlx::query("DELETE FROM declaration_groups WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_group_by_id(
        &self,
        id: &DeclarationGroupId,
    ) -> Result<Option<DeclarationGroup>, InfraError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, company_id, created_at FROM declaration_groups WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GroupRow::into_domain))
    }

    async fn list_groups(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<DeclarationGroup>, InfraError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, company_id, created_at FROM declaration_groups \
             WHERE company_id = $1 ORDER BY name",
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GroupRow::into_domain).collect())
    }

    async fn reassign_owner(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "UPDATE declarations SET owner_id = $3, updated_at = now() \
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
        sqlx::query("DELETE FROM declarations WHERE company_id = $1")
            .bind(company_id.as_uuid())
            .execute(tx.conn())
            .await?;
        sqlx::query("DELETE FROM declaration_groups WHERE company_id = $1")
            .bind(company_id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }
}
