//! # TaskRepository
//!
//! Persistence for tasks and their status-change history. Incoming and
//! outgoing lists are split by which side of the task the company is
//! on; history rows are append-only.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use declarant_domain::{
    certificate::CertificateId,
    company::CompanyId,
    declaration::DeclarationId,
    document::DocumentId,
    task::{Task, TaskId, TaskPriority, TaskStatus, TaskStatusChange, TaskStatusChangeId},
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, task: &Task) -> Result<(), InfraError>;

    async fn update(&self, tx: &mut TxContext, task: &Task) -> Result<(), InfraError>;

    async fn delete(&self, tx: &mut TxContext, id: &TaskId) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, InfraError>;

    /// Tasks addressed to the company, newest first. `assignee: Some`
    /// narrows to tasks for that employee or unassigned ones.
    async fn list_incoming(
        &self,
        company_id: &CompanyId,
        assignee: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), InfraError>;

    /// Tasks created by the company, newest first. `creator: Some`
    /// narrows to tasks the user created themselves.
    async fn list_outgoing(
        &self,
        company_id: &CompanyId,
        creator: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), InfraError>;

    async fn insert_status_change(
        &self,
        tx: &mut TxContext,
        change: &TaskStatusChange,
    ) -> Result<(), InfraError>;

    /// History, oldest first.
    async fn list_status_changes(
        &self,
        task_id: &TaskId,
    ) -> Result<Vec<TaskStatusChange>, InfraError>;

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
struct TaskRow {
    id: Uuid,
    name: String,
    note: Option<String>,
    priority: String,
    status: String,
    deadline: Option<NaiveDate>,
    target_company_id: Uuid,
    target_employee_id: Option<Uuid>,
    created_by_user_id: Uuid,
    created_by_company_id: Uuid,
    document_ids: Vec<Uuid>,
    declaration_ids: Vec<Uuid>,
    certificate_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn into_domain(self) -> Result<Task, InfraError> {
        Ok(Task::from_db(
            TaskId::from_uuid(self.id),
            self.name,
            self.note,
            self.priority
                .parse::<TaskPriority>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.status
                .parse::<TaskStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.deadline,
            CompanyId::from_uuid(self.target_company_id),
            self.target_employee_id.map(UserId::from_uuid),
            UserId::from_uuid(self.created_by_user_id),
            CompanyId::from_uuid(self.created_by_company_id),
            self.document_ids
                .into_iter()
                .map(DocumentId::from_uuid)
                .collect(),
            self.declaration_ids
                .into_iter()
                .map(DeclarationId::from_uuid)
                .collect(),
            self.certificate_ids
                .into_iter()
                .map(CertificateId::from_uuid)
                .collect(),
            self.created_at,
            self.updated_at,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct StatusChangeRow {
    id: Uuid,
    task_id: Uuid,
    from_status: String,
    to_status: String,
    changed_by_id: Uuid,
    created_at: DateTime<Utc>,
}

impl StatusChangeRow {
    fn into_domain(self) -> Result<TaskStatusChange, InfraError> {
        Ok(TaskStatusChange::from_db(
            TaskStatusChangeId::from_uuid(self.id),
            TaskId::from_uuid(self.task_id),
            self.from_status
                .parse::<TaskStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.to_status
                .parse::<TaskStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            UserId::from_uuid(self.changed_by_id),
            self.created_at,
        ))
    }
}

const SELECT_COLUMNS: &str =
    "id, name, note, priority, status, deadline, target_company_id, target_employee_id, \
     created_by_user_id, created_by_company_id, document_ids, declaration_ids, \
     certificate_ids, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_page(
        &self,
        predicate: &str,
        company_id: &CompanyId,
        user: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), InfraError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);

        let (rows, total) = match user {
            None => {
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM tasks WHERE {predicate}"
                ))
                .bind(company_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, TaskRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM tasks WHERE {predicate} \
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
                    "SELECT COUNT(*) FROM tasks WHERE {predicate}"
                ))
                .bind(company_id.as_uuid())
                .bind(user.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                let rows = sqlx::query_as::<_, TaskRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM tasks WHERE {predicate} \
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

        let tasks = rows
            .into_iter()
            .map(TaskRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((tasks, total as u64))
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn insert(&self, tx: &mut TxContext, task: &Task) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, name, note, priority, status, deadline, target_company_id,
                target_employee_id, created_by_user_id, created_by_company_id,
                document_ids, declaration_ids, certificate_ids, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(task.id().as_uuid())
        .bind(task.name())
        .bind(task.note())
        .bind(<&str>::from(task.priority()))
        .bind(<&str>::from(task.status()))
        .bind(task.deadline())
        .bind(task.target_company_id().as_uuid())
        .bind(task.target_employee_id().map(|id| *id.as_uuid()))
        .bind(task.created_by_user_id().as_uuid())
        .bind(task.created_by_company_id().as_uuid())
        .bind(task.document_ids().iter().map(|id| *id.as_uuid()).collect::<Vec<Uuid>>())
        .bind(task.declaration_ids().iter().map(|id| *id.as_uuid()).collect::<Vec<Uuid>>())
        .bind(task.certificate_ids().iter().map(|id| *id.as_uuid()).collect::<Vec<Uuid>>())
        .bind(task.created_at())
        .bind(task.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn update(&self, tx: &mut TxContext, task: &Task) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET name = $2, note = $3, priority = $4, status = $5, deadline = $6,
                target_employee_id = $7, document_ids = $8, declaration_ids = $9,
                certificate_ids = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(task.id().as_uuid())
        .bind(task.name())
        .bind(task.note())
        .bind(<&str>::from(task.priority()))
        .bind(<&str>::from(task.status()))
        .bind(task.deadline())
        .bind(task.target_employee_id().map(|id| *id.as_uuid()))
        .bind(task.document_ids().iter().map(|id| *id.as_uuid()).collect::<Vec<Uuid>>())
        .bind(task.declaration_ids().iter().map(|id| *id.as_uuid()).collect::<Vec<Uuid>>())
        .bind(task.certificate_ids().iter().map(|id| *id.as_uuid()).collect::<Vec<Uuid>>())
        .bind(task.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn delete(&self, tx: &mut TxContext, id: &TaskId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM task_status_changes WHERE task_id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, InfraError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TaskRow::into_domain).transpose()
    }

    async fn list_incoming(
        &self,
        company_id: &CompanyId,
        assignee: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), InfraError> {
        let predicate = if assignee.is_some() {
            "target_company_id = $1 AND (target_employee_id = $2 OR target_employee_id IS NULL)"
        } else {
            "target_company_id = $1"
        };
        self.list_page(predicate, company_id, assignee, page, page_size)
            .await
    }

    async fn list_outgoing(
        &self,
        company_id: &CompanyId,
        creator: Option<&UserId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), InfraError> {
        let predicate = if creator.is_some() {
            "created_by_company_id = $1 AND created_by_user_id = $2"
        } else {
            "created_by_company_id = $1"
        };
        self.list_page(predicate, company_id, creator, page, page_size)
            .await
    }

    async fn insert_status_change(
        &self,
        tx: &mut TxContext,
        change: &TaskStatusChange,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO task_status_changes (
                id, task_id, from_status, to_status, changed_by_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(change.id().as_uuid())
        .bind(change.task_id().as_uuid())
        .bind(<&str>::from(change.from_status()))
        .bind(<&str>::from(change.to_status()))
        .bind(change.changed_by_id().as_uuid())
        .bind(change.created_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn list_status_changes(
        &self,
        task_id: &TaskId,
    ) -> Result<Vec<TaskStatusChange>, InfraError> {
        let rows = sqlx::query_as::<_, StatusChangeRow>(
            "SELECT id, task_id, from_status, to_status, changed_by_id, created_at \
             FROM task_status_changes WHERE task_id = $1 ORDER BY created_at",
        )
        .bind(task_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StatusChangeRow::into_domain).collect()
    }

    async fn reassign_owner(
        &self,
        tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError> {
        sqlx::query(
            "UPDATE tasks SET created_by_user_id = $3, updated_at = now() \
             WHERE created_by_company_id = $1 AND created_by_user_id = $2",
        )
        .bind(company_id.as_uuid())
        .bind(from.as_uuid())
        .bind(to.as_uuid())
        .execute(tx.conn())
        .await?;
        sqlx::query(
            "UPDATE tasks SET target_employee_id = NULL, updated_at = now() \
             WHERE target_company_id = $1 AND target_employee_id = $2",
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
            "DELETE FROM task_status_changes WHERE task_id IN \
             (SELECT id FROM tasks WHERE target_company_id = $1 OR created_by_company_id = $1)",
        )
        .bind(company_id.as_uuid())
        .execute(tx.conn())
        .await?;
        sqlx::query("DELETE FROM tasks WHERE target_company_id = $1 OR created_by_company_id = $1")
            .bind(company_id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }
}
