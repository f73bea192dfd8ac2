//! # NotificationRepository
//!
//! Persistence for in-app notifications. The feed is capped at the 50
//! most recent per user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use declarant_domain::{
    notification::{Notification, NotificationId, NotificationKind},
    user::UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

pub const FEED_LIMIT: i64 = 50;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(
        &self,
        tx: &mut TxContext,
        notification: &Notification,
    ) -> Result<(), InfraError>;

    /// The user's most recent notifications, newest first.
    async fn list_recent(&self, user_id: &UserId) -> Result<Vec<Notification>, InfraError>;

    async fn unread_count(&self, user_id: &UserId) -> Result<u64, InfraError>;

    /// Returns false when the notification does not exist or belongs to
    /// someone else.
    async fn mark_read(
        &self,
        tx: &mut TxContext,
        id: &NotificationId,
        user_id: &UserId,
    ) -> Result<bool, InfraError>;

    async fn mark_all_read(&self, tx: &mut TxContext, user_id: &UserId)
    -> Result<(), InfraError>;

    async fn delete(
        &self,
        tx: &mut TxContext,
        id: &NotificationId,
        user_id: &UserId,
    ) -> Result<bool, InfraError>;
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    kind: String,
    is_read: bool,
    link: Option<String>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_domain(self) -> Result<Notification, InfraError> {
        Ok(Notification::from_db(
            NotificationId::from_uuid(self.id),
            UserId::from_uuid(self.user_id),
            self.title,
            self.message,
            self.kind
                .parse::<NotificationKind>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            self.is_read,
            self.link,
            self.created_at,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn insert(
        &self,
        tx: &mut TxContext,
        notification: &Notification,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, title, message, kind, is_read, link, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id().as_uuid())
        .bind(notification.user_id().as_uuid())
        .bind(notification.title())
        .bind(notification.message())
        .bind(<&str>::from(notification.kind()))
        .bind(notification.is_read())
        .bind(notification.link())
        .bind(notification.created_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    async fn list_recent(&self, user_id: &UserId) -> Result<Vec<Notification>, InfraError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, title, message, kind, is_read, link, created_at \
             FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id.as_uuid())
        .bind(FEED_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRow::into_domain).collect()
    }

    async fn unread_count(&self, user_id: &UserId) -> Result<u64, InfraError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn mark_read(
        &self,
        tx: &mut TxContext,
        id: &NotificationId,
        user_id: &UserId,
    ) -> Result<bool, InfraError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id.as_uuid())
                .bind(user_id.as_uuid())
                .execute(tx.conn())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(
        &self,
        tx: &mut TxContext,
        user_id: &UserId,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        tx: &mut TxContext,
        id: &NotificationId,
        user_id: &UserId,
    ) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(tx.conn())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
