//! # Notifications
//!
//! [`NotificationService`] is the write side shared by other usecases:
//! it stores the in-app notification inside the caller's transaction
//! and hands back a pending Telegram message to deliver after commit.
//! [`NotificationUseCase`] is the read side backing the feed endpoints.

use std::sync::Arc;

use chrono::Utc;
use declarant_domain::{
    DomainError,
    notification::{Notification, NotificationId, NotificationKind},
    user::User,
};
use declarant_infra::{
    TransactionManager, db::TxContext, repository::NotificationRepository, telegram::Notifier,
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx},
};

/// Telegram copy of a stored notification, sent only after the
/// surrounding transaction commits.
pub struct PendingTelegram {
    chat_id: String,
    text: String,
}

pub struct NotificationService<N> {
    repo: N,
    telegram: Arc<dyn Notifier>,
}

impl<N: NotificationRepository> NotificationService<N> {
    pub fn new(repo: N, telegram: Arc<dyn Notifier>) -> Self {
        Self { repo, telegram }
    }

    /// Stores a notification for `recipient` inside `tx`.
    pub async fn push(
        &self,
        tx: &mut TxContext,
        recipient: &User,
        title: &str,
        message: &str,
        kind: NotificationKind,
        link: Option<String>,
    ) -> Result<Option<PendingTelegram>, ApiError> {
        let notification = Notification::new(
            NotificationId::new(),
            *recipient.id(),
            title.to_string(),
            message.to_string(),
            kind,
            link,
            Utc::now(),
        );
        self.repo.insert(tx, &notification).await?;

        Ok(recipient.telegram_chat_id().map(|chat_id| PendingTelegram {
            chat_id: chat_id.to_string(),
            text: format!("{title}\n{message}"),
        }))
    }

    /// Fire-and-forget delivery of the Telegram copies. Failures are
    /// logged; the in-app notification is already committed.
    pub async fn deliver(&self, pending: impl IntoIterator<Item = Option<PendingTelegram>>) {
        for message in pending.into_iter().flatten() {
            if let Err(e) = self.telegram.send(&message.chat_id, &message.text).await {
                tracing::warn!(error = %e, "telegram delivery failed");
            }
        }
    }
}

pub struct NotificationUseCase<TM, N> {
    tx_manager: TM,
    repo: N,
}

impl<TM, N> NotificationUseCase<TM, N>
where
    TM: TransactionManager,
    N: NotificationRepository,
{
    pub fn new(tx_manager: TM, repo: N) -> Self {
        Self { tx_manager, repo }
    }

    /// The 50 most recent notifications plus the unread count.
    pub async fn feed(&self, actor: &User) -> Result<(Vec<Notification>, u64), ApiError> {
        let items = self.repo.list_recent(actor.id()).await?;
        let unread = self.repo.unread_count(actor.id()).await?;
        Ok((items, unread))
    }

    pub async fn mark_read(&self, actor: &User, id: NotificationId) -> Result<(), ApiError> {
        let mut tx = begin_tx(&self.tx_manager).await?;
        let found = self.repo.mark_read(&mut tx, &id, actor.id()).await?;
        commit_tx(tx).await?;

        if !found {
            return Err(DomainError::NotFound {
                entity_type: "Уведомление",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, actor: &User) -> Result<(), ApiError> {
        let mut tx = begin_tx(&self.tx_manager).await?;
        self.repo.mark_all_read(&mut tx, actor.id()).await?;
        commit_tx(tx).await?;
        Ok(())
    }

    pub async fn delete(&self, actor: &User, id: NotificationId) -> Result<(), ApiError> {
        let mut tx = begin_tx(&self.tx_manager).await?;
        let found = self.repo.delete(&mut tx, &id, actor.id()).await?;
        commit_tx(tx).await?;

        if !found {
            return Err(DomainError::NotFound {
                entity_type: "Уведомление",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use declarant_domain::{
        user::UserId,
        value_objects::{ActivityType, Email},
    };
    use declarant_infra::mock::{MockNotificationRepository, MockTransactionManager};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn user() -> User {
        User::new(
            UserId::new(),
            Email::new("user@example.com").unwrap(),
            "hash".to_string(),
            "Иванов Иван".to_string(),
            String::new(),
            ActivityType::Declarant,
            Utc::now(),
        )
        .unwrap()
    }

    fn usecase() -> (
        NotificationUseCase<MockTransactionManager, MockNotificationRepository>,
        MockNotificationRepository,
    ) {
        let repo = MockNotificationRepository::new();
        (
            NotificationUseCase::new(MockTransactionManager, repo.clone()),
            repo,
        )
    }

    async fn push_for(repo: &MockNotificationRepository, user: &User, title: &str) {
        let mut tx = TxContext::mock();
        let notification = Notification::new(
            NotificationId::new(),
            *user.id(),
            title.to_string(),
            "текст".to_string(),
            NotificationKind::Info,
            None,
            Utc::now(),
        );
        repo.insert(&mut tx, &notification).await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn test_feed_returns_items_and_unread_count(user: User) {
        let (usecase, repo) = usecase();
        push_for(&repo, &user, "Первое").await;
        push_for(&repo, &user, "Второе").await;

        let (items, unread) = usecase.feed(&user).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(unread, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_mark_all_read_clears_unread(user: User) {
        let (usecase, repo) = usecase();
        push_for(&repo, &user, "Первое").await;

        usecase.mark_all_read(&user).await.unwrap();
        let (_, unread) = usecase.feed(&user).await.unwrap();
        assert_eq!(unread, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_mark_read_of_foreign_notification_is_not_found(user: User) {
        let (usecase, _) = usecase();
        let result = usecase.mark_read(&user, NotificationId::new()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::NotFound { .. }))
        ));
    }
}
