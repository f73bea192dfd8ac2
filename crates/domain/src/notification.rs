//! # Notification
//!
//! In-app notification row. Telegram delivery is a side channel handled
//! in the infra layer; the entity here is the persistent record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, user::UserId};

define_uuid_id! {
    /// Notification id (UUID v7).
    pub struct NotificationId;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl std::str::FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(DomainError::Validation(format!(
                "Неверный тип уведомления: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    id: NotificationId,
    user_id: UserId,
    title: String,
    message: String,
    kind: NotificationKind,
    is_read: bool,
    link: Option<String>,
    created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        id: NotificationId,
        user_id: UserId,
        title: String,
        message: String,
        kind: NotificationKind,
        link: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            title,
            message,
            kind,
            is_read: false,
            link,
            created_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: NotificationId,
        user_id: UserId,
        title: String,
        message: String,
        kind: NotificationKind,
        is_read: bool,
        link: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            title,
            message,
            kind,
            is_read,
            link,
            created_at,
        }
    }

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn read(self) -> Self {
        Self {
            is_read: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notification_is_unread() {
        let n = Notification::new(
            NotificationId::new(),
            UserId::new(),
            "Запрос одобрен".to_string(),
            "Ваша компания зарегистрирована".to_string(),
            NotificationKind::Success,
            None,
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        );
        assert!(!n.is_read());
        assert!(n.read().is_read());
    }
}
