//! # User
//!
//! A user belongs to at most one company. Role and company membership are
//! assigned through the request flow (see [`crate::request`]), not at
//! registration: a freshly registered user has no company and the
//! `Employee` role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    company::CompanyId,
    value_objects::{ActivityType, Email},
};

define_uuid_id! {
    /// User id (UUID v7).
    pub struct UserId;
}

/// User role inside a company.
///
/// `Admin` is the platform operator and is not tied to a company.
/// `Director` and `Senior` are the privileged company roles; `Employee`
/// sees only what is shared with them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Director,
    Senior,
    Employee,
}

impl Role {
    /// Privileged roles see all company resources regardless of the
    /// per-resource access type.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Admin | Self::Director | Self::Senior)
    }

    /// Ordering used for block/role-change checks: a user may only act
    /// on strictly lower-ranked users.
    pub fn rank(self) -> u8 {
        match self {
            Self::Admin => 4,
            Self::Director => 3,
            Self::Senior => 2,
            Self::Employee => 1,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "director" => Ok(Self::Director),
            "senior" => Ok(Self::Senior),
            "employee" => Ok(Self::Employee),
            _ => Err(DomainError::Validation(format!("Неверная роль: {s}"))),
        }
    }
}

/// User entity.
///
/// # Invariants
///
/// - `email` is unique across the platform
/// - a blocked user cannot authenticate
/// - `role == Admin` implies `company_id == None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: Email,
    password_hash: String,
    full_name: String,
    phone: String,
    activity_type: ActivityType,
    role: Role,
    company_id: Option<CompanyId>,
    is_blocked: bool,
    avatar_url: Option<String>,
    telegram_chat_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a freshly registered user: no company, `Employee` role,
    /// not blocked.
    pub fn new(
        id: UserId,
        email: Email,
        password_hash: String,
        full_name: String,
        phone: String,
        activity_type: ActivityType,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let full_name = full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::Validation("ФИО обязательно".to_string()));
        }

        Ok(Self {
            id,
            email,
            password_hash,
            full_name,
            phone: phone.trim().to_string(),
            activity_type,
            role: Role::Employee,
            company_id: None,
            is_blocked: false,
            avatar_url: None,
            telegram_chat_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Restores a user from persisted data.
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: UserId,
        email: Email,
        password_hash: String,
        full_name: String,
        phone: String,
        activity_type: ActivityType,
        role: Role,
        company_id: Option<CompanyId>,
        is_blocked: bool,
        avatar_url: Option<String>,
        telegram_chat_id: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            password_hash,
            full_name,
            phone,
            activity_type,
            role,
            company_id,
            is_blocked,
            avatar_url,
            telegram_chat_id,
            created_at,
            updated_at,
        }
    }

    // Getters

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn company_id(&self) -> Option<&CompanyId> {
        self.company_id.as_ref()
    }

    pub fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn telegram_chat_id(&self) -> Option<&str> {
        self.telegram_chat_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Business logic

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// A user may log in unless blocked. Company-level blocking is
    /// checked separately, against the company entity.
    pub fn can_login(&self) -> bool {
        !self.is_blocked
    }

    /// Returns an updated copy with new profile fields.
    pub fn with_profile(
        self,
        full_name: String,
        phone: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let full_name = full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::Validation("ФИО обязательно".to_string()));
        }
        Ok(Self {
            full_name,
            phone: phone.trim().to_string(),
            updated_at: now,
            ..self
        })
    }

    pub fn with_avatar(self, avatar_url: String, now: DateTime<Utc>) -> Self {
        Self {
            avatar_url: Some(avatar_url),
            updated_at: now,
            ..self
        }
    }

    pub fn with_role(self, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            role,
            updated_at: now,
            ..self
        }
    }

    pub fn with_company(self, company_id: CompanyId, now: DateTime<Utc>) -> Self {
        Self {
            company_id: Some(company_id),
            updated_at: now,
            ..self
        }
    }

    /// Detaches the user from their company and resets the role.
    /// Used when a registration request is rejected or the user is
    /// removed from the company.
    pub fn detached(self, now: DateTime<Utc>) -> Self {
        Self {
            company_id: None,
            role: Role::Employee,
            updated_at: now,
            ..self
        }
    }

    pub fn with_blocked(self, is_blocked: bool, now: DateTime<Utc>) -> Self {
        Self {
            is_blocked,
            updated_at: now,
            ..self
        }
    }

    pub fn with_password_hash(self, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            password_hash,
            updated_at: now,
            ..self
        }
    }

    pub fn with_telegram_chat_id(self, chat_id: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            telegram_chat_id: chat_id,
            updated_at: now,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn registered_user(now: DateTime<Utc>) -> User {
        User::new(
            UserId::new(),
            Email::new("user@example.com").unwrap(),
            "$argon2id$stub".to_string(),
            "Иванов Иван".to_string(),
            "+992900000000".to_string(),
            ActivityType::Declarant,
            now,
        )
        .unwrap()
    }

    #[rstest]
    fn test_new_user_has_no_company_and_employee_role(registered_user: User) {
        assert_eq!(registered_user.company_id(), None);
        assert_eq!(registered_user.role(), Role::Employee);
        assert!(!registered_user.is_blocked());
    }

    #[rstest]
    fn test_new_user_rejects_blank_full_name(now: DateTime<Utc>) {
        let result = User::new(
            UserId::new(),
            Email::new("user@example.com").unwrap(),
            "hash".to_string(),
            "   ".to_string(),
            String::new(),
            ActivityType::Declarant,
            now,
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_blocked_user_cannot_login(registered_user: User, now: DateTime<Utc>) {
        let blocked = registered_user.with_blocked(true, now);
        assert!(!blocked.can_login());
    }

    #[rstest]
    fn test_detached_resets_company_and_role(registered_user: User, now: DateTime<Utc>) {
        let company_id = CompanyId::new();
        let member = registered_user
            .with_company(company_id, now)
            .with_role(Role::Senior, now);

        let detached = member.detached(now);

        assert_eq!(detached.company_id(), None);
        assert_eq!(detached.role(), Role::Employee);
    }

    #[rstest]
    #[case(Role::Admin, true)]
    #[case(Role::Director, true)]
    #[case(Role::Senior, true)]
    #[case(Role::Employee, false)]
    fn test_privileged_roles(#[case] role: Role, #[case] expected: bool) {
        assert_eq!(role.is_privileged(), expected);
    }

    #[test]
    fn test_role_rank_ordering() {
        assert!(Role::Admin.rank() > Role::Director.rank());
        assert!(Role::Director.rank() > Role::Senior.rank());
        assert!(Role::Senior.rank() > Role::Employee.rank());
    }
}
