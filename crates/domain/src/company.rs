//! # Company
//!
//! A company groups users and owns every company-scoped resource.
//! Created through the registration request flow; `director_id` is set
//! when the admin accepts the registration.

use chrono::{DateTime, Utc};

use crate::{
    DomainError,
    user::UserId,
    value_objects::{ActivityType, Inn},
};

define_uuid_id! {
    /// Company id (UUID v7).
    pub struct CompanyId;
}

/// Company entity.
///
/// # Invariants
///
/// - `inn` is unique across the platform
/// - a blocked company blocks authentication for all of its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    id: CompanyId,
    name: String,
    inn: Inn,
    activity_type: ActivityType,
    is_blocked: bool,
    director_id: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Company {
    /// Creates a company pending registration approval: not blocked,
    /// no director yet.
    pub fn new(
        id: CompanyId,
        name: String,
        inn: Inn,
        activity_type: ActivityType,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Название компании обязательно".to_string(),
            ));
        }

        Ok(Self {
            id,
            name,
            inn,
            activity_type,
            is_blocked: false,
            director_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: CompanyId,
        name: String,
        inn: Inn,
        activity_type: ActivityType,
        is_blocked: bool,
        director_id: Option<UserId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            inn,
            activity_type,
            is_blocked,
            director_id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &CompanyId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inn(&self) -> &Inn {
        &self.inn
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    pub fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    pub fn director_id(&self) -> Option<&UserId> {
        self.director_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Assigns the director. Called when the registration request is
    /// accepted.
    pub fn with_director(self, director_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            director_id: Some(director_id),
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

    pub fn with_name(self, name: String, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Название компании обязательно".to_string(),
            ));
        }
        Ok(Self {
            name,
            updated_at: now,
            ..self
        })
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
    fn company(now: DateTime<Utc>) -> Company {
        Company::new(
            CompanyId::new(),
            "ООО Транзит".to_string(),
            Inn::new("123456789").unwrap(),
            ActivityType::Declarant,
            now,
        )
        .unwrap()
    }

    #[rstest]
    fn test_new_company_has_no_director(company: Company) {
        assert_eq!(company.director_id(), None);
        assert!(!company.is_blocked());
    }

    #[rstest]
    fn test_with_director_assigns_director(company: Company, now: DateTime<Utc>) {
        let director_id = UserId::new();
        let updated = company.with_director(director_id, now);
        assert_eq!(updated.director_id(), Some(&director_id));
    }

    #[rstest]
    fn test_new_company_rejects_blank_name(now: DateTime<Utc>) {
        let result = Company::new(
            CompanyId::new(),
            "  ".to_string(),
            Inn::new("123456789").unwrap(),
            ActivityType::Declarant,
            now,
        );
        assert!(result.is_err());
    }
}
