//! # Client
//!
//! A client is a customer record of a company (the organization a
//! declaration or certificate is prepared for). Clients carry the
//! restricted-visibility model: private, public within the company, or
//! shared with a selected set of users.

use chrono::{DateTime, Utc};

use crate::{DomainError, company::CompanyId, user::UserId, value_objects::AccessType};

define_uuid_id! {
    /// Client id (UUID v7).
    pub struct ClientId;
}

/// Client entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    id: ClientId,
    company_name: String,
    inn: String,
    director_name: Option<String>,
    note: Option<String>,
    access_type: AccessType,
    allowed_user_ids: Vec<UserId>,
    owner_id: UserId,
    company_id: CompanyId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub company_name: Option<String>,
    pub inn: Option<String>,
    pub director_name: Option<String>,
    pub note: Option<String>,
    pub access_type: Option<AccessType>,
    pub allowed_user_ids: Option<Vec<UserId>>,
}

impl Client {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ClientId,
        company_name: String,
        inn: String,
        director_name: Option<String>,
        note: Option<String>,
        access_type: AccessType,
        allowed_user_ids: Vec<UserId>,
        owner_id: UserId,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let company_name = company_name.trim().to_string();
        if company_name.is_empty() {
            return Err(DomainError::Validation(
                "Название компании клиента обязательно".to_string(),
            ));
        }
        let inn = inn.trim().to_string();
        if inn.is_empty() {
            return Err(DomainError::Validation("ИНН клиента обязателен".to_string()));
        }

        Ok(Self {
            id,
            company_name,
            inn,
            director_name,
            note,
            access_type,
            // the allow list only matters in Selected mode, but is kept
            // as entered so switching modes is lossless
            allowed_user_ids,
            owner_id,
            company_id,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: ClientId,
        company_name: String,
        inn: String,
        director_name: Option<String>,
        note: Option<String>,
        access_type: AccessType,
        allowed_user_ids: Vec<UserId>,
        owner_id: UserId,
        company_id: CompanyId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            company_name,
            inn,
            director_name,
            note,
            access_type,
            allowed_user_ids,
            owner_id,
            company_id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn inn(&self) -> &str {
        &self.inn
    }

    pub fn director_name(&self) -> Option<&str> {
        self.director_name.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn access_type(&self) -> AccessType {
        self.access_type
    }

    pub fn allowed_user_ids(&self) -> &[UserId] {
        &self.allowed_user_ids
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.company_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a partial update.
    pub fn apply(self, patch: ClientPatch, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let company_name = match patch.company_name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(DomainError::Validation(
                        "Название компании клиента обязательно".to_string(),
                    ));
                }
                name
            }
            None => self.company_name,
        };

        Ok(Self {
            company_name,
            inn: patch.inn.map(|v| v.trim().to_string()).unwrap_or(self.inn),
            director_name: patch.director_name.or(self.director_name),
            note: patch.note.or(self.note),
            access_type: patch.access_type.unwrap_or(self.access_type),
            allowed_user_ids: patch.allowed_user_ids.unwrap_or(self.allowed_user_ids),
            updated_at: now,
            ..self
        })
    }

    /// Transfers ownership to another user of the same company.
    pub fn redirected_to(self, owner_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            owner_id,
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
    fn client(now: DateTime<Utc>) -> Client {
        Client::new(
            ClientId::new(),
            "ООО Ромашка".to_string(),
            "987654321".to_string(),
            None,
            None,
            AccessType::Private,
            Vec::new(),
            UserId::new(),
            CompanyId::new(),
            now,
        )
        .unwrap()
    }

    #[rstest]
    fn test_apply_changes_only_given_fields(client: Client, now: DateTime<Utc>) {
        let original = client.clone();
        let patch = ClientPatch {
            note: Some("постоянный клиент".to_string()),
            access_type: Some(AccessType::Public),
            ..ClientPatch::default()
        };

        let updated = client.apply(patch, now).unwrap();

        assert_eq!(updated.company_name(), original.company_name());
        assert_eq!(updated.inn(), original.inn());
        assert_eq!(updated.note(), Some("постоянный клиент"));
        assert_eq!(updated.access_type(), AccessType::Public);
    }

    #[rstest]
    fn test_apply_rejects_blank_company_name(client: Client, now: DateTime<Utc>) {
        let patch = ClientPatch {
            company_name: Some("  ".to_string()),
            ..ClientPatch::default()
        };
        assert!(client.apply(patch, now).is_err());
    }

    #[rstest]
    fn test_redirect_changes_owner(client: Client, now: DateTime<Utc>) {
        let new_owner = UserId::new();
        let updated = client.redirected_to(new_owner, now);
        assert_eq!(updated.owner_id(), &new_owner);
    }
}
