//! # Folder
//!
//! Folder hierarchy for documents, sharing the restricted-visibility
//! model with clients. Reparenting must not introduce a cycle; the
//! ancestor walk lives in the usecase layer where the repository is
//! available.

use chrono::{DateTime, Utc};

use crate::{DomainError, client::ClientId, company::CompanyId, user::UserId, value_objects::AccessType};

define_uuid_id! {
    /// Folder id (UUID v7).
    pub struct FolderId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    id: FolderId,
    name: String,
    parent_id: Option<FolderId>,
    access_type: AccessType,
    allowed_user_ids: Vec<UserId>,
    client_id: Option<ClientId>,
    owner_id: UserId,
    company_id: CompanyId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub parent_id: Option<Option<FolderId>>,
    pub access_type: Option<AccessType>,
    pub allowed_user_ids: Option<Vec<UserId>>,
}

impl Folder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: FolderId,
        name: String,
        parent_id: Option<FolderId>,
        access_type: AccessType,
        allowed_user_ids: Vec<UserId>,
        client_id: Option<ClientId>,
        owner_id: UserId,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Название папки обязательно".to_string(),
            ));
        }

        Ok(Self {
            id,
            name,
            parent_id,
            access_type,
            allowed_user_ids,
            client_id,
            owner_id,
            company_id,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: FolderId,
        name: String,
        parent_id: Option<FolderId>,
        access_type: AccessType,
        allowed_user_ids: Vec<UserId>,
        client_id: Option<ClientId>,
        owner_id: UserId,
        company_id: CompanyId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            parent_id,
            access_type,
            allowed_user_ids,
            client_id,
            owner_id,
            company_id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &FolderId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> Option<&FolderId> {
        self.parent_id.as_ref()
    }

    pub fn access_type(&self) -> AccessType {
        self.access_type
    }

    pub fn allowed_user_ids(&self) -> &[UserId] {
        &self.allowed_user_ids
    }

    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
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

    pub fn apply(self, patch: FolderPatch, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = match patch.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(DomainError::Validation(
                        "Название папки обязательно".to_string(),
                    ));
                }
                name
            }
            None => self.name,
        };

        let parent_id = patch.parent_id.unwrap_or(self.parent_id);
        if parent_id.as_ref() == Some(&self.id) {
            return Err(DomainError::Validation(
                "Папка не может быть вложена в саму себя".to_string(),
            ));
        }

        Ok(Self {
            name,
            parent_id,
            access_type: patch.access_type.unwrap_or(self.access_type),
            allowed_user_ids: patch.allowed_user_ids.unwrap_or(self.allowed_user_ids),
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
    fn folder(now: DateTime<Utc>) -> Folder {
        Folder::new(
            FolderId::new(),
            "Договоры".to_string(),
            None,
            AccessType::Private,
            Vec::new(),
            None,
            UserId::new(),
            CompanyId::new(),
            now,
        )
        .unwrap()
    }

    #[rstest]
    fn test_folder_cannot_be_its_own_parent(folder: Folder, now: DateTime<Utc>) {
        let own_id = *folder.id();
        let patch = FolderPatch {
            parent_id: Some(Some(own_id)),
            ..FolderPatch::default()
        };
        assert!(folder.apply(patch, now).is_err());
    }

    #[rstest]
    fn test_apply_can_detach_from_parent(now: DateTime<Utc>) {
        let parent = FolderId::new();
        let folder = Folder::new(
            FolderId::new(),
            "Счета".to_string(),
            Some(parent),
            AccessType::Public,
            Vec::new(),
            None,
            UserId::new(),
            CompanyId::new(),
            now,
        )
        .unwrap();

        let patch = FolderPatch {
            parent_id: Some(None),
            ..FolderPatch::default()
        };
        let updated = folder.apply(patch, now).unwrap();

        assert_eq!(updated.parent_id(), None);
    }
}
