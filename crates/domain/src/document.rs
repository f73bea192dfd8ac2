//! # Document
//!
//! File metadata. The payload itself lives in file storage; `file_url`
//! is the storage-relative path handed to clients for download.

use chrono::{DateTime, Utc};

use crate::{DomainError, client::ClientId, company::CompanyId, folder::FolderId, user::UserId};

define_uuid_id! {
    /// Document id (UUID v7).
    pub struct DocumentId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    name: String,
    file_url: String,
    file_type: String,
    file_size: i64,
    folder_id: Option<FolderId>,
    client_id: Option<ClientId>,
    owner_id: UserId,
    company_id: CompanyId,
    created_at: DateTime<Utc>,
}

impl Document {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DocumentId,
        name: String,
        file_url: String,
        file_type: String,
        file_size: i64,
        folder_id: Option<FolderId>,
        client_id: Option<ClientId>,
        owner_id: UserId,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Название документа обязательно".to_string(),
            ));
        }
        if file_size < 0 {
            return Err(DomainError::Validation(
                "Размер файла не может быть отрицательным".to_string(),
            ));
        }

        Ok(Self {
            id,
            name,
            file_url,
            file_type,
            file_size,
            folder_id,
            client_id,
            owner_id,
            company_id,
            created_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: DocumentId,
        name: String,
        file_url: String,
        file_type: String,
        file_size: i64,
        folder_id: Option<FolderId>,
        client_id: Option<ClientId>,
        owner_id: UserId,
        company_id: CompanyId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            file_url,
            file_type,
            file_size,
            folder_id,
            client_id,
            owner_id,
            company_id,
            created_at,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_url(&self) -> &str {
        &self.file_url
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub fn file_size(&self) -> i64 {
        self.file_size
    }

    pub fn folder_id(&self) -> Option<&FolderId> {
        self.folder_id.as_ref()
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

    pub fn moved_to(self, folder_id: Option<FolderId>) -> Self {
        Self { folder_id, ..self }
    }

    pub fn renamed(self, name: String) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Название документа обязательно".to_string(),
            ));
        }
        Ok(Self { name, ..self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_document_rejects_negative_size() {
        let result = Document::new(
            DocumentId::new(),
            "договор.pdf".to_string(),
            "uploads/x.pdf".to_string(),
            "application/pdf".to_string(),
            -1,
            None,
            None,
            UserId::new(),
            CompanyId::new(),
            now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_renamed_rejects_blank_name() {
        let doc = Document::new(
            DocumentId::new(),
            "договор.pdf".to_string(),
            "uploads/x.pdf".to_string(),
            "application/pdf".to_string(),
            1024,
            None,
            None,
            UserId::new(),
            CompanyId::new(),
            now(),
        )
        .unwrap();

        assert!(doc.renamed("  ".to_string()).is_err());
    }
}
