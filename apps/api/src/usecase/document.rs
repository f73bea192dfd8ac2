//! # Document usecase
//!
//! Document metadata lives in Postgres, the payload on local disk.
//! The row is committed first; the file itself is removed best-effort
//! after a successful delete.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use declarant_domain::{
    DomainError,
    access::{ensure_owner_or_privileged, ensure_same_company},
    client::ClientId,
    document::{Document, DocumentId},
    folder::FolderId,
    user::User,
};
use declarant_infra::{
    TransactionManager,
    repository::{DocumentRepository, FolderRepository},
    storage::LocalFileStorage,
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx},
};

pub struct UploadDocumentInput {
    pub file_name: String,
    pub content: Bytes,
    pub folder_id: Option<FolderId>,
    pub client_id: Option<ClientId>,
}

pub struct DocumentUseCase<TM, D, F> {
    tx_manager: TM,
    document_repo: D,
    folder_repo: F,
    storage: Arc<LocalFileStorage>,
}

impl<TM, D, F> DocumentUseCase<TM, D, F>
where
    TM: TransactionManager,
    D: DocumentRepository,
    F: FolderRepository,
{
    pub fn new(
        tx_manager: TM,
        document_repo: D,
        folder_repo: F,
        storage: Arc<LocalFileStorage>,
    ) -> Self {
        Self {
            tx_manager,
            document_repo,
            folder_repo,
            storage,
        }
    }

    pub async fn upload(
        &self,
        actor: &User,
        input: UploadDocumentInput,
    ) -> Result<Document, ApiError> {
        let company_id = *actor.company_id().ok_or_else(no_company)?;
        if let Some(folder_id) = &input.folder_id {
            self.ensure_folder_in_company(actor, folder_id).await?;
        }

        let stored = self.storage.save(&input.file_name, input.content).await?;
        let document = Document::new(
            DocumentId::new(),
            input.file_name,
            stored.url.clone(),
            stored.file_type,
            stored.file_size,
            input.folder_id,
            input.client_id,
            *actor.id(),
            company_id,
            Utc::now(),
        );
        let document = match document {
            Ok(document) => document,
            Err(e) => {
                // metadata was rejected after the file landed on disk
                self.storage.delete(&stored.url).await;
                return Err(e.into());
            }
        };

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.document_repo.insert(&mut tx, &document).await?;
        commit_tx(tx).await?;

        Ok(document)
    }

    pub async fn get(&self, actor: &User, id: DocumentId) -> Result<Document, ApiError> {
        self.load_in_company(actor, &id).await
    }

    /// Root listing when `folder_id` is None.
    pub async fn list_in_folder(
        &self,
        actor: &User,
        folder_id: Option<FolderId>,
    ) -> Result<Vec<Document>, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        if let Some(folder_id) = &folder_id {
            self.ensure_folder_in_company(actor, folder_id).await?;
        }
        Ok(self
            .document_repo
            .list_in_folder(company_id, folder_id.as_ref())
            .await?)
    }

    pub async fn list_by_client(
        &self,
        actor: &User,
        client_id: ClientId,
    ) -> Result<Vec<Document>, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let documents = self.document_repo.list_by_client(&client_id).await?;
        Ok(documents
            .into_iter()
            .filter(|d| d.company_id() == company_id)
            .collect())
    }

    pub async fn rename(
        &self,
        actor: &User,
        id: DocumentId,
        name: String,
    ) -> Result<Document, ApiError> {
        let document = self.load_in_company(actor, &id).await?;
        ensure_owner_or_privileged(actor, document.owner_id())?;
        let updated = document.renamed(name)?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.document_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    pub async fn move_to_folder(
        &self,
        actor: &User,
        id: DocumentId,
        folder_id: Option<FolderId>,
    ) -> Result<Document, ApiError> {
        let document = self.load_in_company(actor, &id).await?;
        ensure_owner_or_privileged(actor, document.owner_id())?;
        if let Some(folder_id) = &folder_id {
            self.ensure_folder_in_company(actor, folder_id).await?;
        }
        let updated = document.moved_to(folder_id);

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.document_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: DocumentId) -> Result<(), ApiError> {
        let document = self.load_in_company(actor, &id).await?;
        ensure_owner_or_privileged(actor, document.owner_id())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.document_repo.delete(&mut tx, document.id()).await?;
        commit_tx(tx).await?;

        self.storage.delete(document.file_url()).await;
        Ok(())
    }

    async fn ensure_folder_in_company(
        &self,
        actor: &User,
        folder_id: &FolderId,
    ) -> Result<(), ApiError> {
        actor.company_id().ok_or_else(no_company)?;
        let folder = self
            .folder_repo
            .find_by_id(folder_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Папка",
                id: folder_id.to_string(),
            })?;
        ensure_same_company(actor, folder.company_id())?;
        Ok(())
    }

    async fn load_in_company(&self, actor: &User, id: &DocumentId) -> Result<Document, ApiError> {
        actor.company_id().ok_or_else(no_company)?;
        let document = self
            .document_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Документ",
                id: id.to_string(),
            })?;
        ensure_same_company(actor, document.company_id())?;
        Ok(document)
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use declarant_domain::{
        company::CompanyId,
        user::{Role, UserId},
        value_objects::{ActivityType, Email},
    };
    use declarant_infra::mock::{
        MockDocumentRepository, MockFolderRepository, MockTransactionManager,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase =
        DocumentUseCase<MockTransactionManager, MockDocumentRepository, MockFolderRepository>;

    struct Env {
        usecase: TestUseCase,
        company_id: CompanyId,
    }

    #[fixture]
    fn env() -> Env {
        let dir = std::env::temp_dir().join(format!("declarant-test-{}", uuid::Uuid::now_v7()));
        Env {
            usecase: DocumentUseCase::new(
                MockTransactionManager,
                MockDocumentRepository::new(),
                MockFolderRepository::new(),
                Arc::new(LocalFileStorage::new(dir)),
            ),
            company_id: CompanyId::new(),
        }
    }

    fn member(env: &Env, email: &str, role: Role) -> User {
        let now = Utc::now();
        User::new(
            UserId::new(),
            Email::new(email).unwrap(),
            "hash".to_string(),
            "Сотрудник".to_string(),
            String::new(),
            ActivityType::Declarant,
            now,
        )
        .unwrap()
        .with_company(env.company_id, now)
        .with_role(role, now)
    }

    fn upload_input(file_name: &str) -> UploadDocumentInput {
        UploadDocumentInput {
            file_name: file_name.to_string(),
            content: Bytes::from_static(b"%PDF-1.4 test"),
            folder_id: None,
            client_id: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_upload_stores_file_and_metadata(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let document = env
            .usecase
            .upload(&owner, upload_input("договор.pdf"))
            .await
            .unwrap();

        assert_eq!(document.name(), "договор.pdf");
        assert_eq!(document.file_type(), "pdf");
        assert_eq!(document.file_size(), 13);
        assert!(document.file_url().starts_with("/uploads/"));

        let listed = env.usecase.list_in_folder(&owner, None).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_move_requires_existing_folder(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let document = env
            .usecase
            .upload(&owner, upload_input("договор.pdf"))
            .await
            .unwrap();

        let result = env
            .usecase
            .move_to_folder(&owner, *document.id(), Some(FolderId::new()))
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::NotFound { .. }))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_only_owner_or_privileged_deletes(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let colleague = member(&env, "other@example.com", Role::Employee);
        let director = member(&env, "dir@example.com", Role::Director);

        let document = env
            .usecase
            .upload(&owner, upload_input("договор.pdf"))
            .await
            .unwrap();

        let result = env.usecase.delete(&colleague, *document.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
        assert!(env.usecase.delete(&director, *document.id()).await.is_ok());
    }
}
