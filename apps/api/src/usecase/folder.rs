//! # Folder usecase
//!
//! Folders form a tree per company with the same per-record access
//! model as clients. Reparenting walks the new parent chain so the
//! tree can never loop; deletion requires the folder to be empty.

use chrono::Utc;
use declarant_domain::{
    DomainError,
    access::{
        can_view_restricted, ensure_can_view_restricted, ensure_owner_or_privileged,
        ensure_same_company,
    },
    client::ClientId,
    folder::{Folder, FolderId, FolderPatch},
    user::{User, UserId},
    value_objects::AccessType,
};
use declarant_infra::{
    TransactionManager,
    repository::{DocumentRepository, FolderRepository},
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx},
};

pub struct CreateFolderInput {
    pub name: String,
    pub parent_id: Option<FolderId>,
    pub access_type: AccessType,
    pub allowed_user_ids: Vec<UserId>,
    pub client_id: Option<ClientId>,
}

pub struct FolderUseCase<TM, F, D> {
    tx_manager: TM,
    folder_repo: F,
    document_repo: D,
}

impl<TM, F, D> FolderUseCase<TM, F, D>
where
    TM: TransactionManager,
    F: FolderRepository,
    D: DocumentRepository,
{
    pub fn new(tx_manager: TM, folder_repo: F, document_repo: D) -> Self {
        Self {
            tx_manager,
            folder_repo,
            document_repo,
        }
    }

    pub async fn create(&self, actor: &User, input: CreateFolderInput) -> Result<Folder, ApiError> {
        let company_id = *actor.company_id().ok_or_else(no_company)?;
        if let Some(parent_id) = &input.parent_id {
            self.load_visible(actor, parent_id).await?;
        }

        let folder = Folder::new(
            FolderId::new(),
            input.name,
            input.parent_id,
            input.access_type,
            input.allowed_user_ids,
            input.client_id,
            *actor.id(),
            company_id,
            Utc::now(),
        )?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.folder_repo.insert(&mut tx, &folder).await?;
        commit_tx(tx).await?;

        Ok(folder)
    }

    pub async fn get(&self, actor: &User, id: FolderId) -> Result<Folder, ApiError> {
        self.load_visible(actor, &id).await
    }

    pub async fn list(&self, actor: &User) -> Result<Vec<Folder>, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let folders = self.folder_repo.list_for_company(company_id).await?;
        Ok(folders
            .into_iter()
            .filter(|f| {
                can_view_restricted(actor, f.owner_id(), f.access_type(), f.allowed_user_ids())
            })
            .collect())
    }

    pub async fn list_by_client(
        &self,
        actor: &User,
        client_id: ClientId,
    ) -> Result<Vec<Folder>, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let folders = self.folder_repo.list_by_client(&client_id).await?;
        Ok(folders
            .into_iter()
            .filter(|f| f.company_id() == company_id)
            .filter(|f| {
                can_view_restricted(actor, f.owner_id(), f.access_type(), f.allowed_user_ids())
            })
            .collect())
    }

    pub async fn patch(
        &self,
        actor: &User,
        id: FolderId,
        patch: FolderPatch,
    ) -> Result<Folder, ApiError> {
        let folder = self.load_visible(actor, &id).await?;
        ensure_owner_or_privileged(actor, folder.owner_id())?;

        if let Some(Some(new_parent)) = &patch.parent_id {
            self.ensure_no_cycle(actor, folder.id(), new_parent).await?;
        }
        let updated = folder.apply(patch, Utc::now())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.folder_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Only an empty folder can go: no subfolders, no documents.
    pub async fn delete(&self, actor: &User, id: FolderId) -> Result<(), ApiError> {
        let folder = self.load_visible(actor, &id).await?;
        ensure_owner_or_privileged(actor, folder.owner_id())?;

        if self.folder_repo.count_children(folder.id()).await? > 0
            || self.document_repo.count_in_folder(folder.id()).await? > 0
        {
            return Err(DomainError::Conflict("Папка не пуста".to_string()).into());
        }

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.folder_repo.delete(&mut tx, folder.id()).await?;
        commit_tx(tx).await?;

        Ok(())
    }

    /// Walks up from the proposed parent; hitting `folder_id` on the
    /// way means the reparent would close a loop.
    async fn ensure_no_cycle(
        &self,
        actor: &User,
        folder_id: &FolderId,
        new_parent: &FolderId,
    ) -> Result<(), ApiError> {
        let mut cursor = self.load_visible(actor, new_parent).await?;
        loop {
            if cursor.id() == folder_id {
                return Err(DomainError::Validation(
                    "Папка не может быть вложена в собственную подпапку".to_string(),
                )
                .into());
            }
            match cursor.parent_id() {
                Some(parent_id) => {
                    cursor = self
                        .folder_repo
                        .find_by_id(parent_id)
                        .await?
                        .ok_or(DomainError::NotFound {
                            entity_type: "Папка",
                            id: parent_id.to_string(),
                        })?;
                }
                None => return Ok(()),
            }
        }
    }

    async fn load_visible(&self, actor: &User, id: &FolderId) -> Result<Folder, ApiError> {
        actor.company_id().ok_or_else(no_company)?;
        let folder = self
            .folder_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Папка",
                id: id.to_string(),
            })?;
        ensure_same_company(actor, folder.company_id())?;
        ensure_can_view_restricted(
            actor,
            folder.owner_id(),
            folder.access_type(),
            folder.allowed_user_ids(),
        )?;
        Ok(folder)
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use declarant_domain::{
        company::CompanyId,
        document::{Document, DocumentId},
        user::Role,
        value_objects::{ActivityType, Email},
    };
    use declarant_infra::mock::{
        MockDocumentRepository, MockFolderRepository, MockTransactionManager,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase =
        FolderUseCase<MockTransactionManager, MockFolderRepository, MockDocumentRepository>;

    struct Env {
        usecase: TestUseCase,
        documents: MockDocumentRepository,
        company_id: CompanyId,
    }

    #[fixture]
    fn env() -> Env {
        let documents = MockDocumentRepository::new();
        Env {
            usecase: FolderUseCase::new(
                MockTransactionManager,
                MockFolderRepository::new(),
                documents.clone(),
            ),
            documents,
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

    fn input(name: &str, parent_id: Option<FolderId>) -> CreateFolderInput {
        CreateFolderInput {
            name: name.to_string(),
            parent_id,
            access_type: AccessType::Public,
            allowed_user_ids: vec![],
            client_id: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_reparent_into_descendant_is_rejected(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let root = env.usecase.create(&owner, input("Корень", None)).await.unwrap();
        let child = env
            .usecase
            .create(&owner, input("Дочерняя", Some(*root.id())))
            .await
            .unwrap();
        let grandchild = env
            .usecase
            .create(&owner, input("Внучатая", Some(*child.id())))
            .await
            .unwrap();

        let patch = FolderPatch {
            parent_id: Some(Some(*grandchild.id())),
            ..FolderPatch::default()
        };
        let result = env.usecase.patch(&owner, *root.id(), patch).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Validation(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_requires_empty_folder(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let folder = env.usecase.create(&owner, input("Документы", None)).await.unwrap();

        let document = Document::new(
            DocumentId::new(),
            "договор.pdf".to_string(),
            "/uploads/x.pdf".to_string(),
            "pdf".to_string(),
            1024,
            Some(*folder.id()),
            None,
            *owner.id(),
            env.company_id,
            Utc::now(),
        )
        .unwrap();
        env.documents.add_document(document.clone());

        let result = env.usecase.delete(&owner, *folder.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Conflict(_)))
        ));

        let mut tx = declarant_infra::db::TxContext::mock();
        use declarant_infra::repository::DocumentRepository as _;
        env.documents.delete(&mut tx, document.id()).await.unwrap();
        assert!(env.usecase.delete(&owner, *folder.id()).await.is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn test_private_folder_hidden_from_colleague(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let colleague = member(&env, "other@example.com", Role::Employee);

        let folder = env
            .usecase
            .create(
                &owner,
                CreateFolderInput {
                    access_type: AccessType::Private,
                    ..input("Личная", None)
                },
            )
            .await
            .unwrap();

        assert!(env.usecase.get(&owner, *folder.id()).await.is_ok());
        assert!(env.usecase.get(&colleague, *folder.id()).await.is_err());

        let visible = env.usecase.list(&colleague).await.unwrap();
        assert_eq!(visible.len(), 0);
    }
}
