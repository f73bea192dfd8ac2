//! # Client usecase
//!
//! Clients belong to a company and carry per-record access control.
//! Existence is checked before scope: a missing client is `NotFound`,
//! an out-of-scope or hidden one is `Forbidden`.

use chrono::Utc;
use declarant_domain::{
    DomainError,
    access::{
        ensure_can_view_restricted, ensure_owner_or_privileged, ensure_privileged,
        ensure_same_company,
    },
    client::{Client, ClientId, ClientPatch},
    user::{User, UserId},
    value_objects::AccessType,
};
use declarant_infra::{
    TransactionManager,
    repository::{ClientRepository, UserRepository},
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx},
};

pub struct CreateClientInput {
    pub company_name: String,
    pub inn: String,
    pub director_name: Option<String>,
    pub note: Option<String>,
    pub access_type: AccessType,
    pub allowed_user_ids: Vec<UserId>,
}

pub struct ClientUseCase<TM, CL, U> {
    tx_manager: TM,
    client_repo: CL,
    user_repo: U,
}

impl<TM, CL, U> ClientUseCase<TM, CL, U>
where
    TM: TransactionManager,
    CL: ClientRepository,
    U: UserRepository,
{
    pub fn new(tx_manager: TM, client_repo: CL, user_repo: U) -> Self {
        Self {
            tx_manager,
            client_repo,
            user_repo,
        }
    }

    pub async fn create(
        &self,
        actor: &User,
        input: CreateClientInput,
    ) -> Result<Client, ApiError> {
        let company_id = *actor.company_id().ok_or_else(no_company)?;
        let client = Client::new(
            ClientId::new(),
            input.company_name,
            input.inn,
            input.director_name,
            input.note,
            input.access_type,
            input.allowed_user_ids,
            *actor.id(),
            company_id,
            Utc::now(),
        )?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.client_repo.insert(&mut tx, &client).await?;
        commit_tx(tx).await?;

        Ok(client)
    }

    pub async fn get(&self, actor: &User, id: ClientId) -> Result<Client, ApiError> {
        self.load_visible(actor, &id).await
    }

    pub async fn list(
        &self,
        actor: &User,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Client>, u64), ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let viewer = (!actor.role().is_privileged()).then(|| actor.id());
        Ok(self
            .client_repo
            .list_visible(company_id, viewer, page, page_size)
            .await?)
    }

    pub async fn patch(
        &self,
        actor: &User,
        id: ClientId,
        patch: ClientPatch,
    ) -> Result<Client, ApiError> {
        let client = self.load_visible(actor, &id).await?;
        ensure_owner_or_privileged(actor, client.owner_id())?;
        let updated = client.apply(patch, Utc::now())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.client_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Hands the client over to another user of the same company.
    /// Management only.
    pub async fn redirect(
        &self,
        actor: &User,
        id: ClientId,
        new_owner_id: UserId,
    ) -> Result<Client, ApiError> {
        ensure_privileged(actor)?;
        let client = self.load_visible(actor, &id).await?;
        let new_owner = self
            .user_repo
            .find_by_id(&new_owner_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Пользователь",
                id: new_owner_id.to_string(),
            })?;
        if new_owner.company_id() != Some(client.company_id()) {
            return Err(DomainError::Validation(
                "Пользователь состоит в другой компании".to_string(),
            )
            .into());
        }
        let updated = client.redirected_to(new_owner_id, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.client_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: ClientId) -> Result<(), ApiError> {
        let client = self.load_visible(actor, &id).await?;
        ensure_owner_or_privileged(actor, client.owner_id())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.client_repo.delete(&mut tx, client.id()).await?;
        commit_tx(tx).await?;

        Ok(())
    }

    /// Loads a client the actor may see. A missing row is `NotFound`;
    /// another company's client, or one hidden by its access type, is
    /// `Forbidden`.
    async fn load_visible(&self, actor: &User, id: &ClientId) -> Result<Client, ApiError> {
        actor.company_id().ok_or_else(no_company)?;
        let client = self
            .client_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Клиент",
                id: id.to_string(),
            })?;
        ensure_same_company(actor, client.company_id())?;
        ensure_can_view_restricted(
            actor,
            client.owner_id(),
            client.access_type(),
            client.allowed_user_ids(),
        )?;
        Ok(client)
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
        MockClientRepository, MockTransactionManager, MockUserRepository,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase =
        ClientUseCase<MockTransactionManager, MockClientRepository, MockUserRepository>;

    struct Env {
        usecase: TestUseCase,
        users: MockUserRepository,
        company_id: CompanyId,
    }

    #[fixture]
    fn env() -> Env {
        let users = MockUserRepository::new();
        Env {
            usecase: ClientUseCase::new(
                MockTransactionManager,
                MockClientRepository::new(),
                users.clone(),
            ),
            users,
            company_id: CompanyId::new(),
        }
    }

    fn member(env: &Env, email: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User::new(
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
        .with_role(role, now);
        env.users.add_user(user.clone());
        user
    }

    fn input(access_type: AccessType, allowed: Vec<UserId>) -> CreateClientInput {
        CreateClientInput {
            company_name: "ООО Клиент".to_string(),
            inn: "123456789".to_string(),
            director_name: None,
            note: None,
            access_type,
            allowed_user_ids: allowed,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_private_client_hidden_from_colleague(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let colleague = member(&env, "other@example.com", Role::Employee);

        let client = env
            .usecase
            .create(&owner, input(AccessType::Private, vec![]))
            .await
            .unwrap();

        assert!(env.usecase.get(&owner, *client.id()).await.is_ok());
        let result = env.usecase.get(&colleague, *client.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_cross_company_get_is_forbidden(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let client = env
            .usecase
            .create(&owner, input(AccessType::Public, vec![]))
            .await
            .unwrap();

        let now = Utc::now();
        let outsider = User::new(
            UserId::new(),
            Email::new("outsider@example.com").unwrap(),
            "hash".to_string(),
            "Директор".to_string(),
            String::new(),
            ActivityType::Declarant,
            now,
        )
        .unwrap()
        .with_company(CompanyId::new(), now)
        .with_role(Role::Director, now);

        let result = env.usecase.get(&outsider, *client.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_director_sees_private_client(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let director = member(&env, "director@example.com", Role::Director);

        let client = env
            .usecase
            .create(&owner, input(AccessType::Private, vec![]))
            .await
            .unwrap();
        assert!(env.usecase.get(&director, *client.id()).await.is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn test_selected_access_respects_allow_list(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let allowed = member(&env, "allowed@example.com", Role::Employee);
        let excluded = member(&env, "excluded@example.com", Role::Employee);

        let client = env
            .usecase
            .create(&owner, input(AccessType::Selected, vec![*allowed.id()]))
            .await
            .unwrap();

        assert!(env.usecase.get(&allowed, *client.id()).await.is_ok());
        assert!(env.usecase.get(&excluded, *client.id()).await.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn test_list_filters_by_visibility(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let colleague = member(&env, "other@example.com", Role::Employee);

        env.usecase
            .create(&owner, input(AccessType::Public, vec![]))
            .await
            .unwrap();
        env.usecase
            .create(&owner, input(AccessType::Private, vec![]))
            .await
            .unwrap();

        let (visible, total) = env.usecase.list(&colleague, 1, 20).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(total, 1);

        let (all, total) = env.usecase.list(&owner, 1, 20).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(total, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_only_owner_or_privileged_mutates(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let colleague = member(&env, "other@example.com", Role::Employee);

        let client = env
            .usecase
            .create(&owner, input(AccessType::Public, vec![]))
            .await
            .unwrap();

        let patch = ClientPatch {
            note: Some("обновлено".to_string()),
            ..ClientPatch::default()
        };
        let result = env.usecase.patch(&colleague, *client.id(), patch).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_redirect_requires_management(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let colleague = member(&env, "other@example.com", Role::Employee);
        let director = member(&env, "director@example.com", Role::Director);

        let client = env
            .usecase
            .create(&owner, input(AccessType::Public, vec![]))
            .await
            .unwrap();

        let result = env
            .usecase
            .redirect(&owner, *client.id(), *colleague.id())
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));

        let updated = env
            .usecase
            .redirect(&director, *client.id(), *colleague.id())
            .await
            .unwrap();
        assert_eq!(updated.owner_id(), colleague.id());
    }
}
