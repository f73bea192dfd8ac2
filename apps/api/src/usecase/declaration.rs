//! # Declaration usecase
//!
//! Declarations reference a client and inherit its visibility: an
//! employee sees a declaration when they own it or can see its
//! client. Groups are a flat, company-wide labelling of declarations.

use chrono::{NaiveDate, Utc};
use declarant_domain::{
    DomainError,
    access::{
        can_view_restricted, ensure_can_view_restricted, ensure_owner_or_privileged,
        ensure_privileged, ensure_same_company,
    },
    client::ClientId,
    declaration::{
        Declaration, DeclarationGroup, DeclarationGroupId, DeclarationId, DeclarationPatch,
        Vehicle,
    },
    user::{User, UserId},
    value_objects::{DeclarationSerial, PostNumber},
};
use declarant_infra::{
    TransactionManager,
    repository::{ClientRepository, DeclarationRepository, UserRepository},
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx},
};

pub struct CreateDeclarationInput {
    pub post_number: String,
    pub date: NaiveDate,
    pub serial: String,
    pub client_id: ClientId,
    pub mode: String,
    pub note: Option<String>,
    pub vehicles: Vec<Vehicle>,
}

pub struct DeclarationUseCase<TM, D, CL, U> {
    tx_manager: TM,
    declaration_repo: D,
    client_repo: CL,
    user_repo: U,
}

impl<TM, D, CL, U> DeclarationUseCase<TM, D, CL, U>
where
    TM: TransactionManager,
    D: DeclarationRepository,
    CL: ClientRepository,
    U: UserRepository,
{
    pub fn new(tx_manager: TM, declaration_repo: D, client_repo: CL, user_repo: U) -> Self {
        Self {
            tx_manager,
            declaration_repo,
            client_repo,
            user_repo,
        }
    }

    pub async fn create(
        &self,
        actor: &User,
        input: CreateDeclarationInput,
    ) -> Result<Declaration, ApiError> {
        let company_id = *actor.company_id().ok_or_else(no_company)?;
        self.ensure_client_visible(actor, &input.client_id).await?;

        let declaration = Declaration::new(
            DeclarationId::new(),
            PostNumber::new(input.post_number)?,
            input.date,
            DeclarationSerial::new(input.serial)?,
            input.client_id,
            input.mode,
            input.note,
            input.vehicles,
            *actor.id(),
            company_id,
            Utc::now(),
        )?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.declaration_repo.insert(&mut tx, &declaration).await?;
        commit_tx(tx).await?;

        Ok(declaration)
    }

    pub async fn get(&self, actor: &User, id: DeclarationId) -> Result<Declaration, ApiError> {
        self.load_visible(actor, &id).await
    }

    pub async fn list(
        &self,
        actor: &User,
        group_id: Option<DeclarationGroupId>,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Declaration>, u64), ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let viewer = (!actor.role().is_privileged()).then(|| actor.id());
        Ok(self
            .declaration_repo
            .list_for_company(company_id, viewer, group_id.as_ref(), page, page_size)
            .await?)
    }

    pub async fn patch(
        &self,
        actor: &User,
        id: DeclarationId,
        patch: DeclarationPatch,
    ) -> Result<Declaration, ApiError> {
        let declaration = self.load_visible(actor, &id).await?;
        ensure_owner_or_privileged(actor, declaration.owner_id())?;

        if let Some(Some(group_id)) = &patch.group_id {
            self.ensure_group_in_company(actor, group_id).await?;
        }
        let updated = declaration.apply(patch, Utc::now())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.declaration_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: DeclarationId) -> Result<(), ApiError> {
        let declaration = self.load_visible(actor, &id).await?;
        ensure_owner_or_privileged(actor, declaration.owner_id())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.declaration_repo.delete(&mut tx, declaration.id()).await?;
        commit_tx(tx).await?;

        Ok(())
    }

    /// Hands the declaration over to another user of the same company.
    /// Management only.
    pub async fn redirect(
        &self,
        actor: &User,
        id: DeclarationId,
        new_owner_id: UserId,
    ) -> Result<Declaration, ApiError> {
        ensure_privileged(actor)?;
        let declaration = self.load_visible(actor, &id).await?;
        let new_owner = self
            .user_repo
            .find_by_id(&new_owner_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Пользователь",
                id: new_owner_id.to_string(),
            })?;
        if new_owner.company_id() != Some(declaration.company_id()) {
            return Err(DomainError::Validation(
                "Пользователь состоит в другой компании".to_string(),
            )
            .into());
        }
        let updated = declaration.redirected_to(new_owner_id, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.declaration_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    pub async fn assign_to_group(
        &self,
        actor: &User,
        id: DeclarationId,
        group_id: Option<DeclarationGroupId>,
    ) -> Result<Declaration, ApiError> {
        let declaration = self.load_visible(actor, &id).await?;
        ensure_owner_or_privileged(actor, declaration.owner_id())?;
        if let Some(group_id) = &group_id {
            self.ensure_group_in_company(actor, group_id).await?;
        }
        let updated = declaration.with_group(group_id, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.declaration_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    pub async fn create_group(
        &self,
        actor: &User,
        name: String,
    ) -> Result<DeclarationGroup, ApiError> {
        let company_id = *actor.company_id().ok_or_else(no_company)?;
        let group = DeclarationGroup::new(DeclarationGroupId::new(), name, company_id, Utc::now())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.declaration_repo.insert_group(&mut tx, &group).await?;
        commit_tx(tx).await?;

        Ok(group)
    }

    /// Deleting a group detaches its declarations rather than deleting
    /// them.
    pub async fn delete_group(
        &self,
        actor: &User,
        group_id: DeclarationGroupId,
    ) -> Result<(), ApiError> {
        let group = self.ensure_group_in_company(actor, &group_id).await?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.declaration_repo.delete_group(&mut tx, group.id()).await?;
        commit_tx(tx).await?;

        Ok(())
    }

    pub async fn list_groups(&self, actor: &User) -> Result<Vec<DeclarationGroup>, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        Ok(self.declaration_repo.list_groups(company_id).await?)
    }

    async fn load_visible(
        &self,
        actor: &User,
        id: &DeclarationId,
    ) -> Result<Declaration, ApiError> {
        actor.company_id().ok_or_else(no_company)?;
        let declaration = self
            .declaration_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Декларация",
                id: id.to_string(),
            })?;
        ensure_same_company(actor, declaration.company_id())?;
        if declaration.owner_id() != actor.id() && !actor.role().is_privileged() {
            // fall back to the client's visibility
            let visible = match self.client_repo.find_by_id(declaration.client_id()).await? {
                Some(client) => can_view_restricted(
                    actor,
                    client.owner_id(),
                    client.access_type(),
                    client.allowed_user_ids(),
                ),
                None => false,
            };
            if !visible {
                return Err(DomainError::Forbidden(
                    "Нет доступа к этому ресурсу".to_string(),
                )
                .into());
            }
        }
        Ok(declaration)
    }

    async fn ensure_client_visible(
        &self,
        actor: &User,
        client_id: &ClientId,
    ) -> Result<(), ApiError> {
        actor.company_id().ok_or_else(no_company)?;
        let client = self
            .client_repo
            .find_by_id(client_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Клиент",
                id: client_id.to_string(),
            })?;
        ensure_same_company(actor, client.company_id())?;
        ensure_can_view_restricted(
            actor,
            client.owner_id(),
            client.access_type(),
            client.allowed_user_ids(),
        )?;
        Ok(())
    }

    async fn ensure_group_in_company(
        &self,
        actor: &User,
        group_id: &DeclarationGroupId,
    ) -> Result<DeclarationGroup, ApiError> {
        actor.company_id().ok_or_else(no_company)?;
        let group = self
            .declaration_repo
            .find_group_by_id(group_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Группа деклараций",
                id: group_id.to_string(),
            })?;
        ensure_same_company(actor, group.company_id())?;
        Ok(group)
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use declarant_domain::{
        client::Client,
        company::CompanyId,
        user::{Role, UserId},
        value_objects::{AccessType, ActivityType, Email},
    };
    use declarant_infra::mock::{
        MockClientRepository, MockDeclarationRepository, MockTransactionManager,
        MockUserRepository,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase = DeclarationUseCase<
        MockTransactionManager,
        MockDeclarationRepository,
        MockClientRepository,
        MockUserRepository,
    >;

    struct Env {
        usecase: TestUseCase,
        clients: MockClientRepository,
        users: MockUserRepository,
        company_id: CompanyId,
    }

    #[fixture]
    fn env() -> Env {
        let clients = MockClientRepository::new();
        let users = MockUserRepository::new();
        Env {
            usecase: DeclarationUseCase::new(
                MockTransactionManager,
                MockDeclarationRepository::new(),
                clients.clone(),
                users.clone(),
            ),
            clients,
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

    fn client_of(env: &Env, owner: &User, access_type: AccessType) -> Client {
        let client = Client::new(
            ClientId::new(),
            "ООО Клиент".to_string(),
            "123456789".to_string(),
            None,
            None,
            access_type,
            vec![],
            *owner.id(),
            env.company_id,
            Utc::now(),
        )
        .unwrap();
        env.clients.add_client(client.clone());
        client
    }

    fn input(client_id: ClientId) -> CreateDeclarationInput {
        CreateDeclarationInput {
            post_number: "10013".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            serial: "0012345".to_string(),
            client_id,
            mode: "ИМ40".to_string(),
            note: None,
            vehicles: vec![],
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_requires_visible_client(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let other = member(&env, "other@example.com", Role::Employee);
        let client = client_of(&env, &owner, AccessType::Private);

        assert!(env.usecase.create(&owner, input(*client.id())).await.is_ok());
        let result = env.usecase.create(&other, input(*client.id())).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_group_assignment_roundtrip(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let client = client_of(&env, &owner, AccessType::Public);

        let declaration = env.usecase.create(&owner, input(*client.id())).await.unwrap();
        let group = env
            .usecase
            .create_group(&owner, "Март 2024".to_string())
            .await
            .unwrap();

        let assigned = env
            .usecase
            .assign_to_group(&owner, *declaration.id(), Some(*group.id()))
            .await
            .unwrap();
        assert_eq!(assigned.group_id(), Some(group.id()));

        env.usecase.delete_group(&owner, *group.id()).await.unwrap();
        let reloaded = env.usecase.get(&owner, *declaration.id()).await.unwrap();
        assert_eq!(reloaded.group_id(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_unknown_group_is_not_found(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let client = client_of(&env, &owner, AccessType::Public);
        let declaration = env.usecase.create(&owner, input(*client.id())).await.unwrap();

        let result = env
            .usecase
            .assign_to_group(&owner, *declaration.id(), Some(DeclarationGroupId::new()))
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::NotFound { .. }))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_director_sees_declaration_for_private_client(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let director = member(&env, "director@example.com", Role::Director);
        let client = client_of(&env, &owner, AccessType::Private);

        let declaration = env.usecase.create(&owner, input(*client.id())).await.unwrap();
        assert!(env.usecase.get(&director, *declaration.id()).await.is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn test_cross_company_get_is_forbidden(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let client = client_of(&env, &owner, AccessType::Public);
        let declaration = env.usecase.create(&owner, input(*client.id())).await.unwrap();

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

        let result = env.usecase.get(&outsider, *declaration.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_formatted_number(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let client = client_of(&env, &owner, AccessType::Public);
        let declaration = env.usecase.create(&owner, input(*client.id())).await.unwrap();
        assert_eq!(declaration.formatted_number(), "10013/15.03.2024/0012345");
    }

    #[rstest]
    #[tokio::test]
    async fn test_redirect_requires_management(env: Env) {
        let owner = member(&env, "owner@example.com", Role::Employee);
        let colleague = member(&env, "other@example.com", Role::Employee);
        let senior = member(&env, "senior@example.com", Role::Senior);
        let client = client_of(&env, &owner, AccessType::Public);

        let declaration = env.usecase.create(&owner, input(*client.id())).await.unwrap();

        let result = env
            .usecase
            .redirect(&owner, *declaration.id(), *colleague.id())
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));

        let updated = env
            .usecase
            .redirect(&senior, *declaration.id(), *colleague.id())
            .await
            .unwrap();
        assert_eq!(updated.owner_id(), colleague.id());
    }
}
