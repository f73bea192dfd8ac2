//! # Admin usecase
//!
//! Member management inside a company plus the platform-admin
//! surface: blocking, role changes, removal with resource
//! reassignment, company block/delete, and broadcast messages.

use std::sync::Arc;

use chrono::Utc;
use declarant_domain::{
    DomainError,
    access::{ensure_admin, ensure_can_manage_member},
    company::{Company, CompanyId},
    notification::NotificationKind,
    user::{Role, User, UserId},
};
use declarant_infra::{
    TransactionManager,
    repository::{
        CertificateRepository, ClientRepository, CompanyRepository, DeclarationRepository,
        DocumentRepository, FolderRepository, NotificationRepository, PartnershipRepository,
        TaskRepository, UserRepository,
    },
    storage::LocalFileStorage,
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx, notification::NotificationService},
};

/// The per-company data stores touched by user removal and company
/// deletion.
pub struct ResourceRepos<CL, DE, CE, T, DOC, F, P> {
    pub clients: CL,
    pub declarations: DE,
    pub certificates: CE,
    pub tasks: T,
    pub documents: DOC,
    pub folders: F,
    pub partnerships: P,
}

pub struct AdminUseCase<TM, U, C, N, CL, DE, CE, T, DOC, F, P> {
    tx_manager: TM,
    user_repo: U,
    company_repo: C,
    resources: ResourceRepos<CL, DE, CE, T, DOC, F, P>,
    storage: Arc<LocalFileStorage>,
    notifications: NotificationService<N>,
}

impl<TM, U, C, N, CL, DE, CE, T, DOC, F, P> AdminUseCase<TM, U, C, N, CL, DE, CE, T, DOC, F, P>
where
    TM: TransactionManager,
    U: UserRepository,
    C: CompanyRepository,
    N: NotificationRepository,
    CL: ClientRepository,
    DE: DeclarationRepository,
    CE: CertificateRepository,
    T: TaskRepository,
    DOC: DocumentRepository,
    F: FolderRepository,
    P: PartnershipRepository,
{
    pub fn new(
        tx_manager: TM,
        user_repo: U,
        company_repo: C,
        resources: ResourceRepos<CL, DE, CE, T, DOC, F, P>,
        storage: Arc<LocalFileStorage>,
        notifications: NotificationService<N>,
    ) -> Self {
        Self {
            tx_manager,
            user_repo,
            company_repo,
            resources,
            storage,
            notifications,
        }
    }

    pub async fn get_user(&self, actor: &User, user_id: UserId) -> Result<User, ApiError> {
        let user = self.load_user(&user_id).await?;
        if !actor.is_admin() && actor.company_id() != user.company_id() {
            return Err(DomainError::NotFound {
                entity_type: "Пользователь",
                id: user_id.to_string(),
            }
            .into());
        }
        Ok(user)
    }

    pub async fn list_members(&self, actor: &User) -> Result<Vec<User>, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        Ok(self.user_repo.find_by_company(company_id).await?)
    }

    pub async fn list_companies(&self, actor: &User) -> Result<Vec<Company>, ApiError> {
        ensure_admin(actor)?;
        Ok(self.company_repo.list_all().await?)
    }

    pub async fn set_user_blocked(
        &self,
        actor: &User,
        user_id: UserId,
        blocked: bool,
    ) -> Result<User, ApiError> {
        let target = self.load_user(&user_id).await?;
        ensure_can_manage_member(actor, &target)?;
        let updated = target.with_blocked(blocked, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Directors and seniors move members between employee and
    /// senior; the admin may set any role except admin.
    pub async fn change_role(
        &self,
        actor: &User,
        user_id: UserId,
        role: Role,
    ) -> Result<User, ApiError> {
        if role == Role::Admin {
            return Err(DomainError::Validation(
                "Роль администратора нельзя назначить".to_string(),
            )
            .into());
        }
        let target = self.load_user(&user_id).await?;
        ensure_can_manage_member(actor, &target)?;
        if !actor.is_admin() && !matches!(role, Role::Employee | Role::Senior) {
            return Err(DomainError::Forbidden(
                "Недостаточно прав для назначения этой роли".to_string(),
            )
            .into());
        }
        let updated = target.with_role(role, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Detaches the member and hands their owned resources to the
    /// company director, all in one transaction.
    pub async fn remove_user(&self, actor: &User, user_id: UserId) -> Result<User, ApiError> {
        let target = self.load_user(&user_id).await?;
        ensure_can_manage_member(actor, &target)?;
        let company_id = *target.company_id().ok_or_else(|| {
            DomainError::Conflict("Пользователь не состоит в компании".to_string())
        })?;
        let company = self.load_company(&company_id).await?;
        // The director is the heir for owned resources, so the director
        // cannot be removed until the company has a new one.
        let heir = match company.director_id() {
            Some(director_id) if director_id != target.id() => *director_id,
            _ => {
                return Err(DomainError::Conflict(
                    "Сначала назначьте нового директора компании".to_string(),
                )
                .into());
            }
        };

        let now = Utc::now();
        let detached = target.detached(now);

        let mut tx = begin_tx(&self.tx_manager).await?;
        let from = detached.id();
        self.resources
            .clients
            .reassign_owner(&mut tx, &company_id, from, &heir)
            .await?;
        self.resources
            .declarations
            .reassign_owner(&mut tx, &company_id, from, &heir)
            .await?;
        self.resources
            .certificates
            .reassign_owner(&mut tx, &company_id, from, &heir)
            .await?;
        self.resources
            .tasks
            .reassign_owner(&mut tx, &company_id, from, &heir)
            .await?;
        self.resources
            .documents
            .reassign_owner(&mut tx, &company_id, from, &heir)
            .await?;
        self.resources
            .folders
            .reassign_owner(&mut tx, &company_id, from, &heir)
            .await?;
        self.user_repo.update(&mut tx, &detached).await?;
        commit_tx(tx).await?;

        Ok(detached)
    }

    pub async fn set_company_blocked(
        &self,
        actor: &User,
        company_id: CompanyId,
        blocked: bool,
    ) -> Result<Company, ApiError> {
        ensure_admin(actor)?;
        let company = self.load_company(&company_id).await?;
        let updated = company.with_blocked(blocked, Utc::now());

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.company_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Removes the company and everything scoped to it. Members are
    /// detached, not deleted. Stored files are cleaned up after the
    /// transaction commits.
    pub async fn delete_company(&self, actor: &User, company_id: CompanyId) -> Result<(), ApiError> {
        ensure_admin(actor)?;
        let company = self.load_company(&company_id).await?;
        let members = self.user_repo.find_by_company(company.id()).await?;
        let now = Utc::now();

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.resources
            .certificates
            .delete_by_company(&mut tx, company.id())
            .await?;
        self.resources
            .tasks
            .delete_by_company(&mut tx, company.id())
            .await?;
        self.resources
            .declarations
            .delete_by_company(&mut tx, company.id())
            .await?;
        let urls = self
            .resources
            .documents
            .delete_by_company(&mut tx, company.id())
            .await?;
        self.resources
            .folders
            .delete_by_company(&mut tx, company.id())
            .await?;
        self.resources
            .clients
            .delete_by_company(&mut tx, company.id())
            .await?;
        self.resources
            .partnerships
            .delete_by_company(&mut tx, company.id())
            .await?;
        for member in members {
            self.user_repo.update(&mut tx, &member.detached(now)).await?;
        }
        self.company_repo.delete(&mut tx, company.id()).await?;
        commit_tx(tx).await?;

        for url in &urls {
            self.storage.delete(url).await;
        }
        Ok(())
    }

    pub async fn message_user(
        &self,
        actor: &User,
        user_id: UserId,
        title: String,
        message: String,
    ) -> Result<(), ApiError> {
        ensure_admin(actor)?;
        let recipient = self.load_user(&user_id).await?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        let pending = self
            .notifications
            .push(
                &mut tx,
                &recipient,
                &title,
                &message,
                NotificationKind::Info,
                None,
            )
            .await?;
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(())
    }

    pub async fn message_company(
        &self,
        actor: &User,
        company_id: CompanyId,
        title: String,
        message: String,
    ) -> Result<(), ApiError> {
        ensure_admin(actor)?;
        let members = self.user_repo.find_by_company(&company_id).await?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        let mut pendings = Vec::with_capacity(members.len());
        for member in &members {
            pendings.push(
                self.notifications
                    .push(
                        &mut tx,
                        member,
                        &title,
                        &message,
                        NotificationKind::Info,
                        None,
                    )
                    .await?,
            );
        }
        commit_tx(tx).await?;
        self.notifications.deliver(pendings).await;

        Ok(())
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User, ApiError> {
        Ok(self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Пользователь",
                id: user_id.to_string(),
            })?)
    }

    async fn load_company(&self, company_id: &CompanyId) -> Result<Company, ApiError> {
        Ok(self
            .company_repo
            .find_by_id(company_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Компания",
                id: company_id.to_string(),
            })?)
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use declarant_domain::{
        client::{Client, ClientId},
        value_objects::{AccessType, ActivityType, Email, Inn},
    };
    use declarant_infra::{
        mock::{
            MockCertificateRepository, MockClientRepository, MockCompanyRepository,
            MockDeclarationRepository, MockDocumentRepository, MockFolderRepository,
            MockNotificationRepository, MockPartnershipRepository, MockTaskRepository,
            MockTransactionManager, MockUserRepository,
        },
        telegram::NoopNotifier,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase = AdminUseCase<
        MockTransactionManager,
        MockUserRepository,
        MockCompanyRepository,
        MockNotificationRepository,
        MockClientRepository,
        MockDeclarationRepository,
        MockCertificateRepository,
        MockTaskRepository,
        MockDocumentRepository,
        MockFolderRepository,
        MockPartnershipRepository,
    >;

    struct Env {
        usecase: TestUseCase,
        users: MockUserRepository,
        companies: MockCompanyRepository,
        clients: MockClientRepository,
        notifications: MockNotificationRepository,
    }

    #[fixture]
    fn env() -> Env {
        let users = MockUserRepository::new();
        let companies = MockCompanyRepository::new();
        let clients = MockClientRepository::new();
        let notifications = MockNotificationRepository::new();
        let dir = std::env::temp_dir().join(format!("declarant-test-{}", uuid::Uuid::now_v7()));
        let usecase = AdminUseCase::new(
            MockTransactionManager,
            users.clone(),
            companies.clone(),
            ResourceRepos {
                clients: clients.clone(),
                declarations: MockDeclarationRepository::new(),
                certificates: MockCertificateRepository::new(),
                tasks: MockTaskRepository::new(),
                documents: MockDocumentRepository::new(),
                folders: MockFolderRepository::new(),
                partnerships: MockPartnershipRepository::new(),
            },
            Arc::new(LocalFileStorage::new(dir)),
            NotificationService::new(notifications.clone(), Arc::new(NoopNotifier)),
        );
        Env {
            usecase,
            users,
            companies,
            clients,
            notifications,
        }
    }

    fn user(email: &str) -> User {
        User::new(
            UserId::new(),
            Email::new(email).unwrap(),
            "hash".to_string(),
            "Иванов Иван".to_string(),
            String::new(),
            ActivityType::Declarant,
            Utc::now(),
        )
        .unwrap()
    }

    fn admin() -> User {
        user("admin@platform.local").with_role(Role::Admin, Utc::now())
    }

    fn company(env: &Env) -> Company {
        let company = Company::new(
            CompanyId::new(),
            "ООО Декларант".to_string(),
            Inn::new("123456789").unwrap(),
            ActivityType::Declarant,
            Utc::now(),
        )
        .unwrap();
        env.companies.add_company(company.clone());
        company
    }

    fn member(env: &Env, company: &Company, email: &str, role: Role) -> User {
        let now = Utc::now();
        let member = user(email).with_company(*company.id(), now).with_role(role, now);
        env.users.add_user(member.clone());
        member
    }

    #[rstest]
    #[tokio::test]
    async fn test_director_blocks_employee_but_not_peer(env: Env) {
        let company = company(&env);
        let director = member(&env, &company, "dir@example.com", Role::Director);
        let employee = member(&env, &company, "emp@example.com", Role::Employee);
        let senior = member(&env, &company, "senior@example.com", Role::Senior);

        let blocked = env
            .usecase
            .set_user_blocked(&director, *employee.id(), true)
            .await
            .unwrap();
        assert!(blocked.is_blocked());

        let other_director = member(&env, &company, "dir2@example.com", Role::Director);
        let result = env
            .usecase
            .set_user_blocked(&senior, *other_director.id(), true)
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_remove_user_reassigns_owned_resources(env: Env) {
        let now = Utc::now();
        let company = company(&env);
        let director = member(&env, &company, "dir@example.com", Role::Director);
        let company = company.with_director(*director.id(), now);
        env.companies.update_company(company.clone());
        let employee = member(&env, &company, "emp@example.com", Role::Employee);

        let client = Client::new(
            ClientId::new(),
            "ООО Клиент".to_string(),
            "987654321".to_string(),
            None,
            None,
            AccessType::Public,
            vec![],
            *employee.id(),
            *company.id(),
            now,
        )
        .unwrap();
        env.clients.add_client(client.clone());

        let removed = env.usecase.remove_user(&director, *employee.id()).await.unwrap();
        assert_eq!(removed.company_id(), None);
        assert_eq!(removed.role(), Role::Employee);

        let reassigned = env.clients.get(client.id()).unwrap();
        assert_eq!(reassigned.owner_id(), director.id());
    }

    #[rstest]
    #[tokio::test]
    async fn test_removing_the_director_requires_a_successor(env: Env) {
        let now = Utc::now();
        let company = company(&env);
        let director = member(&env, &company, "dir@example.com", Role::Director);
        let company = company.with_director(*director.id(), now);
        env.companies.update_company(company.clone());

        let result = env.usecase.remove_user(&admin(), *director.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Conflict(_)))
        ));

        let untouched = env.users.get(director.id()).unwrap();
        assert_eq!(untouched.company_id(), Some(company.id()));
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_company_detaches_members_and_clears_data(env: Env) {
        let company = company(&env);
        let director = member(&env, &company, "dir@example.com", Role::Director);
        let employee = member(&env, &company, "emp@example.com", Role::Employee);

        let client = Client::new(
            ClientId::new(),
            "ООО Клиент".to_string(),
            "987654321".to_string(),
            None,
            None,
            AccessType::Public,
            vec![],
            *employee.id(),
            *company.id(),
            Utc::now(),
        )
        .unwrap();
        env.clients.add_client(client.clone());

        env.usecase.delete_company(&admin(), *company.id()).await.unwrap();

        assert!(env.companies.get(company.id()).is_none());
        assert!(env.clients.get(client.id()).is_none());
        assert_eq!(env.users.get(director.id()).unwrap().company_id(), None);
        assert_eq!(env.users.get(employee.id()).unwrap().company_id(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_company_broadcast_reaches_every_member(env: Env) {
        let company = company(&env);
        let director = member(&env, &company, "dir@example.com", Role::Director);
        let employee = member(&env, &company, "emp@example.com", Role::Employee);

        env.usecase
            .message_company(
                &admin(),
                *company.id(),
                "Обновление".to_string(),
                "Платформа обновлена".to_string(),
            )
            .await
            .unwrap();

        assert_eq!(env.notifications.for_user(director.id()).len(), 1);
        assert_eq!(env.notifications.for_user(employee.id()).len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_admin_role_cannot_be_granted(env: Env) {
        let company = company(&env);
        let employee = member(&env, &company, "emp@example.com", Role::Employee);

        let result = env
            .usecase
            .change_role(&admin(), *employee.id(), Role::Admin)
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Validation(_)))
        ));
    }
}
