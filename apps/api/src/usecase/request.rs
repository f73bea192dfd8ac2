//! # Request usecase
//!
//! Approval orchestration. Company registration is decided by the
//! platform admin; employee join requests by the target company's
//! management. Both paths resolve the request, mutate the affected
//! entities in the same transaction, and notify the requester.

use chrono::Utc;
use declarant_domain::{
    DomainError,
    access::ensure_privileged,
    company::{Company, CompanyId},
    request::{Request, RequestId, RequestStatus, RequestType},
    user::{Role, User},
    value_objects::{ActivityType, Inn},
};
use declarant_infra::{
    TransactionManager,
    repository::{CompanyRepository, NotificationRepository, RequestRepository, UserRepository},
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx, notification::NotificationService},
};
use declarant_domain::notification::NotificationKind;

pub struct RegisterCompanyInput {
    pub name: String,
    pub inn: String,
    pub activity_type: ActivityType,
}

pub struct RequestUseCase<TM, R, U, C, N> {
    tx_manager: TM,
    request_repo: R,
    user_repo: U,
    company_repo: C,
    notifications: NotificationService<N>,
}

impl<TM, R, U, C, N> RequestUseCase<TM, R, U, C, N>
where
    TM: TransactionManager,
    R: RequestRepository,
    U: UserRepository,
    C: CompanyRepository,
    N: NotificationRepository,
{
    pub fn new(
        tx_manager: TM,
        request_repo: R,
        user_repo: U,
        company_repo: C,
        notifications: NotificationService<N>,
    ) -> Self {
        Self {
            tx_manager,
            request_repo,
            user_repo,
            company_repo,
            notifications,
        }
    }

    /// Creates the company and a pending registration request in one
    /// transaction. The requester is attached to the company right
    /// away; the director role is granted only on approval.
    pub async fn submit_company_registration(
        &self,
        actor: User,
        input: RegisterCompanyInput,
    ) -> Result<Request, ApiError> {
        self.ensure_can_submit(&actor).await?;

        let inn = Inn::new(input.inn)?;
        if self.company_repo.find_by_inn(&inn).await?.is_some() {
            return Err(DomainError::Conflict(
                "Компания с таким ИНН уже зарегистрирована".to_string(),
            )
            .into());
        }

        let now = Utc::now();
        let company = Company::new(
            CompanyId::new(),
            input.name,
            inn,
            input.activity_type,
            now,
        )?;
        let request = Request::new(
            RequestId::new(),
            RequestType::CompanyRegistration,
            *actor.id(),
            *company.id(),
            None,
            None,
            now,
        );
        let attached = actor.with_company(*company.id(), now);

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.company_repo.insert(&mut tx, &company).await?;
        self.user_repo.update(&mut tx, &attached).await?;
        self.request_repo.insert(&mut tx, &request).await?;

        let pending = match self.user_repo.find_admin().await? {
            Some(admin) => {
                self.notifications
                    .push(
                        &mut tx,
                        &admin,
                        "Новый запрос",
                        &format!(
                            "{}: {} ({})",
                            request.request_type().label(),
                            company.name(),
                            company.inn()
                        ),
                        NotificationKind::Info,
                        None,
                    )
                    .await?
            }
            None => None,
        };
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(request)
    }

    pub async fn submit_join_request(
        &self,
        actor: User,
        target_company_id: CompanyId,
        note: Option<String>,
    ) -> Result<Request, ApiError> {
        self.ensure_can_submit(&actor).await?;

        let company = self
            .company_repo
            .find_by_id(&target_company_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Компания",
                id: target_company_id.to_string(),
            })?;
        if company.is_blocked() {
            return Err(DomainError::Forbidden("Компания заблокирована".to_string()).into());
        }

        let request = Request::new(
            RequestId::new(),
            RequestType::EmployeeJoin,
            *actor.id(),
            *company.id(),
            Some(*company.id()),
            note,
            Utc::now(),
        );

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.request_repo.insert(&mut tx, &request).await?;

        let pending = match company.director_id() {
            Some(director_id) => match self.user_repo.find_by_id(director_id).await? {
                Some(director) => {
                    self.notifications
                        .push(
                            &mut tx,
                            &director,
                            "Новый запрос",
                            &format!(
                                "{}: {}",
                                request.request_type().label(),
                                actor.full_name()
                            ),
                            NotificationKind::Info,
                            None,
                        )
                        .await?
                }
                None => None,
            },
            None => None,
        };
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(request)
    }

    /// The actor's decision queue: registration requests for the
    /// admin, join requests for company management.
    pub async fn list_pending(&self, actor: &User) -> Result<Vec<Request>, ApiError> {
        if actor.is_admin() {
            return Ok(self.request_repo.list_pending_registrations().await?);
        }
        ensure_privileged(actor)?;
        let company_id = actor.company_id().ok_or_else(no_company)?;
        Ok(self.request_repo.list_pending_for_company(company_id).await?)
    }

    pub async fn list_mine(&self, actor: &User) -> Result<Vec<Request>, ApiError> {
        Ok(self.request_repo.list_for_user(actor.id()).await?)
    }

    pub async fn approve(&self, actor: &User, request_id: RequestId) -> Result<Request, ApiError> {
        let (request, requester) = self.load_pending(actor, &request_id).await?;
        let now = Utc::now();
        let resolved = request.resolved(RequestStatus::Accepted, now)?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        let pending = match resolved.request_type() {
            RequestType::CompanyRegistration => {
                let company = self
                    .company_repo
                    .find_by_id(resolved.company_id())
                    .await?
                    .ok_or(DomainError::NotFound {
                        entity_type: "Компания",
                        id: resolved.company_id().to_string(),
                    })?;
                let director = requester.clone().with_role(Role::Director, now);
                self.user_repo.update(&mut tx, &director).await?;
                self.company_repo
                    .update(&mut tx, &company.with_director(*director.id(), now))
                    .await?;
                self.request_repo.update(&mut tx, &resolved).await?;
                self.push_decision(&mut tx, &director, &resolved, true).await?
            }
            RequestType::EmployeeJoin => {
                let member = requester.clone().with_company(*resolved.company_id(), now);
                self.user_repo.update(&mut tx, &member).await?;
                self.request_repo.update(&mut tx, &resolved).await?;
                self.push_decision(&mut tx, &member, &resolved, true).await?
            }
            RequestType::Partnership => {
                return Err(DomainError::Validation(
                    "Партнерство обрабатывается отдельно".to_string(),
                )
                .into());
            }
        };
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(resolved)
    }

    /// Rejecting a registration removes the provisional company and
    /// detaches the requester; a rejected join request changes nothing
    /// but its status.
    pub async fn reject(&self, actor: &User, request_id: RequestId) -> Result<Request, ApiError> {
        let (request, requester) = self.load_pending(actor, &request_id).await?;
        let now = Utc::now();
        let resolved = request.resolved(RequestStatus::Rejected, now)?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        if resolved.request_type() == RequestType::CompanyRegistration {
            self.user_repo
                .update(&mut tx, &requester.clone().detached(now))
                .await?;
            self.company_repo.delete(&mut tx, resolved.company_id()).await?;
        }
        self.request_repo.update(&mut tx, &resolved).await?;
        let pending = self.push_decision(&mut tx, &requester, &resolved, false).await?;
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(resolved)
    }

    async fn ensure_can_submit(&self, actor: &User) -> Result<(), ApiError> {
        if actor.company_id().is_some() {
            return Err(
                DomainError::Conflict("Вы уже состоите в компании".to_string()).into(),
            );
        }
        if self.request_repo.has_pending_for_user(actor.id()).await? {
            return Err(DomainError::Conflict(
                "У вас уже есть необработанный запрос".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Loads a pending request and checks the actor may decide it.
    async fn load_pending(
        &self,
        actor: &User,
        request_id: &RequestId,
    ) -> Result<(Request, User), ApiError> {
        let not_found = || DomainError::NotFound {
            entity_type: "Запрос",
            id: request_id.to_string(),
        };
        let forbidden = || DomainError::Forbidden("Нет доступа к этому запросу".to_string());
        let request = self
            .request_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(not_found)?;

        match request.request_type() {
            RequestType::CompanyRegistration => {
                if !actor.is_admin() {
                    return Err(forbidden().into());
                }
            }
            RequestType::EmployeeJoin => {
                if !actor.is_admin() {
                    ensure_privileged(actor)?;
                    if actor.company_id() != request.target_company_id() {
                        return Err(forbidden().into());
                    }
                }
            }
            // partnership requests resolve through the partnership flow
            RequestType::Partnership => return Err(not_found().into()),
        }

        let requester = self
            .user_repo
            .find_by_id(request.user_id())
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Пользователь",
                id: request.user_id().to_string(),
            })?;

        Ok((request, requester))
    }

    async fn push_decision(
        &self,
        tx: &mut declarant_infra::db::TxContext,
        recipient: &User,
        request: &Request,
        approved: bool,
    ) -> Result<Option<crate::usecase::notification::PendingTelegram>, ApiError> {
        let (title, kind) = if approved {
            ("Запрос одобрен", NotificationKind::Success)
        } else {
            ("Запрос отклонен", NotificationKind::Error)
        };
        self.notifications
            .push(
                tx,
                recipient,
                title,
                request.request_type().label(),
                kind,
                None,
            )
            .await
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use declarant_domain::{
        user::UserId,
        value_objects::Email,
    };
    use declarant_infra::{
        mock::{
            MockCompanyRepository, MockNotificationRepository, MockRequestRepository,
            MockTransactionManager, MockUserRepository,
        },
        telegram::NoopNotifier,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase = RequestUseCase<
        MockTransactionManager,
        MockRequestRepository,
        MockUserRepository,
        MockCompanyRepository,
        MockNotificationRepository,
    >;

    struct Env {
        usecase: TestUseCase,
        users: MockUserRepository,
        companies: MockCompanyRepository,
        requests: MockRequestRepository,
        notifications: MockNotificationRepository,
    }

    #[fixture]
    fn env() -> Env {
        let users = MockUserRepository::new();
        let companies = MockCompanyRepository::new();
        let requests = MockRequestRepository::new();
        let notifications = MockNotificationRepository::new();
        let usecase = RequestUseCase::new(
            MockTransactionManager,
            requests.clone(),
            users.clone(),
            companies.clone(),
            NotificationService::new(notifications.clone(), Arc::new(NoopNotifier)),
        );
        Env {
            usecase,
            users,
            companies,
            requests,
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

    fn registration_input() -> RegisterCompanyInput {
        RegisterCompanyInput {
            name: "ООО Декларант".to_string(),
            inn: "123456789".to_string(),
            activity_type: ActivityType::Declarant,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_registration_approval_grants_director(env: Env) {
        let requester = user("director@example.com");
        env.users.add_user(requester.clone());
        env.users.add_user(admin());

        let request = env
            .usecase
            .submit_company_registration(requester.clone(), registration_input())
            .await
            .unwrap();

        let approved = env.usecase.approve(&admin(), *request.id()).await.unwrap();
        assert_eq!(approved.status(), RequestStatus::Accepted);

        let updated = env.users.get(requester.id()).unwrap();
        assert_eq!(updated.role(), Role::Director);

        let company = env.companies.get(request.company_id()).unwrap();
        assert_eq!(company.director_id(), Some(requester.id()));
    }

    #[rstest]
    #[tokio::test]
    async fn test_registration_rejection_deletes_company_and_detaches(env: Env) {
        let requester = user("director@example.com");
        env.users.add_user(requester.clone());

        let request = env
            .usecase
            .submit_company_registration(requester.clone(), registration_input())
            .await
            .unwrap();
        env.usecase.reject(&admin(), *request.id()).await.unwrap();

        assert!(env.companies.get(request.company_id()).is_none());
        let updated = env.users.get(requester.id()).unwrap();
        assert_eq!(updated.company_id(), None);
        assert_eq!(updated.role(), Role::Employee);
    }

    #[rstest]
    #[tokio::test]
    async fn test_duplicate_inn_is_conflict(env: Env) {
        let first = user("first@example.com");
        let second = user("second@example.com");
        env.users.add_user(first.clone());
        env.users.add_user(second.clone());

        env.usecase
            .submit_company_registration(first, registration_input())
            .await
            .unwrap();
        let result = env
            .usecase
            .submit_company_registration(second, registration_input())
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_join_approval_attaches_employee_and_notifies(env: Env) {
        let now = Utc::now();
        let director = user("director@example.com");
        let company = Company::new(
            CompanyId::new(),
            "ООО Декларант".to_string(),
            Inn::new("123456789").unwrap(),
            ActivityType::Declarant,
            now,
        )
        .unwrap()
        .with_director(*director.id(), now);
        let director = director
            .with_company(*company.id(), now)
            .with_role(Role::Director, now);
        env.companies.add_company(company.clone());
        env.users.add_user(director.clone());

        let joiner = user("employee@example.com");
        env.users.add_user(joiner.clone());

        let request = env
            .usecase
            .submit_join_request(joiner.clone(), *company.id(), None)
            .await
            .unwrap();
        env.usecase.approve(&director, *request.id()).await.unwrap();

        let updated = env.users.get(joiner.id()).unwrap();
        assert_eq!(updated.company_id(), Some(company.id()));
        assert_eq!(updated.role(), Role::Employee);

        let feed = env.notifications.for_user(joiner.id());
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].title(), "Запрос одобрен");
    }

    #[rstest]
    #[tokio::test]
    async fn test_join_rejection_notifies_with_error_kind(env: Env) {
        let now = Utc::now();
        let director = user("director@example.com");
        let company = Company::new(
            CompanyId::new(),
            "ООО Декларант".to_string(),
            Inn::new("123456789").unwrap(),
            ActivityType::Declarant,
            now,
        )
        .unwrap()
        .with_director(*director.id(), now);
        let director = director
            .with_company(*company.id(), now)
            .with_role(Role::Director, now);
        env.companies.add_company(company.clone());
        env.users.add_user(director.clone());

        let joiner = user("employee@example.com");
        env.users.add_user(joiner.clone());

        let request = env
            .usecase
            .submit_join_request(joiner.clone(), *company.id(), None)
            .await
            .unwrap();
        env.usecase.reject(&director, *request.id()).await.unwrap();

        let updated = env.users.get(joiner.id()).unwrap();
        assert_eq!(updated.company_id(), None);

        let feed = env.notifications.for_user(joiner.id());
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].title(), "Запрос отклонен");
        assert_eq!(feed[0].kind(), NotificationKind::Error);
    }

    #[rstest]
    #[tokio::test]
    async fn test_foreign_management_cannot_decide_join_request(env: Env) {
        let now = Utc::now();
        let company = Company::new(
            CompanyId::new(),
            "ООО Декларант".to_string(),
            Inn::new("123456789").unwrap(),
            ActivityType::Declarant,
            now,
        )
        .unwrap();
        env.companies.add_company(company.clone());

        let joiner = user("employee@example.com");
        env.users.add_user(joiner.clone());
        let request = env
            .usecase
            .submit_join_request(joiner, *company.id(), None)
            .await
            .unwrap();

        let outsider = user("outsider@example.com")
            .with_company(CompanyId::new(), now)
            .with_role(Role::Director, now);
        let result = env.usecase.approve(&outsider, *request.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_second_pending_request_is_conflict(env: Env) {
        let requester = user("director@example.com");
        env.users.add_user(requester.clone());

        env.usecase
            .submit_company_registration(requester.clone(), registration_input())
            .await
            .unwrap();

        // Requester got attached on submit; detach to isolate the
        // pending-request check.
        let detached = env.users.get(requester.id()).unwrap().detached(Utc::now());
        let result = env
            .usecase
            .submit_join_request(detached, CompanyId::new(), None)
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Conflict(_)))
        ));
        let _ = env.requests;
    }
}
