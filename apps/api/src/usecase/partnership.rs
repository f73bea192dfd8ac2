//! # Partnership usecase
//!
//! Partnerships link two companies so they can exchange certificates
//! and tasks. Only management (director or senior) touches them. A
//! rejected partnership does not block a fresh request; a pending or
//! accepted one does.

use chrono::Utc;
use declarant_domain::{
    DomainError,
    access::ensure_privileged,
    company::CompanyId,
    notification::NotificationKind,
    partnership::{Partnership, PartnershipId, PartnershipStatus},
    user::User,
};
use declarant_infra::{
    TransactionManager,
    repository::{
        CompanyRepository, NotificationRepository, PartnershipRepository, UserRepository,
    },
};

use crate::{
    error::ApiError,
    usecase::{begin_tx, commit_tx, notification::NotificationService},
};

pub struct PartnershipUseCase<TM, P, U, C, N> {
    tx_manager: TM,
    partnership_repo: P,
    user_repo: U,
    company_repo: C,
    notifications: NotificationService<N>,
}

impl<TM, P, U, C, N> PartnershipUseCase<TM, P, U, C, N>
where
    TM: TransactionManager,
    P: PartnershipRepository,
    U: UserRepository,
    C: CompanyRepository,
    N: NotificationRepository,
{
    pub fn new(
        tx_manager: TM,
        partnership_repo: P,
        user_repo: U,
        company_repo: C,
        notifications: NotificationService<N>,
    ) -> Self {
        Self {
            tx_manager,
            partnership_repo,
            user_repo,
            company_repo,
            notifications,
        }
    }

    pub async fn request(
        &self,
        actor: &User,
        target_company_id: CompanyId,
        note: Option<String>,
    ) -> Result<Partnership, ApiError> {
        ensure_privileged(actor)?;
        let company_id = *actor.company_id().ok_or_else(no_company)?;

        let target = self
            .company_repo
            .find_by_id(&target_company_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Компания",
                id: target_company_id.to_string(),
            })?;
        if target.is_blocked() {
            return Err(DomainError::Forbidden("Компания заблокирована".to_string()).into());
        }

        if let Some(existing) = self
            .partnership_repo
            .find_between(&company_id, &target_company_id)
            .await?
        {
            if existing.blocks_new_request() {
                let message = match existing.status() {
                    PartnershipStatus::Accepted => "Партнерство уже установлено",
                    _ => "Запрос на партнерство уже отправлен",
                };
                return Err(DomainError::Conflict(message.to_string()).into());
            }
        }

        let now = Utc::now();
        let partnership = Partnership::new(
            PartnershipId::new(),
            company_id,
            target_company_id,
            note,
            now,
        )?;

        let requesting = self
            .company_repo
            .find_by_id(&company_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Компания",
                id: company_id.to_string(),
            })?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.partnership_repo.insert(&mut tx, &partnership).await?;

        let pending = match target.director_id() {
            Some(director_id) => match self.user_repo.find_by_id(director_id).await? {
                Some(director) => {
                    self.notifications
                        .push(
                            &mut tx,
                            &director,
                            "Запрос на партнерство",
                            &format!("Компания {} предлагает партнерство", requesting.name()),
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

        Ok(partnership)
    }

    pub async fn accept(
        &self,
        actor: &User,
        partnership_id: PartnershipId,
    ) -> Result<Partnership, ApiError> {
        self.decide(actor, partnership_id, PartnershipStatus::Accepted)
            .await
    }

    pub async fn reject(
        &self,
        actor: &User,
        partnership_id: PartnershipId,
    ) -> Result<Partnership, ApiError> {
        self.decide(actor, partnership_id, PartnershipStatus::Rejected)
            .await
    }

    /// Either side's management can sever a partnership; the row is
    /// removed outright so a fresh request is possible afterwards.
    pub async fn delete(
        &self,
        actor: &User,
        partnership_id: PartnershipId,
    ) -> Result<(), ApiError> {
        ensure_privileged(actor)?;
        let company_id = actor.company_id().ok_or_else(no_company)?;

        let partnership = self
            .partnership_repo
            .find_by_id(&partnership_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Партнерство",
                id: partnership_id.to_string(),
            })?;
        if partnership.requesting_company_id() != company_id
            && partnership.target_company_id() != company_id
        {
            return Err(
                DomainError::Forbidden("Партнерство другой компании".to_string()).into(),
            );
        }

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.partnership_repo.delete(&mut tx, &partnership_id).await?;
        commit_tx(tx).await?;

        Ok(())
    }

    pub async fn list(&self, actor: &User) -> Result<Vec<Partnership>, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        Ok(self.partnership_repo.list_for_company(company_id).await?)
    }

    pub async fn list_incoming(&self, actor: &User) -> Result<Vec<Partnership>, ApiError> {
        ensure_privileged(actor)?;
        let company_id = actor.company_id().ok_or_else(no_company)?;
        Ok(self
            .partnership_repo
            .list_pending_for_target(company_id)
            .await?)
    }

    /// Only the target company's management decides.
    async fn decide(
        &self,
        actor: &User,
        partnership_id: PartnershipId,
        status: PartnershipStatus,
    ) -> Result<Partnership, ApiError> {
        ensure_privileged(actor)?;
        let company_id = actor.company_id().ok_or_else(no_company)?;

        let partnership = self
            .partnership_repo
            .find_by_id(&partnership_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Партнерство",
                id: partnership_id.to_string(),
            })?;
        if partnership.target_company_id() != company_id {
            return Err(DomainError::Forbidden(
                "Решение принимает компания-адресат".to_string(),
            )
            .into());
        }

        let now = Utc::now();
        let resolved = partnership.resolved(status, now)?;

        let requesting = self
            .company_repo
            .find_by_id(resolved.requesting_company_id())
            .await?;
        let target = self.company_repo.find_by_id(company_id).await?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.partnership_repo.update(&mut tx, &resolved).await?;

        let pending = match requesting.as_ref().and_then(|c| c.director_id()) {
            Some(director_id) => match self.user_repo.find_by_id(director_id).await? {
                Some(director) => {
                    let target_name = target
                        .as_ref()
                        .map(|c| c.name().to_string())
                        .unwrap_or_default();
                    let (title, kind) = match status {
                        PartnershipStatus::Accepted => {
                            ("Партнерство принято", NotificationKind::Success)
                        }
                        _ => ("Партнерство отклонено", NotificationKind::Warning),
                    };
                    self.notifications
                        .push(
                            &mut tx,
                            &director,
                            title,
                            &format!("Компания {target_name} ответила на ваш запрос"),
                            kind,
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

        Ok(resolved)
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use declarant_domain::{
        company::Company,
        user::{Role, UserId},
        value_objects::{ActivityType, Email, Inn},
    };
    use declarant_infra::{
        mock::{
            MockCompanyRepository, MockNotificationRepository, MockPartnershipRepository,
            MockTransactionManager, MockUserRepository,
        },
        telegram::NoopNotifier,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase = PartnershipUseCase<
        MockTransactionManager,
        MockPartnershipRepository,
        MockUserRepository,
        MockCompanyRepository,
        MockNotificationRepository,
    >;

    struct Env {
        usecase: TestUseCase,
        users: MockUserRepository,
        companies: MockCompanyRepository,
        notifications: MockNotificationRepository,
    }

    #[fixture]
    fn env() -> Env {
        let users = MockUserRepository::new();
        let companies = MockCompanyRepository::new();
        let partnerships = MockPartnershipRepository::new();
        let notifications = MockNotificationRepository::new();
        let usecase = PartnershipUseCase::new(
            MockTransactionManager,
            partnerships,
            users.clone(),
            companies.clone(),
            NotificationService::new(notifications.clone(), Arc::new(NoopNotifier)),
        );
        Env {
            usecase,
            users,
            companies,
            notifications,
        }
    }

    fn company_with_director(env: &Env, name: &str, inn: &str) -> (Company, User) {
        let now = Utc::now();
        let director = User::new(
            UserId::new(),
            Email::new(&format!("{inn}@example.com")).unwrap(),
            "hash".to_string(),
            "Директор".to_string(),
            String::new(),
            ActivityType::Declarant,
            now,
        )
        .unwrap();
        let company = Company::new(
            CompanyId::new(),
            name.to_string(),
            Inn::new(inn).unwrap(),
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
        (company, director)
    }

    #[rstest]
    #[tokio::test]
    async fn test_request_and_accept(env: Env) {
        let (_a, director_a) = company_with_director(&env, "ООО Альфа", "111111111");
        let (b, director_b) = company_with_director(&env, "ООО Бета", "222222222");

        let partnership = env
            .usecase
            .request(&director_a, *b.id(), Some("Сотрудничаем".to_string()))
            .await
            .unwrap();
        assert_eq!(partnership.status(), PartnershipStatus::Pending);
        assert_eq!(env.notifications.for_user(director_b.id()).len(), 1);

        let accepted = env
            .usecase
            .accept(&director_b, *partnership.id())
            .await
            .unwrap();
        assert_eq!(accepted.status(), PartnershipStatus::Accepted);

        let feed = env.notifications.for_user(director_a.id());
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].title(), "Партнерство принято");
    }

    #[rstest]
    #[tokio::test]
    async fn test_duplicate_request_is_conflict(env: Env) {
        let (_a, director_a) = company_with_director(&env, "ООО Альфа", "111111111");
        let (b, _director_b) = company_with_director(&env, "ООО Бета", "222222222");

        env.usecase.request(&director_a, *b.id(), None).await.unwrap();
        let result = env.usecase.request(&director_a, *b.id(), None).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_rejected_partnership_allows_retry(env: Env) {
        let (_a, director_a) = company_with_director(&env, "ООО Альфа", "111111111");
        let (b, director_b) = company_with_director(&env, "ООО Бета", "222222222");

        let first = env.usecase.request(&director_a, *b.id(), None).await.unwrap();
        env.usecase.reject(&director_b, *first.id()).await.unwrap();

        let second = env.usecase.request(&director_a, *b.id(), None).await.unwrap();
        assert_eq!(second.status(), PartnershipStatus::Pending);
    }

    #[rstest]
    #[tokio::test]
    async fn test_employee_cannot_request(env: Env) {
        let (a, _director_a) = company_with_director(&env, "ООО Альфа", "111111111");
        let (b, _director_b) = company_with_director(&env, "ООО Бета", "222222222");

        let now = Utc::now();
        let employee = User::new(
            UserId::new(),
            Email::new("emp@example.com").unwrap(),
            "hash".to_string(),
            "Сотрудник".to_string(),
            String::new(),
            ActivityType::Declarant,
            now,
        )
        .unwrap()
        .with_company(*a.id(), now);

        let result = env.usecase.request(&employee, *b.id(), None).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_either_side_can_delete(env: Env) {
        let (_a, director_a) = company_with_director(&env, "ООО Альфа", "111111111");
        let (b, director_b) = company_with_director(&env, "ООО Бета", "222222222");

        let partnership = env.usecase.request(&director_a, *b.id(), None).await.unwrap();
        env.usecase
            .accept(&director_b, *partnership.id())
            .await
            .unwrap();

        env.usecase
            .delete(&director_a, *partnership.id())
            .await
            .unwrap();
        assert_eq!(env.usecase.list(&director_b).await.unwrap().len(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_only_target_company_decides(env: Env) {
        let (_a, director_a) = company_with_director(&env, "ООО Альфа", "111111111");
        let (b, _director_b) = company_with_director(&env, "ООО Бета", "222222222");

        let partnership = env.usecase.request(&director_a, *b.id(), None).await.unwrap();
        let result = env.usecase.accept(&director_a, *partnership.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }
}
