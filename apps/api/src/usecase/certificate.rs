//! # Certificate usecase
//!
//! The certification workflow between a declarant company and a
//! partner certification company. Every state change appends an audit
//! action and notifies whoever sits on the other side of the
//! certificate.

use chrono::{NaiveDate, Utc};
use declarant_domain::{
    DomainError,
    access::{ensure_company_involved, ensure_owner_or_privileged},
    certificate::{
        Certificate, CertificateAction, CertificateActionId, CertificateId, CertificatePatch,
        CertificateStatus,
    },
    client::ClientId,
    document::DocumentId,
    notification::NotificationKind,
    user::{User, UserId},
};
use declarant_infra::{
    TransactionManager,
    db::TxContext,
    repository::{
        CertificateRepository, NotificationRepository, PartnershipRepository, UserRepository,
    },
};

use crate::{
    error::ApiError,
    usecase::{
        begin_tx, commit_tx,
        notification::{NotificationService, PendingTelegram},
    },
};

pub struct CreateCertificateInput {
    pub kind: String,
    pub number: Option<String>,
    pub number_to_be_filled_by_certifier: bool,
    pub deadline: Option<NaiveDate>,
    pub client_id: ClientId,
    pub note: Option<String>,
}

pub struct CertificateUseCase<TM, CE, P, U, N> {
    tx_manager: TM,
    certificate_repo: CE,
    partnership_repo: P,
    user_repo: U,
    notifications: NotificationService<N>,
}

impl<TM, CE, P, U, N> CertificateUseCase<TM, CE, P, U, N>
where
    TM: TransactionManager,
    CE: CertificateRepository,
    P: PartnershipRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    pub fn new(
        tx_manager: TM,
        certificate_repo: CE,
        partnership_repo: P,
        user_repo: U,
        notifications: NotificationService<N>,
    ) -> Self {
        Self {
            tx_manager,
            certificate_repo,
            partnership_repo,
            user_repo,
            notifications,
        }
    }

    pub async fn create(
        &self,
        actor: &User,
        input: CreateCertificateInput,
    ) -> Result<Certificate, ApiError> {
        let company_id = *actor.company_id().ok_or_else(no_company)?;
        let now = Utc::now();
        let certificate = Certificate::new(
            CertificateId::new(),
            input.kind,
            input.number,
            input.number_to_be_filled_by_certifier,
            input.deadline,
            input.client_id,
            input.note,
            *actor.id(),
            company_id,
            now,
        )?;
        let action = self.action_row(&certificate, actor, "Сертификат создан", None, vec![], now);

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.certificate_repo.insert(&mut tx, &certificate).await?;
        self.certificate_repo.insert_action(&mut tx, &action).await?;
        commit_tx(tx).await?;

        Ok(certificate)
    }

    pub async fn get(&self, actor: &User, id: CertificateId) -> Result<Certificate, ApiError> {
        self.load_visible(actor, &id).await
    }

    pub async fn list(
        &self,
        actor: &User,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Certificate>, u64), ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let employee = (!actor.role().is_privileged()).then(|| actor.id());
        Ok(self
            .certificate_repo
            .list_for_company(company_id, employee, page, page_size)
            .await?)
    }

    pub async fn history(
        &self,
        actor: &User,
        id: CertificateId,
    ) -> Result<Vec<CertificateAction>, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        Ok(self.certificate_repo.list_actions(certificate.id()).await?)
    }

    pub async fn patch(
        &self,
        actor: &User,
        id: CertificateId,
        patch: CertificatePatch,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        self.ensure_can_edit(actor, &certificate)?;

        let now = Utc::now();
        let updated = certificate.apply(patch, now)?;
        let action = self.action_row(&updated, actor, "Сертификат изменен", None, vec![], now);

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.certificate_repo.update(&mut tx, &updated).await?;
        self.certificate_repo.insert_action(&mut tx, &action).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Sends the certificate to a certification company. Requires an
    /// accepted partnership between the two companies.
    pub async fn send_to_certifier(
        &self,
        actor: &User,
        id: CertificateId,
        certifier_company_id: declarant_domain::company::CompanyId,
        sent_date: NaiveDate,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        self.ensure_can_edit(actor, &certificate)?;
        if certificate.declarant_company_id() != actor.company_id().ok_or_else(no_company)? {
            return Err(DomainError::Forbidden(
                "Отправить сертификат может только компания-декларант".to_string(),
            )
            .into());
        }

        let accepted = self
            .partnership_repo
            .find_between(certificate.declarant_company_id(), &certifier_company_id)
            .await?
            .is_some_and(|p| {
                p.status() == declarant_domain::partnership::PartnershipStatus::Accepted
            });
        if !accepted {
            return Err(DomainError::Forbidden(
                "Партнерство с этой компанией не установлено".to_string(),
            )
            .into());
        }

        let now = Utc::now();
        let updated = certificate.sent_to(certifier_company_id, sent_date, now);
        let action = self.action_row(
            &updated,
            actor,
            "Сертификат отправлен сертификатору",
            None,
            vec![],
            now,
        );

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.certificate_repo.update(&mut tx, &updated).await?;
        self.certificate_repo.insert_action(&mut tx, &action).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Any transition is allowed; the change is audited and the
    /// counterpart side notified.
    pub async fn change_status(
        &self,
        actor: &User,
        id: CertificateId,
        status: CertificateStatus,
        note: Option<String>,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        let now = Utc::now();
        let updated = certificate.with_status(status, now);
        let action = self.action_row(
            &updated,
            actor,
            &format!("Статус изменен на {status}"),
            note,
            vec![],
            now,
        );
        self.persist_with_notify(actor, updated, action, "Статус сертификата изменен")
            .await
    }

    /// The certifier fills the number when the declarant left it open.
    pub async fn set_number(
        &self,
        actor: &User,
        id: CertificateId,
        number: String,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        let now = Utc::now();
        let updated = certificate.with_number(number, now)?;
        let action = self.action_row(&updated, actor, "Номер сертификата заполнен", None, vec![], now);
        self.persist_with_notify(actor, updated, action, "Номер сертификата заполнен")
            .await
    }

    /// Attaches payment files and moves the certificate to review.
    pub async fn confirm_payment(
        &self,
        actor: &User,
        id: CertificateId,
        payment_file_ids: Vec<DocumentId>,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        let now = Utc::now();
        let updated = certificate
            .with_payment_files(payment_file_ids.clone(), now)
            .with_status(CertificateStatus::OnReview, now);
        let action = self.action_row(
            &updated,
            actor,
            "Оплата подтверждена",
            None,
            payment_file_ids,
            now,
        );
        self.persist_with_notify(actor, updated, action, "Оплата по сертификату подтверждена")
            .await
    }

    pub async fn confirm_review(
        &self,
        actor: &User,
        id: CertificateId,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        let now = Utc::now();
        let updated = certificate.with_status(CertificateStatus::Completed, now);
        let action = self.action_row(&updated, actor, "Проверка завершена", None, vec![], now);
        self.persist_with_notify(actor, updated, action, "Сертификат завершен")
            .await
    }

    pub async fn attach_payment_files(
        &self,
        actor: &User,
        id: CertificateId,
        payment_file_ids: Vec<DocumentId>,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        let now = Utc::now();
        let updated = certificate.with_payment_files(payment_file_ids.clone(), now);
        let action = self.action_row(
            &updated,
            actor,
            "Платежные документы прикреплены",
            None,
            payment_file_ids,
            now,
        );
        self.persist_with_notify(actor, updated, action, "Платежные документы прикреплены")
            .await
    }

    /// Assigns the certificate to an employee of the certifier company.
    pub async fn assign(
        &self,
        actor: &User,
        id: CertificateId,
        assignee_id: UserId,
    ) -> Result<Certificate, ApiError> {
        let certificate = self.load_visible(actor, &id).await?;
        let company_id = actor.company_id().ok_or_else(no_company)?;
        if certificate.certifier_company_id() != Some(company_id) {
            return Err(DomainError::Forbidden(
                "Назначить исполнителя может только компания-сертификатор".to_string(),
            )
            .into());
        }

        let assignee = self
            .user_repo
            .find_by_id(&assignee_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Пользователь",
                id: assignee_id.to_string(),
            })?;
        if assignee.company_id() != Some(company_id) {
            return Err(DomainError::Validation(
                "Исполнитель должен быть сотрудником вашей компании".to_string(),
            )
            .into());
        }

        let now = Utc::now();
        let updated = certificate.assigned_to(assignee_id, now);
        let action = self.action_row(
            &updated,
            actor,
            &format!("Назначен исполнитель: {}", assignee.full_name()),
            None,
            vec![],
            now,
        );

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.certificate_repo.update(&mut tx, &updated).await?;
        self.certificate_repo.insert_action(&mut tx, &action).await?;
        let pending = self
            .notifications
            .push(
                &mut tx,
                &assignee,
                "Сертификат назначен вам",
                &format!("Сертификат {}", updated.kind()),
                NotificationKind::Info,
                None,
            )
            .await?;
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(updated)
    }

    /// Persists an update plus its audit action and notifies the user
    /// on the opposite side of the certificate.
    async fn persist_with_notify(
        &self,
        actor: &User,
        updated: Certificate,
        action: CertificateAction,
        title: &str,
    ) -> Result<Certificate, ApiError> {
        let mut tx = begin_tx(&self.tx_manager).await?;
        self.certificate_repo.update(&mut tx, &updated).await?;
        self.certificate_repo.insert_action(&mut tx, &action).await?;
        let pending = self.notify_counterpart(&mut tx, actor, &updated, title).await?;
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;
        Ok(updated)
    }

    async fn notify_counterpart(
        &self,
        tx: &mut TxContext,
        actor: &User,
        certificate: &Certificate,
        title: &str,
    ) -> Result<Option<PendingTelegram>, ApiError> {
        let counterpart_id = if certificate.owner_id() == actor.id() {
            certificate.assigned_to_id()
        } else {
            Some(certificate.owner_id())
        };
        let Some(counterpart_id) = counterpart_id else {
            return Ok(None);
        };
        let Some(counterpart) = self.user_repo.find_by_id(counterpart_id).await? else {
            return Ok(None);
        };
        Ok(self
            .notifications
            .push(
                tx,
                &counterpart,
                title,
                &format!("Сертификат {}", certificate.kind()),
                NotificationKind::Info,
                None,
            )
            .await?)
    }

    fn action_row(
        &self,
        certificate: &Certificate,
        actor: &User,
        action: &str,
        note: Option<String>,
        attached_file_ids: Vec<DocumentId>,
        now: chrono::DateTime<Utc>,
    ) -> CertificateAction {
        CertificateAction::new(
            CertificateActionId::new(),
            *certificate.id(),
            action.to_string(),
            note,
            *actor.id(),
            attached_file_ids,
            now,
        )
    }

    fn ensure_can_edit(&self, actor: &User, certificate: &Certificate) -> Result<(), ApiError> {
        if certificate.assigned_to_id() == Some(actor.id()) {
            return Ok(());
        }
        ensure_owner_or_privileged(actor, certificate.owner_id())?;
        Ok(())
    }

    /// A certificate is visible to both involved companies. Within a
    /// company, employees see only certificates they own or are
    /// assigned to.
    async fn load_visible(
        &self,
        actor: &User,
        id: &CertificateId,
    ) -> Result<Certificate, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let certificate = self
            .certificate_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Сертификат",
                id: id.to_string(),
            })?;
        ensure_company_involved(actor, certificate.involves_company(company_id))?;
        if !actor.role().is_privileged()
            && certificate.owner_id() != actor.id()
            && certificate.assigned_to_id() != Some(actor.id())
        {
            return Err(DomainError::Forbidden(
                "Нет доступа к этому ресурсу".to_string(),
            )
            .into());
        }
        Ok(certificate)
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use declarant_domain::{
        company::CompanyId,
        partnership::{Partnership, PartnershipId, PartnershipStatus},
        user::Role,
        value_objects::{ActivityType, Email},
    };
    use declarant_infra::{
        mock::{
            MockCertificateRepository, MockNotificationRepository, MockPartnershipRepository,
            MockTransactionManager, MockUserRepository,
        },
        telegram::NoopNotifier,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase = CertificateUseCase<
        MockTransactionManager,
        MockCertificateRepository,
        MockPartnershipRepository,
        MockUserRepository,
        MockNotificationRepository,
    >;

    struct Env {
        usecase: TestUseCase,
        certificates: MockCertificateRepository,
        partnerships: MockPartnershipRepository,
        users: MockUserRepository,
        notifications: MockNotificationRepository,
        declarant_id: CompanyId,
        certifier_id: CompanyId,
    }

    #[fixture]
    fn env() -> Env {
        let certificates = MockCertificateRepository::new();
        let partnerships = MockPartnershipRepository::new();
        let users = MockUserRepository::new();
        let notifications = MockNotificationRepository::new();
        let usecase = CertificateUseCase::new(
            MockTransactionManager,
            certificates.clone(),
            partnerships.clone(),
            users.clone(),
            NotificationService::new(notifications.clone(), Arc::new(NoopNotifier)),
        );
        Env {
            usecase,
            certificates,
            partnerships,
            users,
            notifications,
            declarant_id: CompanyId::new(),
            certifier_id: CompanyId::new(),
        }
    }

    fn member(company_id: CompanyId, email: &str, role: Role) -> User {
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
        .with_company(company_id, now)
        .with_role(role, now)
    }

    fn accepted_partnership(env: &Env) {
        let partnership = Partnership::new(
            PartnershipId::new(),
            env.declarant_id,
            env.certifier_id,
            None,
            Utc::now(),
        )
        .unwrap()
        .resolved(PartnershipStatus::Accepted, Utc::now())
        .unwrap();
        env.partnerships.add_partnership(partnership);
    }

    fn input() -> CreateCertificateInput {
        CreateCertificateInput {
            kind: "Сертификат соответствия".to_string(),
            number: None,
            number_to_be_filled_by_certifier: true,
            deadline: None,
            client_id: ClientId::new(),
            note: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_appends_audit_action(env: Env) {
        let owner = member(env.declarant_id, "owner@example.com", Role::Employee);
        let certificate = env.usecase.create(&owner, input()).await.unwrap();

        let history = env.usecase.history(&owner, *certificate.id()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action(), "Сертификат создан");
    }

    #[rstest]
    #[tokio::test]
    async fn test_number_required_without_certifier_flag(env: Env) {
        let owner = member(env.declarant_id, "owner@example.com", Role::Employee);
        let result = env
            .usecase
            .create(
                &owner,
                CreateCertificateInput {
                    number: None,
                    number_to_be_filled_by_certifier: false,
                    ..input()
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Validation(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_send_requires_accepted_partnership(env: Env) {
        let owner = member(env.declarant_id, "owner@example.com", Role::Employee);
        let certificate = env.usecase.create(&owner, input()).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let result = env
            .usecase
            .send_to_certifier(&owner, *certificate.id(), env.certifier_id, date)
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));

        accepted_partnership(&env);
        let sent = env
            .usecase
            .send_to_certifier(&owner, *certificate.id(), env.certifier_id, date)
            .await
            .unwrap();
        assert_eq!(sent.certifier_company_id(), Some(&env.certifier_id));
        assert_eq!(sent.sent_date(), Some(date));
    }

    #[rstest]
    #[tokio::test]
    async fn test_confirm_payment_moves_to_review_and_notifies_owner(env: Env) {
        accepted_partnership(&env);
        let owner = member(env.declarant_id, "owner@example.com", Role::Employee);
        env.users.add_user(owner.clone());
        let assignee = member(env.certifier_id, "cert@example.com", Role::Employee);
        env.users.add_user(assignee.clone());

        let certificate = env.usecase.create(&owner, input()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        env.usecase
            .send_to_certifier(&owner, *certificate.id(), env.certifier_id, date)
            .await
            .unwrap();
        let director = member(env.certifier_id, "dir@example.com", Role::Director);
        env.usecase
            .assign(&director, *certificate.id(), *assignee.id())
            .await
            .unwrap();

        let payment = vec![DocumentId::new()];
        let updated = env
            .usecase
            .confirm_payment(&assignee, *certificate.id(), payment.clone())
            .await
            .unwrap();
        assert_eq!(updated.status(), CertificateStatus::OnReview);
        assert_eq!(updated.payment_file_ids(), payment.as_slice());

        let feed = env.notifications.for_user(owner.id());
        assert!(
            feed.iter()
                .any(|n| n.title() == "Оплата по сертификату подтверждена")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_certifier_fills_number_once(env: Env) {
        accepted_partnership(&env);
        let owner = member(env.declarant_id, "owner@example.com", Role::Employee);
        env.users.add_user(owner.clone());
        let certificate = env.usecase.create(&owner, input()).await.unwrap();

        let filled = env
            .usecase
            .set_number(&owner, *certificate.id(), "РОСС RU.1234".to_string())
            .await
            .unwrap();
        assert_eq!(filled.number(), Some("РОСС RU.1234"));

        let result = env
            .usecase
            .set_number(&owner, *certificate.id(), "другой".to_string())
            .await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Conflict(_)))
        ));
        let _ = &env.certificates;
    }

    #[rstest]
    #[tokio::test]
    async fn test_employee_sees_only_owned_or_assigned(env: Env) {
        let owner = member(env.declarant_id, "owner@example.com", Role::Employee);
        let colleague = member(env.declarant_id, "other@example.com", Role::Employee);
        let senior = member(env.declarant_id, "senior@example.com", Role::Senior);

        let certificate = env.usecase.create(&owner, input()).await.unwrap();

        assert!(env.usecase.get(&owner, *certificate.id()).await.is_ok());
        assert!(env.usecase.get(&senior, *certificate.id()).await.is_ok());
        let result = env.usecase.get(&colleague, *certificate.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_uninvolved_company_is_forbidden(env: Env) {
        let owner = member(env.declarant_id, "owner@example.com", Role::Employee);
        let outsider = member(CompanyId::new(), "outsider@example.com", Role::Director);

        let certificate = env.usecase.create(&owner, input()).await.unwrap();

        let result = env.usecase.get(&outsider, *certificate.id()).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }
}
