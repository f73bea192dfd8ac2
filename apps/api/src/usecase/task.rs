//! # Task usecase
//!
//! Tasks flow inside a company or across an accepted partnership.
//! Status changes keep a history and notify whoever sits on the other
//! side: the creator when the assignee moves the task, the assignee
//! when the creator does.

use chrono::{NaiveDate, Utc};
use declarant_domain::{
    DomainError,
    access::ensure_company_involved,
    certificate::CertificateId,
    company::CompanyId,
    declaration::DeclarationId,
    document::DocumentId,
    notification::NotificationKind,
    partnership::PartnershipStatus,
    task::{Task, TaskId, TaskPatch, TaskPriority, TaskStatus, TaskStatusChange},
    user::{User, UserId},
};
use declarant_infra::{
    TransactionManager,
    db::TxContext,
    repository::{NotificationRepository, PartnershipRepository, TaskRepository, UserRepository},
};

use crate::{
    error::ApiError,
    usecase::{
        begin_tx, commit_tx,
        notification::{NotificationService, PendingTelegram},
    },
};

pub struct CreateTaskInput {
    pub name: String,
    pub note: Option<String>,
    pub priority: TaskPriority,
    pub deadline: Option<NaiveDate>,
    pub target_company_id: CompanyId,
    pub target_employee_id: Option<UserId>,
    pub document_ids: Vec<DocumentId>,
    pub declaration_ids: Vec<DeclarationId>,
    pub certificate_ids: Vec<CertificateId>,
}

pub struct TaskUseCase<TM, T, P, U, N> {
    tx_manager: TM,
    task_repo: T,
    partnership_repo: P,
    user_repo: U,
    notifications: NotificationService<N>,
}

impl<TM, T, P, U, N> TaskUseCase<TM, T, P, U, N>
where
    TM: TransactionManager,
    T: TaskRepository,
    P: PartnershipRepository,
    U: UserRepository,
    N: NotificationRepository,
{
    pub fn new(
        tx_manager: TM,
        task_repo: T,
        partnership_repo: P,
        user_repo: U,
        notifications: NotificationService<N>,
    ) -> Self {
        Self {
            tx_manager,
            task_repo,
            partnership_repo,
            user_repo,
            notifications,
        }
    }

    pub async fn create(&self, actor: &User, input: CreateTaskInput) -> Result<Task, ApiError> {
        let company_id = *actor.company_id().ok_or_else(no_company)?;
        if input.target_company_id != company_id {
            self.ensure_partners(&company_id, &input.target_company_id)
                .await?;
        }
        if let Some(employee_id) = &input.target_employee_id {
            let employee = self
                .user_repo
                .find_by_id(employee_id)
                .await?
                .ok_or(DomainError::NotFound {
                    entity_type: "Пользователь",
                    id: employee_id.to_string(),
                })?;
            if employee.company_id() != Some(&input.target_company_id) {
                return Err(DomainError::Validation(
                    "Исполнитель должен быть сотрудником целевой компании".to_string(),
                )
                .into());
            }
        }

        let now = Utc::now();
        let task = Task::new(
            TaskId::new(),
            input.name,
            input.note,
            input.priority,
            input.deadline,
            input.target_company_id,
            input.target_employee_id,
            *actor.id(),
            company_id,
            now,
        )?;
        let task = task.apply(
            TaskPatch {
                document_ids: Some(input.document_ids),
                declaration_ids: Some(input.declaration_ids),
                certificate_ids: Some(input.certificate_ids),
                ..TaskPatch::default()
            },
            now,
        )?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.task_repo.insert(&mut tx, &task).await?;
        let pending = match task.target_employee_id() {
            Some(employee_id) => {
                self.notify_user(&mut tx, employee_id, "Новая задача", task.name())
                    .await?
            }
            None => None,
        };
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(task)
    }

    pub async fn get(&self, actor: &User, id: TaskId) -> Result<Task, ApiError> {
        self.load_visible(actor, &id).await
    }

    pub async fn list_incoming(
        &self,
        actor: &User,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let assignee = (!actor.role().is_privileged()).then(|| actor.id());
        Ok(self
            .task_repo
            .list_incoming(company_id, assignee, page, page_size)
            .await?)
    }

    pub async fn list_outgoing(
        &self,
        actor: &User,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let creator = (!actor.role().is_privileged()).then(|| actor.id());
        Ok(self
            .task_repo
            .list_outgoing(company_id, creator, page, page_size)
            .await?)
    }

    pub async fn history(
        &self,
        actor: &User,
        id: TaskId,
    ) -> Result<Vec<TaskStatusChange>, ApiError> {
        let task = self.load_visible(actor, &id).await?;
        Ok(self.task_repo.list_status_changes(task.id()).await?)
    }

    /// Edits belong to the creator side.
    pub async fn patch(&self, actor: &User, id: TaskId, patch: TaskPatch) -> Result<Task, ApiError> {
        let task = self.load_visible(actor, &id).await?;
        self.ensure_creator_side(actor, &task)?;

        if let Some(Some(employee_id)) = &patch.target_employee_id {
            let employee = self
                .user_repo
                .find_by_id(employee_id)
                .await?
                .ok_or(DomainError::NotFound {
                    entity_type: "Пользователь",
                    id: employee_id.to_string(),
                })?;
            if employee.company_id() != Some(task.target_company_id()) {
                return Err(DomainError::Validation(
                    "Исполнитель должен быть сотрудником целевой компании".to_string(),
                )
                .into());
            }
        }
        let updated = task.apply(patch, Utc::now())?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.task_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        Ok(updated)
    }

    /// Either side moves the status; the transition is recorded and
    /// the other side notified.
    pub async fn change_status(
        &self,
        actor: &User,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, ApiError> {
        let task = self.load_visible(actor, &id).await?;
        let (updated, change) = task.transitioned_to(status, *actor.id(), Utc::now());

        let counterpart_id = if updated.created_by_user_id() == actor.id() {
            updated.target_employee_id()
        } else {
            Some(updated.created_by_user_id())
        };

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.task_repo.update(&mut tx, &updated).await?;
        self.task_repo.insert_status_change(&mut tx, &change).await?;
        let pending = match counterpart_id {
            Some(user_id) => {
                self.notify_user(
                    &mut tx,
                    user_id,
                    "Статус задачи изменен",
                    &format!("{}: {}", updated.name(), status),
                )
                .await?
            }
            None => None,
        };
        commit_tx(tx).await?;
        self.notifications.deliver([pending]).await;

        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: TaskId) -> Result<(), ApiError> {
        let task = self.load_visible(actor, &id).await?;
        self.ensure_creator_side(actor, &task)?;

        let mut tx = begin_tx(&self.tx_manager).await?;
        self.task_repo.delete(&mut tx, task.id()).await?;
        commit_tx(tx).await?;

        Ok(())
    }

    async fn ensure_partners(
        &self,
        company_id: &CompanyId,
        target_company_id: &CompanyId,
    ) -> Result<(), ApiError> {
        let accepted = self
            .partnership_repo
            .find_between(company_id, target_company_id)
            .await?
            .is_some_and(|p| p.status() == PartnershipStatus::Accepted);
        if !accepted {
            return Err(DomainError::Forbidden(
                "Партнерство с этой компанией не установлено".to_string(),
            )
            .into());
        }
        Ok(())
    }

    fn ensure_creator_side(&self, actor: &User, task: &Task) -> Result<(), ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        if task.created_by_company_id() != company_id {
            return Err(DomainError::Forbidden(
                "Задачу может изменить только создавшая сторона".to_string(),
            )
            .into());
        }
        if task.created_by_user_id() != actor.id() && !actor.role().is_privileged() {
            return Err(DomainError::Forbidden(
                "Нет доступа к этому ресурсу".to_string(),
            )
            .into());
        }
        Ok(())
    }

    async fn notify_user(
        &self,
        tx: &mut TxContext,
        user_id: &UserId,
        title: &str,
        message: &str,
    ) -> Result<Option<PendingTelegram>, ApiError> {
        let Some(user) = self.user_repo.find_by_id(user_id).await? else {
            return Ok(None);
        };
        Ok(self
            .notifications
            .push(tx, &user, title, message, NotificationKind::Info, None)
            .await?)
    }

    /// Visible to both involved companies. Within the target company
    /// an employee sees tasks addressed to them or left unassigned.
    async fn load_visible(&self, actor: &User, id: &TaskId) -> Result<Task, ApiError> {
        let company_id = actor.company_id().ok_or_else(no_company)?;
        let task = self
            .task_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Задача",
                id: id.to_string(),
            })?;
        ensure_company_involved(actor, task.involves_company(company_id))?;
        if actor.role().is_privileged() {
            return Ok(task);
        }
        let on_creator_side =
            task.created_by_company_id() == company_id && task.created_by_user_id() == actor.id();
        let on_target_side = task.target_company_id() == company_id
            && (task.target_employee_id() == Some(actor.id())
                || task.target_employee_id().is_none());
        if !on_creator_side && !on_target_side {
            return Err(DomainError::Forbidden(
                "Нет доступа к этому ресурсу".to_string(),
            )
            .into());
        }
        Ok(task)
    }
}

fn no_company() -> DomainError {
    DomainError::Forbidden("Вы не состоите в компании".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use declarant_domain::{
        partnership::{Partnership, PartnershipId},
        user::Role,
        value_objects::{ActivityType, Email},
    };
    use declarant_infra::{
        mock::{
            MockNotificationRepository, MockPartnershipRepository, MockTaskRepository,
            MockTransactionManager, MockUserRepository,
        },
        telegram::NoopNotifier,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    type TestUseCase = TaskUseCase<
        MockTransactionManager,
        MockTaskRepository,
        MockPartnershipRepository,
        MockUserRepository,
        MockNotificationRepository,
    >;

    struct Env {
        usecase: TestUseCase,
        tasks: MockTaskRepository,
        partnerships: MockPartnershipRepository,
        users: MockUserRepository,
        notifications: MockNotificationRepository,
        company_id: CompanyId,
    }

    #[fixture]
    fn env() -> Env {
        let tasks = MockTaskRepository::new();
        let partnerships = MockPartnershipRepository::new();
        let users = MockUserRepository::new();
        let notifications = MockNotificationRepository::new();
        let usecase = TaskUseCase::new(
            MockTransactionManager,
            tasks.clone(),
            partnerships.clone(),
            users.clone(),
            NotificationService::new(notifications.clone(), Arc::new(NoopNotifier)),
        );
        Env {
            usecase,
            tasks,
            partnerships,
            users,
            notifications,
            company_id: CompanyId::new(),
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

    fn input(env: &Env, target_employee_id: Option<UserId>) -> CreateTaskInput {
        CreateTaskInput {
            name: "Подготовить документы".to_string(),
            note: None,
            priority: TaskPriority::Normal,
            deadline: None,
            target_company_id: env.company_id,
            target_employee_id,
            document_ids: vec![],
            declaration_ids: vec![],
            certificate_ids: vec![],
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_notifies_assignee(env: Env) {
        let creator = member(env.company_id, "creator@example.com", Role::Senior);
        let assignee = member(env.company_id, "worker@example.com", Role::Employee);
        env.users.add_user(assignee.clone());

        env.usecase
            .create(&creator, input(&env, Some(*assignee.id())))
            .await
            .unwrap();

        let feed = env.notifications.for_user(assignee.id());
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].title(), "Новая задача");
    }

    #[rstest]
    #[tokio::test]
    async fn test_cross_company_requires_partnership(env: Env) {
        let other_company = CompanyId::new();
        let creator = member(env.company_id, "creator@example.com", Role::Senior);

        let mut input = input(&env, None);
        input.target_company_id = other_company;
        let result = env.usecase.create(&creator, input).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));

        let partnership = Partnership::new(
            PartnershipId::new(),
            env.company_id,
            other_company,
            None,
            Utc::now(),
        )
        .unwrap()
        .resolved(PartnershipStatus::Accepted, Utc::now())
        .unwrap();
        env.partnerships.add_partnership(partnership);

        let input2 = CreateTaskInput {
            name: "Кросс-компания".to_string(),
            note: None,
            priority: TaskPriority::High,
            deadline: None,
            target_company_id: other_company,
            target_employee_id: None,
            document_ids: vec![],
            declaration_ids: vec![],
            certificate_ids: vec![],
        };
        let task = env.usecase.create(&creator, input2).await.unwrap();
        assert!(task.is_cross_company());
    }

    #[rstest]
    #[tokio::test]
    async fn test_status_change_records_history_and_notifies_creator(env: Env) {
        let creator = member(env.company_id, "creator@example.com", Role::Employee);
        let assignee = member(env.company_id, "worker@example.com", Role::Employee);
        env.users.add_user(creator.clone());
        env.users.add_user(assignee.clone());

        let task = env
            .usecase
            .create(&creator, input(&env, Some(*assignee.id())))
            .await
            .unwrap();

        let updated = env
            .usecase
            .change_status(&assignee, *task.id(), TaskStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(updated.status(), TaskStatus::InProgress);

        let history = env.usecase.history(&creator, *task.id()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status(), TaskStatus::New);
        assert_eq!(history[0].to_status(), TaskStatus::InProgress);

        let feed = env.notifications.for_user(creator.id());
        assert!(feed.iter().any(|n| n.title() == "Статус задачи изменен"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_assignee_cannot_edit_task(env: Env) {
        let creator = member(env.company_id, "creator@example.com", Role::Employee);
        let assignee = member(env.company_id, "worker@example.com", Role::Employee);
        env.users.add_user(assignee.clone());

        let task = env
            .usecase
            .create(&creator, input(&env, Some(*assignee.id())))
            .await
            .unwrap();

        let patch = TaskPatch {
            name: Some("Переименовано".to_string()),
            ..TaskPatch::default()
        };
        let result = env.usecase.patch(&assignee, *task.id(), patch).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_unassigned_task_visible_to_any_target_employee(env: Env) {
        let creator = member(env.company_id, "creator@example.com", Role::Senior);
        let employee = member(env.company_id, "worker@example.com", Role::Employee);

        let task = env.usecase.create(&creator, input(&env, None)).await.unwrap();
        assert!(env.usecase.get(&employee, *task.id()).await.is_ok());
        let _ = &env.tasks;
    }
}
