//! # Task
//!
//! A work item sent to a company (or a specific employee), either within
//! one company or across an accepted partnership. Any status transition
//! is allowed; every change is appended to the status history and the
//! counterpart side is notified.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    certificate::CertificateId,
    company::CompanyId,
    declaration::DeclarationId,
    document::DocumentId,
    user::UserId,
};

define_uuid_id! {
    /// Task id (UUID v7).
    pub struct TaskId;
}

define_uuid_id! {
    /// Task status change id (UUID v7).
    pub struct TaskStatusChangeId;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    Urgent,
    High,
    Normal,
}

impl std::str::FromStr for TaskPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urgent" => Ok(Self::Urgent),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            _ => Err(DomainError::Validation(format!(
                "Неверный приоритет задачи: {s}"
            ))),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    New,
    InProgress,
    Waiting,
    OnReview,
    Completed,
    Cancelled,
    Frozen,
}

impl std::str::FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "waiting" => Ok(Self::Waiting),
            "on_review" => Ok(Self::OnReview),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "frozen" => Ok(Self::Frozen),
            _ => Err(DomainError::Validation(format!(
                "Неверный статус задачи: {s}"
            ))),
        }
    }
}

/// One entry of the task status history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusChange {
    id: TaskStatusChangeId,
    task_id: TaskId,
    from_status: TaskStatus,
    to_status: TaskStatus,
    changed_by_id: UserId,
    created_at: DateTime<Utc>,
}

impl TaskStatusChange {
    pub fn new(
        id: TaskStatusChangeId,
        task_id: TaskId,
        from_status: TaskStatus,
        to_status: TaskStatus,
        changed_by_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_id,
            from_status,
            to_status,
            changed_by_id,
            created_at: now,
        }
    }

    pub fn from_db(
        id: TaskStatusChangeId,
        task_id: TaskId,
        from_status: TaskStatus,
        to_status: TaskStatus,
        changed_by_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_id,
            from_status,
            to_status,
            changed_by_id,
            created_at,
        }
    }

    pub fn id(&self) -> &TaskStatusChangeId {
        &self.id
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn from_status(&self) -> TaskStatus {
        self.from_status
    }

    pub fn to_status(&self) -> TaskStatus {
        self.to_status
    }

    pub fn changed_by_id(&self) -> &UserId {
        &self.changed_by_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Task entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    name: String,
    note: Option<String>,
    priority: TaskPriority,
    status: TaskStatus,
    deadline: Option<NaiveDate>,
    target_company_id: CompanyId,
    target_employee_id: Option<UserId>,
    created_by_user_id: UserId,
    created_by_company_id: CompanyId,
    document_ids: Vec<DocumentId>,
    declaration_ids: Vec<DeclarationId>,
    certificate_ids: Vec<CertificateId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub note: Option<String>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<NaiveDate>,
    pub target_employee_id: Option<Option<UserId>>,
    pub document_ids: Option<Vec<DocumentId>>,
    pub declaration_ids: Option<Vec<DeclarationId>>,
    pub certificate_ids: Option<Vec<CertificateId>>,
}

impl Task {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        name: String,
        note: Option<String>,
        priority: TaskPriority,
        deadline: Option<NaiveDate>,
        target_company_id: CompanyId,
        target_employee_id: Option<UserId>,
        created_by_user_id: UserId,
        created_by_company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Название задачи обязательно".to_string(),
            ));
        }

        Ok(Self {
            id,
            name,
            note,
            priority,
            status: TaskStatus::New,
            deadline,
            target_company_id,
            target_employee_id,
            created_by_user_id,
            created_by_company_id,
            document_ids: Vec::new(),
            declaration_ids: Vec::new(),
            certificate_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: TaskId,
        name: String,
        note: Option<String>,
        priority: TaskPriority,
        status: TaskStatus,
        deadline: Option<NaiveDate>,
        target_company_id: CompanyId,
        target_employee_id: Option<UserId>,
        created_by_user_id: UserId,
        created_by_company_id: CompanyId,
        document_ids: Vec<DocumentId>,
        declaration_ids: Vec<DeclarationId>,
        certificate_ids: Vec<CertificateId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            note,
            priority,
            status,
            deadline,
            target_company_id,
            target_employee_id,
            created_by_user_id,
            created_by_company_id,
            document_ids,
            declaration_ids,
            certificate_ids,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        self.deadline
    }

    pub fn target_company_id(&self) -> &CompanyId {
        &self.target_company_id
    }

    pub fn target_employee_id(&self) -> Option<&UserId> {
        self.target_employee_id.as_ref()
    }

    pub fn created_by_user_id(&self) -> &UserId {
        &self.created_by_user_id
    }

    pub fn created_by_company_id(&self) -> &CompanyId {
        &self.created_by_company_id
    }

    pub fn document_ids(&self) -> &[DocumentId] {
        &self.document_ids
    }

    pub fn declaration_ids(&self) -> &[DeclarationId] {
        &self.declaration_ids
    }

    pub fn certificate_ids(&self) -> &[CertificateId] {
        &self.certificate_ids
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when the task crosses company boundaries.
    pub fn is_cross_company(&self) -> bool {
        self.target_company_id != self.created_by_company_id
    }

    /// True when `company_id` is on either side of the task.
    pub fn involves_company(&self, company_id: &CompanyId) -> bool {
        &self.target_company_id == company_id || &self.created_by_company_id == company_id
    }

    /// Changes the status, returning the updated task and the history
    /// entry to persist alongside it.
    pub fn transitioned_to(
        self,
        to_status: TaskStatus,
        changed_by_id: UserId,
        now: DateTime<Utc>,
    ) -> (Self, TaskStatusChange) {
        let change = TaskStatusChange::new(
            TaskStatusChangeId::new(),
            self.id,
            self.status,
            to_status,
            changed_by_id,
            now,
        );
        let task = Self {
            status: to_status,
            updated_at: now,
            ..self
        };
        (task, change)
    }

    pub fn apply(self, patch: TaskPatch, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = match patch.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(DomainError::Validation(
                        "Название задачи обязательно".to_string(),
                    ));
                }
                name
            }
            None => self.name,
        };

        Ok(Self {
            name,
            note: patch.note.or(self.note),
            priority: patch.priority.unwrap_or(self.priority),
            deadline: patch.deadline.or(self.deadline),
            target_employee_id: patch.target_employee_id.unwrap_or(self.target_employee_id),
            document_ids: patch.document_ids.unwrap_or(self.document_ids),
            declaration_ids: patch.declaration_ids.unwrap_or(self.declaration_ids),
            certificate_ids: patch.certificate_ids.unwrap_or(self.certificate_ids),
            updated_at: now,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn task(now: DateTime<Utc>) -> Task {
        Task::new(
            TaskId::new(),
            "Подготовить документы".to_string(),
            None,
            TaskPriority::Normal,
            None,
            CompanyId::new(),
            None,
            UserId::new(),
            CompanyId::new(),
            now,
        )
        .unwrap()
    }

    #[rstest]
    fn test_new_task_starts_new(task: Task) {
        assert_eq!(task.status(), TaskStatus::New);
    }

    #[rstest]
    fn test_transition_records_history_entry(task: Task, now: DateTime<Utc>) {
        let changer = UserId::new();
        let task_id = *task.id();

        let (updated, change) = task.transitioned_to(TaskStatus::InProgress, changer, now);

        assert_eq!(updated.status(), TaskStatus::InProgress);
        assert_eq!(change.task_id(), &task_id);
        assert_eq!(change.from_status(), TaskStatus::New);
        assert_eq!(change.to_status(), TaskStatus::InProgress);
        assert_eq!(change.changed_by_id(), &changer);
    }

    #[rstest]
    fn test_backward_transition_is_allowed_and_audited(task: Task, now: DateTime<Utc>) {
        let changer = UserId::new();
        let (task, _) = task.transitioned_to(TaskStatus::Completed, changer, now);

        let (reopened, change) = task.transitioned_to(TaskStatus::InProgress, changer, now);

        assert_eq!(reopened.status(), TaskStatus::InProgress);
        assert_eq!(change.from_status(), TaskStatus::Completed);
    }

    #[rstest]
    fn test_cross_company_detection(now: DateTime<Utc>) {
        let company = CompanyId::new();
        let same = Task::new(
            TaskId::new(),
            "Внутренняя задача".to_string(),
            None,
            TaskPriority::High,
            None,
            company,
            None,
            UserId::new(),
            company,
            now,
        )
        .unwrap();

        assert!(!same.is_cross_company());
    }

    #[rstest]
    #[case("urgent", TaskPriority::Urgent)]
    #[case("high", TaskPriority::High)]
    #[case("normal", TaskPriority::Normal)]
    fn test_priority_parses(#[case] input: &str, #[case] expected: TaskPriority) {
        assert_eq!(input.parse::<TaskPriority>().unwrap(), expected);
    }

    #[rstest]
    #[case("new", TaskStatus::New)]
    #[case("in_progress", TaskStatus::InProgress)]
    #[case("frozen", TaskStatus::Frozen)]
    fn test_status_parses(#[case] input: &str, #[case] expected: TaskStatus) {
        assert_eq!(input.parse::<TaskStatus>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }
}
