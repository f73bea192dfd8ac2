//! # Mock repositories
//!
//! In-memory repositories for usecase tests. Enable from other crates
//! with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! declarant-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use declarant_domain::{
    certificate::{Certificate, CertificateAction, CertificateId},
    client::{Client, ClientId},
    company::{Company, CompanyId},
    declaration::{Declaration, DeclarationGroup, DeclarationGroupId, DeclarationId},
    document::{Document, DocumentId},
    folder::{Folder, FolderId},
    notification::{Notification, NotificationId},
    partnership::{Partnership, PartnershipId, PartnershipStatus},
    request::{Request, RequestId, RequestStatus, RequestType},
    task::{Task, TaskId, TaskStatusChange},
    user::{Role, User, UserId},
    value_objects::{Email, Inn},
};

use crate::{
    db::{TransactionManager, TxContext},
    error::InfraError,
    repository::{
        CertificateRepository, ClientRepository, CompanyRepository, DeclarationRepository,
        DocumentRepository, FolderRepository, NotificationRepository, PartnershipRepository,
        RequestRepository, StatsRepository, TaskRepository, UserRepository,
        stats_repository::{
            CertificateCounts, DeclarationScope, GrowthPoint, PlatformTotals, TaskCounts,
            TaskScope,
        },
    },
};

fn page<T: Clone>(items: &[T], page: u32, page_size: u32) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let start = (page.saturating_sub(1) as usize) * page_size as usize;
    let chunk = items
        .iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect();
    (chunk, total)
}

// ===== MockTransactionManager =====

#[derive(Clone, Default)]
pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        Ok(TxContext::mock())
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn get(&self, id: &UserId) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id() == id).cloned()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn insert(&self, _tx: &mut TxContext, user: &User) -> Result<(), InfraError> {
        self.users.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, user: &User) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.iter_mut().find(|u| u.id() == user.id()) {
            *existing = user.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email() == email)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(u.id()))
            .cloned()
            .collect())
    }

    async fn find_by_company(&self, company_id: &CompanyId) -> Result<Vec<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.company_id() == Some(company_id))
            .cloned()
            .collect())
    }

    async fn find_admin(&self) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.role() == Role::Admin)
            .cloned())
    }
}

// ===== MockCompanyRepository =====

#[derive(Clone, Default)]
pub struct MockCompanyRepository {
    companies: Arc<Mutex<Vec<Company>>>,
}

impl MockCompanyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_company(&self, company: Company) {
        self.companies.lock().unwrap().push(company);
    }

    pub fn update_company(&self, company: Company) {
        let mut companies = self.companies.lock().unwrap();
        if let Some(existing) = companies.iter_mut().find(|c| c.id() == company.id()) {
            *existing = company;
        }
    }

    pub fn get(&self, id: &CompanyId) -> Option<Company> {
        self.companies
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }
}

#[async_trait]
impl CompanyRepository for MockCompanyRepository {
    async fn insert(&self, _tx: &mut TxContext, company: &Company) -> Result<(), InfraError> {
        self.companies.lock().unwrap().push(company.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, company: &Company) -> Result<(), InfraError> {
        let mut companies = self.companies.lock().unwrap();
        if let Some(existing) = companies.iter_mut().find(|c| c.id() == company.id()) {
            *existing = company.clone();
        }
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &CompanyId) -> Result<(), InfraError> {
        self.companies.lock().unwrap().retain(|c| c.id() != id);
        Ok(())
    }

    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_inn(&self, inn: &Inn) -> Result<Option<Company>, InfraError> {
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.inn() == inn)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Company>, InfraError> {
        Ok(self.companies.lock().unwrap().clone())
    }
}

// ===== MockRequestRepository =====

#[derive(Clone, Default)]
pub struct MockRequestRepository {
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_request(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }

    pub fn get(&self, id: &RequestId) -> Option<Request> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }
}

#[async_trait]
impl RequestRepository for MockRequestRepository {
    async fn insert(&self, _tx: &mut TxContext, request: &Request) -> Result<(), InfraError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, request: &Request) -> Result<(), InfraError> {
        let mut requests = self.requests.lock().unwrap();
        if let Some(existing) = requests.iter_mut().find(|r| r.id() == request.id()) {
            *existing = request.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, InfraError> {
        Ok(self.get(id))
    }

    async fn list_pending_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Request>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.status() == RequestStatus::Pending
                    && r.request_type() == RequestType::EmployeeJoin
                    && r.target_company_id() == Some(company_id)
            })
            .cloned()
            .collect())
    }

    async fn list_pending_registrations(&self) -> Result<Vec<Request>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.status() == RequestStatus::Pending
                    && r.request_type() == RequestType::CompanyRegistration
            })
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Request>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn has_pending_for_user(&self, user_id: &UserId) -> Result<bool, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.user_id() == user_id && r.status() == RequestStatus::Pending))
    }
}

// ===== MockNotificationRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationRepository {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn for_user(&self, user_id: &UserId) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id() == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn insert(
        &self,
        _tx: &mut TxContext,
        notification: &Notification,
    ) -> Result<(), InfraError> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn list_recent(&self, user_id: &UserId) -> Result<Vec<Notification>, InfraError> {
        let mut items = self.for_user(user_id);
        items.sort_by_key(|n| std::cmp::Reverse(n.created_at()));
        items.truncate(50);
        Ok(items)
    }

    async fn unread_count(&self, user_id: &UserId) -> Result<u64, InfraError> {
        Ok(self
            .for_user(user_id)
            .iter()
            .filter(|n| !n.is_read())
            .count() as u64)
    }

    async fn mark_read(
        &self,
        _tx: &mut TxContext,
        id: &NotificationId,
        user_id: &UserId,
    ) -> Result<bool, InfraError> {
        let mut notifications = self.notifications.lock().unwrap();
        let Some(pos) = notifications
            .iter()
            .position(|n| n.id() == id && n.user_id() == user_id)
        else {
            return Ok(false);
        };
        let read = notifications.remove(pos).read();
        notifications.insert(pos, read);
        Ok(true)
    }

    async fn mark_all_read(
        &self,
        _tx: &mut TxContext,
        user_id: &UserId,
    ) -> Result<(), InfraError> {
        let mut notifications = self.notifications.lock().unwrap();
        *notifications = notifications
            .drain(..)
            .map(|n| {
                if n.user_id() == user_id {
                    n.read()
                } else {
                    n
                }
            })
            .collect();
        Ok(())
    }

    async fn delete(
        &self,
        _tx: &mut TxContext,
        id: &NotificationId,
        user_id: &UserId,
    ) -> Result<bool, InfraError> {
        let mut notifications = self.notifications.lock().unwrap();
        let before = notifications.len();
        notifications.retain(|n| !(n.id() == id && n.user_id() == user_id));
        Ok(notifications.len() < before)
    }
}

// ===== MockPartnershipRepository =====

#[derive(Clone, Default)]
pub struct MockPartnershipRepository {
    partnerships: Arc<Mutex<Vec<Partnership>>>,
}

impl MockPartnershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_partnership(&self, partnership: Partnership) {
        self.partnerships.lock().unwrap().push(partnership);
    }

    pub fn get(&self, id: &PartnershipId) -> Option<Partnership> {
        self.partnerships
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }
}

#[async_trait]
impl PartnershipRepository for MockPartnershipRepository {
    async fn insert(
        &self,
        _tx: &mut TxContext,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        self.partnerships.lock().unwrap().push(partnership.clone());
        Ok(())
    }

    async fn update(
        &self,
        _tx: &mut TxContext,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        let mut partnerships = self.partnerships.lock().unwrap();
        if let Some(existing) = partnerships.iter_mut().find(|p| p.id() == partnership.id()) {
            *existing = partnership.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &PartnershipId) -> Result<Option<Partnership>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_between(
        &self,
        a: &CompanyId,
        b: &CompanyId,
    ) -> Result<Option<Partnership>, InfraError> {
        Ok(self
            .partnerships
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.status() != PartnershipStatus::Rejected && p.links(a, b))
            .max_by_key(|p| p.created_at())
            .cloned())
    }

    async fn list_for_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Partnership>, InfraError> {
        Ok(self
            .partnerships
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.requesting_company_id() == company_id || p.target_company_id() == company_id
            })
            .cloned()
            .collect())
    }

    async fn list_pending_for_target(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Partnership>, InfraError> {
        Ok(self
            .partnerships
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.target_company_id() == company_id && p.status() == PartnershipStatus::Pending
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &PartnershipId) -> Result<(), InfraError> {
        self.partnerships.lock().unwrap().retain(|p| p.id() != id);
        Ok(())
    }

    async fn delete_by_company(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        self.partnerships.lock().unwrap().retain(|p| {
            p.requesting_company_id() != company_id && p.target_company_id() != company_id
        });
        Ok(())
    }
}

// ===== MockTaskRepository =====

#[derive(Clone, Default)]
pub struct MockTaskRepository {
    tasks:   Arc<Mutex<Vec<Task>>>,
    changes: Arc<Mutex<Vec<TaskStatusChange>>>,
}

impl MockTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task: Task) {
        self.tasks.lock().unwrap().push(task);
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.lock().unwrap().iter().find(|t| t.id() == id).cloned()
    }

    pub fn status_changes(&self, task_id: &TaskId) -> Vec<TaskStatusChange> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.task_id() == task_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskRepository for MockTaskRepository {
    async fn insert(&self, _tx: &mut TxContext, task: &Task) -> Result<(), InfraError> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, task: &Task) -> Result<(), InfraError> {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(existing) = tasks.iter_mut().find(|t| t.id() == task.id()) {
            *existing = task.clone();
        }
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &TaskId) -> Result<(), InfraError> {
        self.tasks.lock().unwrap().retain(|t| t.id() != id);
        self.changes.lock().unwrap().retain(|c| c.task_id() != id);
        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, InfraError> {
        Ok(self.get(id))
    }

    async fn list_incoming(
        &self,
        company_id: &CompanyId,
        assignee: Option<&UserId>,
        page_num: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), InfraError> {
        let items: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.target_company_id() == company_id)
            .filter(|t| match assignee {
                Some(user) => {
                    t.target_employee_id().is_none() || t.target_employee_id() == Some(user)
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(page(&items, page_num, page_size))
    }

    async fn list_outgoing(
        &self,
        company_id: &CompanyId,
        creator: Option<&UserId>,
        page_num: u32,
        page_size: u32,
    ) -> Result<(Vec<Task>, u64), InfraError> {
        let items: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.created_by_company_id() == company_id)
            .filter(|t| match creator {
                Some(user) => t.created_by_user_id() == user,
                None => true,
            })
            .cloned()
            .collect();
        Ok(page(&items, page_num, page_size))
    }

    async fn insert_status_change(
        &self,
        _tx: &mut TxContext,
        change: &TaskStatusChange,
    ) -> Result<(), InfraError> {
        self.changes.lock().unwrap().push(change.clone());
        Ok(())
    }

    async fn list_status_changes(
        &self,
        task_id: &TaskId,
    ) -> Result<Vec<TaskStatusChange>, InfraError> {
        Ok(self.status_changes(task_id))
    }

    async fn reassign_owner(
        &self,
        _tx: &mut TxContext,
        _company_id: &CompanyId,
        _from: &UserId,
        _to: &UserId,
    ) -> Result<(), InfraError> {
        Ok(())
    }

    async fn delete_by_company(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        self.tasks.lock().unwrap().retain(|t| {
            t.target_company_id() != company_id && t.created_by_company_id() != company_id
        });
        Ok(())
    }
}

// ===== MockCertificateRepository =====

#[derive(Clone, Default)]
pub struct MockCertificateRepository {
    certificates: Arc<Mutex<Vec<Certificate>>>,
    actions:      Arc<Mutex<Vec<CertificateAction>>>,
}

impl MockCertificateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_certificate(&self, certificate: Certificate) {
        self.certificates.lock().unwrap().push(certificate);
    }

    pub fn get(&self, id: &CertificateId) -> Option<Certificate> {
        self.certificates
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    pub fn actions(&self, certificate_id: &CertificateId) -> Vec<CertificateAction> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.certificate_id() == certificate_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CertificateRepository for MockCertificateRepository {
    async fn insert(
        &self,
        _tx: &mut TxContext,
        certificate: &Certificate,
    ) -> Result<(), InfraError> {
        self.certificates.lock().unwrap().push(certificate.clone());
        Ok(())
    }

    async fn update(
        &self,
        _tx: &mut TxContext,
        certificate: &Certificate,
    ) -> Result<(), InfraError> {
        let mut certificates = self.certificates.lock().unwrap();
        if let Some(existing) = certificates.iter_mut().find(|c| c.id() == certificate.id()) {
            *existing = certificate.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &CertificateId) -> Result<Option<Certificate>, InfraError> {
        Ok(self.get(id))
    }

    async fn list_for_company(
        &self,
        company_id: &CompanyId,
        employee: Option<&UserId>,
        page_num: u32,
        page_size: u32,
    ) -> Result<(Vec<Certificate>, u64), InfraError> {
        let items: Vec<Certificate> = self
            .certificates
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.involves_company(company_id))
            .filter(|c| match employee {
                Some(user) => c.owner_id() == user || c.assigned_to_id() == Some(user),
                None => true,
            })
            .cloned()
            .collect();
        Ok(page(&items, page_num, page_size))
    }

    async fn insert_action(
        &self,
        _tx: &mut TxContext,
        action: &CertificateAction,
    ) -> Result<(), InfraError> {
        self.actions.lock().unwrap().push(action.clone());
        Ok(())
    }

    async fn list_actions(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Vec<CertificateAction>, InfraError> {
        Ok(self.actions(certificate_id))
    }

    async fn reassign_owner(
        &self,
        _tx: &mut TxContext,
        _company_id: &CompanyId,
        _from: &UserId,
        _to: &UserId,
    ) -> Result<(), InfraError> {
        Ok(())
    }

    async fn delete_by_company(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        self.certificates
            .lock()
            .unwrap()
            .retain(|c| c.declarant_company_id() != company_id);
        Ok(())
    }
}

// ===== MockClientRepository =====

#[derive(Clone, Default)]
pub struct MockClientRepository {
    clients: Arc<Mutex<Vec<Client>>>,
}

impl MockClientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, client: Client) {
        self.clients.lock().unwrap().push(client);
    }

    pub fn get(&self, id: &ClientId) -> Option<Client> {
        self.clients.lock().unwrap().iter().find(|c| c.id() == id).cloned()
    }
}

#[async_trait]
impl ClientRepository for MockClientRepository {
    async fn insert(&self, _tx: &mut TxContext, client: &Client) -> Result<(), InfraError> {
        self.clients.lock().unwrap().push(client.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, client: &Client) -> Result<(), InfraError> {
        let mut clients = self.clients.lock().unwrap();
        if let Some(existing) = clients.iter_mut().find(|c| c.id() == client.id()) {
            *existing = client.clone();
        }
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &ClientId) -> Result<(), InfraError> {
        self.clients.lock().unwrap().retain(|c| c.id() != id);
        Ok(())
    }

    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, InfraError> {
        Ok(self.get(id))
    }

    async fn list_visible(
        &self,
        company_id: &CompanyId,
        viewer: Option<&UserId>,
        page_num: u32,
        page_size: u32,
    ) -> Result<(Vec<Client>, u64), InfraError> {
        use declarant_domain::value_objects::AccessType;

        let items: Vec<Client> = self
            .clients
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.company_id() == company_id)
            .filter(|c| match viewer {
                None => true,
                Some(user) => {
                    c.access_type() == AccessType::Public
                        || c.owner_id() == user
                        || (c.access_type() == AccessType::Selected
                            && c.allowed_user_ids().contains(user))
                }
            })
            .cloned()
            .collect();
        Ok(page(&items, page_num, page_size))
    }

    async fn reassign_owner(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError> {
        let mut clients = self.clients.lock().unwrap();
        for slot in clients.iter_mut() {
            if slot.company_id() == company_id && slot.owner_id() == from {
                *slot = slot.clone().redirected_to(*to, chrono::Utc::now());
            }
        }
        Ok(())
    }

    async fn delete_by_company(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        self.clients.lock().unwrap().retain(|c| c.company_id() != company_id);
        Ok(())
    }
}

// ===== MockDeclarationRepository =====

#[derive(Clone, Default)]
pub struct MockDeclarationRepository {
    declarations: Arc<Mutex<Vec<Declaration>>>,
    groups: Arc<Mutex<Vec<DeclarationGroup>>>,
}

impl MockDeclarationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_declaration(&self, declaration: Declaration) {
        self.declarations.lock().unwrap().push(declaration);
    }

    pub fn get(&self, id: &DeclarationId) -> Option<Declaration> {
        self.declarations
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id() == id)
            .cloned()
    }
}

#[async_trait]
impl DeclarationRepository for MockDeclarationRepository {
    async fn insert(
        &self,
        _tx: &mut TxContext,
        declaration: &Declaration,
    ) -> Result<(), InfraError> {
        self.declarations.lock().unwrap().push(declaration.clone());
        Ok(())
    }

    async fn update(
        &self,
        _tx: &mut TxContext,
        declaration: &Declaration,
    ) -> Result<(), InfraError> {
        let mut declarations = self.declarations.lock().unwrap();
        if let Some(slot) = declarations.iter_mut().find(|d| d.id() == declaration.id()) {
            *slot = declaration.clone();
        }
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &DeclarationId) -> Result<(), InfraError> {
        self.declarations.lock().unwrap().retain(|d| d.id() != id);
        Ok(())
    }

    async fn find_by_id(&self, id: &DeclarationId) -> Result<Option<Declaration>, InfraError> {
        Ok(self.get(id))
    }

    // Client-derived visibility is approximated as owner-only here;
    // the real predicate lives in the Postgres implementation.
    async fn list_for_company(
        &self,
        company_id: &CompanyId,
        viewer: Option<&UserId>,
        group_id: Option<&DeclarationGroupId>,
        page_num: u32,
        page_size: u32,
    ) -> Result<(Vec<Declaration>, u64), InfraError> {
        let items: Vec<Declaration> = self
            .declarations
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.company_id() == company_id)
            .filter(|d| viewer.is_none_or(|user| d.owner_id() == user))
            .filter(|d| group_id.is_none_or(|g| d.group_id() == Some(g)))
            .cloned()
            .collect();
        Ok(page(&items, page_num, page_size))
    }

    async fn insert_group(
        &self,
        _tx: &mut TxContext,
        group: &DeclarationGroup,
    ) -> Result<(), InfraError> {
        self.groups.lock().unwrap().push(group.clone());
        Ok(())
    }

    async fn delete_group(
        &self,
        _tx: &mut TxContext,
        id: &DeclarationGroupId,
    ) -> Result<(), InfraError> {
        let mut declarations = self.declarations.lock().unwrap();
        for slot in declarations.iter_mut() {
            if slot.group_id() == Some(id) {
                *slot = slot.clone().with_group(None, chrono::Utc::now());
            }
        }
        self.groups.lock().unwrap().retain(|g| g.id() != id);
        Ok(())
    }

    async fn find_group_by_id(
        &self,
        id: &DeclarationGroupId,
    ) -> Result<Option<DeclarationGroup>, InfraError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.id() == id)
            .cloned())
    }

    async fn list_groups(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<DeclarationGroup>, InfraError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.company_id() == company_id)
            .cloned()
            .collect())
    }

    async fn reassign_owner(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), InfraError> {
        let mut declarations = self.declarations.lock().unwrap();
        for slot in declarations.iter_mut() {
            if slot.company_id() == company_id && slot.owner_id() == from {
                *slot = slot.clone().redirected_to(*to, chrono::Utc::now());
            }
        }
        Ok(())
    }

    async fn delete_by_company(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        self.declarations
            .lock()
            .unwrap()
            .retain(|d| d.company_id() != company_id);
        self.groups
            .lock()
            .unwrap()
            .retain(|g| g.company_id() != company_id);
        Ok(())
    }
}

// ===== MockDocumentRepository =====

#[derive(Clone, Default)]
pub struct MockDocumentRepository {
    documents: Arc<Mutex<Vec<Document>>>,
}

impl MockDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&self, document: Document) {
        self.documents.lock().unwrap().push(document);
    }

    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id() == id)
            .cloned()
    }
}

#[async_trait]
impl DocumentRepository for MockDocumentRepository {
    async fn insert(&self, _tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        self.documents.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        let mut documents = self.documents.lock().unwrap();
        if let Some(slot) = documents.iter_mut().find(|d| d.id() == document.id()) {
            *slot = document.clone();
        }
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &DocumentId) -> Result<(), InfraError> {
        self.documents.lock().unwrap().retain(|d| d.id() != id);
        Ok(())
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_ids(&self, ids: &[DocumentId]) -> Result<Vec<Document>, InfraError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| ids.contains(d.id()))
            .cloned()
            .collect())
    }

    async fn list_in_folder(
        &self,
        company_id: &CompanyId,
        folder_id: Option<&FolderId>,
    ) -> Result<Vec<Document>, InfraError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.company_id() == company_id && d.folder_id() == folder_id)
            .cloned()
            .collect())
    }

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Document>, InfraError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.client_id() == Some(client_id))
            .cloned()
            .collect())
    }

    async fn count_in_folder(&self, folder_id: &FolderId) -> Result<u64, InfraError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.folder_id() == Some(folder_id))
            .count() as u64)
    }

    async fn reassign_owner(
        &self,
        _tx: &mut TxContext,
        _company_id: &CompanyId,
        _from: &UserId,
        _to: &UserId,
    ) -> Result<(), InfraError> {
        Ok(())
    }

    async fn delete_by_company(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<Vec<String>, InfraError> {
        let mut documents = self.documents.lock().unwrap();
        let urls = documents
            .iter()
            .filter(|d| d.company_id() == company_id)
            .map(|d| d.file_url().to_string())
            .collect();
        documents.retain(|d| d.company_id() != company_id);
        Ok(urls)
    }
}

// ===== MockFolderRepository =====

#[derive(Clone, Default)]
pub struct MockFolderRepository {
    folders: Arc<Mutex<Vec<Folder>>>,
}

impl MockFolderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, folder: Folder) {
        self.folders.lock().unwrap().push(folder);
    }

    pub fn get(&self, id: &FolderId) -> Option<Folder> {
        self.folders
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id() == id)
            .cloned()
    }
}

#[async_trait]
impl FolderRepository for MockFolderRepository {
    async fn insert(&self, _tx: &mut TxContext, folder: &Folder) -> Result<(), InfraError> {
        self.folders.lock().unwrap().push(folder.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, folder: &Folder) -> Result<(), InfraError> {
        let mut folders = self.folders.lock().unwrap();
        if let Some(slot) = folders.iter_mut().find(|f| f.id() == folder.id()) {
            *slot = folder.clone();
        }
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &FolderId) -> Result<(), InfraError> {
        self.folders.lock().unwrap().retain(|f| f.id() != id);
        Ok(())
    }

    async fn find_by_id(&self, id: &FolderId) -> Result<Option<Folder>, InfraError> {
        Ok(self.get(id))
    }

    async fn list_for_company(&self, company_id: &CompanyId) -> Result<Vec<Folder>, InfraError> {
        Ok(self
            .folders
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.company_id() == company_id)
            .cloned()
            .collect())
    }

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Folder>, InfraError> {
        Ok(self
            .folders
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.client_id() == Some(client_id))
            .cloned()
            .collect())
    }

    async fn count_children(&self, id: &FolderId) -> Result<u64, InfraError> {
        Ok(self
            .folders
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.parent_id() == Some(id))
            .count() as u64)
    }

    async fn reassign_owner(
        &self,
        _tx: &mut TxContext,
        _company_id: &CompanyId,
        _from: &UserId,
        _to: &UserId,
    ) -> Result<(), InfraError> {
        Ok(())
    }

    async fn delete_by_company(
        &self,
        _tx: &mut TxContext,
        company_id: &CompanyId,
    ) -> Result<(), InfraError> {
        self.folders.lock().unwrap().retain(|f| f.company_id() != company_id);
        Ok(())
    }
}

// ===== MockStatsRepository =====

/// Returns preset counts and records the scopes it was asked for, so
/// tests can assert which filter the usecase picked.
#[derive(Clone, Default)]
pub struct MockStatsRepository {
    task_counts:        Arc<Mutex<TaskCounts>>,
    declaration_count:  Arc<Mutex<u64>>,
    certificate_counts: Arc<Mutex<CertificateCounts>>,
    totals:             Arc<Mutex<PlatformTotals>>,
    task_scopes:        Arc<Mutex<Vec<TaskScope>>>,
    declaration_scopes: Arc<Mutex<Vec<DeclarationScope>>>,
}

impl MockStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_task_counts(&self, counts: TaskCounts) {
        *self.task_counts.lock().unwrap() = counts;
    }

    pub fn set_declaration_count(&self, count: u64) {
        *self.declaration_count.lock().unwrap() = count;
    }

    pub fn set_certificate_counts(&self, counts: CertificateCounts) {
        *self.certificate_counts.lock().unwrap() = counts;
    }

    pub fn set_totals(&self, totals: PlatformTotals) {
        *self.totals.lock().unwrap() = totals;
    }

    pub fn task_scopes(&self) -> Vec<TaskScope> {
        self.task_scopes.lock().unwrap().clone()
    }

    pub fn declaration_scopes(&self) -> Vec<DeclarationScope> {
        self.declaration_scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatsRepository for MockStatsRepository {
    async fn task_counts(
        &self,
        scope: &TaskScope,
        _today: chrono::NaiveDate,
    ) -> Result<TaskCounts, InfraError> {
        self.task_scopes.lock().unwrap().push(*scope);
        Ok(*self.task_counts.lock().unwrap())
    }

    async fn declaration_count(&self, scope: &DeclarationScope) -> Result<u64, InfraError> {
        self.declaration_scopes.lock().unwrap().push(*scope);
        Ok(*self.declaration_count.lock().unwrap())
    }

    async fn certificate_counts(
        &self,
        _company_id: &CompanyId,
        _today: chrono::NaiveDate,
    ) -> Result<CertificateCounts, InfraError> {
        Ok(*self.certificate_counts.lock().unwrap())
    }

    async fn platform_totals(&self) -> Result<PlatformTotals, InfraError> {
        Ok(*self.totals.lock().unwrap())
    }

    async fn growth_series(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<GrowthPoint>, InfraError> {
        let totals = *self.totals.lock().unwrap();
        Ok(from
            .iter_days()
            .take_while(|d| *d <= to)
            .map(|date| GrowthPoint {
                date,
                companies: totals.companies,
                users: totals.users,
            })
            .collect())
    }
}
