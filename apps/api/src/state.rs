//! # Application state
//!
//! One shared state for the whole router. Usecases stay generic over
//! their repository traits; here they are pinned to the Postgres
//! implementations.

use std::sync::Arc;

use declarant_infra::{
    PgTransactionManager,
    admin_code::AdminCodeCache,
    password::PasswordHasher,
    repository::{
        PostgresCertificateRepository, PostgresClientRepository, PostgresCompanyRepository,
        PostgresDeclarationRepository, PostgresDocumentRepository, PostgresFolderRepository,
        PostgresNotificationRepository, PostgresPartnershipRepository, PostgresRequestRepository,
        PostgresStatsRepository, PostgresTaskRepository, PostgresUserRepository,
    },
    storage::LocalFileStorage,
    telegram::Notifier,
};
use sqlx::PgPool;

use crate::{
    auth::JwtKeys,
    config::ApiConfig,
    usecase::{
        admin::{AdminUseCase, ResourceRepos},
        auth::AuthUseCase,
        certificate::CertificateUseCase,
        client::ClientUseCase,
        dashboard::DashboardUseCase,
        declaration::DeclarationUseCase,
        document::DocumentUseCase,
        folder::FolderUseCase,
        notification::{NotificationService, NotificationUseCase},
        partnership::PartnershipUseCase,
        request::RequestUseCase,
        task::TaskUseCase,
    },
};

pub type PgAuthUseCase =
    AuthUseCase<PgTransactionManager, PostgresUserRepository, PostgresCompanyRepository>;
pub type PgRequestUseCase = RequestUseCase<
    PgTransactionManager,
    PostgresRequestRepository,
    PostgresUserRepository,
    PostgresCompanyRepository,
    PostgresNotificationRepository,
>;
pub type PgPartnershipUseCase = PartnershipUseCase<
    PgTransactionManager,
    PostgresPartnershipRepository,
    PostgresUserRepository,
    PostgresCompanyRepository,
    PostgresNotificationRepository,
>;
pub type PgClientUseCase =
    ClientUseCase<PgTransactionManager, PostgresClientRepository, PostgresUserRepository>;
pub type PgDeclarationUseCase = DeclarationUseCase<
    PgTransactionManager,
    PostgresDeclarationRepository,
    PostgresClientRepository,
    PostgresUserRepository,
>;
pub type PgCertificateUseCase = CertificateUseCase<
    PgTransactionManager,
    PostgresCertificateRepository,
    PostgresPartnershipRepository,
    PostgresUserRepository,
    PostgresNotificationRepository,
>;
pub type PgTaskUseCase = TaskUseCase<
    PgTransactionManager,
    PostgresTaskRepository,
    PostgresPartnershipRepository,
    PostgresUserRepository,
    PostgresNotificationRepository,
>;
pub type PgDocumentUseCase =
    DocumentUseCase<PgTransactionManager, PostgresDocumentRepository, PostgresFolderRepository>;
pub type PgFolderUseCase =
    FolderUseCase<PgTransactionManager, PostgresFolderRepository, PostgresDocumentRepository>;
pub type PgDashboardUseCase = DashboardUseCase<PostgresStatsRepository>;
pub type PgNotificationUseCase =
    NotificationUseCase<PgTransactionManager, PostgresNotificationRepository>;
pub type PgAdminUseCase = AdminUseCase<
    PgTransactionManager,
    PostgresUserRepository,
    PostgresCompanyRepository,
    PostgresNotificationRepository,
    PostgresClientRepository,
    PostgresDeclarationRepository,
    PostgresCertificateRepository,
    PostgresTaskRepository,
    PostgresDocumentRepository,
    PostgresFolderRepository,
    PostgresPartnershipRepository,
>;

pub struct AppState {
    pub jwt: JwtKeys,
    pub admin_codes: Arc<AdminCodeCache>,
    pub storage: Arc<LocalFileStorage>,
    pub user_repo: PostgresUserRepository,
    pub company_repo: PostgresCompanyRepository,
    pub auth: PgAuthUseCase,
    pub requests: PgRequestUseCase,
    pub partnerships: PgPartnershipUseCase,
    pub clients: PgClientUseCase,
    pub declarations: PgDeclarationUseCase,
    pub certificates: PgCertificateUseCase,
    pub tasks: PgTaskUseCase,
    pub documents: PgDocumentUseCase,
    pub folders: PgFolderUseCase,
    pub notifications: PgNotificationUseCase,
    pub dashboard: PgDashboardUseCase,
    pub admin: PgAdminUseCase,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: &ApiConfig,
        hasher: Arc<dyn PasswordHasher>,
        notifier: Arc<dyn Notifier>,
        admin_codes: Arc<AdminCodeCache>,
    ) -> Self {
        let tm = || PgTransactionManager::new(pool.clone());
        let users = || PostgresUserRepository::new(pool.clone());
        let companies = || PostgresCompanyRepository::new(pool.clone());
        let clients = || PostgresClientRepository::new(pool.clone());
        let declarations = || PostgresDeclarationRepository::new(pool.clone());
        let certificates = || PostgresCertificateRepository::new(pool.clone());
        let tasks = || PostgresTaskRepository::new(pool.clone());
        let documents = || PostgresDocumentRepository::new(pool.clone());
        let folders = || PostgresFolderRepository::new(pool.clone());
        let partnerships = || PostgresPartnershipRepository::new(pool.clone());
        let notification_service = || {
            NotificationService::new(
                PostgresNotificationRepository::new(pool.clone()),
                Arc::clone(&notifier),
            )
        };
        let storage = Arc::new(LocalFileStorage::new(config.uploads_dir.clone()));

        Self {
            jwt: JwtKeys::new(&config.jwt_secret),
            admin_codes: Arc::clone(&admin_codes),
            storage: Arc::clone(&storage),
            user_repo: users(),
            company_repo: companies(),
            auth: AuthUseCase::new(
                tm(),
                users(),
                companies(),
                hasher,
                config.admin_login.clone(),
                config.admin_password.clone(),
                admin_codes,
            ),
            requests: RequestUseCase::new(
                tm(),
                PostgresRequestRepository::new(pool.clone()),
                users(),
                companies(),
                notification_service(),
            ),
            partnerships: PartnershipUseCase::new(
                tm(),
                partnerships(),
                users(),
                companies(),
                notification_service(),
            ),
            clients: ClientUseCase::new(tm(), clients(), users()),
            declarations: DeclarationUseCase::new(tm(), declarations(), clients(), users()),
            certificates: CertificateUseCase::new(
                tm(),
                certificates(),
                partnerships(),
                users(),
                notification_service(),
            ),
            tasks: TaskUseCase::new(
                tm(),
                tasks(),
                partnerships(),
                users(),
                notification_service(),
            ),
            documents: DocumentUseCase::new(
                tm(),
                documents(),
                folders(),
                Arc::clone(&storage),
            ),
            folders: FolderUseCase::new(tm(), folders(), documents()),
            notifications: NotificationUseCase::new(
                tm(),
                PostgresNotificationRepository::new(pool.clone()),
            ),
            dashboard: DashboardUseCase::new(PostgresStatsRepository::new(pool.clone())),
            admin: AdminUseCase::new(
                tm(),
                users(),
                companies(),
                ResourceRepos {
                    clients: clients(),
                    declarations: declarations(),
                    certificates: certificates(),
                    tasks: tasks(),
                    documents: documents(),
                    folders: folders(),
                    partnerships: partnerships(),
                },
                storage,
                notification_service(),
            ),
        }
    }
}
