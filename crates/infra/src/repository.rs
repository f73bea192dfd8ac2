//! # Repository implementations
//!
//! PostgreSQL implementations of the repository traits used by the
//! usecase layer. Reads go through the connection pool; writes take a
//! [`crate::db::TxContext`] so several repository calls commit
//! atomically.

pub mod certificate_repository;
pub mod client_repository;
pub mod company_repository;
pub mod declaration_repository;
pub mod document_repository;
pub mod folder_repository;
pub mod notification_repository;
pub mod partnership_repository;
pub mod request_repository;
pub mod stats_repository;
pub mod task_repository;
pub mod user_repository;

pub use certificate_repository::{CertificateRepository, PostgresCertificateRepository};
pub use client_repository::{ClientRepository, PostgresClientRepository};
pub use company_repository::{CompanyRepository, PostgresCompanyRepository};
pub use declaration_repository::{DeclarationRepository, PostgresDeclarationRepository};
pub use document_repository::{DocumentRepository, PostgresDocumentRepository};
pub use folder_repository::{FolderRepository, PostgresFolderRepository};
pub use notification_repository::{NotificationRepository, PostgresNotificationRepository};
pub use partnership_repository::{PartnershipRepository, PostgresPartnershipRepository};
pub use request_repository::{PostgresRequestRepository, RequestRepository};
pub use stats_repository::{PostgresStatsRepository, StatsRepository};
pub use task_repository::{PostgresTaskRepository, TaskRepository};
pub use user_repository::{PostgresUserRepository, UserRepository};
