//! # HTTP handlers
//!
//! Route handlers grouped by resource. Handlers stay thin: decode the
//! request, call the usecase, encode the response. Authentication is
//! the [`crate::auth::CurrentUser`] extractor.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod certificate;
pub mod client;
pub mod dashboard;
pub mod declaration;
pub mod document;
pub mod folder;
pub mod health;
pub mod notification;
pub mod partnership;
pub mod request;
pub mod task;
pub mod user;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        // auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/admin/login", post(auth::admin_login))
        // profile
        .route("/api/users/me", get(user::get_me).patch(user::update_me))
        .route("/api/users/me/password", post(user::change_password))
        .route("/api/users/me/avatar", post(user::upload_avatar))
        .route("/api/users/me/telegram", post(user::set_telegram))
        // members
        .route("/api/users/{user_id}", get(user::get_user))
        .route("/api/company/members", get(user::list_members))
        .route("/api/users/{user_id}/block", post(admin::block_user))
        .route("/api/users/{user_id}/unblock", post(admin::unblock_user))
        .route("/api/users/{user_id}/role", patch(admin::change_role))
        .route("/api/users/{user_id}/membership", delete(admin::remove_user))
        // dashboard
        .route("/api/dashboard", get(dashboard::user_stats))
        .route("/api/dashboard/admin", get(dashboard::admin_stats))
        // admin
        .route("/api/admin/companies", get(admin::list_companies))
        .route("/api/admin/companies/{company_id}/block", post(admin::block_company))
        .route(
            "/api/admin/companies/{company_id}/unblock",
            post(admin::unblock_company),
        )
        .route("/api/admin/companies/{company_id}", delete(admin::delete_company))
        .route("/api/admin/messages", post(admin::send_message))
        // requests
        .route("/api/requests/company", post(request::register_company))
        .route("/api/requests/join", post(request::join_company))
        .route("/api/requests/pending", get(request::list_pending))
        .route("/api/requests/my", get(request::list_my))
        .route("/api/requests/{request_id}/approve", post(request::approve))
        .route("/api/requests/{request_id}/reject", post(request::reject))
        // partnerships
        .route(
            "/api/partnerships",
            get(partnership::list).post(partnership::create),
        )
        .route("/api/partnerships/incoming", get(partnership::list_incoming))
        .route(
            "/api/partnerships/{partnership_id}",
            delete(partnership::delete),
        )
        .route("/api/partnerships/{partnership_id}/accept", post(partnership::accept))
        .route("/api/partnerships/{partnership_id}/reject", post(partnership::reject))
        // clients
        .route("/api/clients", get(client::list).post(client::create))
        .route(
            "/api/clients/{client_id}",
            get(client::get).patch(client::patch).delete(client::delete),
        )
        .route("/api/clients/{client_id}/redirect", post(client::redirect))
        // declarations
        .route(
            "/api/declarations",
            get(declaration::list).post(declaration::create),
        )
        .route(
            "/api/declarations/{declaration_id}",
            get(declaration::get)
                .patch(declaration::patch)
                .delete(declaration::delete),
        )
        .route(
            "/api/declarations/{declaration_id}/group",
            post(declaration::assign_group),
        )
        .route(
            "/api/declarations/{declaration_id}/redirect",
            post(declaration::redirect),
        )
        .route(
            "/api/declaration-groups",
            get(declaration::list_groups).post(declaration::create_group),
        )
        .route(
            "/api/declaration-groups/{group_id}",
            delete(declaration::delete_group),
        )
        // certificates
        .route(
            "/api/certificates",
            get(certificate::list).post(certificate::create),
        )
        .route(
            "/api/certificates/{certificate_id}",
            get(certificate::get).patch(certificate::patch),
        )
        .route(
            "/api/certificates/{certificate_id}/actions",
            get(certificate::history),
        )
        .route("/api/certificates/{certificate_id}/send", post(certificate::send))
        .route(
            "/api/certificates/{certificate_id}/status",
            post(certificate::change_status),
        )
        .route(
            "/api/certificates/{certificate_id}/number",
            post(certificate::set_number),
        )
        .route(
            "/api/certificates/{certificate_id}/payment",
            post(certificate::confirm_payment),
        )
        .route(
            "/api/certificates/{certificate_id}/payment-files",
            post(certificate::attach_payment_files),
        )
        .route(
            "/api/certificates/{certificate_id}/review",
            post(certificate::confirm_review),
        )
        .route(
            "/api/certificates/{certificate_id}/assign",
            post(certificate::assign),
        )
        // tasks
        .route("/api/tasks", post(task::create))
        .route("/api/tasks/incoming", get(task::list_incoming))
        .route("/api/tasks/outgoing", get(task::list_outgoing))
        .route(
            "/api/tasks/{task_id}",
            get(task::get).patch(task::patch).delete(task::delete),
        )
        .route("/api/tasks/{task_id}/status", post(task::change_status))
        .route("/api/tasks/{task_id}/history", get(task::history))
        // documents
        .route(
            "/api/documents",
            get(document::list).post(document::upload),
        )
        .route(
            "/api/documents/{document_id}",
            patch(document::patch).delete(document::delete),
        )
        // folders
        .route("/api/folders", get(folder::list).post(folder::create))
        .route(
            "/api/folders/{folder_id}",
            get(folder::get).patch(folder::patch).delete(folder::delete),
        )
        // notifications
        .route("/api/notifications", get(notification::feed))
        .route("/api/notifications/read-all", post(notification::mark_all_read))
        .route(
            "/api/notifications/{notification_id}/read",
            post(notification::mark_read),
        )
        .route(
            "/api/notifications/{notification_id}",
            delete(notification::delete),
        )
}
