//! # Domain layer errors
//!
//! Error type for business rule violations. The API layer converts each
//! variant into an HTTP status:
//!
//! | variant | HTTP status |
//! |---------|-------------|
//! | `Validation` | 400 Bad Request |
//! | `NotFound` | 404 Not Found |
//! | `Conflict` | 409 Conflict |
//! | `Forbidden` | 403 Forbidden |
//!
//! User-facing messages are Russian, matching the rest of the product
//! surface.

use thiserror::Error;

/// Error raised by domain logic.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input violates a business rule (missing field, bad format, bad
    /// length).
    #[error("Ошибка валидации: {0}")]
    Validation(String),

    /// The entity does not exist, or the caller is not allowed to know
    /// that it exists (cross-company access is reported as not found).
    #[error("{entity_type} не найден: {id}")]
    NotFound {
        /// Entity kind, decided at compile time ("Клиент", "Задача", ...).
        entity_type: &'static str,
        /// Identifier used for the lookup.
        id:          String,
    },

    /// A uniqueness or state conflict (duplicate email, duplicate INN,
    /// request already resolved).
    #[error("Конфликт: {0}")]
    Conflict(String),

    /// The caller is authenticated but lacks permission.
    #[error("Нет прав: {0}")]
    Forbidden(String),
}
