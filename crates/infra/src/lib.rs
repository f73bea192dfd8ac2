//! # Declarant infrastructure layer
//!
//! PostgreSQL repositories, transaction management, password hashing,
//! file storage and the Telegram notification sink.
//!
//! ## Design
//!
//! - **Repository traits**: usecases depend on traits; Postgres
//!   implementations live here, in-memory mocks behind `test-utils`
//! - **Structural transactions**: write methods require
//!   `&mut TxContext`, so a write outside a transaction does not
//!   compile
//! - **SpanTrace capture**: every `InfraError` records the span path at
//!   the point of failure

pub mod admin_code;
pub mod db;
pub mod error;
pub mod password;
pub mod repository;
pub mod storage;
pub mod telegram;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use db::{PgTransactionManager, TransactionManager, TxContext};
pub use error::{InfraError, InfraErrorKind};
pub use password::{Argon2PasswordHasher, PasswordHasher};
