//! # PostgreSQL connection management
//!
//! Pool creation, migrations and the transaction context.
//!
//! ## Structural transaction enforcement
//!
//! Write methods on every repository take `&mut TxContext`. The only
//! way to obtain one is [`TransactionManager::begin`], so a write
//! outside a transaction is a compile error rather than a code review
//! finding. Dropping the context without [`TxContext::commit`] rolls
//! the transaction back.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use crate::error::InfraError;

/// Creates the connection pool. Called once at startup; the pool is
/// shared across the application.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Applies embedded migrations. Already-applied migrations are
/// skipped; sqlx takes a Postgres advisory lock, so concurrent
/// processes are safe.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

// =============================================================================
// TxContext
// =============================================================================

/// Transaction context, the mandatory argument of repository write
/// methods.
///
/// 1. created by [`TransactionManager::begin`]
/// 2. passed as `&mut TxContext` to write methods
/// 3. committed with [`commit`](TxContext::commit), or rolled back on
///    drop
pub struct TxContext(TxContextInner);

enum TxContextInner {
    Pg(Transaction<'static, Postgres>),
    #[cfg(any(test, feature = "test-utils"))]
    Mock,
}

impl TxContext {
    /// Starts a Postgres transaction. Only `PgTransactionManager` uses
    /// this; usecases go through the trait.
    pub(crate) async fn begin_pg(pool: &PgPool) -> Result<Self, InfraError> {
        Ok(Self(TxContextInner::Pg(pool.begin().await?)))
    }

    /// Mock context for in-memory repositories. Calling `conn()` on it
    /// panics, but mocks never touch the connection.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock() -> Self {
        Self(TxContextInner::Mock)
    }

    /// Commits the transaction. Dropping without committing rolls back.
    pub async fn commit(self) -> Result<(), InfraError> {
        match self.0 {
            TxContextInner::Pg(tx) => {
                tx.commit().await?;
                Ok(())
            }
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock => Ok(()),
        }
    }

    /// The connection inside the transaction, for
    /// `sqlx::query(...).execute(tx.conn())`.
    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        match &mut self.0 {
            TxContextInner::Pg(tx) => tx,
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock => {
                panic!("BUG: conn() called on Mock TxContext. Mock repos should not call conn().")
            }
        }
    }
}

// =============================================================================
// TransactionManager
// =============================================================================

/// Abstraction usecases depend on to start transactions without
/// knowing about `PgPool`.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<TxContext, InfraError>;
}

/// Postgres implementation.
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        TxContext::begin_pg(&self.pool).await
    }
}

#[cfg(test)]
mod tx_context_tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_tx_context_is_send() {
        assert_send::<TxContext>();
    }

    #[test]
    fn test_transaction_manager_is_send_sync() {
        assert_send_sync::<PgTransactionManager>();
        assert_send_sync::<Box<dyn TransactionManager>>();
    }
}
