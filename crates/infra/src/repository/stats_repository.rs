//! # StatsRepository
//!
//! Aggregate counts for the dashboard. Read-only; every method is a
//! single query with `FILTER` clauses so the counts come from one
//! table scan.

use async_trait::async_trait;
use chrono::NaiveDate;
use declarant_domain::{company::CompanyId, user::UserId};
use sqlx::PgPool;

use crate::error::InfraError;

/// Which tasks to count: one assignee's, or everything the company
/// created or received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    Employee(UserId),
    Company(CompanyId),
}

/// Which declarations to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationScope {
    Owner(UserId),
    Company(CompanyId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub active:    u64,
    pub completed: u64,
    pub overdue:   u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CertificateCounts {
    pub active:    u64,
    pub completed: u64,
    pub overdue:   u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformTotals {
    pub companies:        u64,
    pub users:            u64,
    pub pending_requests: u64,
}

/// Cumulative company and user counts as of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPoint {
    pub date:      NaiveDate,
    pub companies: u64,
    pub users:     u64,
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn task_counts(
        &self,
        scope: &TaskScope,
        today: NaiveDate,
    ) -> Result<TaskCounts, InfraError>;

    async fn declaration_count(&self, scope: &DeclarationScope) -> Result<u64, InfraError>;

    /// Counts over certificates the company is involved in on either
    /// side.
    async fn certificate_counts(
        &self,
        company_id: &CompanyId,
        today: NaiveDate,
    ) -> Result<CertificateCounts, InfraError>;

    async fn platform_totals(&self) -> Result<PlatformTotals, InfraError>;

    /// One point per day from `from` to `to` inclusive, cumulative.
    async fn growth_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<GrowthPoint>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct CountsRow {
    active:    i64,
    completed: i64,
    overdue:   i64,
}

#[derive(Debug, Clone)]
pub struct PostgresStatsRepository {
    pool: PgPool,
}

impl PostgresStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    async fn task_counts(
        &self,
        scope: &TaskScope,
        today: NaiveDate,
    ) -> Result<TaskCounts, InfraError> {
        let select = "SELECT \
             COUNT(*) FILTER (WHERE status NOT IN ('completed', 'cancelled')) AS active, \
             COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
             COUNT(*) FILTER (WHERE deadline < $2 \
                              AND status NOT IN ('completed', 'cancelled')) AS overdue \
             FROM tasks";
        let query = match scope {
            TaskScope::Employee(_) => format!("{select} WHERE target_employee_id = $1"),
            TaskScope::Company(_) => {
                format!("{select} WHERE created_by_company_id = $1 OR target_company_id = $1")
            }
        };
        let id = match scope {
            TaskScope::Employee(user_id) => *user_id.as_uuid(),
            TaskScope::Company(company_id) => *company_id.as_uuid(),
        };
        let row = sqlx::query_as::<_, CountsRow>(&query)
            .bind(id)
            .bind(today)
            .fetch_one(&self.pool)
            .await?;
        Ok(TaskCounts {
            active:    row.active as u64,
            completed: row.completed as u64,
            overdue:   row.overdue as u64,
        })
    }

    async fn declaration_count(&self, scope: &DeclarationScope) -> Result<u64, InfraError> {
        let (query, id) = match scope {
            DeclarationScope::Owner(user_id) => (
                "SELECT COUNT(*) FROM declarations WHERE owner_id = $1",
                *user_id.as_uuid(),
            ),
            DeclarationScope::Company(company_id) => (
                "SELECT COUNT(*) FROM declarations WHERE company_id = $1",
                *company_id.as_uuid(),
            ),
        };
        let count: i64 = sqlx::query_scalar(query).bind(id).fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn certificate_counts(
        &self,
        company_id: &CompanyId,
        today: NaiveDate,
    ) -> Result<CertificateCounts, InfraError> {
        let row = sqlx::query_as::<_, CountsRow>(
            "SELECT \
             COUNT(*) FILTER (WHERE status NOT IN ('completed', 'rejected')) AS active, \
             COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
             COUNT(*) FILTER (WHERE deadline < $2 \
                              AND status NOT IN ('completed', 'rejected')) AS overdue \
             FROM certificates \
             WHERE company_id = $1 OR certifier_company_id = $1",
        )
        .bind(company_id.as_uuid())
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(CertificateCounts {
            active:    row.active as u64,
            completed: row.completed as u64,
            overdue:   row.overdue as u64,
        })
    }

    async fn platform_totals(&self) -> Result<PlatformTotals, InfraError> {
        #[derive(sqlx::FromRow)]
        struct TotalsRow {
            companies:        i64,
            users:            i64,
            pending_requests: i64,
        }
        let row = sqlx::query_as::<_, TotalsRow>(
            "SELECT \
             (SELECT COUNT(*) FROM companies) AS companies, \
             (SELECT COUNT(*) FROM users) AS users, \
             (SELECT COUNT(*) FROM requests WHERE status = 'pending') AS pending_requests",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(PlatformTotals {
            companies:        row.companies as u64,
            users:            row.users as u64,
            pending_requests: row.pending_requests as u64,
        })
    }

    async fn growth_series(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<GrowthPoint>, InfraError> {
        #[derive(sqlx::FromRow)]
        struct GrowthRow {
            day:       NaiveDate,
            companies: i64,
            users:     i64,
        }
        let rows = sqlx::query_as::<_, GrowthRow>(
            "SELECT gs::date AS day, \
             (SELECT COUNT(*) FROM companies c WHERE c.created_at::date <= gs::date) AS companies, \
             (SELECT COUNT(*) FROM users u WHERE u.created_at::date <= gs::date) AS users \
             FROM generate_series($1::date, $2::date, interval '1 day') AS gs \
             ORDER BY day",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| GrowthPoint {
                date:      row.day,
                companies: row.companies as u64,
                users:     row.users as u64,
            })
            .collect())
    }
}
