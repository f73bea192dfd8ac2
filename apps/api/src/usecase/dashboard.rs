//! # Dashboard
//!
//! Aggregate counters for the landing page. Employees see their own
//! task and declaration numbers; directors and seniors see the whole
//! company and may narrow to one employee. The admin variant reports
//! platform totals and a daily growth series.

use chrono::{Duration, Utc};
use declarant_domain::{
    access::ensure_admin,
    user::{User, UserId},
    value_objects::ActivityType,
};
use declarant_infra::repository::{
    StatsRepository,
    stats_repository::{
        CertificateCounts, DeclarationScope, GrowthPoint, PlatformTotals, TaskCounts, TaskScope,
    },
};

use crate::error::ApiError;

/// Days covered by the admin growth chart, today included.
const GROWTH_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserStats {
    pub tasks:        TaskCounts,
    pub declarations: u64,
    pub certificates: CertificateCounts,
}

pub struct AdminStats {
    pub totals: PlatformTotals,
    pub growth: Vec<GrowthPoint>,
}

pub struct DashboardUseCase<S> {
    stats: S,
}

impl<S: StatsRepository> DashboardUseCase<S> {
    pub fn new(stats: S) -> Self {
        Self { stats }
    }

    /// Counters for the actor's company. A user without a company gets
    /// zeroes. `employee_id` narrows a privileged view to one member;
    /// employees always get their own numbers.
    pub async fn user_stats(
        &self,
        actor: &User,
        employee_id: Option<UserId>,
    ) -> Result<UserStats, ApiError> {
        let Some(company_id) = actor.company_id().copied() else {
            return Ok(UserStats::default());
        };
        let today = Utc::now().date_naive();

        let (task_scope, declaration_scope) = if actor.role().is_privileged() {
            match employee_id {
                Some(employee) => (
                    TaskScope::Employee(employee),
                    DeclarationScope::Owner(employee),
                ),
                None => (
                    TaskScope::Company(company_id),
                    DeclarationScope::Company(company_id),
                ),
            }
        } else {
            (
                TaskScope::Employee(*actor.id()),
                DeclarationScope::Owner(*actor.id()),
            )
        };

        let tasks = self.stats.task_counts(&task_scope, today).await?;
        // Declaration counters only make sense for declarant companies.
        let declarations = if actor.activity_type() == ActivityType::Declarant {
            self.stats.declaration_count(&declaration_scope).await?
        } else {
            0
        };
        let certificates = self.stats.certificate_counts(&company_id, today).await?;

        Ok(UserStats {
            tasks,
            declarations,
            certificates,
        })
    }

    /// Platform totals plus a cumulative growth point per day over the
    /// last [`GROWTH_WINDOW_DAYS`] days. Admin only.
    pub async fn admin_stats(&self, actor: &User) -> Result<AdminStats, ApiError> {
        ensure_admin(actor)?;

        let totals = self.stats.platform_totals().await?;
        let to = Utc::now().date_naive();
        let from = to - Duration::days(GROWTH_WINDOW_DAYS);
        let growth = self.stats.growth_series(from, to).await?;

        Ok(AdminStats { totals, growth })
    }
}

#[cfg(test)]
mod tests {
    use declarant_domain::{
        DomainError,
        company::CompanyId,
        user::Role,
        value_objects::Email,
    };
    use declarant_infra::mock::MockStatsRepository;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    fn member(company_id: Option<CompanyId>, role: Role, activity: ActivityType) -> User {
        let user = User::new(
            UserId::new(),
            Email::new(format!("{}@example.com", uuid::Uuid::new_v4())).unwrap(),
            "hash".to_string(),
            "Тестовый Пользователь".to_string(),
            String::new(),
            activity,
            Utc::now(),
        )
        .unwrap();
        let user = match company_id {
            Some(id) => user.with_company(id, Utc::now()),
            None => user,
        };
        user.with_role(role, Utc::now())
    }

    #[fixture]
    fn company() -> CompanyId {
        CompanyId::new()
    }

    fn usecase() -> (DashboardUseCase<MockStatsRepository>, MockStatsRepository) {
        let stats = MockStatsRepository::new();
        (DashboardUseCase::new(stats.clone()), stats)
    }

    #[rstest]
    #[tokio::test]
    async fn test_user_without_company_gets_zeroes() {
        let (usecase, stats) = usecase();
        stats.set_declaration_count(42);
        let actor = member(None, Role::Employee, ActivityType::Declarant);

        let result = usecase.user_stats(&actor, None).await.unwrap();
        assert_eq!(result, UserStats::default());
        assert!(stats.task_scopes().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_employee_is_scoped_to_own_tasks(company: CompanyId) {
        let (usecase, stats) = usecase();
        let actor = member(Some(company), Role::Employee, ActivityType::Declarant);

        usecase.user_stats(&actor, None).await.unwrap();
        assert_eq!(stats.task_scopes(), vec![TaskScope::Employee(*actor.id())]);
        assert_eq!(
            stats.declaration_scopes(),
            vec![DeclarationScope::Owner(*actor.id())]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_employee_cannot_widen_scope_via_filter(company: CompanyId) {
        let (usecase, stats) = usecase();
        let actor = member(Some(company), Role::Employee, ActivityType::Declarant);

        usecase
            .user_stats(&actor, Some(UserId::new()))
            .await
            .unwrap();
        assert_eq!(stats.task_scopes(), vec![TaskScope::Employee(*actor.id())]);
    }

    #[rstest]
    #[case(Role::Director)]
    #[case(Role::Senior)]
    #[tokio::test]
    async fn test_privileged_sees_whole_company(company: CompanyId, #[case] role: Role) {
        let (usecase, stats) = usecase();
        let actor = member(Some(company), role, ActivityType::Declarant);

        usecase.user_stats(&actor, None).await.unwrap();
        assert_eq!(stats.task_scopes(), vec![TaskScope::Company(company)]);
        assert_eq!(
            stats.declaration_scopes(),
            vec![DeclarationScope::Company(company)]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_director_narrows_to_one_employee(company: CompanyId) {
        let (usecase, stats) = usecase();
        let actor = member(Some(company), Role::Director, ActivityType::Declarant);
        let employee = UserId::new();

        usecase.user_stats(&actor, Some(employee)).await.unwrap();
        assert_eq!(stats.task_scopes(), vec![TaskScope::Employee(employee)]);
        assert_eq!(
            stats.declaration_scopes(),
            vec![DeclarationScope::Owner(employee)]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_certifier_skips_declaration_counts(company: CompanyId) {
        let (usecase, stats) = usecase();
        stats.set_declaration_count(7);
        let actor = member(Some(company), Role::Director, ActivityType::Certification);

        let result = usecase.user_stats(&actor, None).await.unwrap();
        assert_eq!(result.declarations, 0);
        assert!(stats.declaration_scopes().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_admin_stats_requires_admin(company: CompanyId) {
        let (usecase, _) = usecase();
        let director = member(Some(company), Role::Director, ActivityType::Declarant);

        let result = usecase.admin_stats(&director).await;
        assert!(matches!(
            result,
            Err(ApiError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_admin_stats_covers_the_growth_window() {
        let (usecase, stats) = usecase();
        stats.set_totals(PlatformTotals {
            companies:        3,
            users:            12,
            pending_requests: 2,
        });
        let admin = member(None, Role::Admin, ActivityType::Declarant);

        let result = usecase.admin_stats(&admin).await.unwrap();
        assert_eq!(result.totals.users, 12);
        assert_eq!(result.growth.len(), GROWTH_WINDOW_DAYS as usize + 1);
    }
}
