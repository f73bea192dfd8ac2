//! # Dashboard handlers
//!
//! ## Endpoints
//!
//! - `GET /api/dashboard` - counters for the current user's company;
//!   directors and seniors may pass `?employee_id=` to narrow the view
//! - `GET /api/dashboard/admin` - platform totals and daily growth

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use declarant_domain::user::UserId;
use declarant_infra::repository::stats_repository::{
    CertificateCounts, GrowthPoint, TaskCounts,
};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::CurrentUser, error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CountersDto {
    pub active:    u64,
    pub completed: u64,
    pub overdue:   u64,
}

impl From<TaskCounts> for CountersDto {
    fn from(counts: TaskCounts) -> Self {
        Self {
            active:    counts.active,
            completed: counts.completed,
            overdue:   counts.overdue,
        }
    }
}

impl From<CertificateCounts> for CountersDto {
    fn from(counts: CertificateCounts) -> Self {
        Self {
            active:    counts.active,
            completed: counts.completed,
            overdue:   counts.overdue,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardDto {
    pub tasks:        CountersDto,
    pub declarations: u64,
    pub certificates: CountersDto,
}

#[derive(Debug, Serialize)]
pub struct GrowthPointDto {
    pub date:      String,
    pub companies: u64,
    pub users:     u64,
}

impl From<&GrowthPoint> for GrowthPointDto {
    fn from(point: &GrowthPoint) -> Self {
        Self {
            date:      point.date.to_string(),
            companies: point.companies,
            users:     point.users,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminDashboardDto {
    pub total_companies:  u64,
    pub total_users:      u64,
    pub pending_requests: u64,
    pub growth:           Vec<GrowthPointDto>,
}

#[tracing::instrument(skip_all)]
pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let employee_id = query.employee_id.map(UserId::from_uuid);
    let stats = state.dashboard.user_stats(&actor, employee_id).await?;
    let dto = DashboardDto {
        tasks:        stats.tasks.into(),
        declarations: stats.declarations,
        certificates: stats.certificates.into(),
    };
    Ok((StatusCode::OK, Json(ApiResponse::new(dto))))
}

#[tracing::instrument(skip_all)]
pub async fn admin_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.dashboard.admin_stats(&actor).await?;
    let dto = AdminDashboardDto {
        total_companies:  stats.totals.companies,
        total_users:      stats.totals.users,
        pending_requests: stats.totals.pending_requests,
        growth:           stats.growth.iter().map(GrowthPointDto::from).collect(),
    };
    Ok((StatusCode::OK, Json(ApiResponse::new(dto))))
}
