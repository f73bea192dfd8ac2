//! # Auth handlers
//!
//! ## Endpoints
//!
//! - `POST /api/auth/register` - create an account
//! - `POST /api/auth/login` - email + password login
//! - `POST /api/auth/admin/login` - platform admin login with a one-time code

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use declarant_domain::{user::User, value_objects::ActivityType};
use declarant_shared::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    state::AppState,
    usecase::auth::RegisterInput,
};

use super::user::UserDto;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email:         String,
    pub password:      String,
    pub full_name:     String,
    pub phone:         String,
    pub activity_type: ActivityType,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email:    String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub login:    String,
    pub password: String,
    pub code:     String,
}

#[derive(Debug, Serialize)]
pub struct AuthDto {
    pub token: String,
    pub user:  UserDto,
}

fn auth_response(state: &AppState, user: &User) -> Result<ApiResponse<AuthDto>, ApiError> {
    let token = state.jwt.issue(user)?;
    Ok(ApiResponse::new(AuthDto {
        token,
        user: UserDto::from(user),
    }))
}

#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth
        .register(RegisterInput {
            email:         req.email,
            password:      req.password,
            full_name:     req.full_name,
            phone:         req.phone,
            activity_type: req.activity_type,
        })
        .await?;
    let response = auth_response(&state, &user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.login(&req.email, &req.password).await?;
    let response = auth_response(&state, &user)?;
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip_all)]
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth
        .admin_login(&req.login, &req.password, &req.code, Utc::now())
        .await?;
    let response = auth_response(&state, &user)?;
    Ok((StatusCode::OK, Json(response)))
}
