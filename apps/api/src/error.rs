//! # API error surface
//!
//! Every failure is rendered as `{"success": false, "message": "..."}`
//! with a status code derived from the error kind. Messages for client
//! errors come straight from the domain layer; infrastructure details
//! are logged and replaced with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use declarant_domain::DomainError;
use declarant_infra::InfraError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Требуется авторизация")]
    Unauthorized,

    #[error("Неверный запрос: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Domain(DomainError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Domain(DomainError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Domain(DomainError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Infra(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Infra(e) => {
                tracing::error!(error = %e, span_trace = %e.span_trace(), "internal error");
                "Внутренняя ошибка сервера".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            success: false,
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_domain_errors_map_to_expected_statuses() {
        let cases = [
            (
                ApiError::Domain(DomainError::Validation("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Domain(DomainError::NotFound {
                    entity_type: "Клиент",
                    id: "1".into(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Domain(DomainError::Conflict("x".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Domain(DomainError::Forbidden("x".into())),
                StatusCode::FORBIDDEN,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status(), expected);
        }
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            success: false,
            message: "Нет прав".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "Нет прав"})
        );
    }
}
