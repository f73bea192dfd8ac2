//! # Request
//!
//! An approval request: company registration (resolved by the admin),
//! employee join (resolved by the target company's director) or
//! partnership (tracked here for listing; the partnership row itself
//! carries the resolution).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, company::CompanyId, user::UserId};

define_uuid_id! {
    /// Request id (UUID v7).
    pub struct RequestId;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestType {
    CompanyRegistration,
    EmployeeJoin,
    Partnership,
}

impl RequestType {
    /// Human-readable label used in notification texts.
    pub fn label(self) -> &'static str {
        match self {
            Self::CompanyRegistration => "Регистрация компании",
            Self::EmployeeJoin => "Вступление в компанию",
            Self::Partnership => "Партнерство",
        }
    }
}

impl std::str::FromStr for RequestType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company_registration" => Ok(Self::CompanyRegistration),
            "employee_join" => Ok(Self::EmployeeJoin),
            "partnership" => Ok(Self::Partnership),
            _ => Err(DomainError::Validation(format!(
                "Неверный тип запроса: {s}"
            ))),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::str::FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "Неверный статус запроса: {s}"
            ))),
        }
    }
}

/// Request entity.
///
/// `company_id` is the company the request is about (the one being
/// registered, or the one being joined). `target_company_id` is only
/// set for partnership requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: RequestId,
    request_type: RequestType,
    status: RequestStatus,
    user_id: UserId,
    company_id: CompanyId,
    target_company_id: Option<CompanyId>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Request {
    pub fn new(
        id: RequestId,
        request_type: RequestType,
        user_id: UserId,
        company_id: CompanyId,
        target_company_id: Option<CompanyId>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            request_type,
            status: RequestStatus::Pending,
            user_id,
            company_id,
            target_company_id,
            note,
            created_at: now,
            updated_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: RequestId,
        request_type: RequestType,
        status: RequestStatus,
        user_id: UserId,
        company_id: CompanyId,
        target_company_id: Option<CompanyId>,
        note: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            request_type,
            status,
            user_id,
            company_id,
            target_company_id,
            note,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.company_id
    }

    pub fn target_company_id(&self) -> Option<&CompanyId> {
        self.target_company_id.as_ref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Marks the request resolved. Only pending requests can be
    /// resolved; a second resolution is a conflict.
    pub fn resolved(self, status: RequestStatus, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !self.is_pending() {
            return Err(DomainError::Conflict("Запрос уже обработан".to_string()));
        }
        Ok(Self {
            status,
            updated_at: now,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn pending_request(now: DateTime<Utc>) -> Request {
        Request::new(
            RequestId::new(),
            RequestType::CompanyRegistration,
            UserId::new(),
            CompanyId::new(),
            None,
            None,
            now,
        )
    }

    #[rstest]
    fn test_new_request_is_pending(pending_request: Request) {
        assert!(pending_request.is_pending());
    }

    #[rstest]
    fn test_resolved_request_cannot_be_resolved_again(
        pending_request: Request,
        now: DateTime<Utc>,
    ) {
        let accepted = pending_request.resolved(RequestStatus::Accepted, now).unwrap();
        assert_eq!(accepted.status(), RequestStatus::Accepted);

        assert!(accepted.resolved(RequestStatus::Rejected, now).is_err());
    }

    #[rstest]
    #[case(RequestType::CompanyRegistration, "Регистрация компании")]
    #[case(RequestType::EmployeeJoin, "Вступление в компанию")]
    #[case(RequestType::Partnership, "Партнерство")]
    fn test_request_type_labels(#[case] request_type: RequestType, #[case] label: &str) {
        assert_eq!(request_type.label(), label);
    }
}
