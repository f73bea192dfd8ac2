//! # Partnership
//!
//! A link between two companies. The pair is unordered for uniqueness:
//! while a pending or accepted partnership exists in either direction,
//! a second request between the same two companies is a conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, company::CompanyId};

define_uuid_id! {
    /// Partnership id (UUID v7).
    pub struct PartnershipId;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PartnershipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::str::FromStr for PartnershipStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "Неверный статус партнерства: {s}"
            ))),
        }
    }
}

/// Partnership entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partnership {
    id: PartnershipId,
    requesting_company_id: CompanyId,
    target_company_id: CompanyId,
    note: Option<String>,
    status: PartnershipStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Partnership {
    pub fn new(
        id: PartnershipId,
        requesting_company_id: CompanyId,
        target_company_id: CompanyId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if requesting_company_id == target_company_id {
            return Err(DomainError::Validation(
                "Нельзя отправить запрос на партнерство своей компании".to_string(),
            ));
        }

        Ok(Self {
            id,
            requesting_company_id,
            target_company_id,
            note,
            status: PartnershipStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: PartnershipId,
        requesting_company_id: CompanyId,
        target_company_id: CompanyId,
        note: Option<String>,
        status: PartnershipStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            requesting_company_id,
            target_company_id,
            note,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &PartnershipId {
        &self.id
    }

    pub fn requesting_company_id(&self) -> &CompanyId {
        &self.requesting_company_id
    }

    pub fn target_company_id(&self) -> &CompanyId {
        &self.target_company_id
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn status(&self) -> PartnershipStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when this partnership connects the two companies,
    /// in either direction.
    pub fn links(&self, a: &CompanyId, b: &CompanyId) -> bool {
        (&self.requesting_company_id == a && &self.target_company_id == b)
            || (&self.requesting_company_id == b && &self.target_company_id == a)
    }

    /// The counterpart company as seen from `company_id`, if the
    /// company is part of this partnership at all.
    pub fn partner_of(&self, company_id: &CompanyId) -> Option<&CompanyId> {
        if &self.requesting_company_id == company_id {
            Some(&self.target_company_id)
        } else if &self.target_company_id == company_id {
            Some(&self.requesting_company_id)
        } else {
            None
        }
    }

    /// True while the partnership still blocks a new request between
    /// the same pair.
    pub fn blocks_new_request(&self) -> bool {
        matches!(
            self.status,
            PartnershipStatus::Pending | PartnershipStatus::Accepted
        )
    }

    pub fn resolved(self, status: PartnershipStatus, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != PartnershipStatus::Pending {
            return Err(DomainError::Conflict(
                "Запрос на партнерство уже обработан".to_string(),
            ));
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

    #[rstest]
    fn test_self_partnership_is_rejected(now: DateTime<Utc>) {
        let company = CompanyId::new();
        let result = Partnership::new(PartnershipId::new(), company, company, None, now);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_links_is_direction_agnostic(now: DateTime<Utc>) {
        let a = CompanyId::new();
        let b = CompanyId::new();
        let p = Partnership::new(PartnershipId::new(), a, b, None, now).unwrap();

        assert!(p.links(&a, &b));
        assert!(p.links(&b, &a));
        assert!(!p.links(&a, &CompanyId::new()));
    }

    #[rstest]
    fn test_partner_of_returns_counterpart(now: DateTime<Utc>) {
        let a = CompanyId::new();
        let b = CompanyId::new();
        let p = Partnership::new(PartnershipId::new(), a, b, None, now).unwrap();

        assert_eq!(p.partner_of(&a), Some(&b));
        assert_eq!(p.partner_of(&b), Some(&a));
        assert_eq!(p.partner_of(&CompanyId::new()), None);
    }

    #[rstest]
    fn test_resolving_twice_is_a_conflict(now: DateTime<Utc>) {
        let p = Partnership::new(PartnershipId::new(), CompanyId::new(), CompanyId::new(), None, now)
            .unwrap();

        let accepted = p.resolved(PartnershipStatus::Accepted, now).unwrap();
        assert!(accepted.resolved(PartnershipStatus::Rejected, now).is_err());
    }

    #[rstest]
    fn test_rejected_partnership_does_not_block_new_request(now: DateTime<Utc>) {
        let p = Partnership::new(PartnershipId::new(), CompanyId::new(), CompanyId::new(), None, now)
            .unwrap();
        assert!(p.blocks_new_request());

        let rejected = p.resolved(PartnershipStatus::Rejected, now).unwrap();
        assert!(!rejected.blocks_new_request());
    }
}
