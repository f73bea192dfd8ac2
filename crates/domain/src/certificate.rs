//! # Certificate
//!
//! A certification job opened by a declarant company for one of its
//! clients, optionally sent to a partner certification company. Status
//! transitions are unrestricted, but every change appends an action to
//! the audit trail, so the history stays complete no matter the order
//! in which the two sides work.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    client::ClientId,
    company::CompanyId,
    declaration::DeclarationId,
    document::DocumentId,
    folder::FolderId,
    user::UserId,
};

define_uuid_id! {
    /// Certificate id (UUID v7).
    pub struct CertificateId;
}

define_uuid_id! {
    /// Certificate action id (UUID v7).
    pub struct CertificateActionId;
}

/// Certificate workflow status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CertificateStatus {
    InProgress,
    AwaitingPayment,
    OnReview,
    Completed,
    Rejected,
}

impl std::str::FromStr for CertificateStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "on_review" => Ok(Self::OnReview),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "Неверный статус сертификата: {s}"
            ))),
        }
    }
}

/// A single entry of the certificate audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateAction {
    id: CertificateActionId,
    certificate_id: CertificateId,
    action: String,
    note: Option<String>,
    performed_by_id: UserId,
    attached_file_ids: Vec<DocumentId>,
    created_at: DateTime<Utc>,
}

impl CertificateAction {
    pub fn new(
        id: CertificateActionId,
        certificate_id: CertificateId,
        action: String,
        note: Option<String>,
        performed_by_id: UserId,
        attached_file_ids: Vec<DocumentId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            certificate_id,
            action,
            note,
            performed_by_id,
            attached_file_ids,
            created_at: now,
        }
    }

    pub fn from_db(
        id: CertificateActionId,
        certificate_id: CertificateId,
        action: String,
        note: Option<String>,
        performed_by_id: UserId,
        attached_file_ids: Vec<DocumentId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            certificate_id,
            action,
            note,
            performed_by_id,
            attached_file_ids,
            created_at,
        }
    }

    pub fn id(&self) -> &CertificateActionId {
        &self.id
    }

    pub fn certificate_id(&self) -> &CertificateId {
        &self.certificate_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn performed_by_id(&self) -> &UserId {
        &self.performed_by_id
    }

    pub fn attached_file_ids(&self) -> &[DocumentId] {
        &self.attached_file_ids
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Certificate entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    id: CertificateId,
    kind: String,
    number: Option<String>,
    number_to_be_filled_by_certifier: bool,
    deadline: Option<NaiveDate>,
    sent_date: Option<NaiveDate>,
    status: CertificateStatus,
    client_id: ClientId,
    note: Option<String>,
    owner_id: UserId,
    assigned_to_id: Option<UserId>,
    declarant_company_id: CompanyId,
    certifier_company_id: Option<CompanyId>,
    document_ids: Vec<DocumentId>,
    folder_ids: Vec<FolderId>,
    declaration_ids: Vec<DeclarationId>,
    payment_file_ids: Vec<DocumentId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct CertificatePatch {
    pub kind: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub sent_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub document_ids: Option<Vec<DocumentId>>,
    pub folder_ids: Option<Vec<FolderId>>,
    pub declaration_ids: Option<Vec<DeclarationId>>,
}

impl Certificate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CertificateId,
        kind: String,
        number: Option<String>,
        number_to_be_filled_by_certifier: bool,
        deadline: Option<NaiveDate>,
        client_id: ClientId,
        note: Option<String>,
        owner_id: UserId,
        declarant_company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let kind = kind.trim().to_string();
        if kind.is_empty() {
            return Err(DomainError::Validation(
                "Тип сертификата обязателен".to_string(),
            ));
        }
        if number.is_none() && !number_to_be_filled_by_certifier {
            return Err(DomainError::Validation(
                "Укажите номер сертификата или отметьте, что его заполнит сертификатор"
                    .to_string(),
            ));
        }

        Ok(Self {
            id,
            kind,
            number,
            number_to_be_filled_by_certifier,
            deadline,
            sent_date: None,
            status: CertificateStatus::InProgress,
            client_id,
            note,
            owner_id,
            assigned_to_id: None,
            declarant_company_id,
            certifier_company_id: None,
            document_ids: Vec::new(),
            folder_ids: Vec::new(),
            declaration_ids: Vec::new(),
            payment_file_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: CertificateId,
        kind: String,
        number: Option<String>,
        number_to_be_filled_by_certifier: bool,
        deadline: Option<NaiveDate>,
        sent_date: Option<NaiveDate>,
        status: CertificateStatus,
        client_id: ClientId,
        note: Option<String>,
        owner_id: UserId,
        assigned_to_id: Option<UserId>,
        declarant_company_id: CompanyId,
        certifier_company_id: Option<CompanyId>,
        document_ids: Vec<DocumentId>,
        folder_ids: Vec<FolderId>,
        declaration_ids: Vec<DeclarationId>,
        payment_file_ids: Vec<DocumentId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            number,
            number_to_be_filled_by_certifier,
            deadline,
            sent_date,
            status,
            client_id,
            note,
            owner_id,
            assigned_to_id,
            declarant_company_id,
            certifier_company_id,
            document_ids,
            folder_ids,
            declaration_ids,
            payment_file_ids,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &CertificateId {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn number_to_be_filled_by_certifier(&self) -> bool {
        self.number_to_be_filled_by_certifier
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        self.deadline
    }

    pub fn sent_date(&self) -> Option<NaiveDate> {
        self.sent_date
    }

    pub fn status(&self) -> CertificateStatus {
        self.status
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn assigned_to_id(&self) -> Option<&UserId> {
        self.assigned_to_id.as_ref()
    }

    pub fn declarant_company_id(&self) -> &CompanyId {
        &self.declarant_company_id
    }

    pub fn certifier_company_id(&self) -> Option<&CompanyId> {
        self.certifier_company_id.as_ref()
    }

    pub fn document_ids(&self) -> &[DocumentId] {
        &self.document_ids
    }

    pub fn folder_ids(&self) -> &[FolderId] {
        &self.folder_ids
    }

    pub fn declaration_ids(&self) -> &[DeclarationId] {
        &self.declaration_ids
    }

    pub fn payment_file_ids(&self) -> &[DocumentId] {
        &self.payment_file_ids
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when `company_id` is on either side of the certificate.
    pub fn involves_company(&self, company_id: &CompanyId) -> bool {
        &self.declarant_company_id == company_id
            || self.certifier_company_id.as_ref() == Some(company_id)
    }

    pub fn apply(self, patch: CertificatePatch, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let kind = match patch.kind {
            Some(kind) => {
                let kind = kind.trim().to_string();
                if kind.is_empty() {
                    return Err(DomainError::Validation(
                        "Тип сертификата обязателен".to_string(),
                    ));
                }
                kind
            }
            None => self.kind,
        };

        Ok(Self {
            kind,
            deadline: patch.deadline.or(self.deadline),
            sent_date: patch.sent_date.or(self.sent_date),
            note: patch.note.or(self.note),
            document_ids: patch.document_ids.unwrap_or(self.document_ids),
            folder_ids: patch.folder_ids.unwrap_or(self.folder_ids),
            declaration_ids: patch.declaration_ids.unwrap_or(self.declaration_ids),
            updated_at: now,
            ..self
        })
    }

    pub fn with_status(self, status: CertificateStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: now,
            ..self
        }
    }

    /// Fills the certificate number.
    ///
    /// Only allowed while `number_to_be_filled_by_certifier` is set;
    /// once filled, the flag is cleared.
    pub fn with_number(self, number: String, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !self.number_to_be_filled_by_certifier {
            return Err(DomainError::Conflict(
                "Номер сертификата уже заполнен".to_string(),
            ));
        }
        let number = number.trim().to_string();
        if number.is_empty() {
            return Err(DomainError::Validation(
                "Номер сертификата обязателен".to_string(),
            ));
        }
        Ok(Self {
            number: Some(number),
            number_to_be_filled_by_certifier: false,
            updated_at: now,
            ..self
        })
    }

    /// Sends the certificate to a partner certification company.
    pub fn sent_to(
        self,
        certifier_company_id: CompanyId,
        sent_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            certifier_company_id: Some(certifier_company_id),
            sent_date: Some(sent_date),
            updated_at: now,
            ..self
        }
    }

    pub fn assigned_to(self, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            assigned_to_id: Some(user_id),
            updated_at: now,
            ..self
        }
    }

    pub fn with_payment_files(
        self,
        mut payment_file_ids: Vec<DocumentId>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut all = self.payment_file_ids;
        all.append(&mut payment_file_ids);
        Self {
            payment_file_ids: all,
            updated_at: now,
            ..self
        }
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

    fn certificate_with_number(number: Option<&str>, certifier_fills: bool) -> Certificate {
        Certificate::new(
            CertificateId::new(),
            "Сертификат соответствия".to_string(),
            number.map(str::to_string),
            certifier_fills,
            None,
            ClientId::new(),
            None,
            UserId::new(),
            CompanyId::new(),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_certificate_starts_in_progress() {
        let cert = certificate_with_number(Some("TC RU C-123"), false);
        assert_eq!(cert.status(), CertificateStatus::InProgress);
        assert_eq!(cert.certifier_company_id(), None);
        assert_eq!(cert.sent_date(), None);
    }

    #[test]
    fn test_new_certificate_requires_number_or_certifier_flag() {
        let result = Certificate::new(
            CertificateId::new(),
            "Декларация о соответствии".to_string(),
            None,
            false,
            None,
            ClientId::new(),
            None,
            UserId::new(),
            CompanyId::new(),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_with_number_fills_once(now: DateTime<Utc>) {
        let cert = certificate_with_number(None, true);

        let filled = cert.with_number("TC RU C-456".to_string(), now).unwrap();
        assert_eq!(filled.number(), Some("TC RU C-456"));
        assert!(!filled.number_to_be_filled_by_certifier());

        // second fill is a conflict
        assert!(filled.with_number("TC RU C-789".to_string(), now).is_err());
    }

    #[rstest]
    fn test_sent_to_records_certifier_and_date(now: DateTime<Utc>) {
        let cert = certificate_with_number(Some("TC RU C-123"), false);
        let certifier = CompanyId::new();
        let date = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();

        let sent = cert.sent_to(certifier, date, now);

        assert_eq!(sent.certifier_company_id(), Some(&certifier));
        assert_eq!(sent.sent_date(), Some(date));
        assert!(sent.involves_company(&certifier));
    }

    #[rstest]
    fn test_payment_files_accumulate(now: DateTime<Utc>) {
        let cert = certificate_with_number(Some("TC RU C-123"), false);
        let first = DocumentId::new();
        let second = DocumentId::new();

        let cert = cert
            .with_payment_files(vec![first], now)
            .with_payment_files(vec![second], now);

        assert_eq!(cert.payment_file_ids(), &[first, second]);
    }

    #[rstest]
    #[case("in_progress", CertificateStatus::InProgress)]
    #[case("awaiting_payment", CertificateStatus::AwaitingPayment)]
    #[case("on_review", CertificateStatus::OnReview)]
    #[case("completed", CertificateStatus::Completed)]
    #[case("rejected", CertificateStatus::Rejected)]
    fn test_status_parses(#[case] input: &str, #[case] expected: CertificateStatus) {
        assert_eq!(input.parse::<CertificateStatus>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }
}
