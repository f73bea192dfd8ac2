//! # Declaration
//!
//! A customs declaration filed for a client. Its user-facing number is
//! composed from the customs post, the filing date and a 7-digit serial:
//! `"12345/03.11.2025/0004567"`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    client::ClientId,
    company::CompanyId,
    document::DocumentId,
    folder::FolderId,
    user::UserId,
    value_objects::{DeclarationSerial, PostNumber},
};

define_uuid_id! {
    /// Declaration id (UUID v7).
    pub struct DeclarationId;
}

define_uuid_id! {
    /// Declaration group id (UUID v7).
    pub struct DeclarationGroupId;
}

/// Transport type, coded as in box 25 of the declaration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Sea,
    Rail,
    Road,
    Air,
    Pipeline,
    PowerLine,
    InlandWater,
    SelfPropelled,
}

impl VehicleKind {
    /// Two-digit customs code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Sea => "10",
            Self::Rail => "20",
            Self::Road => "30",
            Self::Air => "40",
            Self::Pipeline => "71",
            Self::PowerLine => "72",
            Self::InlandWater => "80",
            Self::SelfPropelled => "90",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code {
            "10" => Ok(Self::Sea),
            "20" => Ok(Self::Rail),
            "30" => Ok(Self::Road),
            "40" => Ok(Self::Air),
            "71" => Ok(Self::Pipeline),
            "72" => Ok(Self::PowerLine),
            "80" => Ok(Self::InlandWater),
            "90" => Ok(Self::SelfPropelled),
            _ => Err(DomainError::Validation(format!(
                "Неверный код транспортного средства: {code}"
            ))),
        }
    }
}

/// Vehicle attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    number: String,
    kind: VehicleKind,
}

impl Vehicle {
    pub fn new(number: String, kind: VehicleKind) -> Result<Self, DomainError> {
        let number = number.trim().to_string();
        if number.is_empty() {
            return Err(DomainError::Validation(
                "Номер транспортного средства обязателен".to_string(),
            ));
        }
        Ok(Self { number, kind })
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn kind(&self) -> VehicleKind {
        self.kind
    }
}

/// Named group of declarations inside a company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationGroup {
    id: DeclarationGroupId,
    name: String,
    company_id: CompanyId,
    created_at: DateTime<Utc>,
}

impl DeclarationGroup {
    pub fn new(
        id: DeclarationGroupId,
        name: String,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Название группы обязательно".to_string(),
            ));
        }
        Ok(Self {
            id,
            name,
            company_id,
            created_at: now,
        })
    }

    pub fn from_db(
        id: DeclarationGroupId,
        name: String,
        company_id: CompanyId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            company_id,
            created_at,
        }
    }

    pub fn id(&self) -> &DeclarationGroupId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.company_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Declaration entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    id: DeclarationId,
    post_number: PostNumber,
    date: NaiveDate,
    serial: DeclarationSerial,
    client_id: ClientId,
    mode: String,
    note: Option<String>,
    group_id: Option<DeclarationGroupId>,
    vehicles: Vec<Vehicle>,
    document_ids: Vec<DocumentId>,
    folder_ids: Vec<FolderId>,
    owner_id: UserId,
    company_id: CompanyId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update. `None` fields are left unchanged; `vehicles`,
/// `document_ids` and `folder_ids` are replaced wholesale when given.
#[derive(Debug, Clone, Default)]
pub struct DeclarationPatch {
    pub post_number: Option<PostNumber>,
    pub date: Option<NaiveDate>,
    pub serial: Option<DeclarationSerial>,
    pub mode: Option<String>,
    pub note: Option<String>,
    pub group_id: Option<Option<DeclarationGroupId>>,
    pub vehicles: Option<Vec<Vehicle>>,
    pub document_ids: Option<Vec<DocumentId>>,
    pub folder_ids: Option<Vec<FolderId>>,
}

impl Declaration {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DeclarationId,
        post_number: PostNumber,
        date: NaiveDate,
        serial: DeclarationSerial,
        client_id: ClientId,
        mode: String,
        note: Option<String>,
        vehicles: Vec<Vehicle>,
        owner_id: UserId,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mode = mode.trim().to_string();
        if mode.is_empty() {
            return Err(DomainError::Validation(
                "Режим декларации обязателен".to_string(),
            ));
        }

        Ok(Self {
            id,
            post_number,
            date,
            serial,
            client_id,
            mode,
            note,
            group_id: None,
            vehicles,
            document_ids: Vec::new(),
            folder_ids: Vec::new(),
            owner_id,
            company_id,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: DeclarationId,
        post_number: PostNumber,
        date: NaiveDate,
        serial: DeclarationSerial,
        client_id: ClientId,
        mode: String,
        note: Option<String>,
        group_id: Option<DeclarationGroupId>,
        vehicles: Vec<Vehicle>,
        document_ids: Vec<DocumentId>,
        folder_ids: Vec<FolderId>,
        owner_id: UserId,
        company_id: CompanyId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            post_number,
            date,
            serial,
            client_id,
            mode,
            note,
            group_id,
            vehicles,
            document_ids,
            folder_ids,
            owner_id,
            company_id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &DeclarationId {
        &self.id
    }

    pub fn post_number(&self) -> &PostNumber {
        &self.post_number
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn serial(&self) -> &DeclarationSerial {
        &self.serial
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn group_id(&self) -> Option<&DeclarationGroupId> {
        self.group_id.as_ref()
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn document_ids(&self) -> &[DocumentId] {
        &self.document_ids
    }

    pub fn folder_ids(&self) -> &[FolderId] {
        &self.folder_ids
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.company_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// User-facing number: `"{post}/{DD.MM.YYYY}/{serial}"`.
    pub fn formatted_number(&self) -> String {
        format!(
            "{}/{}/{}",
            self.post_number,
            self.date.format("%d.%m.%Y"),
            self.serial
        )
    }

    pub fn apply(self, patch: DeclarationPatch, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let mode = match patch.mode {
            Some(mode) => {
                let mode = mode.trim().to_string();
                if mode.is_empty() {
                    return Err(DomainError::Validation(
                        "Режим декларации обязателен".to_string(),
                    ));
                }
                mode
            }
            None => self.mode,
        };

        Ok(Self {
            post_number: patch.post_number.unwrap_or(self.post_number),
            date: patch.date.unwrap_or(self.date),
            serial: patch.serial.unwrap_or(self.serial),
            mode,
            note: patch.note.or(self.note),
            group_id: patch.group_id.unwrap_or(self.group_id),
            vehicles: patch.vehicles.unwrap_or(self.vehicles),
            document_ids: patch.document_ids.unwrap_or(self.document_ids),
            folder_ids: patch.folder_ids.unwrap_or(self.folder_ids),
            updated_at: now,
            ..self
        })
    }

    pub fn redirected_to(self, owner_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            updated_at: now,
            ..self
        }
    }

    pub fn with_group(self, group_id: Option<DeclarationGroupId>, now: DateTime<Utc>) -> Self {
        Self {
            group_id,
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

    #[fixture]
    fn declaration(now: DateTime<Utc>) -> Declaration {
        Declaration::new(
            DeclarationId::new(),
            PostNumber::new("12345").unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            DeclarationSerial::new("0004567").unwrap(),
            ClientId::new(),
            "ЭК/10".to_string(),
            None,
            vec![Vehicle::new("AA1234BB".to_string(), VehicleKind::Road).unwrap()],
            UserId::new(),
            CompanyId::new(),
            now,
        )
        .unwrap()
    }

    #[rstest]
    fn test_formatted_number_uses_dotted_date(declaration: Declaration) {
        assert_eq!(declaration.formatted_number(), "12345/03.11.2025/0004567");
    }

    #[rstest]
    fn test_formatted_number_keeps_leading_zeros(now: DateTime<Utc>) {
        let declaration = Declaration::new(
            DeclarationId::new(),
            PostNumber::new("00001").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
            DeclarationSerial::new("0000002").unwrap(),
            ClientId::new(),
            "ИМ/40".to_string(),
            None,
            Vec::new(),
            UserId::new(),
            CompanyId::new(),
            now,
        )
        .unwrap();

        assert_eq!(declaration.formatted_number(), "00001/09.01.2025/0000002");
    }

    #[rstest]
    fn test_apply_replaces_vehicles_wholesale(declaration: Declaration, now: DateTime<Utc>) {
        let patch = DeclarationPatch {
            vehicles: Some(vec![
                Vehicle::new("CC5678DD".to_string(), VehicleKind::Rail).unwrap(),
            ]),
            ..DeclarationPatch::default()
        };

        let updated = declaration.apply(patch, now).unwrap();

        assert_eq!(updated.vehicles().len(), 1);
        assert_eq!(updated.vehicles()[0].number(), "CC5678DD");
        assert_eq!(updated.vehicles()[0].kind(), VehicleKind::Rail);
    }

    #[rstest]
    fn test_apply_can_clear_group(declaration: Declaration, now: DateTime<Utc>) {
        let grouped = declaration.with_group(Some(DeclarationGroupId::new()), now);

        let patch = DeclarationPatch {
            group_id: Some(None),
            ..DeclarationPatch::default()
        };
        let updated = grouped.apply(patch, now).unwrap();

        assert_eq!(updated.group_id(), None);
    }

    #[rstest]
    #[case("10", VehicleKind::Sea)]
    #[case("30", VehicleKind::Road)]
    #[case("90", VehicleKind::SelfPropelled)]
    fn test_vehicle_kind_code_round_trip(#[case] code: &str, #[case] kind: VehicleKind) {
        assert_eq!(VehicleKind::from_code(code).unwrap(), kind);
        assert_eq!(kind.code(), code);
    }

    #[test]
    fn test_vehicle_kind_rejects_unknown_code() {
        assert!(VehicleKind::from_code("99").is_err());
    }
}
