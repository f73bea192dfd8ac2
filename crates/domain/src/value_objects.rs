//! # Shared value objects
//!
//! Small validated types used across several entities. Construction is
//! the only place validation happens; once a value exists it is known to
//! be well formed.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

/// Email address.
///
/// Requires a non-empty `local@domain` shape, at most 255 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::Validation("Email обязателен".to_string()));
        }

        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "Неверный формат email".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(DomainError::Validation(
                "Неверный формат email".to_string(),
            ));
        }

        if value.len() > 255 {
            return Err(DomainError::Validation(
                "Email не должен превышать 255 символов".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Taxpayer identification number (ИНН).
///
/// Exactly 9 digits. Companies and clients are looked up by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inn(String);

impl Inn {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.len() != 9 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::Validation(
                "ИНН должен состоять из 9 цифр".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Inn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customs post number: exactly 5 digits, leading zeros preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostNumber(String);

impl PostNumber {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.len() != 5 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::Validation(
                "Номер поста должен состоять из 5 цифр".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declaration serial number: exactly 7 digits, leading zeros preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationSerial(String);

impl DeclarationSerial {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.len() != 7 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::Validation(
                "Номер декларации должен состоять из 7 цифр".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeclarationSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a company does: customs declarations or certification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActivityType {
    Declarant,
    Certification,
}

impl std::str::FromStr for ActivityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "declarant" => Ok(Self::Declarant),
            "certification" => Ok(Self::Certification),
            _ => Err(DomainError::Validation(format!(
                "Неверный тип деятельности: {s}"
            ))),
        }
    }
}

/// Visibility mode of restricted resources (clients, folders).
///
/// - `Private`: only the owner (plus privileged roles)
/// - `Public`: every member of the owning company
/// - `Selected`: owner plus an explicit allow list
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccessType {
    Private,
    Public,
    Selected,
}

impl std::str::FromStr for AccessType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            "selected" => Ok(Self::Selected),
            _ => Err(DomainError::Validation(format!(
                "Неверный тип доступа: {s}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    // Email

    #[test]
    fn test_email_accepts_well_formed_address() {
        assert!(Email::new("user@example.com").is_ok());
    }

    #[test]
    fn test_email_is_lowercased() {
        let email = Email::new("User@Example.COM").unwrap();
        assert_eq!(email.as_str(), "user@example.com");
    }

    #[rstest]
    #[case("", "empty")]
    #[case("no-at-sign", "no at sign")]
    #[case("@example.com", "empty local part")]
    #[case("user@", "empty domain")]
    #[case("user@nodot", "domain without a dot")]
    fn test_email_rejects_malformed_address(#[case] input: &str, #[case] _reason: &str) {
        assert!(Email::new(input).is_err());
    }

    // Inn

    #[test]
    fn test_inn_accepts_nine_digits() {
        assert!(Inn::new("123456789").is_ok());
    }

    #[rstest]
    #[case("12345678", "too short")]
    #[case("1234567890", "too long")]
    #[case("12345678x", "non-digit")]
    #[case("", "empty")]
    fn test_inn_rejects_anything_else(#[case] input: &str, #[case] _reason: &str) {
        assert!(Inn::new(input).is_err());
    }

    // PostNumber / DeclarationSerial

    #[test]
    fn test_post_number_keeps_leading_zeros() {
        let post = PostNumber::new("00042").unwrap();
        assert_eq!(post.as_str(), "00042");
    }

    #[rstest]
    #[case("1234")]
    #[case("123456")]
    #[case("12a45")]
    fn test_post_number_rejects_bad_input(#[case] input: &str) {
        assert!(PostNumber::new(input).is_err());
    }

    #[rstest]
    #[case("0000001", true)]
    #[case("123456", false)]
    #[case("12345678", false)]
    fn test_declaration_serial_requires_seven_digits(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(DeclarationSerial::new(input).is_ok(), ok);
    }

    // Enums

    #[rstest]
    #[case("declarant", ActivityType::Declarant)]
    #[case("certification", ActivityType::Certification)]
    fn test_activity_type_parses_known_values(#[case] input: &str, #[case] expected: ActivityType) {
        assert_eq!(input.parse::<ActivityType>().unwrap(), expected);
    }

    #[test]
    fn test_activity_type_rejects_unknown_value() {
        assert!("broker".parse::<ActivityType>().is_err());
    }

    #[rstest]
    #[case("private", AccessType::Private)]
    #[case("public", AccessType::Public)]
    #[case("selected", AccessType::Selected)]
    fn test_access_type_round_trips(#[case] input: &str, #[case] expected: AccessType) {
        assert_eq!(input.parse::<AccessType>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }
}
