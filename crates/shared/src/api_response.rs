//! # API response envelope
//!
//! Every endpoint answers `{ "data": ..., "success": true, "message": ... }`.
//! Errors use the same shape with `success: false` and no `data`
//! (see the API crate's error type).

use serde::{Deserialize, Serialize};

/// Uniform success envelope of the public API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Success envelope without a message.
    pub fn new(data: T) -> Self {
        Self {
            data,
            success: true,
            message: None,
        }
    }

    /// Success envelope with a human-readable message.
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            success: true,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_to_expected_shape() {
        let response = ApiResponse::new("hello");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "data": "hello", "success": true })
        );
    }

    #[test]
    fn test_message_is_included_when_set() {
        let response = ApiResponse::with_message(42, "Создано");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "data": 42, "success": true, "message": "Создано" })
        );
    }

    #[test]
    fn test_deserializes_without_message() {
        let response: ApiResponse<String> =
            serde_json::from_str(r#"{"data": "x", "success": true}"#).unwrap();
        assert_eq!(response.data, "x");
        assert_eq!(response.message, None);
    }
}
