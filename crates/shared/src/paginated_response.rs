//! # Paginated response
//!
//! Offset pagination with a page-count summary. Pages are 1-based.

use serde::{Deserialize, Serialize};

/// List envelope with offset pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(u64::from(page_size)) as u32
        };
        Self {
            data,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 20, 0)]
    #[case(1, 20, 1)]
    #[case(20, 20, 1)]
    #[case(21, 20, 2)]
    #[case(100, 7, 15)]
    fn test_total_pages_rounds_up(#[case] total: u64, #[case] page_size: u32, #[case] expected: u32) {
        let response: PaginatedResponse<u8> = PaginatedResponse::new(Vec::new(), total, 1, page_size);
        assert_eq!(response.total_pages, expected);
    }

    #[test]
    fn test_serializes_all_fields() {
        let response = PaginatedResponse::new(vec!["a"], 1, 1, 20);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "data": ["a"],
                "total": 1,
                "page": 1,
                "page_size": 20,
                "total_pages": 1
            })
        );
    }
}
