//! # Usecases
//!
//! Business logic, one module per feature area. Usecases are generic
//! over repository traits so tests can run against the in-memory mocks
//! from `declarant-infra`.

pub mod admin;
pub mod auth;
pub mod certificate;
pub mod client;
pub mod dashboard;
pub mod declaration;
pub mod document;
pub mod folder;
pub mod notification;
pub mod partnership;
pub mod request;
pub mod task;

use declarant_infra::{TransactionManager, db::TxContext};

use crate::error::ApiError;

pub(crate) const DEFAULT_PAGE_SIZE: u32 = 20;
pub(crate) const MAX_PAGE_SIZE: u32 = 100;

/// Normalizes pagination input: 1-based page, size capped at
/// [`MAX_PAGE_SIZE`].
pub(crate) fn clamp_page(page: Option<u32>, page_size: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

pub(crate) async fn begin_tx<TM: TransactionManager>(tm: &TM) -> Result<TxContext, ApiError> {
    Ok(tm.begin().await?)
}

pub(crate) async fn commit_tx(tx: TxContext) -> Result<(), ApiError> {
    Ok(tx.commit().await?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, None, 1, 20)]
    #[case(Some(0), Some(0), 1, 1)]
    #[case(Some(3), Some(50), 3, 50)]
    #[case(Some(2), Some(500), 2, 100)]
    fn test_clamp_page(
        #[case] page: Option<u32>,
        #[case] size: Option<u32>,
        #[case] expected_page: u32,
        #[case] expected_size: u32,
    ) {
        assert_eq!(clamp_page(page, size), (expected_page, expected_size));
    }
}
