//! # Declarant shared utilities
//!
//! Cross-cutting types used by every other crate: the API response
//! envelopes and tracing initialization. No business logic lives here.

pub mod api_response;
pub mod observability;
pub mod paginated_response;

pub use api_response::ApiResponse;
pub use paginated_response::PaginatedResponse;
