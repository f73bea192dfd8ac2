//! # Declarant domain layer
//!
//! Entities, value objects and authorization rules of the customs
//! declaration and certification back office.
//!
//! ## Design
//!
//! - **Pure**: no I/O, no async; everything here is synchronous logic
//! - **Newtype ids**: every entity has a UUID v7 newtype id
//! - **Immutable entities**: private fields, `with_*` methods return a
//!   modified copy
//! - **Validated value objects**: construction returns
//!   `Result<_, DomainError>`

#[macro_use]
mod macros;

pub mod access;
pub mod certificate;
pub mod client;
pub mod company;
pub mod declaration;
pub mod document;
pub mod error;
pub mod folder;
pub mod notification;
pub mod partnership;
pub mod request;
pub mod task;
pub mod user;
pub mod value_objects;

pub use error::DomainError;
