//! # Infrastructure layer errors
//!
//! Wraps database, storage and HTTP failures. Follows the
//! `std::io::Error` struct + enum pattern:
//!
//! - [`InfraError`]: the kind plus a [`SpanTrace`] captured at the
//!   point the error was created
//! - [`InfraErrorKind`]: the concrete failure
//!
//! `From` conversions and the convenience constructors capture the
//! current span path automatically.

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// Error raised by the infrastructure layer.
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// Concrete failure behind an [`InfraError`].
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// SQL execution failure, connection error, constraint violation.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// JSON conversion failure.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// File storage failure.
    #[error("storage error: {0}")]
    Io(#[source] std::io::Error),

    /// Uniqueness or state conflict detected at the storage level.
    #[error("conflict: {entity}(id={id})")]
    Conflict {
        /// Entity name ("User", "Company", ...).
        entity: String,
        /// Conflicting identifier.
        id:     String,
    },

    /// Outbound HTTP call failure (Telegram Bot API).
    #[error("http error: {0}")]
    Http(String),

    /// The failure is caused by bad client input detected here.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything that does not fit the variants above.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    // Convenience constructors

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Conflict {
                entity: entity.into(),
                id:     id.into(),
            },
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Http(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::InvalidInput(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Unexpected(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Database(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Serialization(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(source: std::io::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Io(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// Installs a subscriber with the ErrorLayer for SpanTrace capture.
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_sqlx_error_captures_span_trace() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_repo", company_id = "C-001");
            let _enter = span.enter();

            let err: InfraError = sqlx::Error::RowNotFound.into();

            assert!(matches!(err.kind(), InfraErrorKind::Database(_)));
            let trace = format!("{}", err.span_trace());
            assert!(trace.contains("test_repo"), "span name missing: {trace}");
        });
    }

    #[test]
    fn test_conflict_constructor() {
        with_error_layer(|| {
            let err = InfraError::conflict("User", "U-001");
            assert!(matches!(
                err.kind(),
                InfraErrorKind::Conflict { entity, id } if entity == "User" && id == "U-001"
            ));
        });
    }

    #[test]
    fn test_display_shows_kind_message() {
        let err = InfraError::conflict("Company", "C-001");
        assert_eq!(format!("{err}"), "conflict: Company(id=C-001)");
    }

    #[test]
    fn test_source_delegates_to_kind() {
        use std::error::Error;

        let err: InfraError = sqlx::Error::RowNotFound.into();
        assert!(err.source().is_some());
    }
}
