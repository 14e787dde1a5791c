//! The closed error taxonomy from `spec.md` §7, plus the open
//! `BackendUnavailable` class wrapping driver failures.
//!
//! Modeled on `lakekeeper`'s `ErrorModel` / `CatalogBackendError` split
//! (`service/catalog_store/error.rs`): controllers return
//! [`ZephyrError`] variants verbatim to the transport layer; unexpected
//! driver failures get folded into `BackendUnavailable` at the driver
//! boundary, never leaking driver-specific error types upward.

use std::fmt;

use http::StatusCode;

/// One entry in the closed taxonomy of `spec.md` §7.
#[derive(Debug, thiserror::Error)]
pub enum ZephyrError {
    #[error("queue '{queue}' does not exist in project '{project}'")]
    QueueDoesNotExist { project: String, queue: String },

    #[error("message '{msg_id}' does not exist in queue '{queue}'")]
    MessageDoesNotExist { queue: String, msg_id: String },

    #[error("claim '{claim_id}' does not exist in queue '{queue}'")]
    ClaimDoesNotExist { queue: String, claim_id: String },

    #[error("operation not permitted: {reason}")]
    NotPermitted { reason: String },

    #[error("validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("no partitions are registered")]
    NoPartitionsRegistered,

    #[error("partition '{name}' was not found")]
    PartitionNotFound { name: String },

    #[error("catalogue entry for project '{project}', queue '{queue}' was not found")]
    EntryNotFound { project: String, queue: String },

    #[error("catalogue entry for project '{project}', queue '{queue}' already exists")]
    EntryAlreadyExists { project: String, queue: String },

    /// Open class: wraps any driver-level failure that is not itself part
    /// of the closed taxonomy (connection loss, serialization failure,
    /// deadline exceeded). Retriable from the caller's point of view.
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl ZephyrError {
    #[must_use]
    pub fn not_permitted(reason: impl Into<String>) -> Self {
        Self::NotPermitted {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn wrap_backend<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wire mapping from `spec.md` §6.2.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::QueueDoesNotExist { .. }
            | Self::MessageDoesNotExist { .. }
            | Self::ClaimDoesNotExist { .. }
            | Self::PartitionNotFound { .. }
            | Self::EntryNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotPermitted { .. } => StatusCode::FORBIDDEN,
            Self::EntryAlreadyExists { .. } => StatusCode::CONFLICT,
            Self::NoPartitionsRegistered | Self::BackendUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QueueDoesNotExist { .. } => "QueueDoesNotExist",
            Self::MessageDoesNotExist { .. } => "MessageDoesNotExist",
            Self::ClaimDoesNotExist { .. } => "ClaimDoesNotExist",
            Self::NotPermitted { .. } => "NotPermitted",
            Self::ValidationFailed { .. } => "ValidationFailed",
            Self::NoPartitionsRegistered => "NoPartitionsRegistered",
            Self::PartitionNotFound { .. } => "PartitionNotFound",
            Self::EntryNotFound { .. } => "EntryNotFound",
            Self::EntryAlreadyExists { .. } => "EntryAlreadyExists",
            Self::BackendUnavailable { .. } => "BackendUnavailable",
        }
    }
}

/// A human/machine-readable rendering of a [`ZephyrError`], independent of
/// any particular transport. The `router` feature maps this to a JSON body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorModel {
    pub r#type: String,
    pub code: u16,
    pub message: String,
}

impl From<&ZephyrError> for ErrorModel {
    fn from(err: &ZephyrError) -> Self {
        Self {
            r#type: err.kind().to_string(),
            code: err.status_code().as_u16(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.r#type, self.code, self.message)
    }
}

pub type Result<T> = std::result::Result<T, ZephyrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy_table() {
        assert_eq!(
            ZephyrError::ValidationFailed {
                reason: "x".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ZephyrError::QueueDoesNotExist {
                project: "p".into(),
                queue: "q".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ZephyrError::not_permitted("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ZephyrError::backend_unavailable("db down").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
