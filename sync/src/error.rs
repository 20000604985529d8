//! Unified error handling for the sync runtime.
//!
//! None of these errors reach storefront consumers directly: the
//! [`Collection`](crate::Collection) facade turns them into `None`/`false`
//! outcomes and records the message as the collection's last error.

use std::time::Duration;

/// Failure reported by the remote document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("remote request timed out")]
    Timeout,
}

impl RemoteError {
    /// Expected outcome for non-privileged callers of admin-only streams.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, RemoteError::PermissionDenied(_))
    }
}

/// Sync runtime error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote store is not configured")]
    NotConfigured,

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("engine error: {0}")]
    Engine(#[from] shopfront_engine::Error),

    #[error("local store error: {0}")]
    LocalStore(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Result type alias for the sync runtime.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_classified() {
        assert!(RemoteError::PermissionDenied("orders".into()).is_permission_denied());
        assert!(!RemoteError::Timeout.is_permission_denied());
    }

    #[test]
    fn error_display() {
        let err = SyncError::from(RemoteError::Unavailable("offline".into()));
        assert_eq!(err.to_string(), "remote error: remote unavailable: offline");

        let err = SyncError::from(shopfront_engine::Error::EntityNotFound("p1".into()));
        assert_eq!(err.to_string(), "engine error: entity not found: p1");

        assert_eq!(
            SyncError::NotConfigured.to_string(),
            "remote store is not configured"
        );
    }
}
