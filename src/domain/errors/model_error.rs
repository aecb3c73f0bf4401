//! Model error types.

use thiserror::Error;

/// Error taxonomy for model operations.
///
/// Transient network failures are retried on explicit user action;
/// permission and not-found failures roll back or skip model state; schema
/// failures drop the offending row in production and trap in debug.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Request failure or timeout; retryable by the caller.
    #[error("network error: {message}")]
    Network {
        /// Human-readable description.
        message: String,
    },

    /// Request deadline exceeded.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline that elapsed.
        timeout_ms: u64,
    },

    /// The platform refused the operation.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Human-readable description.
        message: String,
    },

    /// The referenced entity no longer exists.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Malformed platform data; the offending row is dropped.
    #[error("schema error: {message}")]
    Schema {
        /// Human-readable description.
        message: String,
    },

    /// A queued upload file was opened more than once.
    #[error("file {name} already consumed")]
    FileConsumed {
        /// File name as queued.
        name: String,
    },

    /// File I/O failure while preparing an upload.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),

    /// Model state touched off the owning scheduler.
    #[error("concurrency violation: {message}")]
    Concurrency {
        /// Human-readable description.
        message: String,
    },
}

impl ModelError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a permission-denied error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a schema error.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Returns whether retrying on user action may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    /// Returns whether the error came from the network boundary.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(ModelError::network("down").is_recoverable());
        assert!(!ModelError::permission_denied("nope").is_recoverable());
        assert!(!ModelError::not_found("message 5").is_recoverable());
    }
}
