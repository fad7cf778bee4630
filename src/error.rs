//! Error taxonomy for the export pipeline.
//!
//! Every failure the pipeline can hit maps onto one [`ExportError`] variant. None
//! of them are recoverable at the top level: either the whole timeframe is fetched
//! and written, or the run fails with one of these.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Missing or invalid setting, raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The API rejected the credential or account. Never retried.
    #[error("{operation} rejected by API (HTTP {status}): {message}")]
    Authorization {
        operation: String,
        status: u16,
        message: String,
    },

    /// Still rate limited after the retry budget was spent.
    #[error("{operation} still rate limited after {attempts} attempts")]
    RateLimit { operation: String, attempts: u32 },

    /// Network failure or 5xx response that outlasted the retry budget.
    #[error("{operation} failed after {attempts} attempts{}: {last_error}", .status.map(|s| format!(" (last HTTP status {s})")).unwrap_or_default())]
    TransientNetwork {
        operation: String,
        attempts: u32,
        status: Option<u16>,
        last_error: String,
    },

    /// The page payload did not have the expected shape.
    #[error("malformed response to {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },

    /// Any other non-retryable rejection (4xx other than auth, GraphQL errors).
    #[error("{operation} failed (HTTP {status}): {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    /// Destination could not be created or written.
    #[error("failed to write output to {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub(crate) fn malformed(operation: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Whether this error came from the retry loop giving up.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::RateLimit { .. } | Self::TransientNetwork { .. })
    }
}

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_message_includes_status() {
        let err = ExportError::TransientNetwork {
            operation: "auditFeed".to_string(),
            attempts: 6,
            status: Some(503),
            last_error: "service unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("6 attempts"));
        assert!(msg.contains("HTTP status 503"));
        assert!(err.is_retry_exhausted());
    }

    #[test]
    fn test_transient_message_without_status() {
        let err = ExportError::TransientNetwork {
            operation: "auditFeed".to_string(),
            attempts: 2,
            status: None,
            last_error: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "auditFeed failed after 2 attempts: connection reset"
        );
    }

    #[test]
    fn test_output_error_names_path() {
        let err = ExportError::output(
            "/tmp/out.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out.csv"));
        assert!(!err.is_retry_exhausted());
    }
}
