//! Error types for backend communication.

use thiserror::Error;

/// Errors returned by the processing backend client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The backend answered 2xx but reported `success: false`.
    #[error("Backend rejected request: {0}")]
    Rejected(String),

    /// The response body was not the JSON we expected.
    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// A local file could not be read for upload.
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl BackendError {
    /// True for failures worth retrying later (network trouble, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Transport { .. } => true,
            BackendError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BackendError::Status {
            status: 502,
            url: "http://backend/api/laz/dtm".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502 from http://backend/api/laz/dtm");
        assert_eq!(
            BackendError::Rejected("no points".to_string()).to_string(),
            "Backend rejected request: no points"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(BackendError::Transport {
            url: "u".to_string(),
            reason: "reset".to_string()
        }
        .is_transient());
        assert!(BackendError::Status {
            status: 503,
            url: "u".to_string()
        }
        .is_transient());
        assert!(!BackendError::Status {
            status: 404,
            url: "u".to_string()
        }
        .is_transient());
        assert!(!BackendError::Rejected("x".to_string()).is_transient());
    }
}
