//! Error types for the completion client.

use thiserror::Error;

/// Result alias using [`CompletionError`].
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Failures from the completion service or the transport to it.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The service returned a non-success status.
    #[error("completion API error (status {status}): {message}")]
    Api {
        /// HTTP status returned by the service.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// Transport-level failure reaching the service.
    #[error("completion network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response that does not carry a usable completion.
    #[error("malformed completion payload: {0}")]
    Malformed(String),
}

impl CompletionError {
    /// Whether the whole completion may be retried.
    ///
    /// Since no partial text is ever published, a retry is always safe for
    /// transient faults; a malformed payload is a contract break and is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CompletionError::Api {
            status: 500,
            message: "oops".into()
        }
        .is_retryable());
        assert!(CompletionError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_retryable());
        assert!(!CompletionError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!CompletionError::Malformed("no choices".into()).is_retryable());
    }
}
