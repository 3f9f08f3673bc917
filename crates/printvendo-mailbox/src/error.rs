//! Error types for the mailbox adapter.

use thiserror::Error;

/// Result alias using [`MailboxError`].
pub type Result<T> = std::result::Result<T, MailboxError>;

/// Failures surfaced by a mailbox store backend.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// No folder exists for the machine; registration must fail.
    #[error("no mailbox folder for machine '{0}'")]
    FolderNotFound(String),

    /// The store rejected a request.
    #[error("store API error (status {status}): {message}")]
    Api {
        /// HTTP status returned by the store.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// Transport-level failure reaching the store.
    #[error("store network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A single store operation exceeded its time bound.
    #[error("store operation timed out: {0}")]
    Timeout(String),

    /// The store answered with something we could not interpret.
    #[error("unexpected store response: {0}")]
    InvalidResponse(String),
}

impl MailboxError {
    /// Whether the operation may be retried as-is.
    ///
    /// Transport faults, timeouts, rate limits, and server-side errors are
    /// transient; a missing folder or a malformed response is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::FolderNotFound(_) | Self::InvalidResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(MailboxError::Timeout("read".into()).is_retryable());
        assert!(MailboxError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(MailboxError::Api {
            status: 429,
            message: "rate limited".into()
        }
        .is_retryable());
        assert!(!MailboxError::Api {
            status: 403,
            message: "forbidden".into()
        }
        .is_retryable());
        assert!(!MailboxError::FolderNotFound("kiosk-07".into()).is_retryable());
        assert!(!MailboxError::InvalidResponse("bad json".into()).is_retryable());
    }
}
