//! Error type for session operations.

use thiserror::Error;

use printvendo_llm::CompletionError;
use printvendo_mailbox::MailboxError;
use printvendo_types::{SessionState, VendoError};

/// Result alias using [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No mailbox folder is provisioned for the machine id.
    #[error("unknown machine: {0}")]
    UnknownMachine(String),

    /// Empty or malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not legal in the session's current state.
    #[error("{operation} requires {required:?}, session is {actual:?}")]
    InvalidTransition {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the operation requires.
        required: SessionState,
        /// The state the session was actually in.
        actual: SessionState,
    },

    /// The completion service failed; nothing was billed or published.
    #[error("completion failed: {0}")]
    Upstream(#[source] CompletionError),

    /// The mailbox store failed; retryable when the inner error is.
    #[error("mailbox store failed: {0}")]
    Store(#[source] MailboxError),

    /// A payment confirmation appeared without a matching prior request.
    #[error("stale payment signal: {0}")]
    StaleSignal(String),
}

impl SessionError {
    /// Whether the poll loop may simply try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Upstream(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<MailboxError> for SessionError {
    fn from(e: MailboxError) -> Self {
        match e {
            MailboxError::FolderNotFound(machine) => Self::UnknownMachine(machine),
            other => Self::Store(other),
        }
    }
}

impl From<CompletionError> for SessionError {
    fn from(e: CompletionError) -> Self {
        Self::Upstream(e)
    }
}

impl SessionError {
    /// Flatten into the client-facing taxonomy, dropping source chains.
    ///
    /// The kiosk client sees one of the fixed error categories; internal
    /// detail stays in the logs.
    pub fn as_client_error(&self) -> VendoError {
        match self {
            Self::UnknownMachine(m) => VendoError::UnknownMachine(m.clone()),
            Self::Validation(m) => VendoError::Validation(m.clone()),
            Self::Upstream(e) => VendoError::Upstream(e.to_string()),
            Self::Store(e) => VendoError::StoreUnavailable(e.to_string()),
            Self::StaleSignal(m) => VendoError::StaleSignal(m.clone()),
            Self::InvalidTransition {
                operation,
                required,
                actual,
            } => VendoError::InvalidTransition {
                operation,
                required: *required,
                actual: *actual,
            },
        }
    }
}
