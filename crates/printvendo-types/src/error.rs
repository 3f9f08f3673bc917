//! The shared error taxonomy.
//!
//! Every failure surfaced to a kiosk client falls into one of these
//! categories. Leaf crates define their own error types and convert into
//! this taxonomy at the session layer.

use thiserror::Error;

use crate::session::SessionState;

/// Result alias using [`VendoError`].
pub type Result<T> = std::result::Result<T, VendoError>;

/// Top-level error taxonomy for the kiosk backend.
#[derive(Debug, Error)]
pub enum VendoError {
    /// No mailbox folder exists for the presented machine id. Fatal to the
    /// request; the user must re-enter the id.
    #[error("unknown machine: {0}")]
    UnknownMachine(String),

    /// Empty or malformed input. Fatal, user-correctable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The completion service failed. Retryable; nothing was billed.
    #[error("completion service error: {0}")]
    Upstream(String),

    /// The mailbox store failed transiently. Retryable with backoff; poll
    /// loops continue.
    #[error("mailbox store unavailable: {0}")]
    StoreUnavailable(String),

    /// A confirmation entry was found without a matching prior request.
    /// Logged and ignored; never unlocks a session.
    #[error("stale payment signal: {0}")]
    StaleSignal(String),

    /// The operation is not legal in the session's current state.
    #[error("invalid transition: {operation} requires {required:?}, session is {actual:?}")]
    InvalidTransition {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the operation requires.
        required: SessionState,
        /// The state the session was actually in.
        actual: SessionState,
    },
}

impl VendoError {
    /// Build a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an upstream (completion service) error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Build a transient store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Build a stale-signal error.
    pub fn stale(msg: impl Into<String>) -> Self {
        Self::StaleSignal(msg.into())
    }

    /// Whether a caller may retry the failed operation as-is.
    ///
    /// Store and upstream faults are transient; everything else needs a
    /// different input or a different state first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Upstream(_))
    }
}
