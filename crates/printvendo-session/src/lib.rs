//! Machine-session state machine and mailbox protocol for the PrintVendo
//! kiosk backend.
//!
//! This crate composes the leaf crates into the core of the system: a
//! per-machine session that advances
//!
//! ```text
//! Unregistered -> Registered -> ContentSubmitted -> AwaitingAiResponse
//!     -> ResponseReady -> CostPublished -> AwaitingPayment
//!     -> PaymentConfirmed -> Unlocked -> Cleaned(-> Unregistered)
//! ```
//!
//! with every transition conditioned on a positive confirmation: a
//! successful mailbox write, a finished completion, or a won delete of a
//! payment sentinel. The absence of an error never advances state.
//!
//! # Module Organization
//!
//! - [`store`] - the injected session-store abstraction
//! - [`manager`] - the operations themselves
//! - [`api`] - client-facing request/response contracts
//! - [`poll`] - payment/response watchers on a fixed tick
//! - [`retry`] - exponential backoff for transient store faults
//! - [`error`] - the session error type

pub mod api;
pub mod error;
pub mod manager;
pub mod poll;
pub mod retry;
pub mod store;

pub use api::{
    ArtifactOutcome, CleanupOutcome, CostReport, PaymentPoll, ResponsePoll, SubmitOutcome,
};
pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use poll::{watch_payment, watch_response, PollConfig, WatchOutcome};
pub use retry::RetryPolicy;
pub use store::{InMemorySessionStore, SessionStore};
