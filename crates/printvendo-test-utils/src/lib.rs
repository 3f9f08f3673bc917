//! Shared test doubles for the PrintVendo crates.
//!
//! - [`MockMailbox`] - in-memory mailbox store with the same consumption
//!   semantics as the remote one
//! - [`ScriptedCompletionApi`] - completion service that plays back a
//!   scripted sequence of replies and records every call

pub mod mock_completion;
pub mod mock_mailbox;

pub use mock_completion::ScriptedCompletionApi;
pub use mock_mailbox::MockMailbox;
