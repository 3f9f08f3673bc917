//! Completion-service client for the PrintVendo kiosk backend.
//!
//! One kiosk prompt may take several service calls to answer: the model can
//! stop mid-sentence at its token ceiling, in which case the prior exchange
//! is replayed with an explicit continue instruction until a completion
//! heuristic is satisfied or the attempt budget runs out. Token usage
//! accumulates across all calls: the billing layer sees one total.
//!
//! - [`CompletionApi`] - one request/response round trip, mockable
//! - [`OpenAiApi`] - the chat-completions HTTP implementation
//! - [`CompletionClient`] - the bounded continuation loop
//! - [`StopPolicy`] - pluggable "is this response finished?" predicate
//!
//! Failure is all-or-nothing: if any call in the loop fails, the whole
//! completion fails and no partial text is returned.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::{CompletionApi, OpenAiApi, OpenAiConfig};
pub use client::{CompletionClient, SentenceBoundary, StopPolicy};
pub use error::{CompletionError, Result};
pub use types::{ChatMessage, ChatOutcome, ChatRole, Completion, TokenUsage};
