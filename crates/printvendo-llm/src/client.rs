//! The bounded continuation loop.
//!
//! The loop is explicit state (attempt counter, accumulated text, stop
//! predicate) rather than nested control flow, so each piece can be tested
//! on its own and the stop heuristic can be swapped out.

use tracing::{debug, warn};

use printvendo_types::constants::{CONTINUE_INSTRUCTION, MAX_COMPLETION_ATTEMPTS};

use crate::api::CompletionApi;
use crate::error::Result;
use crate::types::{ChatMessage, Completion, TokenUsage};

/// Decides whether a response chunk completes the answer.
pub trait StopPolicy: Send + Sync {
    /// True when `chunk` finishes the response and no continuation call is
    /// needed.
    fn is_complete(&self, chunk: &str) -> bool;
}

/// Default heuristic: the chunk, trimmed, ends in sentence punctuation.
///
/// A model that ran into its token ceiling stops mid-sentence; one that
/// finished its answer almost always closes the sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceBoundary;

impl StopPolicy for SentenceBoundary {
    fn is_complete(&self, chunk: &str) -> bool {
        matches!(chunk.trim_end().chars().last(), Some('.' | '!' | '?'))
    }
}

/// Drives a prompt to a finished completion over one or more service calls.
pub struct CompletionClient<A> {
    api: A,
    stop: Box<dyn StopPolicy>,
    max_attempts: u32,
}

impl<A: CompletionApi> CompletionClient<A> {
    /// Client with the sentence-boundary stop policy and the default
    /// attempt budget.
    pub fn new(api: A) -> Self {
        Self {
            api,
            stop: Box::new(SentenceBoundary),
            max_attempts: MAX_COMPLETION_ATTEMPTS,
        }
    }

    /// Swap in a different stop policy.
    pub fn with_stop_policy(mut self, stop: impl StopPolicy + 'static) -> Self {
        self.stop = Box::new(stop);
        self
    }

    /// Override the attempt budget (including the first call).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Run the prompt to completion.
    ///
    /// Accumulates text and token usage across continuation calls. If any
    /// call fails, the whole completion fails: no partial text is returned.
    /// Hitting the attempt budget with an incomplete chunk is not an error;
    /// the accumulated text is returned as-is.
    pub async fn complete(&self, prompt: &str) -> Result<Completion> {
        let mut messages = vec![ChatMessage::user(prompt)];
        let mut full_text = String::new();
        let mut usage = TokenUsage::default();
        let mut attempts = 0u32;

        loop {
            let outcome = self.api.chat(&messages).await?;
            attempts += 1;
            usage.absorb(outcome.usage);
            full_text.push_str(&outcome.text);

            if self.stop.is_complete(&outcome.text) {
                debug!(attempts, "completion finished");
                break;
            }
            if attempts >= self.max_attempts {
                warn!(attempts, "attempt budget exhausted with incomplete chunk");
                break;
            }

            debug!(attempts, "chunk incomplete, requesting continuation");
            messages = vec![
                ChatMessage::user(prompt),
                ChatMessage::assistant(full_text.clone()),
                ChatMessage::user(CONTINUE_INSTRUCTION),
            ];
        }

        Ok(Completion {
            text: full_text,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }
}
