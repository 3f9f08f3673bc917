//! Scripted implementation of the `CompletionApi` trait for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use printvendo_llm::{ChatMessage, ChatOutcome, CompletionApi, CompletionError, TokenUsage};

#[derive(Debug, Clone)]
enum ScriptedReply {
    Reply {
        text: String,
        input_tokens: u64,
        output_tokens: u64,
    },
    Failure {
        status: u16,
        message: String,
    },
}

#[derive(Debug, Default)]
struct ScriptedInner {
    replies: VecDeque<ScriptedReply>,
    calls: Vec<Vec<ChatMessage>>,
}

/// A completion service that plays back a scripted sequence of replies and
/// records every conversation it was sent.
///
/// Clones share state, so a test can keep a handle for assertions while the
/// client under test owns another.
#[derive(Clone, Default)]
pub struct ScriptedCompletionApi {
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedCompletionApi {
    /// Empty script; any call fails until replies are queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply with its reported usage.
    pub fn with_reply(self, text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        self.inner
            .lock()
            .unwrap()
            .replies
            .push_back(ScriptedReply::Reply {
                text: text.into(),
                input_tokens,
                output_tokens,
            });
        self
    }

    /// Queue an API failure.
    pub fn with_failure(self, status: u16, message: impl Into<String>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .replies
            .push_back(ScriptedReply::Failure {
                status,
                message: message.into(),
            });
        self
    }

    /// Every conversation sent so far, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.inner.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl CompletionApi for ScriptedCompletionApi {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatOutcome, CompletionError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(messages.to_vec());

        match inner.replies.pop_front() {
            Some(ScriptedReply::Reply {
                text,
                input_tokens,
                output_tokens,
            }) => Ok(ChatOutcome {
                text,
                usage: TokenUsage {
                    input_tokens,
                    output_tokens,
                },
            }),
            Some(ScriptedReply::Failure { status, message }) => {
                Err(CompletionError::Api { status, message })
            }
            None => Err(CompletionError::Malformed(
                "scripted replies exhausted".into(),
            )),
        }
    }
}
