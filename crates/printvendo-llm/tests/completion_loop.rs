//! Behavioural tests for the bounded continuation loop.
//!
//! These live as an integration test (rather than an inline `#[cfg(test)]`
//! module) because they depend on `printvendo-test-utils`, which in turn
//! depends on `printvendo-llm`. An inline unit test would compile against the
//! `cfg(test)` build of this crate while the test double is built against the
//! plain build, so their `CompletionApi`/`ChatMessage` types would not unify.

use printvendo_llm::{ChatMessage, CompletionClient, SentenceBoundary, StopPolicy};
use printvendo_test_utils::ScriptedCompletionApi;
use printvendo_types::constants::CONTINUE_INSTRUCTION;

#[test]
fn test_sentence_boundary() {
    let stop = SentenceBoundary;
    assert!(stop.is_complete("All done."));
    assert!(stop.is_complete("Really?  "));
    assert!(stop.is_complete("Yes!\n"));
    assert!(!stop.is_complete("and then the"));
    assert!(!stop.is_complete("ends with a comma,"));
    assert!(!stop.is_complete(""));
}

#[tokio::test]
async fn test_single_call_completion() {
    let api = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let client = CompletionClient::new(api.clone());

    let completion = client.complete("Summarize this text").await.unwrap();
    assert_eq!(completion.text, "This is a short summary.");
    assert_eq!(completion.input_tokens, 5);
    assert_eq!(completion.output_tokens, 6);
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn test_continuation_replays_context() {
    let api = ScriptedCompletionApi::new()
        .with_reply("The first half, which stops mid", 10, 20)
        .with_reply("way and now concludes.", 35, 8);
    let client = CompletionClient::new(api.clone());

    let completion = client.complete("Tell me a story").await.unwrap();
    assert_eq!(
        completion.text,
        "The first half, which stops midway and now concludes."
    );
    // Usage accumulates across both calls.
    assert_eq!(completion.input_tokens, 45);
    assert_eq!(completion.output_tokens, 28);

    // The second call must replay prompt, accumulated text, continue.
    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    let replay = &calls[1];
    assert_eq!(replay.len(), 3);
    assert_eq!(replay[0], ChatMessage::user("Tell me a story"));
    assert_eq!(
        replay[1],
        ChatMessage::assistant("The first half, which stops mid")
    );
    assert_eq!(replay[2], ChatMessage::user(CONTINUE_INSTRUCTION));
}

#[tokio::test]
async fn test_attempt_budget_caps_continuations() {
    let mut api = ScriptedCompletionApi::new();
    for _ in 0..10 {
        api = api.with_reply("never ending chunk", 1, 1);
    }
    let client = CompletionClient::new(api.clone()).with_max_attempts(3);

    let completion = client.complete("go").await.unwrap();
    assert_eq!(api.calls().len(), 3);
    assert_eq!(completion.output_tokens, 3);
}

#[tokio::test]
async fn test_custom_stop_policy() {
    struct FirstChunkWins;
    impl StopPolicy for FirstChunkWins {
        fn is_complete(&self, _chunk: &str) -> bool {
            true
        }
    }

    let api = ScriptedCompletionApi::new()
        .with_reply("no trailing punctuation", 1, 1)
        .with_reply("never requested", 1, 1);
    let client = CompletionClient::new(api.clone()).with_stop_policy(FirstChunkWins);

    let completion = client.complete("go").await.unwrap();
    assert_eq!(completion.text, "no trailing punctuation");
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn test_midway_failure_returns_nothing() {
    let api = ScriptedCompletionApi::new()
        .with_reply("an incomplete chunk without a", 10, 10)
        .with_failure(503, "service unavailable");
    let client = CompletionClient::new(api.clone());

    let result = client.complete("go").await;
    assert!(result.is_err(), "partial text must not escape");
}
