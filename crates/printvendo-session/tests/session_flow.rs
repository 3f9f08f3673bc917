//! End-to-end session protocol tests against the in-memory doubles.
//!
//! These cover the load-bearing guarantees: idempotent registration,
//! deterministic billing, at-most-once consumption of payment signals,
//! stale-signal rejection, and clean re-registration after cleanup.

use std::sync::Arc;

use printvendo_econ::{completion_cost, PricingTable};
use printvendo_llm::CompletionClient;
use printvendo_session::{InMemorySessionStore, SessionError, SessionManager, SessionStore};
use printvendo_test_utils::{MockMailbox, ScriptedCompletionApi};
use printvendo_types::{
    format_amount, ColorMode, EntryName, MachineId, MachineSession, PaymentKind, SessionState,
};

type TestManager = SessionManager<MockMailbox, ScriptedCompletionApi>;

fn kiosk() -> MachineId {
    MachineId::new("kiosk-07").unwrap()
}

fn manager_over(mailbox: MockMailbox, script: ScriptedCompletionApi) -> Arc<TestManager> {
    Arc::new(SessionManager::new(
        mailbox,
        CompletionClient::new(script),
        Arc::new(InMemorySessionStore::new()),
    ))
}

/// Register, submit, generate, and confirm payment on one machine.
async fn drive_to_awaiting_payment(manager: &TestManager, machine: &MachineId) -> u64 {
    manager.register(machine).await.unwrap();
    manager
        .submit_content(machine, "Summarize this text", None)
        .await
        .unwrap();
    manager.generate_response(machine).await.unwrap();
    manager
        .request_payment(machine, PaymentKind::Completion)
        .await
        .unwrap()
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_unknown_machine_fails() {
    let manager = manager_over(MockMailbox::new(), ScriptedCompletionApi::new());
    let result = manager.register(&kiosk()).await;
    assert!(matches!(result, Err(SessionError::UnknownMachine(_))));
    assert_eq!(manager.session_state(&kiosk()), SessionState::Unregistered);
}

#[tokio::test]
async fn test_register_is_idempotent() {
    let machine = kiosk();
    let manager = manager_over(MockMailbox::with_machine(&machine), ScriptedCompletionApi::new());

    assert_eq!(
        manager.register(&machine).await.unwrap(),
        SessionState::Registered
    );
    assert_eq!(
        manager.register(&machine).await.unwrap(),
        SessionState::Registered
    );

    // Re-registering mid-session reports the current state and changes
    // nothing.
    manager
        .submit_content(&machine, "Summarize this text", None)
        .await
        .unwrap();
    assert_eq!(
        manager.register(&machine).await.unwrap(),
        SessionState::ContentSubmitted
    );
    assert_eq!(
        manager.session(&machine).unwrap().prompt.as_deref(),
        Some("Summarize this text")
    );
}

// =============================================================================
// Submission & Generation
// =============================================================================

#[tokio::test]
async fn test_submit_requires_registration() {
    let machine = kiosk();
    let manager = manager_over(MockMailbox::with_machine(&machine), ScriptedCompletionApi::new());
    let result = manager.submit_content(&machine, "hello", None).await;
    assert!(matches!(result, Err(SessionError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_submit_rejects_empty_prompt() {
    let machine = kiosk();
    let manager = manager_over(MockMailbox::with_machine(&machine), ScriptedCompletionApi::new());
    manager.register(&machine).await.unwrap();

    let result = manager.submit_content(&machine, "   \n ", None).await;
    assert!(matches!(result, Err(SessionError::Validation(_))));
    assert_eq!(manager.session_state(&machine), SessionState::Registered);
}

#[tokio::test]
async fn test_submit_appends_document_text() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let manager = manager_over(mailbox.clone(), ScriptedCompletionApi::new());
    manager.register(&machine).await.unwrap();

    manager
        .submit_content(&machine, "Review this contract", Some("WHEREAS the parties..."))
        .await
        .unwrap();

    let stored = mailbox.entry_bytes(&machine, &EntryName::Prompt).unwrap();
    assert_eq!(
        String::from_utf8(stored).unwrap(),
        "Review this contract\n\nWHEREAS the parties..."
    );
}

#[tokio::test]
async fn test_round_trip_scripted_generation() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);

    manager.register(&machine).await.unwrap();
    let submit = manager
        .submit_content(&machine, "Summarize this text", None)
        .await
        .unwrap();
    assert!(submit.accepted);
    assert!(submit.estimated_cost > 0);
    assert_eq!(manager.session_state(&machine), SessionState::ContentSubmitted);

    let report = manager.generate_response(&machine).await.unwrap();
    assert_eq!(report.input_tokens, 5);
    assert_eq!(report.output_tokens, 6);

    // The authoritative charge is re-derivable from the real usage.
    let expected = completion_cost(5, 6, &PricingTable::default());
    assert_eq!(report.final_cost, expected.final_cost_minor);
    assert_eq!(manager.session_state(&machine), SessionState::CostPublished);

    // The mailbox carries the response and the non-estimate cost record.
    let response = mailbox.entry_bytes(&machine, &EntryName::Response).unwrap();
    assert_eq!(String::from_utf8(response).unwrap(), "This is a short summary.");

    let cost_json = mailbox.entry_bytes(&machine, &EntryName::CostDetails).unwrap();
    let record: serde_json::Value = serde_json::from_slice(&cost_json).unwrap();
    assert_eq!(record["isEstimate"], false);
    assert_eq!(record["inputTokens"], 5);
    assert_eq!(record["finalCostMinor"], expected.final_cost_minor);

    // The read-back endpoints agree.
    let poll = manager.poll_response(&machine).await.unwrap();
    assert!(poll.ready);
    assert_eq!(poll.text.as_deref(), Some("This is a short summary."));
    let cost = manager.get_cost_details(&machine).await.unwrap().unwrap();
    assert_eq!(cost.final_cost, expected.final_cost_minor);
}

#[tokio::test]
async fn test_generation_is_reproducible() {
    // Two machines, identical prompt and scripted usage: identical charge.
    let mut finals = Vec::new();
    for name in ["kiosk-07", "kiosk-08"] {
        let machine = MachineId::new(name).unwrap();
        let mailbox = MockMailbox::with_machine(&machine);
        let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
        let manager = manager_over(mailbox, script);
        manager.register(&machine).await.unwrap();
        manager
            .submit_content(&machine, "Summarize this text", None)
            .await
            .unwrap();
        finals.push(manager.generate_response(&machine).await.unwrap().final_cost);
    }
    assert_eq!(finals[0], finals[1]);
}

#[tokio::test]
async fn test_second_generation_short_circuits() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("Done.", 5, 2);
    let manager = manager_over(mailbox, script);

    manager.register(&machine).await.unwrap();
    manager
        .submit_content(&machine, "Summarize this text", None)
        .await
        .unwrap();

    let first = manager.generate_response(&machine).await.unwrap();
    let second = manager.generate_response(&machine).await;
    assert!(matches!(
        second,
        Err(SessionError::InvalidTransition { .. })
    ));

    // The single charge stands.
    let cost = manager.get_cost_details(&machine).await.unwrap().unwrap();
    assert_eq!(cost.final_cost, first.final_cost);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_generation_bills_once() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    // One scripted reply: if both callers reached the service, the second
    // would fail on an exhausted script rather than short-circuit.
    let script = ScriptedCompletionApi::new().with_reply("Done.", 5, 2);
    let manager = manager_over(mailbox, script.clone());

    manager.register(&machine).await.unwrap();
    manager
        .submit_content(&machine, "Summarize this text", None)
        .await
        .unwrap();

    let a = tokio::spawn({
        let manager = Arc::clone(&manager);
        let machine = machine.clone();
        async move { manager.generate_response(&machine).await }
    });
    let b = tokio::spawn({
        let manager = Arc::clone(&manager);
        let machine = machine.clone();
        async move { manager.generate_response(&machine).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok_count, 1, "exactly one caller may generate");
    assert_eq!(script.calls().len(), 1, "the service was hit exactly once");
    assert_eq!(manager.session_state(&machine), SessionState::CostPublished);
}

#[tokio::test]
async fn test_failed_generation_rolls_back_for_retry() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new()
        .with_failure(503, "service unavailable")
        .with_reply("Recovered fine.", 5, 3);
    let manager = manager_over(mailbox.clone(), script);

    manager.register(&machine).await.unwrap();
    manager
        .submit_content(&machine, "Summarize this text", None)
        .await
        .unwrap();

    let first = manager.generate_response(&machine).await;
    assert!(matches!(first, Err(SessionError::Upstream(_))));
    // No partial response was published and the session may retry.
    assert_eq!(manager.session_state(&machine), SessionState::ContentSubmitted);
    assert!(!mailbox.has_entry(&machine, &EntryName::Response));

    let second = manager.generate_response(&machine).await.unwrap();
    assert_eq!(second.output_tokens, 3);
    assert_eq!(manager.session_state(&machine), SessionState::CostPublished);
}

// =============================================================================
// Payment
// =============================================================================

#[tokio::test]
async fn test_payment_request_publishes_exact_amount() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);

    let amount = drive_to_awaiting_payment(&manager, &machine).await;
    assert_eq!(manager.session_state(&machine), SessionState::AwaitingPayment);

    let request = mailbox
        .entry_bytes(&machine, &EntryName::PaymentRequest(PaymentKind::Completion))
        .unwrap();
    assert_eq!(String::from_utf8(request).unwrap(), format_amount(amount));
}

#[tokio::test]
async fn test_confirmation_unlocks_and_is_consumed() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);

    drive_to_awaiting_payment(&manager, &machine).await;

    // Not yet paid.
    let poll = manager
        .poll_for_payment(&machine, PaymentKind::Completion)
        .await
        .unwrap();
    assert!(!poll.paid);

    // The terminal drops the confirmation sentinel.
    let confirmation = EntryName::PaymentConfirmation(PaymentKind::Completion);
    mailbox.plant_entry(&machine, &confirmation, b"");

    let poll = manager
        .poll_for_payment(&machine, PaymentKind::Completion)
        .await
        .unwrap();
    assert!(poll.paid);
    assert_eq!(manager.session_state(&machine), SessionState::Unlocked);
    // Consumed: the sentinel is gone.
    assert!(!mailbox.has_entry(&machine, &confirmation));

    // Re-entry after a client reload stays unlocked.
    let again = manager
        .poll_for_payment(&machine, PaymentKind::Completion)
        .await
        .unwrap();
    assert!(again.paid);
}

#[tokio::test]
async fn test_confirmation_with_matching_amount_content() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);

    let amount = drive_to_awaiting_payment(&manager, &machine).await;
    mailbox.plant_entry(
        &machine,
        &EntryName::PaymentConfirmation(PaymentKind::Completion),
        format_amount(amount).as_bytes(),
    );

    let poll = manager
        .poll_for_payment(&machine, PaymentKind::Completion)
        .await
        .unwrap();
    assert!(poll.paid);
}

#[tokio::test]
async fn test_confirmation_amount_mismatch_is_stale() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);

    drive_to_awaiting_payment(&manager, &machine).await;
    let confirmation = EntryName::PaymentConfirmation(PaymentKind::Completion);
    mailbox.plant_entry(&machine, &confirmation, b"0.01");

    let result = manager
        .poll_for_payment(&machine, PaymentKind::Completion)
        .await;
    assert!(matches!(result, Err(SessionError::StaleSignal(_))));
    // Rejected signals are never consumed and never unlock.
    assert!(mailbox.has_entry(&machine, &confirmation));
    assert_eq!(manager.session_state(&machine), SessionState::AwaitingPayment);
}

#[tokio::test]
async fn test_confirmation_without_request_is_stale() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let manager = manager_over(mailbox.clone(), ScriptedCompletionApi::new());

    manager.register(&machine).await.unwrap();
    let confirmation = EntryName::PaymentConfirmation(PaymentKind::Completion);
    mailbox.plant_entry(&machine, &confirmation, b"");

    let result = manager
        .poll_for_payment(&machine, PaymentKind::Completion)
        .await;
    assert!(matches!(result, Err(SessionError::StaleSignal(_))));
    assert!(mailbox.has_entry(&machine, &confirmation));
    assert_eq!(manager.session_state(&machine), SessionState::Registered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_race_exactly_one_consumer_wins() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let store = Arc::new(InMemorySessionStore::new());

    // An unlocked session with a prepared print job: print polls report
    // paid only on a won delete, so every winner is a consumption event.
    let mut session = MachineSession::registered(machine.clone());
    session.state = SessionState::Unlocked;
    session.payment_requests.record(PaymentKind::Print, 900);
    store.put(session);

    let manager: Arc<TestManager> = Arc::new(SessionManager::new(
        mailbox.clone(),
        CompletionClient::new(ScriptedCompletionApi::new()),
        store,
    ));

    let confirmation = EntryName::PaymentConfirmation(PaymentKind::Print);
    mailbox.plant_entry(&machine, &confirmation, b"");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        let machine = machine.clone();
        handles.push(tokio::spawn(async move {
            manager.poll_for_payment(&machine, PaymentKind::Print).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        let poll = handle.await.unwrap().unwrap();
        if poll.paid {
            winners += 1;
        }
    }

    assert_eq!(winners, 1, "exactly one poller may consume the confirmation");
    assert!(!mailbox.has_entry(&machine, &confirmation));
}

#[tokio::test]
async fn test_legacy_blanked_request_convention() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);

    drive_to_awaiting_payment(&manager, &machine).await;

    // A freshly published request carries the amount: not satisfied.
    assert!(!manager
        .legacy_payment_satisfied(&machine, PaymentKind::Completion)
        .await
        .unwrap());

    // The old terminal firmware blanks the request file on payment.
    mailbox.plant_entry(
        &machine,
        &EntryName::PaymentRequest(PaymentKind::Completion),
        b"  \n",
    );
    assert!(manager
        .legacy_payment_satisfied(&machine, PaymentKind::Completion)
        .await
        .unwrap());
    // Observation only: the state machine did not move.
    assert_eq!(manager.session_state(&machine), SessionState::AwaitingPayment);
}

// =============================================================================
// Deliverable
// =============================================================================

async fn drive_to_unlocked(manager: &TestManager, machine: &MachineId, mailbox: &MockMailbox) {
    drive_to_awaiting_payment(manager, machine).await;
    mailbox.plant_entry(
        machine,
        &EntryName::PaymentConfirmation(PaymentKind::Completion),
        b"",
    );
    let poll = manager
        .poll_for_payment(machine, PaymentKind::Completion)
        .await
        .unwrap();
    assert!(poll.paid);
}

#[tokio::test]
async fn test_prepare_artifact_requires_unlock() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox, script);

    drive_to_awaiting_payment(&manager, &machine).await;
    let result = manager
        .prepare_artifact(&machine, "content", ColorMode::Monochrome, false, None)
        .await;
    assert!(matches!(result, Err(SessionError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_prepare_artifact_writes_deliverable_and_print_request() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);
    drive_to_unlocked(&manager, &machine, &mailbox).await;

    let content = "z".repeat(4500); // 3 pages
    let outcome = manager
        .prepare_artifact(&machine, &content, ColorMode::Color, true, Some(b"%PDF-1.4"))
        .await
        .unwrap();

    assert!(outcome.accepted);
    // 3 pages x 500 + 200 PDF surcharge
    assert_eq!(outcome.total_cost, 1700);
    // content, pdf, cost summary, print request
    assert_eq!(outcome.drive_references.len(), 4);

    let txt = EntryName::Artifact(format!("{}.txt", outcome.file_id));
    let pdf = EntryName::Artifact(format!("{}.pdf", outcome.file_id));
    assert!(mailbox.has_entry(&machine, &txt));
    assert!(mailbox.has_entry(&machine, &pdf));
    assert!(mailbox.has_entry(&machine, &EntryName::CostSummary));

    let request = mailbox
        .entry_bytes(&machine, &EntryName::PaymentRequest(PaymentKind::Print))
        .unwrap();
    assert_eq!(String::from_utf8(request).unwrap(), "17.00");

    let job = manager.session(&machine).unwrap().print_job.unwrap();
    assert_eq!(job.page_count, 3);
    assert_eq!(job.total_cost_minor, 1700);

    // The print confirmation completes the flow.
    mailbox.plant_entry(
        &machine,
        &EntryName::PaymentConfirmation(PaymentKind::Print),
        b"17.00",
    );
    let poll = manager
        .poll_for_payment(&machine, PaymentKind::Print)
        .await
        .unwrap();
    assert!(poll.paid);
}

// =============================================================================
// Cleanup
// =============================================================================

#[tokio::test]
async fn test_cleanup_then_register_leaves_no_residue() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let script = ScriptedCompletionApi::new().with_reply("This is a short summary.", 5, 6);
    let manager = manager_over(mailbox.clone(), script);
    drive_to_unlocked(&manager, &machine, &mailbox).await;

    let cleanup = manager.cleanup_session(&machine).await.unwrap();
    assert!(cleanup.files_deleted > 0);
    assert_eq!(mailbox.entry_count(&machine), 0);
    assert_eq!(manager.session_state(&machine), SessionState::Unregistered);

    // A fresh registration starts from nothing.
    assert_eq!(
        manager.register(&machine).await.unwrap(),
        SessionState::Registered
    );
    let session = manager.session(&machine).unwrap();
    assert!(session.prompt.is_none());
    assert!(session.response.is_none());
    assert!(session.cost.is_none());
    assert!(manager.get_prompt(&machine).await.unwrap().is_none());
    assert!(manager.get_cost_details(&machine).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cleanup_is_valid_from_any_state() {
    let machine = kiosk();
    let mailbox = MockMailbox::with_machine(&machine);
    let manager = manager_over(mailbox.clone(), ScriptedCompletionApi::new());

    // No session at all: still valid, nothing to delete.
    let cleanup = manager.cleanup_session(&machine).await.unwrap();
    assert_eq!(cleanup.files_deleted, 0);

    // Mid-session cleanup wipes the mailbox.
    manager.register(&machine).await.unwrap();
    manager
        .submit_content(&machine, "Summarize this text", None)
        .await
        .unwrap();
    assert!(mailbox.entry_count(&machine) > 0);
    let cleanup = manager.cleanup_session(&machine).await.unwrap();
    assert!(cleanup.files_deleted > 0);
    assert_eq!(mailbox.entry_count(&machine), 0);
}
