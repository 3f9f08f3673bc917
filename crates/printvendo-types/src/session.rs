//! Session state and per-machine session records.

use serde::{Deserialize, Serialize};

use crate::cost::{CostDetails, PrintJob};
use crate::entry::PaymentKind;
use crate::machine::MachineId;
use crate::Amount;

/// Lifecycle of a machine session.
///
/// States only advance forward; the single exception is cleanup, which
/// resets a session to [`SessionState::Unregistered`] from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session exists for the machine (initial, and post-cleanup).
    Unregistered,
    /// The machine id was validated against the mailbox store.
    Registered,
    /// A prompt (and/or extracted document text) was written to the mailbox.
    ContentSubmitted,
    /// A completion request is in flight.
    AwaitingAiResponse,
    /// The full response was produced but not yet priced.
    ResponseReady,
    /// The authoritative cost record was written to the mailbox.
    CostPublished,
    /// A payment request is published; waiting on the billing terminal.
    AwaitingPayment,
    /// The confirmation entry was consumed by this session.
    PaymentConfirmed,
    /// The deliverable may be printed or downloaded.
    Unlocked,
    /// The mailbox was purged; terminal, equivalent to `Unregistered`.
    Cleaned,
}

impl SessionState {
    /// Whether the session accepts content submission.
    pub fn can_submit(&self) -> bool {
        matches!(self, Self::Registered)
    }

    /// Whether the session accepts a generation request.
    pub fn can_generate(&self) -> bool {
        matches!(self, Self::ContentSubmitted)
    }

    /// Whether the session accepts a payment request.
    pub fn can_request_payment(&self) -> bool {
        matches!(self, Self::CostPublished)
    }

    /// Whether the session is waiting on a payment confirmation.
    pub fn awaiting_payment(&self) -> bool {
        matches!(self, Self::AwaitingPayment)
    }

    /// Whether the deliverable is unlocked.
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked)
    }

    /// Whether this state doubles as the initial state.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Unregistered | Self::Cleaned)
    }
}

/// Amounts this session has published payment requests for.
///
/// A confirmation entry is only honored when the matching request was
/// published by this session; anything else is a stale signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequests {
    /// Amount requested for the AI completion, if any.
    pub completion: Option<Amount>,
    /// Amount requested for the print job, if any.
    pub print: Option<Amount>,
}

impl PaymentRequests {
    /// The amount requested for a payment kind, if a request was published.
    pub fn amount(&self, kind: PaymentKind) -> Option<Amount> {
        match kind {
            PaymentKind::Completion => self.completion,
            PaymentKind::Print => self.print,
        }
    }

    /// Record a published request.
    pub fn record(&mut self, kind: PaymentKind, amount: Amount) {
        match kind {
            PaymentKind::Completion => self.completion = Some(amount),
            PaymentKind::Print => self.print = Some(amount),
        }
    }
}

/// One kiosk's session record, keyed by machine id.
///
/// Prompt and response content mirror what is durably held in the mailbox;
/// the mailbox remains authoritative and re-reads must stay idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSession {
    /// The mailbox partition key.
    pub machine_id: MachineId,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Submitted prompt text, if any.
    pub prompt: Option<String>,
    /// Generated response text, if any.
    pub response: Option<String>,
    /// Latest cost record; the last write wins.
    pub cost: Option<CostDetails>,
    /// Print job details once a deliverable was prepared.
    pub print_job: Option<PrintJob>,
    /// Payment requests published by this session.
    pub payment_requests: PaymentRequests,
}

impl MachineSession {
    /// Create a fresh session in [`SessionState::Registered`].
    pub fn registered(machine_id: MachineId) -> Self {
        Self {
            machine_id,
            state: SessionState::Registered,
            prompt: None,
            response: None,
            cost: None,
            print_job: None,
            payment_requests: PaymentRequests::default(),
        }
    }

    /// Reset everything except the machine id, as cleanup does.
    pub fn reset(&mut self) {
        self.state = SessionState::Unregistered;
        self.prompt = None;
        self.response = None;
        self.cost = None;
        self.print_job = None;
        self.payment_requests = PaymentRequests::default();
    }
}

/// Print color selection, priced per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Black and white.
    Monochrome,
    /// Full color.
    Color,
}
