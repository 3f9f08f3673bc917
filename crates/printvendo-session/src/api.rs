//! Client-facing request/response contracts.
//!
//! These are the structured payloads the kiosk client sees; the key names
//! are part of the wire contract and use camelCase like the mailbox
//! records.

use serde::{Deserialize, Serialize};

use printvendo_types::Amount;

/// Reply to a content submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    /// The submission was accepted and stored.
    pub accepted: bool,
    /// Pre-submission quote in minor units; superseded once the real token
    /// usage is known.
    pub estimated_cost: Amount,
}

/// Reply to a response poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePoll {
    /// Whether the response is available.
    pub ready: bool,
    /// The response text when ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Reply to a payment poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPoll {
    /// True only after this poller consumed the confirmation entry.
    pub paid: bool,
}

/// Reply to a cost query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReport {
    /// Input tokens billed.
    pub input_tokens: u64,
    /// Output tokens billed.
    pub output_tokens: u64,
    /// Final charge in minor units.
    pub final_cost: Amount,
}

/// Reply to an artifact preparation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactOutcome {
    /// The deliverable was written to the mailbox.
    pub accepted: bool,
    /// Machine-scoped id the artifact files are named by.
    pub file_id: String,
    /// Store ids of everything written, in write order.
    pub drive_references: Vec<String>,
    /// Total print charge in minor units.
    pub total_cost: Amount,
}

/// Reply to a session cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutcome {
    /// Mailbox entries deleted.
    pub files_deleted: u32,
}
