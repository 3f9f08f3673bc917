//! The fixed mailbox entry-name vocabulary.
//!
//! Participants communicate exclusively through named entries in the
//! per-machine mailbox folder. The names are case-sensitive and fixed; both
//! the billing terminal and the kiosk client match on them literally.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which payment pair an entry belongs to.
///
/// The AI completion and the print job are billed separately, each with its
/// own request/confirmation entry pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// The AI completion charge.
    Completion,
    /// The print/download charge.
    Print,
}

/// A name in the mailbox vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryName {
    /// `prompt.txt`: the submitted prompt text.
    Prompt,
    /// `response.txt`: the full generated response.
    Response,
    /// `cost_details.json`: the machine-readable cost record.
    CostDetails,
    /// `cost.txt`: the human-readable cost summary shown at the terminal.
    CostSummary,
    /// `Amount_request.txt` / `Amount_print_request.txt`: amount due,
    /// two decimal places.
    PaymentRequest(PaymentKind),
    /// `Amount_paid.txt` / `Amount_print_paid.txt`: sentinel written by the
    /// billing terminal; presence is the signal, content is corroboration.
    PaymentConfirmation(PaymentKind),
    /// A machine-scoped deliverable file, e.g. `file_17_abc.txt`.
    Artifact(String),
}

impl EntryName {
    /// The literal file name in the mailbox folder.
    pub fn file_name(&self) -> &str {
        match self {
            Self::Prompt => "prompt.txt",
            Self::Response => "response.txt",
            Self::CostDetails => "cost_details.json",
            Self::CostSummary => "cost.txt",
            Self::PaymentRequest(PaymentKind::Completion) => "Amount_request.txt",
            Self::PaymentRequest(PaymentKind::Print) => "Amount_print_request.txt",
            Self::PaymentConfirmation(PaymentKind::Completion) => "Amount_paid.txt",
            Self::PaymentConfirmation(PaymentKind::Print) => "Amount_print_paid.txt",
            Self::Artifact(name) => name,
        }
    }

    /// MIME content type used when writing the entry.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::CostDetails => "application/json",
            Self::Artifact(name) if name.ends_with(".pdf") => "application/pdf",
            _ => "text/plain",
        }
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_is_fixed() {
        assert_eq!(EntryName::Prompt.file_name(), "prompt.txt");
        assert_eq!(EntryName::Response.file_name(), "response.txt");
        assert_eq!(EntryName::CostDetails.file_name(), "cost_details.json");
        assert_eq!(EntryName::CostSummary.file_name(), "cost.txt");
        assert_eq!(
            EntryName::PaymentRequest(PaymentKind::Completion).file_name(),
            "Amount_request.txt"
        );
        assert_eq!(
            EntryName::PaymentRequest(PaymentKind::Print).file_name(),
            "Amount_print_request.txt"
        );
        assert_eq!(
            EntryName::PaymentConfirmation(PaymentKind::Completion).file_name(),
            "Amount_paid.txt"
        );
        assert_eq!(
            EntryName::PaymentConfirmation(PaymentKind::Print).file_name(),
            "Amount_print_paid.txt"
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(EntryName::CostDetails.content_type(), "application/json");
        assert_eq!(EntryName::Prompt.content_type(), "text/plain");
        assert_eq!(
            EntryName::Artifact("file_1_x.pdf".into()).content_type(),
            "application/pdf"
        );
        assert_eq!(
            EntryName::Artifact("file_1_x.txt".into()).content_type(),
            "text/plain"
        );
    }
}
