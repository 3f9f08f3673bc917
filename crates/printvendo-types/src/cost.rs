//! Cost breakdowns and print job records.

use serde::{Deserialize, Serialize};

use crate::session::ColorMode;
use crate::Amount;

/// Token and cost accounting for one completion.
///
/// Serialized as `cost_details.json` in the machine's mailbox; the key names
/// are part of the wire contract with the kiosk client. Exactly one record
/// is authoritative at a time: the latest non-estimate write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDetails {
    /// Input tokens billed.
    pub input_tokens: u64,
    /// Output tokens billed.
    pub output_tokens: u64,
    /// Input-side cost in minor units.
    pub input_cost_minor: Amount,
    /// Output-side cost in minor units.
    pub output_cost_minor: Amount,
    /// Total charge in minor units, rounded up.
    pub final_cost_minor: Amount,
    /// When the record was computed, `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "timestamp")]
    pub computed_at: String,
    /// True for pre-submission estimates; the authoritative record computed
    /// from real usage carries `false`.
    #[serde(default)]
    pub is_estimate: bool,
}

/// A priced print job for an unlocked deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    /// Pages to print (at least one).
    pub page_count: u32,
    /// Color selection.
    pub color_mode: ColorMode,
    /// Rate per page in minor units for the selected mode.
    pub per_page_rate: Amount,
    /// Whether a PDF copy is kept (flat surcharge).
    pub save_pdf_copy: bool,
    /// Total charge in minor units.
    pub total_cost_minor: Amount,
}
