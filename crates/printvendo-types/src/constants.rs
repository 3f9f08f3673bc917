//! System constants: pricing, token estimation, polling, and completion
//! parameters.

use crate::Amount;

// =============================================================================
// Token Estimation
// =============================================================================

/// Average characters per token for prose input.
pub const CHARS_PER_TOKEN_PROSE: u64 = 4;

/// Average characters per token for code-like input (denser tokenization).
pub const CHARS_PER_TOKEN_CODE: u64 = 3;

/// Safety margin applied on top of every token estimate, in percent.
pub const TOKEN_ESTIMATE_MARGIN_PCT: u64 = 5;

// =============================================================================
// Completion Pricing
// =============================================================================

/// USD per 1000 input tokens.
pub const USD_PER_1K_INPUT_TOKENS: f64 = 0.0015;

/// USD per 1000 output tokens.
pub const USD_PER_1K_OUTPUT_TOKENS: f64 = 0.002;

/// Currency conversion rate applied to USD costs.
pub const USD_TO_LOCAL_RATE: f64 = 58.0;

/// Fixed markup multiplier on converted costs.
pub const COST_MARKUP: f64 = 20.0;

/// Minimum input tokens charged for a non-empty prompt.
pub const MIN_CHARGEABLE_INPUT_TOKENS: u64 = 50;

/// Minimum output tokens charged for a non-empty response.
pub const MIN_CHARGEABLE_OUTPUT_TOKENS: u64 = 100;

/// Floor on the final completion charge (coin-denomination granularity).
pub const MIN_COMPLETION_COST: Amount = 500;

// =============================================================================
// Print Pricing
// =============================================================================

/// Per-page rate for monochrome printing.
pub const PAGE_RATE_MONOCHROME: Amount = 300;

/// Per-page rate for color printing.
pub const PAGE_RATE_COLOR: Amount = 500;

/// Flat surcharge for keeping a PDF copy of the deliverable.
pub const PDF_COPY_SURCHARGE: Amount = 200;

/// Characters rendered per printed page.
pub const CHARS_PER_PAGE: u64 = 2000;

// =============================================================================
// Completion Service
// =============================================================================

/// Maximum continuation calls per completion, including the first.
pub const MAX_COMPLETION_ATTEMPTS: u32 = 5;

/// Token ceiling requested per completion call.
pub const COMPLETION_MAX_TOKENS: u32 = 4096;

/// Sampling temperature for completion calls.
pub const COMPLETION_TEMPERATURE: f64 = 0.7;

/// Nucleus sampling parameter for completion calls.
pub const COMPLETION_TOP_P: f64 = 1.0;

/// Frequency penalty for completion calls.
pub const COMPLETION_FREQUENCY_PENALTY: f64 = 0.1;

/// Presence penalty for completion calls.
pub const COMPLETION_PRESENCE_PENALTY: f64 = 0.1;

/// Instruction replayed to the model when a chunk ends mid-sentence.
pub const CONTINUE_INSTRUCTION: &str = "Please continue from where you left off.";

// =============================================================================
// Polling
// =============================================================================

/// Interval between payment and response checks, in milliseconds.
pub const PAYMENT_POLL_INTERVAL_MS: u64 = 250;

/// Interval between document-preview checks, in milliseconds.
pub const PREVIEW_POLL_INTERVAL_MS: u64 = 1000;

/// Upper bound on any single mailbox store operation, in milliseconds.
/// A tick that cannot finish inside this window fails as retryable rather
/// than blocking the poll loop.
pub const STORE_OP_TIMEOUT_MS: u64 = 10_000;
