//! Completion pricing from token counts.
//!
//! The pipeline is: per-model USD rates per 1000 tokens, currency
//! conversion, fixed markup, then a round **up** to the next whole minor
//! unit. Minimum token floors and a minimum total keep charges above what
//! the coin terminal can actually collect.

use serde::{Deserialize, Serialize};

use printvendo_types::constants::{
    COST_MARKUP, MIN_CHARGEABLE_INPUT_TOKENS, MIN_CHARGEABLE_OUTPUT_TOKENS, MIN_COMPLETION_COST,
    USD_PER_1K_INPUT_TOKENS, USD_PER_1K_OUTPUT_TOKENS, USD_TO_LOCAL_RATE,
};
use printvendo_types::{Amount, CostDetails};

use crate::tokens::{estimate_tokens, project_output_tokens};

/// Completion model classes with distinct per-1000-token rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    /// Baseline chat model.
    Gpt35Turbo,
    /// Mid-tier model, 1.5x baseline rates.
    Gpt4,
    /// Top-tier model, 2x baseline rates.
    Gpt45,
}

impl Model {
    /// USD per 1000 input tokens for this model.
    pub fn usd_per_1k_input(&self) -> f64 {
        USD_PER_1K_INPUT_TOKENS * self.rate_factor()
    }

    /// USD per 1000 output tokens for this model.
    pub fn usd_per_1k_output(&self) -> f64 {
        USD_PER_1K_OUTPUT_TOKENS * self.rate_factor()
    }

    /// Rate advertised on the kiosk pricing board, minor units per 100
    /// tokens.
    pub fn posted_rate_per_100_tokens(&self) -> Amount {
        match self {
            Self::Gpt35Turbo => 2400,
            Self::Gpt4 => 3600,
            Self::Gpt45 => 4800,
        }
    }

    fn rate_factor(&self) -> f64 {
        match self {
            Self::Gpt35Turbo => 1.0,
            Self::Gpt4 => 1.5,
            Self::Gpt45 => 2.0,
        }
    }
}

/// Pricing parameters, tunable per deployment without recompiling.
#[derive(Debug, Clone)]
pub struct PricingTable {
    /// Model whose per-token rates apply.
    pub model: Model,
    /// USD -> local currency conversion rate.
    pub fx_rate: f64,
    /// Markup multiplier applied after conversion.
    pub markup: f64,
    /// Minimum input tokens billed when any input exists.
    pub min_input_tokens: u64,
    /// Minimum output tokens billed when any output exists.
    pub min_output_tokens: u64,
    /// Floor on the final charge, minor units.
    pub min_total: Amount,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            model: Model::Gpt35Turbo,
            fx_rate: USD_TO_LOCAL_RATE,
            markup: COST_MARKUP,
            min_input_tokens: MIN_CHARGEABLE_INPUT_TOKENS,
            min_output_tokens: MIN_CHARGEABLE_OUTPUT_TOKENS,
            min_total: MIN_COMPLETION_COST,
        }
    }
}

impl PricingTable {
    /// Use a different model's rates.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Override the conversion rate.
    pub fn with_fx_rate(mut self, fx_rate: f64) -> Self {
        self.fx_rate = fx_rate;
        self
    }

    /// Override the markup multiplier.
    pub fn with_markup(mut self, markup: f64) -> Self {
        self.markup = markup;
        self
    }
}

/// One computed cost, before it becomes a mailbox record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostBreakdown {
    /// Input tokens the charge was computed from.
    pub input_tokens: u64,
    /// Output tokens the charge was computed from.
    pub output_tokens: u64,
    /// Input-side cost, minor units.
    pub input_cost_minor: Amount,
    /// Output-side cost, minor units.
    pub output_cost_minor: Amount,
    /// Final charge, minor units; `>= ceil(input + output)` always.
    pub final_cost_minor: Amount,
}

impl CostBreakdown {
    /// Convert into the mailbox record form.
    pub fn to_details(&self, computed_at: String, is_estimate: bool) -> CostDetails {
        CostDetails {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            input_cost_minor: self.input_cost_minor,
            output_cost_minor: self.output_cost_minor,
            final_cost_minor: self.final_cost_minor,
            computed_at,
            is_estimate,
        }
    }
}

/// Price a completion from token counts.
///
/// Deterministic: identical inputs always produce the identical
/// `final_cost_minor`. The recorded token counts are the raw ones; the
/// minimum floors affect only the charge.
pub fn completion_cost(input_tokens: u64, output_tokens: u64, table: &PricingTable) -> CostBreakdown {
    let billed_input = effective_tokens(input_tokens, table.min_input_tokens);
    let billed_output = effective_tokens(output_tokens, table.min_output_tokens);

    let input_usd = billed_input as f64 / 1000.0 * table.model.usd_per_1k_input();
    let output_usd = billed_output as f64 / 1000.0 * table.model.usd_per_1k_output();

    let input_cost_minor = to_minor(input_usd, table);
    let output_cost_minor = to_minor(output_usd, table);

    // Round the exact total up, never the pre-rounded legs, so the ceil
    // lower bound holds even when both legs rounded down. Quantize to a
    // micro-unit first: f64 residue like 6380.000000000001 must not ceil
    // into an extra centavo.
    let total_minor_exact = (input_usd + output_usd) * table.fx_rate * table.markup * 100.0;
    let quantized = (total_minor_exact * 1e6).round() / 1e6;
    let final_cost_minor = (quantized.ceil() as Amount)
        .max(input_cost_minor + output_cost_minor)
        .max(table.min_total);

    CostBreakdown {
        input_tokens,
        output_tokens,
        input_cost_minor,
        output_cost_minor,
        final_cost_minor,
    }
}

/// Quote a submission before any tokens are spent.
///
/// Estimates input tokens from the prompt text and projects output tokens;
/// the result is marked as an estimate downstream and superseded by the
/// post-completion authoritative cost.
pub fn estimate_submission(prompt: &str, table: &PricingTable) -> CostBreakdown {
    let input_tokens = estimate_tokens(prompt);
    let output_tokens = project_output_tokens(input_tokens);
    completion_cost(input_tokens, output_tokens, table)
}

fn effective_tokens(tokens: u64, floor: u64) -> u64 {
    if tokens == 0 {
        0
    } else {
        tokens.max(floor)
    }
}

fn to_minor(usd: f64, table: &PricingTable) -> Amount {
    (usd * table.fx_rate * table.markup * 100.0).round() as Amount
}
