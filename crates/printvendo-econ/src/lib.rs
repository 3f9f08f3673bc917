//! Cost and token accounting engine for the PrintVendo kiosk backend.
//!
//! Everything in this crate is a pure function of its inputs: no I/O, no
//! clock reads, no global state. Given identical inputs the engine always
//! produces identical results, which is what lets the authoritative billing
//! record be re-derived from stored token counts at any time.
//!
//! - [`tokens`] - token estimation from raw text
//! - [`pricing`] - completion pricing from token counts
//! - [`print`] - page counting and print pricing
//!
//! The authoritative cost for billing is always computed from the *real*
//! token usage reported by the completion service; pre-submission estimates
//! exist only to show the user a quote and are overridden afterwards.

pub mod pricing;
pub mod print;
pub mod tokens;

pub use pricing::{completion_cost, estimate_submission, CostBreakdown, Model, PricingTable};
pub use print::{page_count, per_page_rate, print_cost};
pub use tokens::{estimate_tokens, project_output_tokens};
