//! Data structures for the PrintVendo kiosk backend.
//!
//! This crate provides the data types shared across the PrintVendo crates.
//! It contains no business logic, only type definitions with serialization
//! support.
//!
//! # Module Organization
//!
//! - [`machine`] - Validated machine identifiers
//! - [`session`] - Session state and per-machine session records
//! - [`cost`] - Cost breakdowns and print job records
//! - [`entry`] - The fixed mailbox entry-name vocabulary
//! - [`constants`] - Pricing, polling, and completion constants
//! - [`error`] - The shared error taxonomy
//!
//! # Type Conventions
//!
//! - Derive `Debug`, `Clone`, `PartialEq`, `Eq` where appropriate
//! - Derive `Copy` for small types (enums, simple structs)
//! - Derive `Serialize`, `Deserialize` for everything that crosses the
//!   mailbox or the client boundary
//! - Mailbox payloads use `#[serde(rename_all = "camelCase")]` so the files
//!   stay readable by the existing kiosk clients

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod cost;
pub mod entry;
pub mod error;
pub mod machine;
pub mod session;

// Re-export all public types at the crate root for convenience

pub use constants::*;
pub use cost::{CostDetails, PrintJob};
pub use entry::{EntryName, PaymentKind};
pub use error::{Result, VendoError};
pub use machine::MachineId;
pub use session::{ColorMode, MachineSession, PaymentRequests, SessionState};

/// Amount in minor currency units (centavos).
///
/// This is the standard type for all monetary values in the system.
/// One peso equals 100 centavos; integer arithmetic only.
pub type Amount = u64;

/// Render an [`Amount`] as a two-decimal currency string.
///
/// This is the exact format the billing terminal expects inside the
/// payment-request mailbox entries, e.g. `1250` centavos -> `"12.50"`.
pub fn format_amount(amount: Amount) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}

/// Parse a currency string back into minor units.
///
/// Accepts up to two decimal places (`"12"`, `"12.5"`, `"12.50"`); anything
/// else is `None`. Used to corroborate amounts found in mailbox entries.
pub fn parse_amount(text: &str) -> Option<Amount> {
    let text = text.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };
    if whole.is_empty() || frac.len() > 2 {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: Amount = whole.parse().ok()?;
    let frac_minor: Amount = match frac.len() {
        0 => 0,
        1 => frac.parse::<Amount>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    Some(whole * 100 + frac_minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(100), "1.00");
        assert_eq!(format_amount(1250), "12.50");
        assert_eq!(format_amount(30_007), "300.07");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.50"), Some(1250));
        assert_eq!(parse_amount("12.5"), Some(1250));
        assert_eq!(parse_amount("12"), Some(1200));
        assert_eq!(parse_amount(" 5.00 \n"), Some(500));
        assert_eq!(parse_amount("0.07"), Some(7));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("."), None);
        assert_eq!(parse_amount("12.505"), None);
        assert_eq!(parse_amount("-3"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_amount_round_trips() {
        for amount in [0, 5, 99, 100, 1250, 987_654] {
            assert_eq!(parse_amount(&format_amount(amount)), Some(amount));
        }
    }
}
