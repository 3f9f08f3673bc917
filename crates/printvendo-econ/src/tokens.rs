//! Token estimation from raw text.
//!
//! The completion service reports exact token usage after the fact; these
//! estimates exist so a quote can be shown before anything is billed. They
//! deliberately overshoot a little: underestimating a quote is worse than
//! overestimating it at an unattended terminal.

use printvendo_types::constants::{
    CHARS_PER_TOKEN_CODE, CHARS_PER_TOKEN_PROSE, TOKEN_ESTIMATE_MARGIN_PCT,
};

/// Characters that suggest code-like content.
const CODE_INDICATORS: &[char] = &[
    '{', '}', '[', ']', '(', ')', '=', '>', '<', ';', ':', '"', '`', '\'',
];

/// Approximate the token count of `text`.
///
/// Prose averages about four characters per token; code-like text with many
/// structural characters tokenizes denser, around three. A fixed 5% safety
/// margin is applied on top, and the result is always rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }

    let chars = text.chars().count() as u64;
    let chars_per_token = if looks_like_code(text) {
        CHARS_PER_TOKEN_CODE
    } else {
        CHARS_PER_TOKEN_PROSE
    };

    let base = chars.div_ceil(chars_per_token);
    // +5%, rounded up
    (base * (100 + TOKEN_ESTIMATE_MARGIN_PCT)).div_ceil(100)
}

/// Project output tokens from an input-token estimate.
///
/// Short prompts tend to draw verbose responses; very long prompts draw
/// proportionally concise ones. Tiers: <100 tokens x3, <500 x2.5,
/// <1000 x2, otherwise x1.5.
pub fn project_output_tokens(input_tokens: u64) -> u64 {
    // Multipliers scaled by 2 to stay in integer arithmetic.
    let doubled = match input_tokens {
        0..=99 => 6,
        100..=499 => 5,
        500..=999 => 4,
        _ => 3,
    };
    (input_tokens * doubled).div_ceil(2)
}

/// Heuristic: the text contains structural characters, and splitting on them
/// produces noticeably more fragments than a tenth of the word count.
fn looks_like_code(text: &str) -> bool {
    if !text.contains(CODE_INDICATORS) {
        return false;
    }
    let words = text.split_whitespace().count();
    let fragments = text.split(CODE_INDICATORS).count();
    fragments * 10 > words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero_tokens() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_prose_uses_four_chars_per_token() {
        // 40 chars of plain prose -> 10 tokens -> 11 after the 5% margin.
        let text = "the quick brown fox jumps over lazy dog ";
        assert_eq!(text.chars().count(), 40);
        assert_eq!(estimate_tokens(text), 11);
    }

    #[test]
    fn test_code_uses_three_chars_per_token() {
        let code = "fn main() { println!(\"hello\"); }";
        let prose_equivalent = "fn main   println   hello      a";
        assert!(estimate_tokens(code) > estimate_tokens(prose_equivalent));
    }

    #[test]
    fn test_margin_rounds_up() {
        // 4 chars -> 1 base token -> 1.05 -> 2 after ceil.
        assert_eq!(estimate_tokens("abcd"), 2);
    }

    #[test]
    fn test_short_prompt_region() {
        // A 19-char prompt lands around ceil(19/4) * 1.05 = 6 tokens.
        let tokens = estimate_tokens("Summarize this text");
        assert!(tokens > 0);
        assert!((5..=7).contains(&tokens), "got {tokens}");
    }

    #[test]
    fn test_output_projection_tiers() {
        assert_eq!(project_output_tokens(10), 30);
        assert_eq!(project_output_tokens(99), 297);
        assert_eq!(project_output_tokens(100), 250);
        assert_eq!(project_output_tokens(500), 1000);
        assert_eq!(project_output_tokens(1000), 1500);
        assert_eq!(project_output_tokens(2001), 3002);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let text = "Explain how a vending machine makes change.";
        assert_eq!(estimate_tokens(text), estimate_tokens(text));
    }
}
