//! Page counting and print pricing.

use printvendo_types::constants::{
    CHARS_PER_PAGE, PAGE_RATE_COLOR, PAGE_RATE_MONOCHROME, PDF_COPY_SURCHARGE,
};
use printvendo_types::{Amount, ColorMode};

/// Pages needed to print `text`, at least one.
pub fn page_count(text: &str) -> u32 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(CHARS_PER_PAGE).max(1) as u32
}

/// Per-page rate for a color mode, minor units.
pub fn per_page_rate(mode: ColorMode) -> Amount {
    match mode {
        ColorMode::Monochrome => PAGE_RATE_MONOCHROME,
        ColorMode::Color => PAGE_RATE_COLOR,
    }
}

/// Total print charge: pages x per-page rate, plus the flat surcharge when a
/// PDF copy is kept.
pub fn print_cost(pages: u32, mode: ColorMode, save_pdf_copy: bool) -> Amount {
    let mut total = pages as Amount * per_page_rate(mode);
    if save_pdf_copy {
        total += PDF_COPY_SURCHARGE;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_one_page() {
        assert_eq!(page_count(""), 1);
    }

    #[test]
    fn test_page_boundaries() {
        assert_eq!(page_count(&"x".repeat(2000)), 1);
        assert_eq!(page_count(&"x".repeat(2001)), 2);
        assert_eq!(page_count(&"x".repeat(4000)), 2);
        assert_eq!(page_count(&"x".repeat(4001)), 3);
    }

    #[test]
    fn test_print_cost_by_mode() {
        assert_eq!(print_cost(3, ColorMode::Monochrome, false), 900);
        assert_eq!(print_cost(3, ColorMode::Color, false), 1500);
    }

    #[test]
    fn test_pdf_surcharge_is_flat() {
        assert_eq!(
            print_cost(1, ColorMode::Monochrome, true),
            print_cost(1, ColorMode::Monochrome, false) + PDF_COPY_SURCHARGE
        );
        assert_eq!(
            print_cost(9, ColorMode::Color, true),
            print_cost(9, ColorMode::Color, false) + PDF_COPY_SURCHARGE
        );
    }
}
