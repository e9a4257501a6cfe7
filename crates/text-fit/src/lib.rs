//! Text Fit - fitting text into fixed boxes
//!
//! This crate provides:
//! - Greedy width-aware line wrapping
//! - Ellipsis truncation (binary search on the kept prefix)
//! - Shrink-to-fit font sizing
//! - Two-line title fitting by candidate split search
//! - Thousands grouping for number display
//!
//! Every function is pure: it only depends on the text, the box and a
//! [`MeasureText`] implementation supplying advance widths.
//!
//! # Example
//!
//! ```ignore
//! use text_fit::{ellipsis_to_width, wrap_to_lines};
//!
//! let lines = wrap_to_lines("A long product name", &fonts, 10.0, 80.0);
//! let cell = ellipsis_to_width("A long product name", &fonts, 10.0, 80.0);
//! ```

mod fit;
mod formatter;
mod wrap;

pub use fit::{
    ellipsis_marker, ellipsis_to_width, fit_title_up_to_2_lines, shrink_to_fit, TitleFit,
    LINE_HEIGHT_FACTOR,
};
pub use formatter::group_thousands;
pub use wrap::{is_break_opportunity, wrap_to_lines};

/// Source of text advance widths
///
/// Widths are returned in the same unit as `size` (a width of 0.5 at size
/// 10 means five units).
pub trait MeasureText {
    fn text_width(&self, text: &str, size: f64) -> f64;
}

impl<T: MeasureText + ?Sized> MeasureText for &T {
    fn text_width(&self, text: &str, size: f64) -> f64 {
        (**self).text_width(text, size)
    }
}

/// Fixed-advance measurer: every character is `advance_em` wide
///
/// Useful where real font metrics are unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    pub advance_em: f64,
}

impl MeasureText for MonospaceMetrics {
    fn text_width(&self, text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * self.advance_em * size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_metrics() {
        let m = MonospaceMetrics { advance_em: 0.5 };
        assert_eq!(m.text_width("abcd", 10.0), 20.0);
        assert_eq!(m.text_width("", 10.0), 0.0);
    }

    #[test]
    fn test_measure_through_reference() {
        let m = MonospaceMetrics { advance_em: 1.0 };
        let r: &dyn MeasureText = &m;
        assert_eq!((&r).text_width("ab", 3.0), 6.0);
    }
}
