//! Single-line fitting: ellipsis, shrink-to-fit and two-line titles

use crate::wrap::is_break_opportunity;
use crate::MeasureText;

/// Line height as a multiple of font size
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Most split candidates examined by [`fit_title_up_to_2_lines`]
const MAX_SPLIT_CANDIDATES: usize = 12;

/// Truncation marker for `text`: three dots for ASCII, a single ellipsis otherwise
pub fn ellipsis_marker(text: &str) -> &'static str {
    if text.is_ascii() {
        "..."
    } else {
        "\u{2026}"
    }
}

/// Truncate text with an ellipsis so it fits within `max_width`
///
/// Returns the text unchanged when it already fits and an empty string when
/// not even the marker fits.
///
/// # Examples
/// ```
/// use text_fit::{ellipsis_to_width, MonospaceMetrics};
/// let m = MonospaceMetrics { advance_em: 1.0 };
/// assert_eq!(ellipsis_to_width("abcdefgh", &m, 1.0, 5.0), "ab...");
/// assert_eq!(ellipsis_to_width("abc", &m, 1.0, 5.0), "abc");
/// ```
pub fn ellipsis_to_width<M: MeasureText + ?Sized>(
    text: &str,
    measure: &M,
    size: f64,
    max_width: f64,
) -> String {
    if measure.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let marker = ellipsis_marker(text);
    if measure.text_width(marker, size) > max_width {
        return String::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let with_marker = |n: usize| -> String {
        let mut s: String = chars[..n].iter().collect();
        s.push_str(marker);
        s
    };

    // largest prefix length whose prefix + marker fits; 0 always fits
    let (mut lo, mut hi) = (0usize, chars.len());
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if measure.text_width(&with_marker(mid), size) <= max_width {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    let mut prefix: String = chars[..lo].iter().collect();
    prefix.truncate(prefix.trim_end().len());
    prefix.push_str(marker);
    prefix
}

/// Largest font size in `[min_size, base_size]` at which text fits `max_width`
///
/// The size is scaled down by the overflow ratio and floored to a whole
/// number before clamping.
///
/// # Examples
/// ```
/// use text_fit::{shrink_to_fit, MonospaceMetrics};
/// let m = MonospaceMetrics { advance_em: 1.0 };
/// assert_eq!(shrink_to_fit("abcd", &m, 10.0, 20.0, 4.0), 5.0);
/// assert_eq!(shrink_to_fit("abcd", &m, 10.0, 2.0, 4.0), 4.0);
/// ```
pub fn shrink_to_fit<M: MeasureText + ?Sized>(
    text: &str,
    measure: &M,
    base_size: f64,
    max_width: f64,
    min_size: f64,
) -> f64 {
    let width = measure.text_width(text, base_size);
    if width <= max_width || width <= 0.0 {
        return base_size;
    }
    let scaled = (base_size * max_width / width).floor();
    scaled.max(min_size).min(base_size)
}

/// Result of fitting a title into a box
#[derive(Debug, Clone, PartialEq)]
pub struct TitleFit {
    /// One or two lines, top to bottom
    pub lines: Vec<String>,
    pub font_size: f64,
}

/// Fit a title into a box using one or two lines, maximizing font size
///
/// One line at the height-derived size wins outright when it fits the width.
/// Otherwise split points near the middle of the text are compared with the
/// one-line arrangement and the largest achievable size is kept. Text with no
/// break opportunity is split at its midpoint.
pub fn fit_title_up_to_2_lines<M: MeasureText + ?Sized>(
    text: &str,
    measure: &M,
    box_width: f64,
    box_height: f64,
    max_size: f64,
    min_size: f64,
) -> TitleFit {
    let one_line_size = (box_height / LINE_HEIGHT_FACTOR).min(max_size).max(min_size);
    let text = text.trim();
    if text.is_empty() || measure.text_width(text, one_line_size) <= box_width {
        return TitleFit {
            lines: vec![text.to_string()],
            font_size: one_line_size,
        };
    }

    let achievable = |lines: &[&str], height_size: f64| -> f64 {
        let widest = lines
            .iter()
            .map(|l| measure.text_width(l, height_size))
            .fold(0.0_f64, f64::max);
        if widest <= box_width || widest <= 0.0 {
            height_size
        } else {
            height_size * box_width / widest
        }
    };

    let mut best = TitleFit {
        lines: vec![text.to_string()],
        font_size: achievable(&[text], one_line_size),
    };

    let two_line_size = (box_height / (2.0 * LINE_HEIGHT_FACTOR)).min(max_size);
    let mut splits = split_candidates(text);
    if splits.is_empty() {
        splits.push(midpoint_split(text));
    }
    for (first, second) in splits {
        if first.is_empty() || second.is_empty() {
            continue;
        }
        let size = achievable(&[&first, &second], two_line_size);
        if size > best.font_size {
            best = TitleFit {
                lines: vec![first, second],
                font_size: size,
            };
        }
    }

    best.font_size = (best.font_size * 10.0).floor() / 10.0;
    best.font_size = best.font_size.max(min_size).min(max_size);
    best
}

/// Split points at break opportunities, nearest the midpoint first
fn split_candidates(text: &str) -> Vec<(String, String)> {
    let chars: Vec<char> = text.chars().collect();
    let mid = chars.len() as f64 / 2.0;

    let mut points: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(i, c)| *i + 1 < chars.len() && is_break_opportunity(**c))
        .map(|(i, _)| i + 1)
        .collect();
    points.sort_by(|a, b| {
        let da = (*a as f64 - mid).abs();
        let db = (*b as f64 - mid).abs();
        da.total_cmp(&db).then(a.cmp(b))
    });
    points.truncate(MAX_SPLIT_CANDIDATES);

    points
        .into_iter()
        .map(|p| {
            let first: String = chars[..p].iter().collect();
            let second: String = chars[p..].iter().collect();
            (first.trim().to_string(), second.trim().to_string())
        })
        .collect()
}

fn midpoint_split(text: &str) -> (String, String) {
    let chars: Vec<char> = text.chars().collect();
    let mid = chars.len().div_ceil(2);
    (
        chars[..mid].iter().collect(),
        chars[mid..].iter().collect(),
    )
}
