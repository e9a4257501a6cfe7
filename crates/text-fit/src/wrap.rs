//! Greedy line wrapping

use crate::MeasureText;

/// Whether a line may break right after `c`
///
/// Whitespace and common Latin/CJK punctuation qualify.
pub fn is_break_opportunity(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            ',' | '.' | ';' | ':' | '/' | '-' | ')' | '、' | '。' | '・' | '，' | '）' | '」'
        )
}

/// Wrap text into lines no wider than `max_width`
///
/// Characters are accumulated greedily; a character that would overflow the
/// current line starts a new one. Explicit `\n` always starts a new line. A
/// single character wider than `max_width` still occupies its own line, so
/// wrapping always terminates.
///
/// # Examples
/// ```
/// use text_fit::{wrap_to_lines, MonospaceMetrics};
/// let m = MonospaceMetrics { advance_em: 1.0 };
/// assert_eq!(wrap_to_lines("abcde", &m, 1.0, 2.0), vec!["ab", "cd", "e"]);
/// assert_eq!(wrap_to_lines("", &m, 1.0, 2.0), vec![""]);
/// ```
pub fn wrap_to_lines<M: MeasureText + ?Sized>(
    text: &str,
    measure: &M,
    size: f64,
    max_width: f64,
) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for c in paragraph.chars() {
            let mut candidate = current.clone();
            candidate.push(c);
            if !current.is_empty() && measure.text_width(&candidate, size) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push(c);
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }

    lines
}
