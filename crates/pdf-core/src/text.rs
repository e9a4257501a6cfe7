//! Text operators and content-stream number formatting

use crate::document::Color;
use crate::Align;

/// One positioned run of encoded text
pub(crate) struct TextRun {
    /// Font resource name, e.g. `F1`
    pub font_name: String,
    pub font_size: f32,
    /// Advance width in points, used to anchor centered and right-aligned runs
    pub text_width: f64,
    pub color: Color,
}

/// Format a number for a content stream
///
/// PDF numbers have no exponent form, so values are printed with at most
/// three decimals and trailing zeros removed.
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{rounded:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// Escape a byte string for use inside a PDF literal string `( ... )`
pub fn escape_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('(');
    for &b in bytes {
        match b {
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\\' => out.push_str("\\\\"),
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out.push(')');
    out
}

/// `BT .. ET` block drawing `operand` with its anchor at (`x`, `y`)
///
/// `operand` is already encoded: `<hex>` for composite fonts, `(literal)`
/// for the standard font.
pub(crate) fn text_operators(operand: &str, x: f64, y: f64, align: Align, run: &TextRun) -> Vec<u8> {
    let start_x = match align {
        Align::Left => x,
        Align::Center => x - run.text_width / 2.0,
        Align::Right => x - run.text_width,
    };
    let Color { r, g, b } = run.color;
    format!(
        "BT\n{} {} {} rg\n/{} {} Tf\n{} {} Td\n{operand} Tj\nET\n",
        fmt_num(f64::from(r)),
        fmt_num(f64::from(g)),
        fmt_num(f64::from(b)),
        run.font_name,
        fmt_num(f64::from(run.font_size)),
        fmt_num(start_x),
        fmt_num(y),
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_run(size: f32, width: f64, color: Color) -> TextRun {
        TextRun {
            font_name: "F1".to_string(),
            font_size: size,
            text_width: width,
            color,
        }
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(100.0), "100");
        assert_eq!(fmt_num(12.5), "12.5");
        assert_eq!(fmt_num(0.1234), "0.123");
        assert_eq!(fmt_num(-3.0), "-3");
        assert_eq!(fmt_num(1e-9), "0");
        assert_eq!(fmt_num(f64::NAN), "0");
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal(b"a(b)c"), "(a\\(b\\)c)");
        assert_eq!(escape_literal(b"back\\slash"), "(back\\\\slash)");
        assert_eq!(escape_literal(&[0xA5]), "(\\245)");
    }

    #[test]
    fn test_text_operators_block() {
        let ops = text_operators("<0048>", 100.0, 700.0, Align::Left, &text_run(12.0, 100.0, Color::rgb(1.0, 0.0, 0.0)));
        let ops = String::from_utf8(ops).unwrap();
        assert_eq!(ops, "BT\n1 0 0 rg\n/F1 12 Tf\n100 700 Td\n<0048> Tj\nET\n");
    }

    #[test]
    fn test_text_operators_anchor() {
        let start = |align, width| {
            let ops = text_operators("(x)", 300.0, 500.0, align, &text_run(10.0, width, Color::black()));
            String::from_utf8(ops).unwrap()
        };
        assert!(start(Align::Center, 100.0).contains("250 500 Td"));
        assert!(start(Align::Right, 80.0).contains("220 500 Td"));
        assert!(start(Align::Center, 0.0).contains("300 500 Td"));
    }
}
