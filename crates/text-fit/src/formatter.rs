//! Number display helpers

/// Insert `sep` between groups of three digits
///
/// Accepts an optional leading `-` and an optional fractional part, which is
/// left untouched. Input that is not a plain decimal number is returned as-is.
///
/// # Examples
/// ```
/// use text_fit::group_thousands;
/// assert_eq!(group_thousands("1234567", ','), "1,234,567");
/// assert_eq!(group_thousands("-1234.505", ','), "-1,234.505");
/// assert_eq!(group_thousands("abc", ','), "abc");
/// ```
pub fn group_thousands(number: &str, sep: char) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if int_part.is_empty() || !is_digits(int_part) || !frac_part.map_or(true, is_digits) {
        return number.to_string();
    }

    let mut result = String::with_capacity(number.len() + int_part.len() / 3);
    result.push_str(sign);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            result.push(sep);
        }
        result.push(c);
    }
    if let Some(frac) = frac_part {
        result.push('.');
        result.push_str(frac);
    }
    result
}
