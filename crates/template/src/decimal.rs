//! Exact fixed-point decimals for money accumulation

use std::fmt;

use serde_json::Value;

use crate::warnings::{Warning, WarningSink};

/// Longest digit run accepted; keeps every value well inside `i128`
const MAX_DIGITS: usize = 36;

/// `magnitude / 10^scale`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaledDecimal {
    pub magnitude: i128,
    pub scale: u32,
}

impl ScaledDecimal {
    pub const ZERO: ScaledDecimal = ScaledDecimal {
        magnitude: 0,
        scale: 0,
    };

    pub fn new(magnitude: i128, scale: u32) -> Self {
        Self { magnitude, scale }
    }

    /// Rescale to a larger scale without losing digits
    fn rescaled(self, scale: u32) -> Option<i128> {
        let factor = 10i128.checked_pow(scale.checked_sub(self.scale)?)?;
        self.magnitude.checked_mul(factor)
    }

    /// Add after aligning both operands to the larger scale
    ///
    /// Returns `None` on overflow.
    pub fn checked_add(self, other: ScaledDecimal) -> Option<ScaledDecimal> {
        let scale = self.scale.max(other.scale);
        let a = self.rescaled(scale)?;
        let b = other.rescaled(scale)?;
        Some(ScaledDecimal {
            magnitude: a.checked_add(b)?,
            scale,
        })
    }

    pub fn is_negative(&self) -> bool {
        self.magnitude < 0
    }

    /// Parse a plain or currency-like decimal string
    ///
    /// Accepts surrounding whitespace, a leading `-` or `+`, accounting-style
    /// parentheses for negatives, `¥`/`￥`/`$` prefixes and `,` group
    /// separators. Exponent notation is rejected.
    pub fn parse_str(input: &str) -> Option<ScaledDecimal> {
        let mut s = input.trim();
        let mut negative = false;

        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            negative = true;
            s = inner.trim();
        }
        // the sign may sit on either side of the currency symbol, not both
        let mut signed = strip_sign(s);
        if let Some((_, rest)) = signed {
            s = rest;
        }
        for prefix in ['¥', '￥', '$'] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.trim_start();
                if signed.is_none() {
                    signed = strip_sign(s);
                    if let Some((_, rest)) = signed {
                        s = rest;
                    }
                }
                break;
            }
        }
        if let Some((true, _)) = signed {
            negative = !negative;
        }

        let cleaned: String = s.chars().filter(|c| *c != ',').collect();
        let (int_part, frac_part) = match cleaned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (cleaned.as_str(), ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return None;
        }
        if int_part.len() + frac_part.len() > MAX_DIGITS {
            return None;
        }

        let digits = format!("{int_part}{frac_part}");
        let magnitude: i128 = digits.parse().ok()?;
        Some(ScaledDecimal {
            magnitude: if negative { -magnitude } else { magnitude },
            scale: frac_part.len() as u32,
        })
    }
}

/// Leading `-` or `+`, as (is negative, remainder)
fn strip_sign(s: &str) -> Option<(bool, &str)> {
    if let Some(rest) = s.strip_prefix('-') {
        Some((true, rest.trim_start()))
    } else {
        s.strip_prefix('+').map(|rest| (false, rest.trim_start()))
    }
}

impl fmt::Display for ScaledDecimal {
    /// Plain decimal notation with trailing fractional zeros removed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.magnitude.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let (int_part, frac_part) = if digits.len() > scale {
            let (i, fr) = digits.split_at(digits.len() - scale);
            (i.to_string(), fr.to_string())
        } else {
            ("0".to_string(), format!("{digits:0>scale$}"))
        };
        let frac_part = frac_part.trim_end_matches('0');
        let sign = if self.magnitude < 0 { "-" } else { "" };
        if frac_part.is_empty() {
            write!(f, "{sign}{int_part}")
        } else {
            write!(f, "{sign}{int_part}.{frac_part}")
        }
    }
}

/// Parse a record value into a decimal
///
/// Null and blank strings are treated as absent without a warning. Anything
/// else that does not parse records a data warning and yields `None`.
pub fn parse_decimal_value(value: &Value, sink: &mut WarningSink) -> Option<ScaledDecimal> {
    let parsed = match value {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => ScaledDecimal::parse_str(s),
        Value::Number(n) => ScaledDecimal::parse_str(&n.to_string()),
        _ => None,
    };
    if parsed.is_none() {
        sink.push(Warning::data("value is not a decimal number").with("value", value));
    }
    parsed
}
