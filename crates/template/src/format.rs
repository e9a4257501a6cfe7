//! Column and field formatters

use chrono::{DateTime, NaiveDate};
use text_fit::group_thousands;

use crate::decimal::ScaledDecimal;
use crate::warnings::{Warning, WarningSink};
use crate::{Align, FieldFormat};

const CURRENCY_SYMBOL: &str = "¥";

/// Apply a display format to resolved text
///
/// Empty text passes through. Values the format cannot interpret are shown
/// as-is with a data warning.
pub fn format_value(text: &str, format: FieldFormat, sink: &mut WarningSink) -> String {
    if text.trim().is_empty() || format == FieldFormat::Text {
        return text.to_string();
    }
    let formatted = match format {
        FieldFormat::Text => None,
        FieldFormat::Number => ScaledDecimal::parse_str(text).map(|d| group_decimal(&d)),
        FieldFormat::Currency => ScaledDecimal::parse_str(text).map(|d| {
            let grouped = group_decimal(&d);
            match grouped.strip_prefix('-') {
                Some(abs) => format!("-{CURRENCY_SYMBOL}{abs}"),
                None => format!("{CURRENCY_SYMBOL}{grouped}"),
            }
        }),
        FieldFormat::Date => format_date(text),
    };
    formatted.unwrap_or_else(|| {
        sink.push(
            Warning::data("value does not match column format")
                .with("format", format!("{format:?}").to_lowercase())
                .with("value", text),
        );
        text.to_string()
    })
}

fn group_decimal(value: &ScaledDecimal) -> String {
    group_thousands(&value.to_string(), ',')
}

/// Normalize a date or timestamp to `YYYY-MM-DD`
fn format_date(text: &str) -> Option<String> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y/%m/%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
}

/// Whether text reads as a number (grouping, currency marks and signs allowed)
pub fn looks_numeric(text: &str) -> bool {
    ScaledDecimal::parse_str(text).is_some()
}

/// Explicit alignment, else right for numeric-looking text and left otherwise
pub fn default_align(explicit: Option<Align>, text: &str) -> Align {
    explicit.unwrap_or(if looks_numeric(text) {
        Align::Right
    } else {
        Align::Left
    })
}
