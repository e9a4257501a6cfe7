//! Non-fatal render diagnostics

use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Warning category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCategory {
    Debug,
    Data,
    Layout,
    Image,
    Number,
}

impl WarningCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningCategory::Debug => "debug",
            WarningCategory::Data => "data",
            WarningCategory::Layout => "layout",
            WarningCategory::Image => "image",
            WarningCategory::Number => "number",
        }
    }
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic with key/value context
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub category: WarningCategory,
    pub message: String,
    pub context: BTreeMap<String, String>,
}

impl Warning {
    pub fn new(category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Data, message)
    }

    pub fn layout(message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Layout, message)
    }

    pub fn image(message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Image, message)
    }

    pub fn number(message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Number, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Debug, message)
    }

    /// Attach a context entry
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)?;
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, " ({})", pairs.join(", "))?;
        }
        Ok(())
    }
}

/// Append-only warning collector for one render call
///
/// Keeps insertion order and drops warnings whose rendered string was
/// already recorded.
#[derive(Debug, Default)]
pub struct WarningSink {
    debug: bool,
    request_id: Option<String>,
    seen: HashSet<String>,
    warnings: Vec<Warning>,
}

impl WarningSink {
    pub fn new(debug: bool, request_id: Option<String>) -> Self {
        Self {
            debug,
            request_id,
            ..Self::default()
        }
    }

    pub fn push(&mut self, warning: Warning) {
        if warning.category == WarningCategory::Debug && !self.debug {
            return;
        }
        let rendered = warning.to_string();
        if !self.seen.insert(rendered.clone()) {
            return;
        }
        let request = self.request_id.as_deref().unwrap_or("-");
        if warning.category == WarningCategory::Debug {
            log::debug!("render[{request}] {rendered}");
        } else {
            log::warn!("render[{request}] {rendered}");
        }
        self.warnings.push(warning);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_strings(self) -> Vec<String> {
        self.warnings.iter().map(Warning::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_context() {
        let w = Warning::data("missing field")
            .with("fieldCode", "Amount")
            .with("element", "items");
        assert_eq!(
            w.to_string(),
            "[data] missing field (element=items, fieldCode=Amount)"
        );
    }

    #[test]
    fn test_dedup_keeps_order() {
        let mut sink = WarningSink::new(false, None);
        sink.push(Warning::layout("b"));
        sink.push(Warning::data("a"));
        sink.push(Warning::layout("b"));
        assert_eq!(sink.into_strings(), vec!["[layout] b", "[data] a"]);
    }

    #[test]
    fn test_debug_only_when_enabled() {
        let mut quiet = WarningSink::new(false, None);
        quiet.push(Warning::debug("trace"));
        assert!(quiet.is_empty());

        let mut verbose = WarningSink::new(true, Some("req-1".into()));
        verbose.push(Warning::debug("trace"));
        assert_eq!(verbose.len(), 1);
    }
}
