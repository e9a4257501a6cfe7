//! Template Engine - JSON template rendering
//!
//! This crate provides:
//! - Template and summary schema types
//! - Data-source resolution against a record (or field-code preview)
//! - Exact decimal accumulation for totals
//! - Table, card-list and label-sheet body renderers with pagination
//! - Header/footer stamping and page numbering
//!
//! # Example
//!
//! ```ignore
//! use template::{parse_record, parse_template, render_template_to_pdf, FontBytes, RenderOptions};
//!
//! let template = parse_template(template_json)?;
//! let record = parse_record(data_json)?;
//! let fonts = FontBytes { latin: &latin_ttf, ideographic: &cjk_ttf };
//! let output = render_template_to_pdf(&template, Some(&record), fonts, RenderOptions::new())?;
//! std::fs::write("out.pdf", &output.bytes)?;
//! for warning in &output.warnings {
//!     eprintln!("{warning}");
//! }
//! ```

mod blocks;
pub mod decimal;
pub mod fonts;
pub mod format;
pub mod images;
pub mod parser;
mod renderer;
mod schema;
pub mod transform;
pub mod warnings;

pub use decimal::ScaledDecimal;
pub use fonts::FontBytes;
pub use images::{FetchedImage, ImageFetchError, ImageFetcher};
#[cfg(feature = "http")]
pub use images::HttpImageFetcher;
pub use parser::{parse_record, parse_template, resolve_data_source};
pub use renderer::{
    render_template_to_pdf, RenderOptions, RenderOutput, TextDrawEvent, COMPUTED_TOTAL_KEY,
};
pub use schema::*;
pub use transform::PdfTransform;
pub use warnings::{Warning, WarningCategory, WarningSink};

use std::fmt;

use thiserror::Error;

/// What was being drawn when a text primitive failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    Header,
    Cell,
    Summary,
    Text,
    Label,
    Card,
    Footer,
    PageNumber,
}

impl fmt::Display for DrawPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrawPhase::Header => "header",
            DrawPhase::Cell => "cell",
            DrawPhase::Summary => "summary",
            DrawPhase::Text => "text",
            DrawPhase::Label => "label",
            DrawPhase::Card => "card",
            DrawPhase::Footer => "footer",
            DrawPhase::PageNumber => "page-number",
        })
    }
}

/// Errors that can occur during template processing
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to parse template: {0}")]
    ParseError(String),

    #[error("Failed to draw text of '{element_id}' in template '{template_id}' ({phase}): {source}")]
    TextDraw {
        template_id: String,
        element_id: String,
        phase: DrawPhase,
        source: pdf_core::PdfError,
    },

    #[error("Render exceeded the limit of {limit} pages")]
    PageLimitExceeded { limit: usize },

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Font error: {0}")]
    FontError(String),
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
