//! PDF Core - Low-level PDF writing
//!
//! This crate provides functionality for:
//! - Building a fresh PDF document page by page
//! - Embedding TrueType fonts (or using the built-in Helvetica)
//! - Inserting text at PDF-space coordinates
//! - Drawing rectangles, rounded rectangles and lines
//! - Inserting images (JPEG, PNG)
//!
//! All coordinates taken by this crate are PDF user space: points, origin at
//! the bottom-left corner of the page. Callers that author in a top-left
//! space convert before calling in.
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, FontData, PdfDocument};
//!
//! let mut doc = PdfDocument::new();
//! let page = doc.add_page(595.28, 841.89);
//! doc.add_font(FontData::from_ttf("latin", &ttf_bytes)?)?;
//! doc.set_font("latin", 12.0)?;
//! doc.insert_text("Hello, World!", page, 100.0, 700.0, Align::Left)?;
//! let bytes = doc.to_bytes()?;
//! ```

mod document;
mod font;
mod graphics;
mod image;
mod text;

pub use document::{Color, PdfDocument};
pub use font::{FontData, StandardFont};
pub use graphics::{Rect, ShapeStyle};
pub use image::{detect_format, encode_png, fit_rect, ImageFormat};
pub use text::{escape_literal, fmt_num};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Points per millimetre
pub const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Convert millimetres to points
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * POINTS_PER_MM
}
