//! Latin / ideographic font pair

use pdf_core::{FontData, PdfDocument, StandardFont};
use text_fit::MeasureText;

use crate::{Result, TemplateError};

pub const LATIN_FONT: &str = "latin";
pub const IDEOGRAPHIC_FONT: &str = "ideographic";

/// Font bytes supplied by the caller
///
/// An empty Latin buffer selects the built-in Helvetica; an empty
/// ideographic buffer reuses the Latin font.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontBytes<'a> {
    pub latin: &'a [u8],
    pub ideographic: &'a [u8],
}

/// The two fonts of one render call
#[derive(Debug, Clone)]
pub struct FontSet {
    latin: FontData,
    ideographic: Option<FontData>,
}

impl FontSet {
    pub fn load(bytes: FontBytes<'_>) -> Result<Self> {
        let latin = if bytes.latin.is_empty() {
            FontData::standard(LATIN_FONT, StandardFont::Helvetica)
        } else {
            FontData::from_ttf(LATIN_FONT, bytes.latin)
                .map_err(|e| TemplateError::FontError(format!("latin font: {e}")))?
        };
        let ideographic = if bytes.ideographic.is_empty() {
            None
        } else {
            Some(
                FontData::from_ttf(IDEOGRAPHIC_FONT, bytes.ideographic)
                    .map_err(|e| TemplateError::FontError(format!("ideographic font: {e}")))?,
            )
        };
        Ok(Self { latin, ideographic })
    }

    /// Any non-ASCII character selects the ideographic font
    pub fn font_name_for(&self, text: &str) -> &'static str {
        if !text.is_ascii() && self.ideographic.is_some() {
            IDEOGRAPHIC_FONT
        } else {
            LATIN_FONT
        }
    }

    fn font_for(&self, text: &str) -> &FontData {
        match &self.ideographic {
            Some(font) if !text.is_ascii() => font,
            _ => &self.latin,
        }
    }

    /// Register both fonts with the document
    pub fn register(&self, doc: &mut PdfDocument) -> Result<()> {
        doc.add_font(self.latin.clone())?;
        if let Some(font) = &self.ideographic {
            doc.add_font(font.clone())?;
        }
        Ok(())
    }
}

impl MeasureText for FontSet {
    fn text_width(&self, text: &str, size: f64) -> f64 {
        let font = self.font_for(text);
        font.text_width(text, size)
    }
}
