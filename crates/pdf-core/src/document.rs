//! PDF Document builder

use crate::graphics::{
    generate_line_operators, generate_rect_operators, generate_rounded_rect_operators, Rect,
    ShapeStyle,
};
use crate::image::{fit_rect, image_operators, ImageXObject};
use crate::text::{text_operators, TextRun};
use crate::{Align, FontData, PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

/// Device RGB color, each channel in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Equal channels; `0.0` is black
    pub const fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    pub fn black() -> Self {
        Self::BLACK
    }

    pub fn white() -> Self {
        Self::gray(1.0)
    }

}

/// Buffered state of a single page
#[derive(Debug, Default)]
struct PageState {
    width: f64,
    height: f64,
    content: Vec<u8>,
    /// Font names referenced by this page's content
    fonts: BTreeSet<String>,
    /// Indices into the document image list used by this page
    images: BTreeSet<usize>,
}

/// An image registered with the document
struct EmbeddedImage {
    resource_name: String,
    source: Vec<u8>,
    xobject: ImageXObject,
}

/// PDF Document builder providing high-level drawing operations
///
/// Pages are buffered in memory and the PDF object graph is assembled once
/// in [`PdfDocument::to_bytes`], when every font's character set is known.
pub struct PdfDocument {
    pages: Vec<PageState>,
    /// Registered fonts (font name -> data)
    fonts: BTreeMap<String, FontData>,
    /// Font resource names (font name -> "F1", "F2", ...)
    font_resources: BTreeMap<String, String>,
    current_font: Option<String>,
    current_font_size: f32,
    current_text_color: Color,
    images: Vec<EmbeddedImage>,
    /// Content hash -> indices into `images`; equal hashes are confirmed by bytes
    image_index: HashMap<u64, Vec<usize>>,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    /// Create an empty document with no pages
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            fonts: BTreeMap::new(),
            font_resources: BTreeMap::new(),
            current_font: None,
            current_font_size: 12.0,
            current_text_color: Color::default(),
            images: Vec::new(),
            image_index: HashMap::new(),
        }
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a blank page of the given size in points
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub fn add_page(&mut self, width: f64, height: f64) -> usize {
        self.pages.push(PageState {
            width,
            height,
            ..PageState::default()
        });
        self.pages.len()
    }

    /// Page size in points
    pub fn page_size(&self, page: usize) -> Result<(f64, f64)> {
        let state = self.page(page)?;
        Ok((state.width, state.height))
    }

    /// Register a font under its name
    pub fn add_font(&mut self, font: FontData) -> Result<()> {
        if self.fonts.contains_key(&font.name) {
            return Err(PdfError::FontAlreadyExists(font.name));
        }
        let resource_name = format!("F{}", self.font_resources.len() + 1);
        self.font_resources
            .insert(font.name.clone(), resource_name);
        self.fonts.insert(font.name.clone(), font);
        Ok(())
    }

    /// Look up a registered font
    pub fn font(&self, name: &str) -> Option<&FontData> {
        self.fonts.get(name)
    }

    /// Set the current font and size
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        if !self.fonts.contains_key(name) {
            return Err(PdfError::FontNotFound(name.to_string()));
        }
        self.current_font = Some(name.to_string());
        self.current_font_size = size;
        Ok(())
    }

    /// Set the text color
    ///
    /// # Example
    /// ```ignore
    /// doc.set_text_color(Color::rgb(1.0, 0.0, 0.0));
    /// doc.set_text_color(Color::gray(0.4));
    /// ```
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    fn current_font_name(&self) -> Result<&str> {
        self.current_font
            .as_deref()
            .ok_or_else(|| PdfError::FontNotFound("No font set".to_string()))
    }

    /// Get current font's text width for a string, in points
    pub fn text_width(&self, text: &str) -> Result<f64> {
        let name = self.current_font_name()?;
        let font = self
            .fonts
            .get(name)
            .ok_or_else(|| PdfError::FontNotFound(name.to_string()))?;
        Ok(font.text_width(text, f64::from(self.current_font_size)))
    }

    /// Insert text with the current font, size and color
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - Anchor X in points; meaning depends on `align`
    /// * `y` - Baseline Y in points (from bottom)
    /// * `align` - Text alignment relative to `x`
    pub fn insert_text(
        &mut self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
        align: Align,
    ) -> Result<()> {
        self.page(page)?;
        if text.is_empty() {
            return Ok(());
        }

        let font_name = self.current_font_name()?.to_string();
        let resource_name = self
            .font_resources
            .get(&font_name)
            .cloned()
            .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
        let font = self
            .fonts
            .get_mut(&font_name)
            .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
        font.add_chars(text);

        let run = TextRun {
            font_name: resource_name,
            font_size: self.current_font_size,
            text_width: font.text_width(text, f64::from(self.current_font_size)),
            color: self.current_text_color,
        };
        let operand = font.encode_text(text);
        let operators = text_operators(&operand, x, y, align, &run);

        let state = self.page_mut(page)?;
        state.fonts.insert(font_name);
        state.content.extend_from_slice(&operators);
        Ok(())
    }

    /// Draw a rectangle (PDF coordinates, lower-left origin)
    pub fn draw_rect(&mut self, page: usize, rect: Rect, style: &ShapeStyle) -> Result<()> {
        let operators = generate_rect_operators(rect, style);
        self.append_content(page, &operators)
    }

    /// Draw a rectangle with rounded corners
    pub fn draw_rounded_rect(
        &mut self,
        page: usize,
        rect: Rect,
        radius: f64,
        style: &ShapeStyle,
    ) -> Result<()> {
        let operators = generate_rounded_rect_operators(rect, radius, style);
        self.append_content(page, &operators)
    }

    /// Draw a straight line
    pub fn draw_line(
        &mut self,
        page: usize,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        line_width: f64,
    ) -> Result<()> {
        let operators = generate_line_operators(from, to, color, line_width);
        self.append_content(page, &operators)
    }

    /// Insert a JPEG or PNG image fitted into `rect`
    ///
    /// The aspect ratio is kept and the image is centered in the box. Equal
    /// image bytes are embedded once per document.
    pub fn insert_image(&mut self, data: &[u8], page: usize, rect: Rect) -> Result<()> {
        self.page(page)?;
        let index = self.register_image(data)?;
        let image = &self.images[index];
        let placed = fit_rect(image.xobject.width, image.xobject.height, rect);
        let operators = image_operators(&image.resource_name, placed);

        let state = self.page_mut(page)?;
        state.images.insert(index);
        state.content.extend_from_slice(&operators);
        Ok(())
    }

    fn register_image(&mut self, data: &[u8]) -> Result<usize> {
        let hash = hash_bytes(data);
        let bucket = self.image_index.get(&hash).map(Vec::as_slice).unwrap_or_default();
        if let Some(&index) = bucket.iter().find(|&&i| self.images[i].source == data) {
            return Ok(index);
        }

        let xobject = ImageXObject::from_bytes(data)?;
        let index = self.images.len();
        self.images.push(EmbeddedImage {
            resource_name: format!("Im{}", index + 1),
            source: data.to_vec(),
            xobject,
        });
        self.image_index.entry(hash).or_default().push(index);
        Ok(index)
    }

    /// Assemble the PDF and serialize it to bytes
    ///
    /// Can be called repeatedly; each call builds a fresh object graph.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let used_fonts: BTreeSet<&String> = self.pages.iter().flat_map(|p| &p.fonts).collect();
        let mut font_ids: BTreeMap<&str, ObjectId> = BTreeMap::new();
        for name in used_fonts {
            let font = self
                .fonts
                .get(name)
                .ok_or_else(|| PdfError::FontNotFound(name.clone()))?;
            font_ids.insert(name.as_str(), font.embed(&mut doc)?);
        }

        let image_ids: Vec<ObjectId> = self
            .images
            .iter()
            .map(|image| doc.add_object(image.xobject.to_pdf_stream()))
            .collect();

        let mut kids = Vec::with_capacity(self.pages.len());
        for state in &self.pages {
            let mut font_dict = Dictionary::new();
            for name in &state.fonts {
                if let (Some(resource), Some(id)) =
                    (self.font_resources.get(name), font_ids.get(name.as_str()))
                {
                    font_dict.set(resource.as_bytes(), *id);
                }
            }
            let mut xobject_dict = Dictionary::new();
            for &index in &state.images {
                if let (Some(image), Some(id)) = (self.images.get(index), image_ids.get(index)) {
                    xobject_dict.set(image.resource_name.as_bytes(), *id);
                }
            }
            let mut resources = Dictionary::new();
            if !font_dict.is_empty() {
                resources.set("Font", font_dict);
            }
            if !xobject_dict.is_empty() {
                resources.set("XObject", xobject_dict);
            }

            let contents_id = doc.add_object(Stream::new(dictionary! {}, state.content.clone()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::from(state.width),
                    Object::from(state.height),
                ],
                "Resources" => resources,
                "Contents" => contents_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    fn page(&self, page: usize) -> Result<&PageState> {
        let count = self.pages.len();
        if page == 0 || page > count {
            return Err(PdfError::InvalidPage(page, count));
        }
        Ok(&self.pages[page - 1])
    }

    fn page_mut(&mut self, page: usize) -> Result<&mut PageState> {
        let count = self.pages.len();
        if page == 0 || page > count {
            return Err(PdfError::InvalidPage(page, count));
        }
        Ok(&mut self.pages[page - 1])
    }

    fn append_content(&mut self, page: usize, operators: &[u8]) -> Result<()> {
        self.page_mut(page)?.content.extend_from_slice(operators);
        Ok(())
    }
}

fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}
