//! Authoring space to PDF space

use pdf_core::Rect;

/// Maps top-left authoring coordinates onto a bottom-left PDF page
///
/// Every position and size drawn by the renderers goes through this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfTransform {
    page_width: f64,
    page_height: f64,
    scale_x: f64,
    scale_y: f64,
}

fn ratio(physical: f64, canvas: f64) -> f64 {
    let scale = physical / canvas;
    if canvas.is_finite() && canvas > 0.0 && scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

impl PdfTransform {
    /// Page size in points and canvas size in authoring units
    pub fn new(page_width: f64, page_height: f64, canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            page_width,
            page_height,
            scale_x: ratio(page_width, canvas_width),
            scale_y: ratio(page_height, canvas_height),
        }
    }

    pub fn page_size(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    /// Horizontal length or X position
    pub fn sx(&self, v: f64) -> f64 {
        v * self.scale_x
    }

    /// Vertical length
    pub fn sy(&self, v: f64) -> f64 {
        v * self.scale_y
    }

    /// Top-origin Y to bottom-origin Y
    pub fn y(&self, y: f64) -> f64 {
        self.page_height - y * self.scale_y
    }

    /// Bottom-origin Y of the top edge of a box at `y`
    pub fn top_y(&self, y: f64) -> f64 {
        self.y(y)
    }

    /// Bottom-origin Y of the bottom edge of a box at `y` with height `h`
    pub fn bottom_y(&self, y: f64, h: f64) -> f64 {
        self.y(y + h)
    }

    /// Font sizes scale with the smaller axis so glyphs never overflow
    pub fn font_size(&self, size: f64) -> f64 {
        size * self.scale_x.min(self.scale_y)
    }

    /// Authoring box to a PDF rectangle (lower-left origin)
    pub fn rect(&self, x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(self.sx(x), self.bottom_y(y, h), self.sx(w), self.sy(h))
    }

    /// Whether an authoring point lies on the canvas
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (px, py) = (self.sx(x), self.y(y));
        (0.0..=self.page_width).contains(&px) && (0.0..=self.page_height).contains(&py)
    }
}
