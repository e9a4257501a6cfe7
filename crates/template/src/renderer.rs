//! Template renderer - drives page creation and element drawing

use std::time::Duration;

use pdf_core::{mm_to_pt, PdfDocument, ShapeStyle};
use serde_json::Value;
use text_fit::{
    ellipsis_marker, ellipsis_to_width, fit_title_up_to_2_lines, shrink_to_fit, wrap_to_lines,
    LINE_HEIGHT_FACTOR,
};

use crate::blocks::{card_list, label_sheet, static_elements, table};
use crate::fonts::{FontBytes, FontSet};
use crate::images::{ImageCache, ImageFetcher};
use crate::parser::resolve_data_source;
use crate::transform::PdfTransform;
use crate::warnings::{Warning, WarningSink};
use crate::{
    Align, Color, DataSource, DrawPhase, Overflow, PreviewMode, Region, Repeat, Result,
    StructureType, TemplateDataRecord, TemplateDefinition, TemplateElement, TemplateError,
};

/// Record key receiving the grand total of the `amount` column
pub const COMPUTED_TOTAL_KEY: &str = "__computedTotal";

/// Space kept free above the bottom edge when no footer bound is declared
const DEFAULT_FOOTER_RESERVE: f64 = 40.0;
/// Body top on continuation pages when no header is declared
const DEFAULT_TOP_MARGIN: f64 = 40.0;
/// Gap between the lowest repeated header element and the body
const HEADER_GAP: f64 = 8.0;
const PAGE_NUMBER_SIZE: f64 = 9.0;
const PAGE_NUMBER_OFFSET: f64 = 20.0;
/// Baseline position within a line box, as a multiple of font size
const BASELINE_RATIO: f64 = 0.9;
const DEFAULT_MAX_PAGES: usize = 2000;

/// One drawn text run, reported to the `on_text` callback (PDF space)
#[derive(Debug, Clone, PartialEq)]
pub struct TextDrawEvent {
    /// Page number (1-indexed)
    pub page: usize,
    pub text: String,
    /// Anchor X in points; meaning depends on `align`
    pub x: f64,
    /// Baseline Y in points from the bottom
    pub y: f64,
    pub font_size: f64,
    pub font: &'static str,
    pub align: Align,
    pub element_id: String,
    pub phase: DrawPhase,
}

type TextCallback = Box<dyn FnMut(&TextDrawEvent)>;
type PageCallback = Box<dyn FnMut(usize)>;

/// Per-call render settings
pub struct RenderOptions {
    pub debug: bool,
    pub preview_mode: PreviewMode,
    /// Correlation id attached to log lines
    pub request_id: Option<String>,
    pub image_timeout: Duration,
    /// Rendering fails with [`TemplateError::PageLimitExceeded`] past this many pages
    pub max_pages: usize,
    image_fetcher: Option<Box<dyn ImageFetcher>>,
    on_text: Option<TextCallback>,
    on_page: Option<PageCallback>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            debug: false,
            preview_mode: PreviewMode::Record,
            request_id: None,
            image_timeout: Duration::from_secs(5),
            max_pages: DEFAULT_MAX_PAGES,
            image_fetcher: None,
            on_text: None,
            on_page: None,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_preview_mode(mut self, mode: PreviewMode) -> Self {
        self.preview_mode = mode;
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Replace the default HTTP fetcher
    pub fn with_image_fetcher(mut self, fetcher: impl ImageFetcher + 'static) -> Self {
        self.image_fetcher = Some(Box::new(fetcher));
        self
    }

    /// Called for every text run drawn
    pub fn on_text(mut self, callback: impl FnMut(&TextDrawEvent) + 'static) -> Self {
        self.on_text = Some(Box::new(callback));
        self
    }

    /// Called with the page number whenever a page is appended
    pub fn on_page(mut self, callback: impl FnMut(usize) + 'static) -> Self {
        self.on_page = Some(Box::new(callback));
        self
    }
}

/// Rendered document plus the warnings collected on the way
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub bytes: Vec<u8>,
    pub warnings: Vec<String>,
    pub page_count: usize,
}

/// Vertical placement of a text block inside its box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VAlign {
    Top,
    Middle,
}

/// How text is fitted into a box
#[derive(Debug, Clone, Copy)]
pub(crate) struct TextStyle {
    pub size: f64,
    pub min_size: f64,
    pub align: Align,
    pub color: Color,
    pub overflow: Overflow,
    pub valign: VAlign,
    pub padding: f64,
}

impl TextStyle {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            min_size: size.min(6.0),
            align: Align::Left,
            color: Color::black(),
            overflow: Overflow::Ellipsis,
            valign: VAlign::Middle,
            padding: 0.0,
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn valign(mut self, valign: VAlign) -> Self {
        self.valign = valign;
        self
    }

    pub fn padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    pub fn min_size(mut self, min_size: f64) -> Self {
        self.min_size = min_size.min(self.size);
        self
    }
}

/// Authoring-space box
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoxArea {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoxArea {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

/// Header and footer elements split by when they are drawn
#[derive(Default)]
struct PageFurniture<'a> {
    /// Drawn as each page is created
    headers: Vec<&'a TemplateElement>,
    /// Drawn once every page exists
    deferred: Vec<&'a TemplateElement>,
    body_static: Vec<&'a TemplateElement>,
}

/// Mutable state of one render call
pub(crate) struct RenderContext<'a> {
    pub template: &'a TemplateDefinition,
    pub record: Option<TemplateDataRecord>,
    pub doc: PdfDocument,
    pub fonts: FontSet,
    pub transform: PdfTransform,
    pub sink: WarningSink,
    pub images: ImageCache,
    pub preview_mode: PreviewMode,
    pub page: usize,
    canvas: (f64, f64),
    max_pages: usize,
    furniture: PageFurniture<'a>,
    on_text: Option<TextCallback>,
    on_page: Option<PageCallback>,
}

impl<'a> RenderContext<'a> {
    pub fn warn(&mut self, warning: Warning) {
        self.sink.push(warning);
    }

    /// Resolve a data source against the working record
    pub fn resolve(&mut self, source: &DataSource) -> String {
        resolve_data_source(source, self.record.as_ref(), self.preview_mode, &mut self.sink)
    }

    /// Append a page and draw the header elements that apply to it
    pub fn new_page(&mut self) -> Result<usize> {
        if self.doc.page_count() >= self.max_pages {
            return Err(TemplateError::PageLimitExceeded {
                limit: self.max_pages,
            });
        }
        let (w, h) = self.transform.page_size();
        self.page = self.doc.add_page(w, h);
        log::debug!("template '{}': page {}", self.template.id, self.page);
        if let Some(callback) = self.on_page.as_mut() {
            callback(self.page);
        }

        let page = self.page;
        let headers: Vec<&'a TemplateElement> = self
            .furniture
            .headers
            .iter()
            .copied()
            .filter(|el| el.base().repeat != Repeat::FirstPageOnly || page == 1)
            .collect();
        for el in headers {
            static_elements::draw(self, el, DrawPhase::Header)?;
        }
        Ok(page)
    }

    /// Bottom limit of body content in authoring units
    pub fn body_bottom(&self) -> f64 {
        let reserve = self
            .template
            .footer_reserve_height
            .unwrap_or(DEFAULT_FOOTER_RESERVE);
        let mut bottom = self.canvas.1 - reserve;
        if let Some(footer_top) = self.template.region_bounds.and_then(|b| b.footer_top) {
            bottom = bottom.min(footer_top);
        }
        self.template
            .elements
            .iter()
            .filter(|el| el.region() == Region::Footer)
            .fold(bottom, |acc, el| acc.min(el.base().position.y))
    }

    /// Top of body content on continuation pages
    pub fn continuation_top(&self) -> f64 {
        if let Some(header_bottom) = self.template.region_bounds.and_then(|b| b.header_bottom) {
            return header_bottom;
        }
        self.furniture
            .headers
            .iter()
            .filter(|el| el.base().repeat == Repeat::EveryPage)
            .map(|el| el.base().bottom())
            .reduce(f64::max)
            .map_or(DEFAULT_TOP_MARGIN, |bottom| bottom + HEADER_GAP)
    }

    /// Draw one line of text; `x` is the anchor for `align`
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text_line(
        &mut self,
        element_id: &str,
        phase: DrawPhase,
        text: &str,
        x: f64,
        baseline: f64,
        size: f64,
        align: Align,
        color: Color,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if !self.transform.contains(x, baseline) {
            self.sink.push(
                Warning::layout("text positioned outside the page")
                    .with("element", element_id)
                    .with("page", self.page),
            );
        }
        let font = self.fonts.font_name_for(text);
        let pdf_size = self.transform.font_size(size);
        let (px, py) = (self.transform.sx(x), self.transform.y(baseline));
        let page = self.page;

        self.doc.set_text_color(color.to_pdf());
        self.doc
            .set_font(font, pdf_size as f32)
            .and_then(|()| self.doc.insert_text(text, page, px, py, align.to_pdf()))
            .map_err(|source| TemplateError::TextDraw {
                template_id: self.template.id.clone(),
                element_id: element_id.to_string(),
                phase,
                source,
            })?;

        if let Some(callback) = self.on_text.as_mut() {
            callback(&TextDrawEvent {
                page,
                text: text.to_string(),
                x: px,
                y: py,
                font_size: pdf_size,
                font,
                align,
                element_id: element_id.to_string(),
                phase,
            });
        }
        Ok(())
    }

    /// Lines and font size for text fitted to a box width
    pub fn fit_lines(&self, text: &str, width: f64, style: &TextStyle) -> (Vec<String>, f64) {
        let inner = (width - 2.0 * style.padding).max(0.0);
        let single = || text.replace('\n', " ");
        match style.overflow {
            Overflow::Wrap => (wrap_to_lines(text, &self.fonts, style.size, inner), style.size),
            Overflow::Shrink => {
                let line = single();
                let size = shrink_to_fit(&line, &self.fonts, style.size, inner, style.min_size);
                (vec![line], size)
            }
            Overflow::Ellipsis => (
                vec![ellipsis_to_width(&single(), &self.fonts, style.size, inner)],
                style.size,
            ),
            Overflow::Clip => (vec![single()], style.size),
        }
    }

    /// Draw text fitted into a box
    ///
    /// Wrapped text that runs past the box bottom is cut at the last line
    /// that fits, which gets an ellipsis.
    pub fn draw_text_box(
        &mut self,
        element_id: &str,
        phase: DrawPhase,
        text: &str,
        area: BoxArea,
        style: &TextStyle,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let (mut lines, size) = self.fit_lines(text, area.w, style);
        let line_h = size * LINE_HEIGHT_FACTOR;
        let inner_w = (area.w - 2.0 * style.padding).max(0.0);

        // tolerance keeps rows sized for exactly n lines from losing one
        let room = ((area.h - 2.0 * style.padding) / line_h + 1e-6)
            .floor()
            .max(1.0) as usize;
        if lines.len() > room {
            let cut = format!("{}{}", lines[room - 1], lines[room]);
            let mut last = ellipsis_to_width(&cut, &self.fonts, size, inner_w);
            if last == cut {
                last = format!("{}{}", lines[room - 1], ellipsis_marker(text));
            }
            lines.truncate(room);
            lines[room - 1] = last;
        }

        let block_h = lines.len() as f64 * line_h;
        let top = match style.valign {
            VAlign::Top => area.y + style.padding,
            VAlign::Middle => area.y + (area.h - block_h) / 2.0,
        };
        let x = match style.align {
            Align::Left => area.x + style.padding,
            Align::Center => area.x + area.w / 2.0,
            Align::Right => area.x + area.w - style.padding,
        };
        for (i, line) in lines.iter().enumerate() {
            let baseline = top + i as f64 * line_h + size * BASELINE_RATIO;
            self.draw_text_line(
                element_id,
                phase,
                line,
                x,
                baseline,
                size,
                style.align,
                style.color,
            )?;
        }
        Ok(())
    }

    /// Title fitted into up to two lines, vertically centered in `area`
    #[allow(clippy::too_many_arguments)]
    pub fn draw_title(
        &mut self,
        element_id: &str,
        phase: DrawPhase,
        text: &str,
        area: BoxArea,
        max_size: f64,
        min_size: f64,
        align: Align,
    ) -> Result<()> {
        let fit = fit_title_up_to_2_lines(text, &self.fonts, area.w, area.h, max_size, min_size);
        let line_h = fit.font_size * LINE_HEIGHT_FACTOR;
        let top = area.y + (area.h - line_h * fit.lines.len() as f64) / 2.0;
        let style = TextStyle::new(fit.font_size)
            .align(align)
            .overflow(Overflow::Clip);
        for (i, line) in fit.lines.iter().enumerate() {
            let slot = BoxArea::new(area.x, top + i as f64 * line_h, area.w, line_h);
            self.draw_text_box(element_id, phase, line, slot, &style)?;
        }
        Ok(())
    }

    /// Fill and/or stroke an authoring-space rectangle
    pub fn draw_box(
        &mut self,
        area: BoxArea,
        fill: Option<Color>,
        stroke: Option<Color>,
        line_width: f64,
    ) -> Result<()> {
        if fill.is_none() && stroke.is_none() {
            return Ok(());
        }
        let rect = self.transform.rect(area.x, area.y, area.w, area.h);
        let style = ShapeStyle {
            fill: fill.map(Color::to_pdf),
            stroke: stroke.map(Color::to_pdf),
            line_width,
        };
        self.doc.draw_rect(self.page, rect, &style)?;
        Ok(())
    }

    pub fn draw_rounded_box(
        &mut self,
        area: BoxArea,
        radius: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
        line_width: f64,
    ) -> Result<()> {
        let rect = self.transform.rect(area.x, area.y, area.w, area.h);
        let radius = self.transform.sx(radius).min(self.transform.sy(radius));
        let style = ShapeStyle {
            fill: fill.map(Color::to_pdf),
            stroke: stroke.map(Color::to_pdf),
            line_width,
        };
        self.doc.draw_rounded_rect(self.page, rect, radius, &style)?;
        Ok(())
    }

    pub fn draw_line(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        line_width: f64,
    ) -> Result<()> {
        let from = (self.transform.sx(from.0), self.transform.y(from.1));
        let to = (self.transform.sx(to.0), self.transform.y(to.1));
        self.doc
            .draw_line(self.page, from, to, color.to_pdf(), line_width)?;
        Ok(())
    }

    /// Place image bytes centered in a box, preserving aspect ratio
    pub fn draw_image(&mut self, data: &[u8], area: BoxArea) -> pdf_core::Result<()> {
        let rect = self.transform.rect(area.x, area.y, area.w, area.h);
        self.doc.insert_image(data, self.page, rect)
    }

    /// Bordered gray box with a centered caption
    pub fn draw_placeholder(
        &mut self,
        element_id: &str,
        phase: DrawPhase,
        area: BoxArea,
        caption: &str,
    ) -> Result<()> {
        self.draw_box(area, Some(Color::gray(0.92)), Some(Color::gray(0.6)), 0.75)?;
        let size = (area.h * 0.3).clamp(1.0, 10.0);
        let style = TextStyle::new(size)
            .align(Align::Center)
            .color(Color::gray(0.45))
            .overflow(Overflow::Clip);
        self.draw_text_box(element_id, phase, caption, area, &style)
    }

    /// Draw deferred headers, footers and page numbers on every page
    fn finish_pages(&mut self) -> Result<()> {
        let total = self.doc.page_count();
        let deferred = self.furniture.deferred.clone();
        let stamp = self.template.show_page_numbers && !self.template.is_label_sheet();
        for page in 1..=total {
            self.page = page;
            for el in deferred.iter().copied() {
                if el.base().repeat.applies(page, total) {
                    let phase = match el.region() {
                        Region::Header => DrawPhase::Header,
                        _ => DrawPhase::Footer,
                    };
                    static_elements::draw(self, el, phase)?;
                }
            }
            if stamp {
                let (w, h) = self.canvas;
                self.draw_text_line(
                    "page-number",
                    DrawPhase::PageNumber,
                    &format!("{page} / {total}"),
                    w / 2.0,
                    h - PAGE_NUMBER_OFFSET,
                    PAGE_NUMBER_SIZE,
                    Align::Center,
                    Color::gray(0.3),
                )?;
            }
        }
        Ok(())
    }

    /// Record the grand total so footer elements can display it
    pub fn set_computed_total(&mut self, total: String) {
        if let Some(record) = self.record.as_mut() {
            record.insert(COMPUTED_TOTAL_KEY.to_string(), Value::String(total));
        }
    }
}

/// Split elements into per-page headers, deferred furniture and body statics
fn classify(elements: &[TemplateElement]) -> PageFurniture<'_> {
    let mut furniture = PageFurniture::default();
    for el in elements.iter().filter(|el| el.is_static()) {
        match (el.region(), el.base().repeat) {
            (Region::Header, Repeat::LastPageOnly) => furniture.deferred.push(el),
            (Region::Header, _) => furniture.headers.push(el),
            (Region::Footer, _) => furniture.deferred.push(el),
            (Region::Body, _) => furniture.body_static.push(el),
        }
    }
    furniture
}

/// The single body block: preferred id first, else the first match
fn select_body<'a, T>(
    elements: &'a [TemplateElement],
    pick: fn(&'a TemplateElement) -> Option<&'a T>,
    preferred_id: &str,
    kind: &str,
    sink: &mut WarningSink,
) -> Option<&'a T> {
    let candidates: Vec<(&str, &'a T)> = elements
        .iter()
        .filter_map(|el| pick(el).map(|t| (el.id(), t)))
        .collect();
    if candidates.len() > 1 {
        sink.push(
            Warning::layout(format!("template has {} {kind} elements; rendering one", candidates.len()))
                .with("kind", kind),
        );
    }
    candidates
        .iter()
        .find(|(id, _)| *id == preferred_id)
        .or(candidates.first())
        .map(|(_, t)| *t)
}

fn page_geometry(template: &TemplateDefinition, sink: &mut WarningSink) -> (f64, f64, f64, f64) {
    if template.is_label_sheet() {
        match &template.label_sheet {
            Some(sheet) if sheet.paper_width_mm > 0.0 && sheet.paper_height_mm > 0.0 => {
                return (
                    mm_to_pt(sheet.paper_width_mm),
                    mm_to_pt(sheet.paper_height_mm),
                    sheet.paper_width_mm,
                    sheet.paper_height_mm,
                );
            }
            _ => sink.push(Warning::layout("label sheet has no usable paper size")),
        }
    }
    let (pw, ph) = template.page_size_pt();
    let (cw, ch) = template.canvas_size();
    (pw, ph, cw, ch)
}

/// Render a template and optional record to PDF bytes
///
/// Only text-draw failures, the page ceiling, unusable font bytes and PDF
/// serialization abort rendering; everything else degrades into warnings.
pub fn render_template_to_pdf(
    template: &TemplateDefinition,
    data: Option<&TemplateDataRecord>,
    fonts: FontBytes<'_>,
    options: RenderOptions,
) -> Result<RenderOutput> {
    let RenderOptions {
        debug,
        preview_mode,
        request_id,
        image_timeout,
        max_pages,
        image_fetcher,
        on_text,
        on_page,
    } = options;
    let mut sink = WarningSink::new(debug, request_id);
    log::debug!(
        "rendering template '{}' ({} elements, {:?})",
        template.id,
        template.elements.len(),
        preview_mode
    );

    let fonts = FontSet::load(fonts)?;
    let mut doc = PdfDocument::new();
    fonts.register(&mut doc)?;

    let (pw, ph, cw, ch) = page_geometry(template, &mut sink);
    let transform = PdfTransform::new(pw, ph, cw, ch);

    let mut images = ImageCache::new();
    if preview_mode == PreviewMode::Record && !template.is_label_sheet() {
        let urls: Vec<String> = template
            .elements
            .iter()
            .filter_map(|el| match el {
                TemplateElement::Image(img) => Some(resolve_data_source(
                    &img.data_source,
                    data,
                    preview_mode,
                    &mut sink,
                )),
                _ => None,
            })
            .collect();
        if !urls.iter().all(String::is_empty) {
            let fetcher = image_fetcher.or_else(default_fetcher);
            images.prefetch(
                urls.iter().map(String::as_str),
                fetcher.as_deref(),
                image_timeout,
                &mut sink,
            );
        }
    }

    let mut ctx = RenderContext {
        template,
        record: data.cloned(),
        doc,
        fonts,
        transform,
        sink,
        images,
        preview_mode,
        page: 0,
        canvas: (cw, ch),
        max_pages: max_pages.max(1),
        furniture: PageFurniture::default(),
        on_text,
        on_page,
    };

    if template.is_label_sheet() {
        match &template.label_sheet {
            Some(sheet) => label_sheet::render(&mut ctx, sheet)?,
            None => {
                ctx.new_page()?;
            }
        }
    } else {
        ctx.furniture = classify(&template.elements);
        ctx.new_page()?;
        for el in ctx.furniture.body_static.clone() {
            static_elements::draw(&mut ctx, el, static_elements::own_phase(el))?;
        }
        render_body(&mut ctx)?;
    }
    ctx.finish_pages()?;

    let bytes = ctx.doc.to_bytes()?;
    let page_count = ctx.doc.page_count();
    log::debug!(
        "template '{}': {} pages, {} bytes, {} warnings",
        template.id,
        page_count,
        bytes.len(),
        ctx.sink.len()
    );
    Ok(RenderOutput {
        bytes,
        warnings: ctx.sink.into_strings(),
        page_count,
    })
}

fn render_body(ctx: &mut RenderContext<'_>) -> Result<()> {
    let template = ctx.template;
    let prefer_cards = template.structure_type == StructureType::CardsV1;

    let table = select_body(
        &template.elements,
        TemplateElement::as_table,
        "items",
        "table",
        &mut ctx.sink,
    );
    let cards = select_body(
        &template.elements,
        TemplateElement::as_card_list,
        "cards",
        "cardList",
        &mut ctx.sink,
    );
    match (table, cards) {
        (Some(_), Some(_)) => ctx.warn(Warning::layout(
            "template has both a table and a card list; rendering one",
        )),
        (None, None) => ctx.warn(Warning::debug("template has no body block")),
        _ => {}
    }

    match (table, cards) {
        (Some(t), Some(_)) if !prefer_cards => table::render(ctx, t),
        (_, Some(c)) => card_list::render(ctx, c),
        (Some(t), None) => table::render(ctx, t),
        (None, None) => Ok(()),
    }
}

#[cfg(feature = "http")]
fn default_fetcher() -> Option<Box<dyn ImageFetcher>> {
    match crate::images::HttpImageFetcher::new() {
        Ok(fetcher) => Some(Box::new(fetcher)),
        Err(e) => {
            log::warn!("HTTP image fetcher unavailable: {e}");
            None
        }
    }
}

#[cfg(not(feature = "http"))]
fn default_fetcher() -> Option<Box<dyn ImageFetcher>> {
    None
}
