//! Label sheet body
//!
//! Authoring units on a label sheet are millimetres. One record yields one
//! label design, printed `copies` times across a fixed grid.

use image::{DynamicImage, Luma};
use qrcode::{EcLevel, QrCode};

use crate::parser::{display_value, field_value, value_to_string};
use crate::renderer::{BoxArea, RenderContext, TextStyle};
use crate::warnings::Warning;
use crate::{Align, Color, DrawPhase, LabelSheetSpec, Overflow, PreviewMode, Result};

const MAX_COPIES: u32 = 1000;
/// Largest grid accepted on one sheet
const MAX_GRID_CELLS: usize = 10_000;
const MAX_SUB_LINES: usize = 3;
const PT_TO_MM: f64 = 25.4 / 72.0;
/// Inner padding of a label, mm
const LABEL_PADDING: f64 = 2.0;
const TITLE_SHARE: f64 = 0.45;
const QR_PLACEHOLDER: &str = "QR";
const ELEMENT_ID: &str = "labelSheet";

/// Cell size and origin of the label grid, mm
#[derive(Debug, Clone, Copy, PartialEq)]
struct Grid {
    cols: usize,
    per_page: usize,
    left: f64,
    top: f64,
    cell_w: f64,
    cell_h: f64,
    gap_x: f64,
    gap_y: f64,
}

impl Grid {
    fn new(sheet: &LabelSheetSpec) -> Option<Self> {
        let m = sheet.margin_mm;
        let usable_w = sheet.paper_width_mm - m.left - m.right;
        let usable_h = sheet.paper_height_mm - m.top - m.bottom;
        if usable_w <= 0.0 || usable_h <= 0.0 {
            return None;
        }
        let cols = usize::try_from(sheet.cols).ok()?;
        let per_page = cols
            .checked_mul(usize::try_from(sheet.rows).ok()?)
            .filter(|&n| (1..=MAX_GRID_CELLS).contains(&n))?;
        let (gap_x, gap_y) = (sheet.gap_mm.x.max(0.0), sheet.gap_mm.y.max(0.0));
        let cell_w = (usable_w - gap_x * f64::from(sheet.cols - 1)) / f64::from(sheet.cols);
        let cell_h = (usable_h - gap_y * f64::from(sheet.rows - 1)) / f64::from(sheet.rows);
        if cell_w <= 0.0 || cell_h <= 0.0 {
            return None;
        }
        Some(Self {
            cols,
            per_page,
            left: m.left + sheet.offset_mm.x,
            top: m.top + sheet.offset_mm.y,
            cell_w,
            cell_h,
            gap_x,
            gap_y,
        })
    }

    /// Box of the label at `index` on its page, row-major
    fn cell(&self, index: usize) -> BoxArea {
        let slot = index % self.per_page;
        let col = (slot % self.cols) as f64;
        let row = (slot / self.cols) as f64;
        BoxArea::new(
            self.left + col * (self.cell_w + self.gap_x),
            self.top + row * (self.cell_h + self.gap_y),
            self.cell_w,
            self.cell_h,
        )
    }
}

/// Text content shared by every copy
struct LabelContent {
    title: String,
    subs: Vec<String>,
    qr: Option<Vec<u8>>,
}

fn mapped_text(ctx: &mut RenderContext<'_>, code: Option<&str>) -> String {
    let Some(code) = code.filter(|c| !c.is_empty()) else {
        return String::new();
    };
    if ctx.preview_mode == PreviewMode::FieldCode {
        return code.to_string();
    }
    let Some(record) = ctx.record.as_ref() else {
        return String::new();
    };
    match field_value(record, code).cloned() {
        Some(value) => display_value(&value, code, &mut ctx.sink),
        None => {
            ctx.warn(Warning::data("field not found in record").with("fieldCode", code));
            String::new()
        }
    }
}

/// Copies requested by the record, clamped to `1..=1000`
fn copies(ctx: &mut RenderContext<'_>, code: Option<&str>) -> u32 {
    let Some(code) = code.filter(|c| !c.is_empty()) else {
        return 1;
    };
    if ctx.preview_mode == PreviewMode::FieldCode {
        return 1;
    }
    let raw = ctx
        .record
        .as_ref()
        .and_then(|record| field_value(record, code))
        .map(value_to_string)
        .unwrap_or_default();
    match parse_copies(&raw) {
        Some(n) => n,
        None => {
            if !raw.trim().is_empty() {
                ctx.warn(
                    Warning::data("copies is not a number; printing one")
                        .with("fieldCode", code)
                        .with("value", &raw),
                );
            }
            1
        }
    }
}

fn parse_copies(raw: &str) -> Option<u32> {
    let n = raw.trim().replace(',', "").parse::<f64>().ok()?;
    if !n.is_finite() {
        return None;
    }
    Some(n.trunc().clamp(1.0, f64::from(MAX_COPIES)) as u32)
}

/// PNG bitmap of a QR code
fn qr_png(payload: &str) -> std::result::Result<Vec<u8>, String> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| e.to_string())?;
    let bitmap = code.render::<Luma<u8>>().min_dimensions(200, 200).build();
    pdf_core::encode_png(&DynamicImage::ImageLuma8(bitmap)).map_err(|e| e.to_string())
}

fn load_content(ctx: &mut RenderContext<'_>, sheet: &LabelSheetSpec) -> LabelContent {
    let mapping = &sheet.mapping;
    let title = mapped_text(ctx, mapping.title_field.as_deref());
    if mapping.sub_fields.len() > MAX_SUB_LINES {
        ctx.warn(Warning::layout(format!(
            "label sheet prints at most {MAX_SUB_LINES} sub fields"
        )));
    }
    let subs = mapping
        .sub_fields
        .iter()
        .take(MAX_SUB_LINES)
        .map(|code| mapped_text(ctx, Some(code)))
        .collect();

    let payload = mapped_text(ctx, mapping.qr_field.as_deref());
    let qr = if payload.is_empty() {
        None
    } else {
        match qr_png(&payload) {
            Ok(png) => Some(png),
            Err(e) => {
                ctx.warn(Warning::image(format!("QR code generation failed: {e}")));
                None
            }
        }
    };
    LabelContent { title, subs, qr }
}

fn draw_label(
    ctx: &mut RenderContext<'_>,
    sheet: &LabelSheetSpec,
    content: &LabelContent,
    cell: BoxArea,
) -> Result<()> {
    if sheet.show_borders {
        ctx.draw_box(cell, None, Some(Color::gray(0.7)), 0.5)?;
    }
    let inner = BoxArea::new(
        cell.x + LABEL_PADDING,
        cell.y + LABEL_PADDING,
        (cell.w - 2.0 * LABEL_PADDING).max(0.0),
        (cell.h - 2.0 * LABEL_PADDING).max(0.0),
    );

    let qr_side = inner.h.min(inner.w * 0.4);
    let qr_area = BoxArea::new(inner.x + inner.w - qr_side, inner.y, qr_side, qr_side);
    let text_w = (inner.w - qr_side - LABEL_PADDING).max(0.0);

    let title_size = sheet.title_font_size * PT_TO_MM;
    let title_area = BoxArea::new(inner.x, inner.y, text_w, inner.h * TITLE_SHARE);
    ctx.draw_title(
        ELEMENT_ID,
        DrawPhase::Label,
        &content.title,
        title_area,
        title_size,
        title_size / 2.0,
        Align::Left,
    )?;

    let sub_size = sheet.sub_font_size * PT_TO_MM;
    let style = TextStyle::new(sub_size).overflow(Overflow::Ellipsis);
    let sub_top = title_area.y + title_area.h;
    let sub_h = (inner.h - title_area.h) / MAX_SUB_LINES as f64;
    for (i, text) in content.subs.iter().enumerate() {
        let slot = BoxArea::new(inner.x, sub_top + i as f64 * sub_h, text_w, sub_h);
        ctx.draw_text_box(ELEMENT_ID, DrawPhase::Label, text, slot, &style)?;
    }

    match &content.qr {
        Some(png) => {
            if let Err(e) = ctx.draw_image(png, qr_area) {
                ctx.warn(Warning::image(format!("QR code could not be embedded: {e}")));
                ctx.draw_placeholder(ELEMENT_ID, DrawPhase::Label, qr_area, QR_PLACEHOLDER)?;
            }
        }
        None => ctx.draw_placeholder(ELEMENT_ID, DrawPhase::Label, qr_area, QR_PLACEHOLDER)?,
    }
    Ok(())
}

pub(crate) fn render(ctx: &mut RenderContext<'_>, sheet: &LabelSheetSpec) -> Result<()> {
    ctx.new_page()?;
    let Some(grid) = Grid::new(sheet) else {
        ctx.warn(
            Warning::layout("label sheet has no usable area")
                .with("cols", sheet.cols)
                .with("rows", sheet.rows),
        );
        return Ok(());
    };

    let copies = copies(ctx, sheet.mapping.copies_field.as_deref()) as usize;
    let content = load_content(ctx, sheet);
    log::debug!(
        "label sheet {}x{}: {} copies, cell {:.1}x{:.1} mm",
        sheet.cols,
        sheet.rows,
        copies,
        grid.cell_w,
        grid.cell_h
    );

    for index in 0..copies {
        if index > 0 && index % grid.per_page == 0 {
            ctx.new_page()?;
        }
        draw_label(ctx, sheet, &content, grid.cell(index))?;
    }
    Ok(())
}
