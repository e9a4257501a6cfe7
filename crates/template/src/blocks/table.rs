//! Table body: dynamic row heights, pagination and summary rows
//!
//! A table runs through a small state machine: header row, body rows, any
//! number of page breaks (each optionally closed by a subtotal block), and
//! the trailing summary block. Breaks happen when the next row, plus the
//! subtotal block it would force in subtotal mode, would cross the body
//! bottom. A row that does not fit even on a fresh page is drawn anyway and
//! reported as a layout warning, so pagination always advances.

use serde_json::Value;
use text_fit::LINE_HEIGHT_FACTOR;

use crate::decimal::{parse_decimal_value, ScaledDecimal};
use crate::format::{default_align, format_value};
use crate::parser::{display_value, field_value};
use crate::renderer::{BoxArea, RenderContext, TextStyle, VAlign};
use crate::warnings::Warning;
use crate::{
    Align, Color, DrawPhase, Overflow, PreviewMode, Result, SummaryMode, SummaryOp,
    SummaryRow, SummaryStyle, TableColumn, TableElement, TemplateDataRecord,
};

const CELL_PADDING: f64 = 3.0;
const GRID_WIDTH: f64 = 0.5;
const TOTAL_RULE_WIDTH: f64 = 1.5;
/// Column whose total is written back to the record
const AMOUNT_COLUMN: &str = "amount";

struct Column<'t> {
    spec: &'t TableColumn,
    x: f64,
    width: f64,
}

/// Columns left to right; unsized columns share what fixed widths leave
fn layout_columns<'t>(ctx: &mut RenderContext<'_>, table: &'t TableElement) -> Vec<Column<'t>> {
    let fixed: f64 = table.columns.iter().filter_map(|c| c.width).sum();
    let auto_count = table.columns.iter().filter(|c| c.width.is_none()).count();
    let remaining = table.base.size.width - fixed;
    let auto_width = if auto_count == 0 {
        0.0
    } else if remaining > 0.0 {
        remaining / auto_count as f64
    } else {
        ctx.warn(
            Warning::layout("no width left for unsized columns").with("element", &table.base.id),
        );
        0.0
    };

    let mut x = table.base.position.x;
    table
        .columns
        .iter()
        .map(|spec| {
            let width = spec.width.unwrap_or(auto_width);
            let column = Column { spec, x, width };
            x += width;
            column
        })
        .collect()
}

/// Trailer block flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trailer {
    Subtotal,
    Total,
}

struct SummaryLine<'t> {
    row: &'t SummaryRow,
    column: usize,
    field_code: Option<String>,
}

impl SummaryLine<'_> {
    fn label(&self, trailer: Trailer) -> String {
        let specific = match trailer {
            Trailer::Subtotal => &self.row.subtotal_label,
            Trailer::Total => &self.row.total_label,
        };
        specific
            .as_ref()
            .or(self.row.label.as_ref())
            .cloned()
            .unwrap_or_else(|| match trailer {
                Trailer::Subtotal => "Subtotal".to_string(),
                Trailer::Total => "Total".to_string(),
            })
    }

    fn included_in(&self, trailer: Trailer) -> bool {
        match trailer {
            Trailer::Subtotal => self.row.kind.in_subtotal(),
            Trailer::Total => self.row.kind.in_total(),
        }
    }
}

/// Page and grand accumulators for every summary line
struct Summaries<'t> {
    mode: SummaryMode,
    style: SummaryStyle,
    lines: Vec<SummaryLine<'t>>,
    page: Vec<ScaledDecimal>,
    grand: Vec<ScaledDecimal>,
    /// Field summed silently when no line targets the amount column
    fallback: Option<(String, ScaledDecimal)>,
}

impl<'t> Summaries<'t> {
    fn new(
        ctx: &mut RenderContext<'_>,
        spec: Option<&'t crate::SummarySpec>,
        columns: &[Column<'t>],
    ) -> Self {
        let mut lines = Vec::new();
        for row in spec.map(|s| s.rows.as_slice()).unwrap_or_default() {
            let Some(column) = columns.iter().position(|c| c.spec.id == row.column_id) else {
                ctx.warn(
                    Warning::layout("summary row targets an unknown column")
                        .with("columnId", &row.column_id),
                );
                continue;
            };
            let field_code = row
                .field_code
                .clone()
                .or_else(|| columns[column].spec.field_code.clone());
            if row.op == SummaryOp::Sum && field_code.is_none() {
                ctx.warn(
                    Warning::layout("summary row has no field to sum")
                        .with("columnId", &row.column_id),
                );
            }
            lines.push(SummaryLine {
                row,
                column,
                field_code,
            });
        }

        let targets_amount = lines
            .iter()
            .any(|l| l.row.op == SummaryOp::Sum && l.row.column_id == AMOUNT_COLUMN);
        let fallback = if targets_amount {
            None
        } else {
            columns
                .iter()
                .find(|c| c.spec.id == AMOUNT_COLUMN)
                .and_then(|c| c.spec.field_code.clone())
                .map(|code| (code, ScaledDecimal::ZERO))
        };

        let n = lines.len();
        Self {
            mode: spec.map(|s| s.mode).unwrap_or_default(),
            style: spec.map(|s| s.style).unwrap_or_default(),
            lines,
            page: vec![ScaledDecimal::ZERO; n],
            grand: vec![ScaledDecimal::ZERO; n],
            fallback,
        }
    }

    fn accumulate(&mut self, ctx: &mut RenderContext<'_>, row: &TemplateDataRecord) {
        for (i, line) in self.lines.iter().enumerate() {
            if line.row.op != SummaryOp::Sum {
                continue;
            }
            let Some(code) = line.field_code.as_deref() else {
                continue;
            };
            let Some(value) = field_value(row, code) else {
                continue;
            };
            if let Some(d) = parse_decimal_value(value, &mut ctx.sink) {
                add_into(&mut self.page[i], d, ctx);
                add_into(&mut self.grand[i], d, ctx);
            }
        }
        if let Some((code, total)) = self.fallback.as_mut() {
            let value = field_value(row, code.as_str());
            if let Some(d) = value.and_then(|v| parse_decimal_value(v, &mut ctx.sink)) {
                add_into(total, d, ctx);
            }
        }
    }

    fn reset_page(&mut self) {
        self.page.fill(ScaledDecimal::ZERO);
    }

    fn line_count(&self, trailer: Trailer) -> usize {
        self.lines.iter().filter(|l| l.included_in(trailer)).count()
    }

    /// Grand total of the amount column, summed by a line or silently
    fn amount_total(&self) -> Option<ScaledDecimal> {
        self.lines
            .iter()
            .position(|l| l.row.op == SummaryOp::Sum && l.row.column_id == AMOUNT_COLUMN)
            .map(|i| self.grand[i])
            .or(self.fallback.as_ref().map(|(_, total)| *total))
    }
}

fn add_into(acc: &mut ScaledDecimal, value: ScaledDecimal, ctx: &mut RenderContext<'_>) {
    match acc.checked_add(value) {
        Some(sum) => *acc = sum,
        None => ctx.warn(Warning::number("summary accumulator overflowed")),
    }
}

struct TableDrawer<'t> {
    table: &'t TableElement,
    columns: Vec<Column<'t>>,
    font_size: f64,
    row_height: f64,
    border: Color,
}

impl<'t> TableDrawer<'t> {
    fn left(&self) -> f64 {
        self.columns.first().map_or(self.table.base.position.x, |c| c.x)
    }

    fn width(&self) -> f64 {
        self.columns
            .last()
            .map_or(0.0, |c| c.x + c.width - self.left())
    }

    fn cell_style(&self, column: &TableColumn, text: &str) -> TextStyle {
        TextStyle::new(self.font_size)
            .min_size(column.min_font_size)
            .align(default_align(column.align, text))
            .overflow(column.overflow)
            .padding(CELL_PADDING)
            .valign(if column.overflow == Overflow::Wrap {
                VAlign::Top
            } else {
                VAlign::Middle
            })
    }

    /// Display text of every cell in a row
    fn cell_texts(&self, ctx: &mut RenderContext<'_>, row: &TemplateDataRecord) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                let Some(code) = column.spec.field_code.as_deref() else {
                    return String::new();
                };
                let raw = match field_value(row, code) {
                    Some(value) => display_value(value, code, &mut ctx.sink),
                    None => {
                        ctx.warn(
                            Warning::data("field not found in table row")
                                .with("element", &self.table.base.id)
                                .with("fieldCode", code),
                        );
                        String::new()
                    }
                };
                format_value(&raw, column.spec.format, &mut ctx.sink)
            })
            .collect()
    }

    /// Declared height, grown to fit the most-wrapped cell
    fn row_height(&self, ctx: &RenderContext<'_>, cells: &[String]) -> f64 {
        let lines = self
            .columns
            .iter()
            .zip(cells)
            .filter(|(c, _)| c.spec.overflow == Overflow::Wrap)
            .map(|(c, text)| {
                let style = self.cell_style(c.spec, text);
                ctx.fit_lines(text, c.width, &style).0.len()
            })
            .max()
            .unwrap_or(1);
        self.row_height
            .max(LINE_HEIGHT_FACTOR * self.font_size * lines as f64 + 2.0 * CELL_PADDING)
    }

    /// Returns the Y below the header row
    fn draw_header_row(&self, ctx: &mut RenderContext<'_>, y: f64) -> Result<f64> {
        let table = self.table;
        if !table.show_header {
            return Ok(y);
        }
        let h = table.header_height;
        let fill = table.header_fill.unwrap_or(Color::gray(0.9));
        ctx.draw_box(
            BoxArea::new(self.left(), y, self.width(), h),
            Some(fill),
            Some(self.border),
            GRID_WIDTH,
        )?;
        let size = table.header_font_size.unwrap_or(self.font_size);
        for column in &self.columns {
            let area = BoxArea::new(column.x, y, column.width, h);
            ctx.draw_box(area, None, Some(self.border), GRID_WIDTH)?;
            let style = TextStyle::new(size)
                .align(column.spec.align.unwrap_or(Align::Left))
                .padding(CELL_PADDING);
            ctx.draw_text_box(&table.base.id, DrawPhase::Header, &column.spec.title, area, &style)?;
        }
        Ok(y + h)
    }

    fn draw_row(&self, ctx: &mut RenderContext<'_>, cells: &[String], y: f64, h: f64) -> Result<()> {
        for (column, text) in self.columns.iter().zip(cells) {
            let area = BoxArea::new(column.x, y, column.width, h);
            ctx.draw_box(area, None, Some(self.border), GRID_WIDTH)?;
            let style = self.cell_style(column.spec, text);
            ctx.draw_text_box(&self.table.base.id, DrawPhase::Cell, text, area, &style)?;
        }
        Ok(())
    }

    fn summary_height(&self) -> f64 {
        self.row_height
            .max(LINE_HEIGHT_FACTOR * self.font_size + 2.0 * CELL_PADDING)
    }

    /// Draw one trailer block; returns the Y below it
    fn draw_trailer(
        &self,
        ctx: &mut RenderContext<'_>,
        summaries: &Summaries<'_>,
        trailer: Trailer,
        mut y: f64,
    ) -> Result<f64> {
        let h = self.summary_height();
        let fill = summaries.style.fill_color.unwrap_or(Color::gray(0.95));
        let border = summaries.style.border_color.unwrap_or(self.border);
        let id = &self.table.base.id;

        if trailer == Trailer::Total && summaries.line_count(trailer) > 0 {
            let right = self.left() + self.width();
            ctx.draw_line((self.left(), y), (right, y), border, TOTAL_RULE_WIDTH)?;
        }
        for (i, line) in summaries.lines.iter().enumerate() {
            if !line.included_in(trailer) {
                continue;
            }
            let value = match line.row.op {
                SummaryOp::Sum => {
                    let acc = match trailer {
                        Trailer::Subtotal => summaries.page[i],
                        Trailer::Total => summaries.grand[i],
                    };
                    format_value(&acc.to_string(), self.columns[line.column].spec.format, &mut ctx.sink)
                }
                SummaryOp::Static => line.row.text.clone().unwrap_or_default(),
            };

            ctx.draw_box(
                BoxArea::new(self.left(), y, self.width(), h),
                Some(fill),
                Some(border),
                GRID_WIDTH,
            )?;
            let target = &self.columns[line.column];
            let label_area = if line.column > 0 {
                BoxArea::new(self.left(), y, target.x - self.left(), h)
            } else {
                BoxArea::new(target.x, y, target.width, h)
            };
            let label_style = TextStyle::new(self.font_size).padding(CELL_PADDING);
            ctx.draw_text_box(id, DrawPhase::Summary, &line.label(trailer), label_area, &label_style)?;

            let value_style = TextStyle::new(self.font_size)
                .min_size(target.spec.min_font_size)
                .align(target.spec.align.unwrap_or(Align::Right))
                .overflow(Overflow::Shrink)
                .padding(CELL_PADDING);
            let value_area = BoxArea::new(target.x, y, target.width, h);
            ctx.draw_text_box(id, DrawPhase::Summary, &value, value_area, &value_style)?;
            y += h;
        }
        Ok(y)
    }

    /// Start a continuation page; returns the Y below its header row
    fn break_page(&self, ctx: &mut RenderContext<'_>) -> Result<f64> {
        ctx.new_page()?;
        let top = ctx.continuation_top();
        self.draw_header_row(ctx, top)
    }

    /// Make room for a trailing block, breaking the page once if needed
    fn ensure_room(&self, ctx: &mut RenderContext<'_>, y: f64, needed: f64, bottom: f64) -> Result<f64> {
        if y + needed <= bottom {
            return Ok(y);
        }
        let y = self.break_page(ctx)?;
        if y + needed > bottom {
            ctx.warn(
                Warning::layout("summary rows cannot fit on a page")
                    .with("element", &self.table.base.id),
            );
        }
        Ok(y)
    }
}

/// Rows of the table's subtable, or one echo row in field-code preview
fn load_rows(ctx: &mut RenderContext<'_>, table: &TableElement) -> Vec<TemplateDataRecord> {
    if ctx.preview_mode == PreviewMode::FieldCode {
        let echo = table
            .columns
            .iter()
            .filter_map(|c| c.field_code.clone())
            .map(|code| (code.clone(), Value::String(code)))
            .collect();
        return vec![echo];
    }
    super::source_rows(ctx, &table.data_source, &table.base.id)
}

pub(crate) fn render(ctx: &mut RenderContext<'_>, table: &TableElement) -> Result<()> {
    let columns = layout_columns(ctx, table);
    if columns.is_empty() {
        ctx.warn(Warning::layout("table has no columns").with("element", &table.base.id));
        return Ok(());
    }
    let template = ctx.template;
    let mut summaries = Summaries::new(ctx, template.summary.as_ref(), &columns);
    let drawer = TableDrawer {
        table,
        columns,
        font_size: table.font_size,
        row_height: table.row_height,
        border: table.border_color.unwrap_or(Color::gray(0.6)),
    };
    let rows = load_rows(ctx, table);
    let accumulate = ctx.preview_mode == PreviewMode::Record;
    let bottom = ctx.body_bottom();

    let subtotal_block = match summaries.mode {
        SummaryMode::EveryPageSubtotalLastTotal => {
            summaries.line_count(Trailer::Subtotal) as f64 * drawer.summary_height()
        }
        _ => 0.0,
    };

    let mut y = drawer.draw_header_row(ctx, table.base.position.y)?;
    let mut rows_on_page = 0usize;
    let mut fresh_page = false;

    for (index, row) in rows.iter().enumerate() {
        let cells = drawer.cell_texts(ctx, row);
        let h = drawer.row_height(ctx, &cells);

        if y + h + subtotal_block > bottom {
            if !fresh_page {
                if rows_on_page > 0 && subtotal_block > 0.0 {
                    drawer.draw_trailer(ctx, &summaries, Trailer::Subtotal, y)?;
                    summaries.reset_page();
                }
                y = drawer.break_page(ctx)?;
                rows_on_page = 0;
                fresh_page = true;
            }
            if y + h + subtotal_block > bottom {
                ctx.warn(
                    Warning::layout("row is taller than the page body")
                        .with("element", &table.base.id)
                        .with("row", index + 1),
                );
            }
        }

        drawer.draw_row(ctx, &cells, y, h)?;
        if accumulate {
            summaries.accumulate(ctx, row);
        }
        y += h;
        rows_on_page += 1;
        fresh_page = false;
    }

    match summaries.mode {
        SummaryMode::None => {}
        SummaryMode::LastPageOnly => {
            let needed = summaries.line_count(Trailer::Total) as f64 * drawer.summary_height();
            y = drawer.ensure_room(ctx, y, needed, bottom)?;
            drawer.draw_trailer(ctx, &summaries, Trailer::Total, y)?;
        }
        SummaryMode::EveryPageSubtotalLastTotal => {
            y = drawer.draw_trailer(ctx, &summaries, Trailer::Subtotal, y)?;
            summaries.reset_page();
            let needed = summaries.line_count(Trailer::Total) as f64 * drawer.summary_height();
            y = drawer.ensure_room(ctx, y, needed, bottom)?;
            drawer.draw_trailer(ctx, &summaries, Trailer::Total, y)?;
        }
    }

    if accumulate {
        if let Some(total) = summaries.amount_total() {
            ctx.set_computed_total(total.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(label: Option<&str>, subtotal: Option<&str>) -> SummaryRow {
        SummaryRow {
            column_id: "amount".into(),
            label: label.map(str::to_string),
            subtotal_label: subtotal.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_labels() {
        let row = line(None, None);
        let l = SummaryLine {
            row: &row,
            column: 0,
            field_code: None,
        };
        assert_eq!(l.label(Trailer::Subtotal), "Subtotal");
        assert_eq!(l.label(Trailer::Total), "Total");

        let row = line(Some("Sum"), Some("Page sum"));
        let l = SummaryLine {
            row: &row,
            column: 0,
            field_code: None,
        };
        assert_eq!(l.label(Trailer::Subtotal), "Page sum");
        assert_eq!(l.label(Trailer::Total), "Sum");
        assert!(l.included_in(Trailer::Subtotal) && l.included_in(Trailer::Total));
    }
}
