//! Card list body
//!
//! Each subtable row becomes one rounded card. The layout depends on how
//! many fields are bound: one field gets a single large text, two or three
//! a title with secondary rows, four or more a six-region grid.

use crate::format::format_value;
use crate::parser::{display_value, field_value};
use crate::renderer::{BoxArea, RenderContext, TextStyle};
use crate::warnings::Warning;
use crate::{
    Align, CardField, CardListElement, Color, DrawPhase, Overflow, PreviewMode, Result,
    TemplateDataRecord,
};

const PLACEHOLDER_CARDS: usize = 3;
const PLACEHOLDER_TINT: (f64, f64, f64) = (1.0, 0.97, 0.88);
const FULL_REGIONS: usize = 6;
/// Width / height ratio from which compact cards put secondaries beside the title
const WIDE_ASPECT: f64 = 3.0;
const MIN_TITLE_SIZE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Single,
    Compact { wide: bool },
    Full,
}

fn variant_for(active_fields: usize, width: f64, height: f64) -> Option<Variant> {
    match active_fields {
        0 => None,
        1 => Some(Variant::Single),
        2 | 3 => Some(Variant::Compact {
            wide: height > 0.0 && width / height >= WIDE_ASPECT,
        }),
        _ => Some(Variant::Full),
    }
}

/// Display values of one card, in field order
struct Card {
    values: Vec<String>,
}

fn secondary_text(field: &CardField, value: &str) -> String {
    match field.label.as_deref() {
        Some(label) if !label.is_empty() => format!("{label}: {value}"),
        _ => value.to_string(),
    }
}

fn card_from_row(
    ctx: &mut RenderContext<'_>,
    element_id: &str,
    fields: &[&CardField],
    row: &TemplateDataRecord,
) -> Card {
    let values = fields
        .iter()
        .map(|field| {
            let code = field.field_code.as_deref().unwrap_or_default();
            let raw = match field_value(row, code) {
                Some(value) => display_value(value, code, &mut ctx.sink),
                None => {
                    ctx.warn(
                        Warning::data("field not found in card row")
                            .with("element", element_id)
                            .with("fieldCode", code),
                    );
                    String::new()
                }
            };
            format_value(&raw, field.format, &mut ctx.sink)
        })
        .collect();
    Card { values }
}

/// Cards to draw and whether they are placeholders
fn load_cards(
    ctx: &mut RenderContext<'_>,
    list: &CardListElement,
    fields: &[&CardField],
) -> (Vec<Card>, bool) {
    if ctx.preview_mode == PreviewMode::FieldCode {
        let values = fields
            .iter()
            .map(|f| f.field_code.clone().unwrap_or_default())
            .collect();
        return (vec![Card { values }], false);
    }

    let rows = super::source_rows(ctx, &list.data_source, &list.base.id);
    if !rows.is_empty() {
        let cards = rows
            .iter()
            .map(|row| card_from_row(ctx, &list.base.id, fields, row))
            .collect();
        return (cards, false);
    }

    ctx.warn(Warning::debug("card list is empty; drawing sample cards").with("element", &list.base.id));
    let cards = (1..=PLACEHOLDER_CARDS)
        .map(|n| Card {
            values: fields
                .iter()
                .enumerate()
                .map(|(i, f)| match i {
                    0 => format!("Sample item {n}"),
                    _ => format!("Sample {}", f.label.as_deref().unwrap_or(&f.id)),
                })
                .collect(),
        })
        .collect();
    (cards, true)
}

struct CardDrawer<'l> {
    list: &'l CardListElement,
    fields: Vec<&'l CardField>,
    variant: Variant,
    placeholder: bool,
}

impl CardDrawer<'_> {
    fn id(&self) -> &str {
        &self.list.base.id
    }

    fn body_style(&self) -> TextStyle {
        TextStyle::new(self.list.body_font_size).overflow(Overflow::Ellipsis)
    }

    fn draw(&self, ctx: &mut RenderContext<'_>, card: &Card, area: BoxArea) -> Result<()> {
        let list = self.list;
        let fill = if self.placeholder {
            let (r, g, b) = PLACEHOLDER_TINT;
            Some(Color::rgb(r, g, b))
        } else {
            list.fill_color
        };
        let border = list.border_color.unwrap_or(Color::gray(0.6));
        ctx.draw_rounded_box(area, list.corner_radius, fill, Some(border), 0.75)?;

        let pad = list.padding;
        let inner = BoxArea::new(
            area.x + pad,
            area.y + pad,
            (area.w - 2.0 * pad).max(0.0),
            (area.h - 2.0 * pad).max(0.0),
        );
        if self.placeholder {
            let tag = TextStyle::new(list.body_font_size * 0.8)
                .align(Align::Right)
                .color(Color::gray(0.5))
                .overflow(Overflow::Clip);
            let tag_area = BoxArea::new(inner.x, inner.y, inner.w, list.body_font_size);
            ctx.draw_text_box(self.id(), DrawPhase::Card, "SAMPLE", tag_area, &tag)?;
        }

        match self.variant {
            Variant::Single => self.draw_single(ctx, card, inner),
            Variant::Compact { wide } => self.draw_compact(ctx, card, inner, wide),
            Variant::Full => self.draw_full(ctx, card, inner),
        }
    }

    fn draw_single(&self, ctx: &mut RenderContext<'_>, card: &Card, inner: BoxArea) -> Result<()> {
        let style = TextStyle::new(self.list.title_font_size)
            .align(Align::Center)
            .overflow(Overflow::Wrap);
        ctx.draw_text_box(self.id(), DrawPhase::Card, &card.values[0], inner, &style)
    }

    fn draw_title(&self, ctx: &mut RenderContext<'_>, text: &str, area: BoxArea) -> Result<()> {
        ctx.draw_title(
            self.id(),
            DrawPhase::Card,
            text,
            area,
            self.list.title_font_size,
            MIN_TITLE_SIZE.min(self.list.title_font_size),
            Align::Left,
        )
    }

    /// Secondary fields stacked evenly inside `area`
    fn draw_secondaries(&self, ctx: &mut RenderContext<'_>, card: &Card, area: BoxArea) -> Result<()> {
        let rows: Vec<String> = self
            .fields
            .iter()
            .zip(&card.values)
            .skip(1)
            .take(2)
            .map(|(f, v)| secondary_text(f, v))
            .collect();
        if rows.is_empty() {
            return Ok(());
        }
        let h = area.h / rows.len() as f64;
        let style = self.body_style();
        for (i, text) in rows.iter().enumerate() {
            let slot = BoxArea::new(area.x, area.y + i as f64 * h, area.w, h);
            ctx.draw_text_box(self.id(), DrawPhase::Card, text, slot, &style)?;
        }
        Ok(())
    }

    fn draw_compact(
        &self,
        ctx: &mut RenderContext<'_>,
        card: &Card,
        inner: BoxArea,
        wide: bool,
    ) -> Result<()> {
        if wide {
            let title_w = inner.w * 0.6;
            self.draw_title(ctx, &card.values[0], BoxArea::new(inner.x, inner.y, title_w, inner.h))?;
            let side = BoxArea::new(inner.x + title_w, inner.y, inner.w - title_w, inner.h);
            self.draw_secondaries(ctx, card, side)
        } else {
            let title_h = inner.h * 0.55;
            self.draw_title(ctx, &card.values[0], BoxArea::new(inner.x, inner.y, inner.w, title_h))?;
            let below = BoxArea::new(inner.x, inner.y + title_h, inner.w, inner.h - title_h);
            self.draw_secondaries(ctx, card, below)
        }
    }

    /// Two-thirds / one-third columns across three bands
    fn draw_full(&self, ctx: &mut RenderContext<'_>, card: &Card, inner: BoxArea) -> Result<()> {
        let left_w = inner.w * 2.0 / 3.0;
        let bands = [0.4, 0.3, 0.3];
        let mut regions = Vec::with_capacity(FULL_REGIONS);
        let mut y = inner.y;
        for share in bands {
            let h = inner.h * share;
            regions.push(BoxArea::new(inner.x, y, left_w, h));
            regions.push(BoxArea::new(inner.x + left_w, y, inner.w - left_w, h));
            y += h;
        }

        let style = self.body_style();
        for (i, ((field, value), region)) in self
            .fields
            .iter()
            .zip(&card.values)
            .zip(regions)
            .enumerate()
        {
            if i == 0 {
                self.draw_title(ctx, value, region)?;
            } else {
                let text = secondary_text(field, value);
                ctx.draw_text_box(self.id(), DrawPhase::Card, &text, region, &style)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn render(ctx: &mut RenderContext<'_>, list: &CardListElement) -> Result<()> {
    let fields: Vec<&CardField> = list.fields.iter().filter(|f| f.is_active()).collect();
    let (x, width, height) = (list.base.position.x, list.base.size.width, list.card_height);
    let Some(variant) = variant_for(fields.len(), width, height) else {
        ctx.warn(Warning::layout("card list has no bound fields").with("element", &list.base.id));
        return Ok(());
    };
    if fields.len() > FULL_REGIONS {
        ctx.warn(
            Warning::layout(format!("only the first {FULL_REGIONS} card fields are shown"))
                .with("element", &list.base.id),
        );
    }

    let (cards, placeholder) = load_cards(ctx, list, &fields);
    let drawer = CardDrawer {
        list,
        fields,
        variant,
        placeholder,
    };
    log::debug!(
        "card list '{}': {} cards, {:?}",
        list.base.id,
        cards.len(),
        variant
    );

    let bottom = ctx.body_bottom();
    let mut y = list.base.position.y;
    let mut fresh_page = false;
    for (index, card) in cards.iter().enumerate() {
        if y + height > bottom {
            if !fresh_page {
                ctx.new_page()?;
                y = ctx.continuation_top();
                fresh_page = true;
            }
            if y + height > bottom {
                ctx.warn(
                    Warning::layout("card is taller than the page body")
                        .with("element", &list.base.id)
                        .with("card", index + 1),
                );
            }
        }
        drawer.draw(ctx, card, BoxArea::new(x, y, width, height))?;
        y += height + list.gap;
        fresh_page = false;
    }
    Ok(())
}
