//! Text, label and image elements

use text_fit::LINE_HEIGHT_FACTOR;

use crate::format::format_value;
use crate::renderer::{BoxArea, RenderContext, TextStyle, VAlign};
use crate::warnings::Warning;
use crate::{
    Align, DrawPhase, ImageElement, LabelElement, PreviewMode, Result, TemplateElement,
    TextElement,
};

/// Caption of the box drawn in place of an unavailable image
pub(crate) const IMAGE_PLACEHOLDER: &str = "IMAGE";

const LABEL_PADDING: f64 = 2.0;
const BORDER_WIDTH: f64 = 0.75;

/// Phase used for a body-region element
pub(crate) fn own_phase(el: &TemplateElement) -> DrawPhase {
    match el {
        TemplateElement::Label(_) => DrawPhase::Label,
        _ => DrawPhase::Text,
    }
}

pub(crate) fn draw(ctx: &mut RenderContext<'_>, el: &TemplateElement, phase: DrawPhase) -> Result<()> {
    match el {
        TemplateElement::Text(text) => draw_text(ctx, text, phase),
        TemplateElement::Label(label) => draw_label(ctx, label, phase),
        TemplateElement::Image(image) => draw_image(ctx, image, phase),
        TemplateElement::Table(_) | TemplateElement::CardList(_) => {
            ctx.warn(
                Warning::layout("body block cannot be drawn as a page element")
                    .with("element", el.id()),
            );
            Ok(())
        }
    }
}

fn element_area(base: &crate::ElementBase, min_height: f64) -> BoxArea {
    BoxArea::new(
        base.position.x,
        base.position.y,
        base.size.width,
        base.size.height.max(min_height),
    )
}

fn draw_text(ctx: &mut RenderContext<'_>, el: &TextElement, phase: DrawPhase) -> Result<()> {
    let raw = ctx.resolve(&el.data_source);
    let text = format_value(&raw, el.format, &mut ctx.sink);
    let style = TextStyle::new(el.font_size)
        .min_size(el.min_font_size)
        .align(el.align.unwrap_or_default())
        .color(el.color.unwrap_or_default())
        .overflow(el.overflow)
        .valign(VAlign::Top);
    let area = element_area(&el.base, el.font_size * LINE_HEIGHT_FACTOR);
    ctx.draw_text_box(&el.base.id, phase, &text, area, &style)
}

fn draw_label(ctx: &mut RenderContext<'_>, el: &LabelElement, phase: DrawPhase) -> Result<()> {
    let area = element_area(&el.base, el.font_size * LINE_HEIGHT_FACTOR);
    let boxed = el.fill_color.is_some() || el.border_color.is_some();
    if boxed {
        ctx.draw_box(area, el.fill_color, el.border_color, BORDER_WIDTH)?;
    }
    let style = TextStyle::new(el.font_size)
        .min_size(el.min_font_size)
        .align(el.align.unwrap_or(Align::Left))
        .color(el.color.unwrap_or_default())
        .overflow(el.overflow)
        .padding(if boxed { LABEL_PADDING } else { 0.0 });
    ctx.draw_text_box(&el.base.id, phase, &el.text, area, &style)
}

fn draw_image(ctx: &mut RenderContext<'_>, el: &ImageElement, phase: DrawPhase) -> Result<()> {
    let area = element_area(&el.base, 0.0);
    if ctx.preview_mode == PreviewMode::FieldCode {
        return ctx.draw_placeholder(&el.base.id, phase, area, IMAGE_PLACEHOLDER);
    }

    let url = ctx.resolve(&el.data_source);
    if url.is_empty() {
        ctx.warn(Warning::debug("image element has no URL").with("element", &el.base.id));
        return ctx.draw_placeholder(&el.base.id, phase, area, IMAGE_PLACEHOLDER);
    }
    // fetch failures were reported when the cache was filled
    let Some(bytes) = ctx.images.get(&url).map(<[u8]>::to_vec) else {
        return ctx.draw_placeholder(&el.base.id, phase, area, IMAGE_PLACEHOLDER);
    };
    if let Err(e) = ctx.draw_image(&bytes, area) {
        ctx.warn(
            Warning::image(format!("image could not be embedded: {e}"))
                .with("element", &el.base.id)
                .with("url", &url),
        );
        return ctx.draw_placeholder(&el.base.id, phase, area, IMAGE_PLACEHOLDER);
    }
    if el.base.size.width <= 0.0 || el.base.size.height <= 0.0 {
        ctx.warn(Warning::layout("image element has an empty box").with("element", &el.base.id));
    }
    Ok(())
}

